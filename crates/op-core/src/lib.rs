//! # op-core
//!
//! Configuration, error handling, audit events and logging shared by the
//! OpenID provider crates.
//!
//! ## Modules
//!
//! - [`config`] - Operator configuration loaded from the environment
//! - [`error`] - Core error type
//! - [`event`] - Structured audit events for the authorization flow
//! - [`logging`] - `tracing` subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod logging;

pub use config::{AuthorizationConfig, Config};
pub use error::{Error, Result};
pub use event::{
    Event, EventBuilder, EventListener, EventOutcome, EventType, RecordingEventListener,
    TracingEventListener,
};
