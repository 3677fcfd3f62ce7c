//! # op-oidc
//!
//! `OpenID` Connect authorization decisions layered on the authorization code
//! grant engine in [`op_grant`].
//!
//! The layer plugs four strategies into the engine:
//!
//! - [`PromptValidator`] rejects `prompt` lists combining `none` with other
//!   values, before the client is resolved
//! - [`OidcConsentPolicy`] skips consent for `openid`-only requests when the
//!   operator enabled it
//! - [`ClaimsRequestExtension`] carries the raw `claims` parameter in the
//!   redirection state
//! - [`ExtraPropertiesEnricher`] copies the state's extra properties into the
//!   code registration
//!
//! [`OidcGrantServiceExt::with_oidc`] installs all four on a
//! [`GrantServiceBuilder`](op_grant::GrantServiceBuilder).
//!
//! ## Modules
//!
//! - [`claims`] - Claims request propagation and decoding
//! - [`consent`] - Consent skipping for authentication-only requests
//! - [`enricher`] - Extra property enrichment of code registrations
//! - [`prompt`] - `prompt` parameter validation
//! - [`service`] - Grant service wiring

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod consent;
pub mod enricher;
pub mod prompt;
pub mod service;

pub use claims::{ClaimsRequest, ClaimsRequestExtension, IndividualClaimRequest};
pub use consent::OidcConsentPolicy;
pub use enricher::ExtraPropertiesEnricher;
pub use prompt::{Prompt, PromptValidator};
pub use service::OidcGrantServiceExt;
