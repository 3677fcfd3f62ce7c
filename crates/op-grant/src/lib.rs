//! # op-grant
//!
//! OAuth 2.0 authorization code grant engine (RFC 6749 Section 4.1).
//!
//! The engine owns client lookup, scope resolution, code minting and storage.
//! Authorization decisions that depend on the protocol profile layered on top
//! (request validation, consent skipping, state and code enrichment) are
//! delegated to injected extensions, see [`extension`].
//!
//! ## Modules
//!
//! - [`error`] - OAuth 2.0 error types
//! - [`extension`] - Extension points for authorization decisions
//! - [`model`] - Clients, subjects, permissions, redirection state, code registrations
//! - [`params`] - Multi-valued request parameters
//! - [`phase`] - Authorization phase machine
//! - [`registry`] - Client, scope and pre-authorized token collaborators
//! - [`service`] - The grant service
//! - [`store`] - Authorization code and consent session storage

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extension;
pub mod model;
pub mod params;
pub mod phase;
pub mod registry;
pub mod service;
pub mod store;

pub use error::{ErrorResponse, GrantError, GrantResult};
pub use extension::{
    AlwaysRequireConsent, CodeRegistrationExtension, ConsentPolicy, RedirectionStateExtension,
    RequestValidator,
};
pub use model::{
    AuthorizationCodeRegistration, Client, ExtraProperties, OAuthPermission,
    OAuthRedirectionState, PendingAuthorization, ServerAccessToken, ServerAuthorizationCodeGrant,
    UserSubject,
};
pub use params::RequestParams;
pub use phase::AuthorizationPhase;
pub use registry::{
    ClientRegistry, InMemoryClientRegistry, InMemoryTokenRegistry, NoPreauthorizedTokens,
    PreauthorizedTokenProvider, ScopeResolver, StaticScopeResolver,
};
pub use service::{
    AuthorizationCodeGrantService, AuthorizationCodeResponse, AuthorizationOutcome,
    ConsentRequest, GrantServiceBuilder,
};
pub use store::{
    AuthorizationCodeStore, ConsentSessionStore, InMemoryAuthorizationCodeStore,
    InMemoryConsentSessionStore,
};
