//! Extension points for authorization decisions.
//!
//! The grant service is profile-agnostic. A protocol profile (such as OpenID
//! Connect) plugs its rules in through these traits:
//!
//! - [`RequestValidator`] - runs before anything else touches the request
//! - [`ConsentPolicy`] - decides whether the consent form can be skipped
//! - [`RedirectionStateExtension`] - augments state rebuilt from parameters
//! - [`CodeRegistrationExtension`] - augments the record a code is minted from
//!
//! Implementations must be pure functions of their inputs: the service calls
//! them concurrently for independent requests.

use crate::error::GrantResult;
use crate::model::{
    AuthorizationCodeRegistration, Client, OAuthPermission, OAuthRedirectionState, UserSubject,
};
use crate::params::RequestParams;

/// Validates raw request parameters before client resolution.
pub trait RequestValidator: Send + Sync {
    /// Returns an error to reject the request.
    ///
    /// # Errors
    ///
    /// Returns the protocol error to report to the client.
    fn validate(&self, params: &RequestParams) -> GrantResult<()>;
}

/// Decides whether the interactive consent form may be bypassed.
pub trait ConsentPolicy: Send + Sync {
    /// Returns `true` to issue the code without asking the user.
    fn can_authorization_be_skipped(
        &self,
        client: &Client,
        subject: &UserSubject,
        requested_scope: &[String],
        permissions: &[OAuthPermission],
    ) -> bool;
}

/// Consent policy that always shows the consent form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRequireConsent;

impl ConsentPolicy for AlwaysRequireConsent {
    fn can_authorization_be_skipped(
        &self,
        _client: &Client,
        _subject: &UserSubject,
        _requested_scope: &[String],
        _permissions: &[OAuthPermission],
    ) -> bool {
        false
    }
}

/// Augments redirection state after the base reconstruction.
///
/// Implementations must only add entries; keys set by the base step stay untouched.
pub trait RedirectionStateExtension: Send + Sync {
    /// Adds profile-specific data from `params` to `state`.
    fn extend_state(&self, state: &mut OAuthRedirectionState, params: &RequestParams);
}

/// Augments a code registration after the base population.
pub trait CodeRegistrationExtension: Send + Sync {
    /// Adds data from the originating `state` to `registration`.
    fn extend_registration(
        &self,
        registration: &mut AuthorizationCodeRegistration,
        state: &OAuthRedirectionState,
    );
}
