//! Consent skipping for authentication-only requests.

use op_core::AuthorizationConfig;
use op_grant::model::OPENID_SCOPE;
use op_grant::{Client, ConsentPolicy, OAuthPermission, UserSubject};

/// Skips the consent form when a request asks for nothing but `openid`.
///
/// Such a request only authenticates the user to the relying party, so the
/// operator may opt out of asking for consent. Any additional scope forces
/// the consent form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OidcConsentPolicy {
    skip_authorization_with_oidc_scope: bool,
}

impl OidcConsentPolicy {
    /// Creates the policy with an explicit flag.
    #[must_use]
    pub const fn new(skip_authorization_with_oidc_scope: bool) -> Self {
        Self {
            skip_authorization_with_oidc_scope,
        }
    }

    /// Creates the policy from the authorization configuration.
    #[must_use]
    pub const fn from_config(config: &AuthorizationConfig) -> Self {
        Self::new(config.skip_authorization_with_oidc_scope)
    }

    /// Checks whether the shortcut is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.skip_authorization_with_oidc_scope
    }
}

impl ConsentPolicy for OidcConsentPolicy {
    fn can_authorization_be_skipped(
        &self,
        _client: &Client,
        _subject: &UserSubject,
        requested_scope: &[String],
        permissions: &[OAuthPermission],
    ) -> bool {
        self.skip_authorization_with_oidc_scope
            && permissions.len() == 1
            && matches!(requested_scope, [only] if only == OPENID_SCOPE)
    }
}
