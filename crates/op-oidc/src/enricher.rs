//! Carries redirection state extra properties into code registrations.

use op_grant::{AuthorizationCodeRegistration, CodeRegistrationExtension, OAuthRedirectionState};

/// Copies every extra property of the state into the code registration.
///
/// Runs after the base population, and the state's value wins on key
/// collisions. This is how a claims request reaches ID token assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraPropertiesEnricher;

impl ExtraPropertiesEnricher {
    /// Creates the enricher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CodeRegistrationExtension for ExtraPropertiesEnricher {
    fn extend_registration(
        &self,
        registration: &mut AuthorizationCodeRegistration,
        state: &OAuthRedirectionState,
    ) {
        if !state.extra_properties.is_empty() {
            tracing::trace!(
                client_id = %registration.client_id,
                count = state.extra_properties.len(),
                "copying extra properties into code registration"
            );
        }
        registration.extra_properties.merge_from(&state.extra_properties);
    }
}
