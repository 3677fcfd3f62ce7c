//! OIDC wiring for the authorization code grant service.

use op_core::AuthorizationConfig;
use op_grant::GrantServiceBuilder;

use crate::claims::ClaimsRequestExtension;
use crate::consent::OidcConsentPolicy;
use crate::enricher::ExtraPropertiesEnricher;
use crate::prompt::PromptValidator;

/// Installs the OpenID Connect authorization decisions on a grant service.
pub trait OidcGrantServiceExt {
    /// Adds prompt validation, the `openid` consent shortcut, claims
    /// propagation and extra property enrichment, and applies the code
    /// lifespan from `config`.
    #[must_use]
    fn with_oidc(self, config: &AuthorizationConfig) -> Self;
}

impl OidcGrantServiceExt for GrantServiceBuilder {
    fn with_oidc(self, config: &AuthorizationConfig) -> Self {
        tracing::debug!(
            skip_authorization_with_oidc_scope = config.skip_authorization_with_oidc_scope,
            "installing OIDC authorization decisions"
        );
        self.authorization_config(config)
            .request_validator(PromptValidator::new())
            .consent_policy(OidcConsentPolicy::from_config(config))
            .redirection_state_extension(ClaimsRequestExtension::new())
            .code_registration_extension(ExtraPropertiesEnricher::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use op_grant::{
        AuthorizationCodeGrantService, AuthorizationCodeStore, AuthorizationOutcome,
        AuthorizationPhase, Client, ExtraProperties, InMemoryAuthorizationCodeStore,
        InMemoryClientRegistry, RequestParams, StaticScopeResolver, UserSubject,
    };
    use std::sync::Arc;

    fn service(
        skip: bool,
        codes: Arc<InMemoryAuthorizationCodeStore>,
    ) -> AuthorizationCodeGrantService {
        let config = AuthorizationConfig::default().with_skip_authorization_with_oidc_scope(skip);
        AuthorizationCodeGrantService::builder(
            Arc::new(InMemoryClientRegistry::with_clients([
                Client::new("rp").with_redirect_uri("https://rp.example/cb")
            ])),
            Arc::new(StaticScopeResolver::with_oidc_scopes()),
            codes,
        )
        .with_oidc(&config)
        .build()
    }

    fn request(scope: &str) -> RequestParams {
        RequestParams::new()
            .with("client_id", "rp")
            .with("response_type", "code")
            .with("scope", scope)
    }

    #[tokio::test]
    async fn claims_reach_the_stored_code() {
        let codes = Arc::new(InMemoryAuthorizationCodeStore::new());
        let service = service(true, codes.clone());
        let claims = r#"{"id_token":{"email":null}}"#;

        let outcome = service
            .start_authorization(&request("openid").with("claims", claims), &UserSubject::new("alice"))
            .await
            .unwrap();

        let AuthorizationOutcome::CodeIssued(response) = outcome else {
            panic!("expected consent to be skipped");
        };
        let grant = codes.take_code(&response.code).await.unwrap().unwrap();
        let extra = &grant.registration.extra_properties;
        assert_eq!(extra.get(ExtraProperties::CLAIMS), Some(claims));
        assert_eq!(extra.get(ExtraProperties::RESPONSE_TYPE), Some("code"));
    }

    #[tokio::test]
    async fn disabled_flag_requires_consent() {
        let codes = Arc::new(InMemoryAuthorizationCodeStore::new());
        let service = service(false, codes.clone());

        let outcome = service
            .start_authorization(&request("openid"), &UserSubject::new("alice"))
            .await
            .unwrap();

        assert_eq!(outcome.phase(), AuthorizationPhase::ConsentPending);
        assert!(codes.is_empty().await);
    }

    #[tokio::test]
    async fn prompt_none_with_consent_is_rejected() {
        let codes = Arc::new(InMemoryAuthorizationCodeStore::new());
        let service = service(true, codes.clone());

        let err = service
            .start_authorization(
                &request("openid").with("prompt", "none consent"),
                &UserSubject::new("alice"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "invalid_request");
        assert!(codes.is_empty().await);
    }
}
