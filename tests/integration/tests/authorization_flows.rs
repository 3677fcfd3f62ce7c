//! Initial authorization leg: prompt validation and consent skipping.

use op_core::EventType;
use op_grant::{
    AuthorizationCodeStore, AuthorizationOutcome, AuthorizationPhase, ExtraProperties, GrantError,
};
use url::Url;

use crate::common::{TestEnv, CLIENT_ID, REDIRECT_URI};

/// An `openid`-only request skips consent and returns a code directly.
#[tokio::test]
async fn test_openid_only_request_skips_consent() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;

    let AuthorizationOutcome::CodeIssued(response) = outcome else {
        anyhow::bail!("expected consent to be skipped");
    };
    assert_eq!(response.redirect_uri, REDIRECT_URI);
    assert_eq!(response.state.as_deref(), Some("af0ifjsldkj"));

    let location = Url::parse(&response.location)?;
    let code = location
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned());
    assert_eq!(code.as_deref(), Some(response.code.as_str()));

    let grant = env
        .codes
        .take_code(&response.code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code was not stored"))?;
    assert_eq!(grant.registration.client_id, CLIENT_ID);
    assert_eq!(grant.registration.approved_scope, vec!["openid"]);
    assert_eq!(grant.registration.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
    assert_eq!((grant.expires_at - grant.issued_at).num_seconds(), 120);

    assert_eq!(
        env.events.event_types(),
        vec![
            EventType::AuthorizationRequested,
            EventType::ConsentSkipped,
            EventType::CodeIssued
        ]
    );

    Ok(())
}

/// Any scope besides `openid` brings the consent form back.
#[tokio::test]
async fn test_additional_scope_requires_consent() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid profile"), &env.user())
        .await?;

    assert_eq!(outcome.phase(), AuthorizationPhase::ConsentPending);
    let consent = outcome
        .consent_request()
        .ok_or_else(|| anyhow::anyhow!("expected a consent request"))?;
    assert_eq!(consent.client_name.as_deref(), Some("Test Client"));
    let scopes: Vec<&str> = consent
        .permissions
        .iter()
        .map(|p| p.permission.as_str())
        .collect();
    assert_eq!(scopes, vec!["openid", "profile"]);
    assert!(env.codes.is_empty().await);

    Ok(())
}

/// With the shortcut disabled even `openid` alone needs consent.
#[tokio::test]
async fn test_disabled_shortcut_requires_consent() -> anyhow::Result<()> {
    let env = TestEnv::new(false)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;

    assert_eq!(outcome.phase(), AuthorizationPhase::ConsentPending);
    assert!(env.codes.is_empty().await);

    Ok(())
}

/// `prompt=none consent` is refused before the client is even looked up.
#[tokio::test]
async fn test_prompt_none_combination_rejected_before_resolution() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let params = env
        .authorization_request("openid")
        .with("prompt", "none consent");
    let err = env
        .service
        .start_authorization(&params, &env.user())
        .await
        .expect_err("prompt=none consent must be rejected");

    assert!(matches!(err, GrantError::InvalidRequest(_)));
    let response = err.to_error_response();
    assert_eq!(response.error, "invalid_request");
    assert_eq!(err.http_status(), 400);

    assert_eq!(env.clients.lookups(), 0, "client registry must not be queried");
    assert!(env.codes.is_empty().await, "no code may be stored");
    assert_eq!(env.events.event_types(), vec![EventType::RequestRejected]);

    Ok(())
}

/// Single-token prompts, known or not, never block the flow.
#[tokio::test]
async fn test_single_prompt_values_pass() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    for prompt in ["none", "login", "banana"] {
        let params = env.authorization_request("openid").with("prompt", prompt);
        let outcome = env.service.start_authorization(&params, &env.user()).await?;
        assert!(outcome.code().is_some(), "prompt={prompt}");
    }

    let params = env
        .authorization_request("openid")
        .with("prompt", "login consent");
    let outcome = env.service.start_authorization(&params, &env.user()).await?;
    assert!(outcome.code().is_some());

    Ok(())
}

/// A claims request on the silent path reaches the stored code untouched.
#[tokio::test]
async fn test_claims_survive_to_code_on_silent_path() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;
    let claims = serde_json::json!({
        "id_token": { "email": { "essential": true } },
        "userinfo": { "name": null }
    })
    .to_string();

    let params = env
        .authorization_request("openid")
        .with("claims", claims.as_str());
    let outcome = env.service.start_authorization(&params, &env.user()).await?;
    let code = outcome
        .code()
        .ok_or_else(|| anyhow::anyhow!("expected a code"))?;

    let grant = env
        .codes
        .take_code(code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code was not stored"))?;
    let extra = &grant.registration.extra_properties;
    assert_eq!(extra.get(ExtraProperties::CLAIMS), Some(claims.as_str()));

    let request = op_oidc::ClaimsRequest::from_extra_properties(extra)?
        .ok_or_else(|| anyhow::anyhow!("claims request missing"))?;
    assert!(request.is_essential("email"));

    Ok(())
}

/// Without a claims parameter no claims key is carried.
#[tokio::test]
async fn test_no_claims_parameter_carries_no_key() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let state = env
        .service
        .recreate_redirection_state_from_params(&env.authorization_request("openid"));
    assert!(!state.extra_properties.contains_key(ExtraProperties::CLAIMS));

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;
    let code = outcome
        .code()
        .ok_or_else(|| anyhow::anyhow!("expected a code"))?;
    let grant = env
        .codes
        .take_code(code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code was not stored"))?;
    assert!(!grant
        .registration
        .extra_properties
        .contains_key(ExtraProperties::CLAIMS));

    Ok(())
}

/// Engine errors pass through the OIDC layer unchanged.
#[tokio::test]
async fn test_engine_errors_propagate() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let mut params = env.authorization_request("openid");
    params.insert("client_id", "unknown-client");
    let err = env
        .service
        .start_authorization(&params, &env.user())
        .await
        .expect_err("unknown client");
    assert_eq!(err.error_code(), "invalid_client");

    let params = env.authorization_request("openid wallet");
    let err = env
        .service
        .start_authorization(&params, &env.user())
        .await
        .expect_err("unknown scope");
    assert_eq!(err.error_code(), "invalid_scope");

    assert!(env.codes.is_empty().await);

    Ok(())
}

/// The same request yields the same decision every time.
#[tokio::test]
async fn test_decisions_are_deterministic() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;
    let params = env.authorization_request("openid email");

    for _ in 0..3 {
        let outcome = env.service.start_authorization(&params, &env.user()).await?;
        assert_eq!(outcome.phase(), AuthorizationPhase::ConsentPending);
    }

    Ok(())
}
