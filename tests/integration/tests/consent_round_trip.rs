//! Consent leg: the state leaves with the consent form and comes back with
//! the user's decision.

use chrono::{Duration, Utc};
use op_core::EventType;
use op_grant::{
    AuthorizationCodeStore, ExtraProperties, GrantError, RequestParams, ServerAccessToken,
};

use crate::common::{TestEnv, CLIENT_ID};

const CLAIMS: &str = r#"{"userinfo":{"email":{"essential":true},"email_verified":null}}"#;

/// Claims attached to the initial request are still on the code after the
/// consent form round trip.
#[tokio::test]
async fn test_claims_survive_consent_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let request = env
        .authorization_request("openid email profile")
        .with("claims", CLAIMS);
    let outcome = env.service.start_authorization(&request, &env.user()).await?;
    let consent = outcome
        .consent_request()
        .ok_or_else(|| anyhow::anyhow!("expected a consent request"))?;
    assert_eq!(
        consent.state.extra_properties.get(ExtraProperties::CLAIMS),
        Some(CLAIMS)
    );

    // The user approves email but not profile.
    let form = consent
        .form_params()
        .with("oauthDecision", "allow")
        .with("email_status", "allow");
    let response = env.service.complete_authorization(&form, &env.user()).await?;
    assert_eq!(response.state.as_deref(), Some("af0ifjsldkj"));

    let grant = env
        .codes
        .take_code(&response.code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code was not stored"))?;
    let registration = &grant.registration;
    assert_eq!(registration.client_id, CLIENT_ID);
    assert_eq!(registration.requested_scope, vec!["openid", "email", "profile"]);
    assert_eq!(registration.approved_scope, vec!["openid", "email"]);
    assert_eq!(registration.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
    assert_eq!(
        registration.extra_properties.get(ExtraProperties::CLAIMS),
        Some(CLAIMS)
    );

    assert_eq!(
        env.events.event_types(),
        vec![
            EventType::AuthorizationRequested,
            EventType::ConsentRequired,
            EventType::CodeIssued
        ]
    );

    Ok(())
}

/// The consent form can also be posted back as a raw form body.
#[tokio::test]
async fn test_consent_form_body_is_accepted() -> anyhow::Result<()> {
    let env = TestEnv::new(false)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;
    let consent = outcome
        .consent_request()
        .ok_or_else(|| anyhow::anyhow!("expected a consent request"))?;

    let body = consent
        .form_params()
        .with("oauthDecision", "allow")
        .to_form();
    let form = RequestParams::from_form(&body);

    let response = env.service.complete_authorization(&form, &env.user()).await?;
    assert!(!response.code.is_empty());

    Ok(())
}

/// A consent submission that was never started cannot mint a code, even
/// when it carries an approval and a request the validators would refuse.
#[tokio::test]
async fn test_unstarted_consent_submission_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let form = env
        .authorization_request("openid")
        .with("prompt", "none login")
        .with("oauthDecision", "allow");
    let err = env
        .service
        .complete_authorization(&form, &env.user())
        .await
        .expect_err("submission without a consent session must fail");

    assert!(matches!(err, GrantError::InvalidRequest(_)));
    assert_eq!(env.clients.lookups(), 0);
    assert!(env.codes.is_empty().await);
    assert_eq!(env.events.event_types(), vec![EventType::RequestRejected]);

    Ok(())
}

/// Replaying an approved consent form fails the second time.
#[tokio::test]
async fn test_consent_form_cannot_be_replayed() -> anyhow::Result<()> {
    let env = TestEnv::new(false)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;
    let form = outcome
        .consent_request()
        .ok_or_else(|| anyhow::anyhow!("expected a consent request"))?
        .form_params()
        .with("oauthDecision", "allow");

    env.service.complete_authorization(&form, &env.user()).await?;
    let err = env
        .service
        .complete_authorization(&form, &env.user())
        .await
        .expect_err("replayed form must fail");
    assert_eq!(err.error_code(), "invalid_request");
    assert_eq!(env.codes.len().await, 1);

    Ok(())
}

/// Declining consent issues nothing.
#[tokio::test]
async fn test_denied_consent_issues_no_code() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid profile"), &env.user())
        .await?;
    let consent = outcome
        .consent_request()
        .ok_or_else(|| anyhow::anyhow!("expected a consent request"))?;

    let form = consent.form_params().with("oauthDecision", "deny");
    let err = env
        .service
        .complete_authorization(&form, &env.user())
        .await
        .expect_err("denied consent must fail");

    assert!(matches!(err, GrantError::AccessDenied(_)));
    assert_eq!(err.to_error_response().error, "access_denied");
    assert!(env.codes.is_empty().await);
    assert_eq!(
        env.events.event_types().last(),
        Some(&EventType::ConsentDenied)
    );

    Ok(())
}

/// A live token covering the request lets a returning user skip consent.
#[tokio::test]
async fn test_preauthorized_token_skips_consent() -> anyhow::Result<()> {
    let env = TestEnv::new(false)?;
    let now = Utc::now();
    env.tokens
        .add(ServerAccessToken {
            token_key: "at-7b1c".to_string(),
            client_id: CLIENT_ID.to_string(),
            subject: env.user().login,
            scopes: vec!["openid".to_string(), "profile".to_string()],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(10),
        })
        .await;

    let request = env
        .authorization_request("openid profile")
        .with("claims", CLAIMS);
    let outcome = env.service.start_authorization(&request, &env.user()).await?;
    let code = outcome
        .code()
        .ok_or_else(|| anyhow::anyhow!("expected consent to be skipped"))?;

    let grant = env
        .codes
        .take_code(code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code was not stored"))?;
    assert_eq!(
        grant.registration.preauthorized_token_key.as_deref(),
        Some("at-7b1c")
    );
    assert_eq!(
        grant.registration.extra_properties.get(ExtraProperties::CLAIMS),
        Some(CLAIMS)
    );

    Ok(())
}

/// A redeemed code cannot be taken twice.
#[tokio::test]
async fn test_code_is_single_use() -> anyhow::Result<()> {
    let env = TestEnv::new(true)?;

    let outcome = env
        .service
        .start_authorization(&env.authorization_request("openid"), &env.user())
        .await?;
    let code = outcome
        .code()
        .ok_or_else(|| anyhow::anyhow!("expected a code"))?;

    assert!(env.codes.take_code(code).await?.is_some());
    assert!(env.codes.take_code(code).await?.is_none());

    Ok(())
}
