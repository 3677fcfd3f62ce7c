//! Authorization code grant service.
//!
//! Drives one authorization transaction through the [`AuthorizationPhase`]
//! machine:
//!
//! 1. Request validators run on the raw parameters (fail fast, before the
//!    client registry or scope resolver is consulted)
//! 2. The client, redirect URI and scopes are resolved
//! 3. The consent policy (or a live pre-authorized token) decides whether the
//!    consent form is shown
//! 4. On approval a code registration is built, extended, and minted into a
//!    stored code
//!
//! When consent is required the validated state is parked in a
//! [`ConsentSessionStore`] under a random session token. The consent form
//! posts that token back to [`AuthorizationCodeGrantService::complete_authorization`],
//! which resumes the parked state; nothing else in the submission feeds the
//! code except the user's decision.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use op_core::config::MAX_CODE_LIFESPAN_SECS;
use op_core::{AuthorizationConfig, Event, EventBuilder, EventListener, EventType, TracingEventListener};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GrantError, GrantResult};
use crate::extension::{
    AlwaysRequireConsent, CodeRegistrationExtension, ConsentPolicy, RedirectionStateExtension,
    RequestValidator,
};
use crate::model::{
    AuthorizationCodeRegistration, Client, ExtraProperties, OAuthPermission,
    OAuthRedirectionState, PendingAuthorization, ServerAccessToken, ServerAuthorizationCodeGrant,
    UserSubject,
};
use crate::params::{names, RequestParams};
use crate::phase::AuthorizationPhase;
use crate::registry::{ClientRegistry, NoPreauthorizedTokens, PreauthorizedTokenProvider, ScopeResolver};
use crate::store::{AuthorizationCodeStore, ConsentSessionStore, InMemoryConsentSessionStore};

/// The only response type this engine issues.
const CODE_RESPONSE_TYPE: &str = "code";

/// Length of generated codes and session tokens.
const TOKEN_LENGTH: usize = 32;

/// Data needed to render the consent form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequest {
    /// OAuth `client_id`.
    pub client_id: String,

    /// Client display name.
    pub client_name: Option<String>,

    /// Login name of the end user.
    pub user: String,

    /// Redirection state parked for this form, for display.
    pub state: OAuthRedirectionState,

    /// Token the form posts back to resume the parked state.
    pub session_token: String,

    /// One permission per requested scope.
    pub permissions: Vec<OAuthPermission>,
}

impl ConsentRequest {
    /// Hidden form fields the consent form must post back.
    ///
    /// Only the session token is carried. The form adds [`names::DECISION`]
    /// and one `<scope>_status` field per approved scope.
    #[must_use]
    pub fn form_params(&self) -> RequestParams {
        RequestParams::new().with(names::SESSION_TOKEN, self.session_token.clone())
    }
}

/// Successful authorization response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeResponse {
    /// The authorization code.
    pub code: String,

    /// State parameter from the request.
    pub state: Option<String>,

    /// Redirection endpoint the response is sent to.
    pub redirect_uri: String,

    /// Full redirect location including `code` and `state`.
    pub location: String,

    /// Code expiry.
    pub expires_at: DateTime<Utc>,
}

/// Result of an authorization leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The consent form must be shown.
    ConsentRequired(ConsentRequest),

    /// A code was issued.
    CodeIssued(AuthorizationCodeResponse),
}

impl AuthorizationOutcome {
    /// Phase the transaction ended in.
    #[must_use]
    pub const fn phase(&self) -> AuthorizationPhase {
        match self {
            Self::ConsentRequired(_) => AuthorizationPhase::ConsentPending,
            Self::CodeIssued(_) => AuthorizationPhase::CodeIssued,
        }
    }

    /// Returns the issued code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::CodeIssued(response) => Some(response.code.as_str()),
            Self::ConsentRequired(_) => None,
        }
    }

    /// Returns the consent request, if consent is required.
    #[must_use]
    pub const fn consent_request(&self) -> Option<&ConsentRequest> {
        match self {
            Self::ConsentRequired(request) => Some(request),
            Self::CodeIssued(_) => None,
        }
    }
}

/// Authorization code grant service with pluggable decision extensions.
pub struct AuthorizationCodeGrantService {
    clients: Arc<dyn ClientRegistry>,
    scopes: Arc<dyn ScopeResolver>,
    codes: Arc<dyn AuthorizationCodeStore>,
    sessions: Arc<dyn ConsentSessionStore>,
    tokens: Arc<dyn PreauthorizedTokenProvider>,
    validators: Vec<Arc<dyn RequestValidator>>,
    consent_policy: Arc<dyn ConsentPolicy>,
    state_extensions: Vec<Arc<dyn RedirectionStateExtension>>,
    registration_extensions: Vec<Arc<dyn CodeRegistrationExtension>>,
    events: Arc<dyn EventListener>,
    code_lifespan_secs: i64,
}

impl AuthorizationCodeGrantService {
    /// Starts building a service around its storage collaborators.
    #[must_use]
    pub fn builder(
        clients: Arc<dyn ClientRegistry>,
        scopes: Arc<dyn ScopeResolver>,
        codes: Arc<dyn AuthorizationCodeStore>,
    ) -> GrantServiceBuilder {
        GrantServiceBuilder::new(clients, scopes, codes)
    }

    /// Handles the initial authorization request.
    ///
    /// # Errors
    ///
    /// Returns the validator error unchanged when a validator rejects the
    /// request, otherwise any client, scope, redirect or storage error.
    pub async fn start_authorization(
        &self,
        params: &RequestParams,
        subject: &UserSubject,
    ) -> GrantResult<AuthorizationOutcome> {
        let phase = AuthorizationPhase::Received;

        if let Err(err) = self.validate_request(params) {
            phase.transition_to(AuthorizationPhase::Rejected)?;
            let mut event = Event::builder(EventType::RequestRejected)
                .failure(err.error_code())
                .user(subject.login.as_str())
                .detail("reason", err.to_string());
            if let Some(client_id) = params.first(names::CLIENT_ID) {
                event = event.client(client_id);
            }
            self.emit(event);
            return Err(err);
        }
        let phase = phase.transition_to(AuthorizationPhase::Validated)?;

        let client = self.get_client(params.first(names::CLIENT_ID)).await?;
        self.start_for_client(params, subject, &client, phase).await
    }

    /// Handles the consent form submission.
    ///
    /// The submission must carry the session token of an authorization parked
    /// by [`start_authorization`](Self::start_authorization) for the same
    /// user. Each token resumes at most once. Approves the default
    /// permissions plus every requested scope whose `<scope>_status` field is
    /// `allow`.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidRequest`] for a missing, unknown, expired
    /// or foreign session token, [`GrantError::AccessDenied`] if the user
    /// declined or approved nothing, otherwise any client, scope or storage
    /// error.
    pub async fn complete_authorization(
        &self,
        params: &RequestParams,
        subject: &UserSubject,
    ) -> GrantResult<AuthorizationCodeResponse> {
        let pending = match self.resume_pending(params, subject).await {
            Ok(pending) => pending,
            Err(err) => {
                self.emit(
                    Event::builder(EventType::RequestRejected)
                        .failure(err.error_code())
                        .user(subject.login.as_str())
                        .detail("reason", err.to_string()),
                );
                return Err(err);
            }
        };
        let phase = AuthorizationPhase::ConsentPending;

        let state = pending.state;
        let client = self.get_client(Some(state.client_id.as_str())).await?;
        let permissions = self.resolve_permissions(&client, &state.requested_scope).await?;

        let approved: Vec<String> = if params.first(names::DECISION) == Some(names::ALLOW) {
            permissions
                .iter()
                .filter(|p| {
                    p.default
                        || params.first(&format!("{}{}", p.permission, names::SCOPE_STATUS_SUFFIX))
                            == Some(names::ALLOW)
                })
                .map(|p| p.permission.clone())
                .collect()
        } else {
            Vec::new()
        };

        if approved.is_empty() {
            self.emit(
                Event::builder(EventType::ConsentDenied)
                    .failure("access_denied")
                    .client(client.client_id.as_str())
                    .user(subject.login.as_str()),
            );
            return Err(GrantError::AccessDenied(
                "the resource owner denied the request".to_string(),
            ));
        }

        let phase = phase.transition_to(AuthorizationPhase::Approved)?;
        let requested = state.requested_scope.clone();
        let response = self
            .issue_code(&state, &client, &requested, &approved, subject, None)
            .await?;
        phase.transition_to(AuthorizationPhase::CodeIssued)?;
        Ok(response)
    }

    /// Rebuilds redirection state from request parameters.
    ///
    /// The base step reads the standard OAuth 2.0 parameters; registered
    /// [`RedirectionStateExtension`]s then run in registration order.
    #[must_use]
    pub fn recreate_redirection_state_from_params(
        &self,
        params: &RequestParams,
    ) -> OAuthRedirectionState {
        let owned = |name: &str| params.first(name).map(String::from);

        let mut state = OAuthRedirectionState {
            client_id: params.first(names::CLIENT_ID).unwrap_or_default().to_string(),
            redirect_uri: owned(names::REDIRECT_URI),
            state: owned(names::STATE),
            requested_scope: params.scopes(),
            response_type: params
                .first(names::RESPONSE_TYPE)
                .unwrap_or_default()
                .to_string(),
            nonce: owned(names::NONCE),
            audience: owned(names::AUDIENCE),
            extra_properties: ExtraProperties::new(),
        };

        for extension in &self.state_extensions {
            extension.extend_state(&mut state, params);
        }
        state
    }

    /// Builds the record a code is minted from.
    ///
    /// The base step copies client, subject, scopes and request data, and
    /// records the response type in the extra properties. Registered
    /// [`CodeRegistrationExtension`]s then run in registration order.
    #[must_use]
    pub fn create_code_registration(
        &self,
        state: &OAuthRedirectionState,
        client: &Client,
        requested_scope: &[String],
        approved_scope: &[String],
        subject: &UserSubject,
        preauthorized_token: Option<&ServerAccessToken>,
    ) -> AuthorizationCodeRegistration {
        let mut extra_properties = ExtraProperties::new();
        if !state.response_type.is_empty() {
            extra_properties.insert(ExtraProperties::RESPONSE_TYPE, state.response_type.clone());
        }

        let mut registration = AuthorizationCodeRegistration {
            client_id: client.client_id.clone(),
            subject: subject.clone(),
            requested_scope: requested_scope.to_vec(),
            approved_scope: approved_scope.to_vec(),
            redirect_uri: state.redirect_uri.clone().unwrap_or_default(),
            nonce: state.nonce.clone(),
            audience: state.audience.clone(),
            preauthorized_token_key: preauthorized_token.map(|t| t.token_key.clone()),
            extra_properties,
        };

        for extension in &self.registration_extensions {
            extension.extend_registration(&mut registration, state);
        }
        registration
    }

    /// Asks the consent policy whether the consent form can be skipped.
    #[must_use]
    pub fn can_authorization_be_skipped(
        &self,
        client: &Client,
        subject: &UserSubject,
        requested_scope: &[String],
        permissions: &[OAuthPermission],
    ) -> bool {
        self.consent_policy
            .can_authorization_be_skipped(client, subject, requested_scope, permissions)
    }

    fn validate_request(&self, params: &RequestParams) -> GrantResult<()> {
        self.validators.iter().try_for_each(|v| v.validate(params))
    }

    async fn resume_pending(
        &self,
        params: &RequestParams,
        subject: &UserSubject,
    ) -> GrantResult<PendingAuthorization> {
        let token = params
            .first(names::SESSION_TOKEN)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                GrantError::InvalidRequest(format!("{} is required", names::SESSION_TOKEN))
            })?;

        let pending = self.sessions.take_pending(token).await?.ok_or_else(|| {
            GrantError::InvalidRequest("unknown or expired consent session".to_string())
        })?;
        if pending.subject != subject.login {
            return Err(GrantError::InvalidRequest(
                "consent session belongs to another user".to_string(),
            ));
        }
        Ok(pending)
    }

    async fn start_for_client(
        &self,
        params: &RequestParams,
        subject: &UserSubject,
        client: &Client,
        phase: AuthorizationPhase,
    ) -> GrantResult<AuthorizationOutcome> {
        let mut state = self.recreate_redirection_state_from_params(params);
        ensure_code_response_type(&state.response_type)?;
        state.redirect_uri = Some(resolve_redirect_uri(client, state.redirect_uri.as_deref())?);
        let permissions = self.resolve_permissions(client, &state.requested_scope).await?;

        self.emit(
            Event::builder(EventType::AuthorizationRequested)
                .client(client.client_id.as_str())
                .user(subject.login.as_str())
                .detail("scope", state.requested_scope.join(" ")),
        );

        let preauthorized = self
            .tokens
            .find_token(client, subject)
            .await?
            .filter(|t| t.covers(&state.requested_scope));
        let skip_reason = if preauthorized.is_some() {
            Some("preauthorized_token")
        } else if self.can_authorization_be_skipped(
            client,
            subject,
            &state.requested_scope,
            &permissions,
        ) {
            Some("consent_policy")
        } else {
            None
        };

        let Some(reason) = skip_reason else {
            phase.transition_to(AuthorizationPhase::ConsentPending)?;
            let pending = PendingAuthorization {
                session_token: generate_token(),
                state,
                subject: subject.login.clone(),
                expires_at: self.expiry_from(Utc::now())?,
            };
            self.sessions.save_pending(&pending).await?;
            self.emit(
                Event::builder(EventType::ConsentRequired)
                    .client(client.client_id.as_str())
                    .user(subject.login.as_str()),
            );
            return Ok(AuthorizationOutcome::ConsentRequired(ConsentRequest {
                client_id: client.client_id.clone(),
                client_name: client.name.clone(),
                user: subject.login.clone(),
                state: pending.state,
                session_token: pending.session_token,
                permissions,
            }));
        };

        let phase = phase
            .transition_to(AuthorizationPhase::ConsentSkipped)?
            .transition_to(AuthorizationPhase::Approved)?;
        self.emit(
            Event::builder(EventType::ConsentSkipped)
                .client(client.client_id.as_str())
                .user(subject.login.as_str())
                .detail("reason", reason),
        );

        let requested = state.requested_scope.clone();
        let response = self
            .issue_code(&state, client, &requested, &requested, subject, preauthorized.as_ref())
            .await?;
        phase.transition_to(AuthorizationPhase::CodeIssued)?;
        Ok(AuthorizationOutcome::CodeIssued(response))
    }

    async fn issue_code(
        &self,
        state: &OAuthRedirectionState,
        client: &Client,
        requested_scope: &[String],
        approved_scope: &[String],
        subject: &UserSubject,
        preauthorized_token: Option<&ServerAccessToken>,
    ) -> GrantResult<AuthorizationCodeResponse> {
        let registration = self.create_code_registration(
            state,
            client,
            requested_scope,
            approved_scope,
            subject,
            preauthorized_token,
        );

        let now = Utc::now();
        let grant = ServerAuthorizationCodeGrant {
            code: generate_token(),
            registration,
            issued_at: now,
            expires_at: self.expiry_from(now)?,
        };
        let redirect_uri = grant.registration.redirect_uri.clone();
        let location = build_redirect_location(&redirect_uri, &grant.code, state.state.as_deref())?;

        self.codes.store_code(&grant).await?;

        self.emit(
            Event::builder(EventType::CodeIssued)
                .client(client.client_id.as_str())
                .user(subject.login.as_str())
                .detail("scope", approved_scope.join(" ")),
        );

        Ok(AuthorizationCodeResponse {
            code: grant.code,
            state: state.state.clone(),
            redirect_uri,
            location,
            expires_at: grant.expires_at,
        })
    }

    async fn get_client(&self, client_id: Option<&str>) -> GrantResult<Client> {
        let client_id = client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GrantError::InvalidRequest("client_id is required".to_string()))?;

        self.clients
            .find_client(client_id)
            .await?
            .ok_or_else(|| GrantError::InvalidClient(format!("unknown client '{client_id}'")))
    }

    async fn resolve_permissions(
        &self,
        client: &Client,
        requested_scope: &[String],
    ) -> GrantResult<Vec<OAuthPermission>> {
        if requested_scope.is_empty() {
            return Err(GrantError::InvalidScope("scope is required".to_string()));
        }
        self.scopes.resolve_permissions(client, requested_scope).await
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> GrantResult<DateTime<Utc>> {
        Some(self.code_lifespan_secs)
            .filter(|secs| (1..=MAX_CODE_LIFESPAN_SECS).contains(secs))
            .and_then(Duration::try_seconds)
            .and_then(|lifespan| now.checked_add_signed(lifespan))
            .ok_or_else(|| {
                GrantError::ServerError(format!(
                    "code lifespan of {} seconds is out of range",
                    self.code_lifespan_secs
                ))
            })
    }

    fn emit(&self, event: EventBuilder) {
        self.events.on_event(&event.build());
    }
}

/// Builder for [`AuthorizationCodeGrantService`].
pub struct GrantServiceBuilder {
    clients: Arc<dyn ClientRegistry>,
    scopes: Arc<dyn ScopeResolver>,
    codes: Arc<dyn AuthorizationCodeStore>,
    sessions: Arc<dyn ConsentSessionStore>,
    tokens: Arc<dyn PreauthorizedTokenProvider>,
    validators: Vec<Arc<dyn RequestValidator>>,
    consent_policy: Arc<dyn ConsentPolicy>,
    state_extensions: Vec<Arc<dyn RedirectionStateExtension>>,
    registration_extensions: Vec<Arc<dyn CodeRegistrationExtension>>,
    events: Arc<dyn EventListener>,
    code_lifespan_secs: i64,
}

impl GrantServiceBuilder {
    fn new(
        clients: Arc<dyn ClientRegistry>,
        scopes: Arc<dyn ScopeResolver>,
        codes: Arc<dyn AuthorizationCodeStore>,
    ) -> Self {
        Self {
            clients,
            scopes,
            codes,
            sessions: Arc::new(InMemoryConsentSessionStore::new()),
            tokens: Arc::new(NoPreauthorizedTokens),
            validators: Vec::new(),
            consent_policy: Arc::new(AlwaysRequireConsent),
            state_extensions: Vec::new(),
            registration_extensions: Vec::new(),
            events: Arc::new(TracingEventListener::new()),
            code_lifespan_secs: AuthorizationConfig::default().code_lifespan_secs,
        }
    }

    /// Adds a request validator. Validators run in registration order.
    #[must_use]
    pub fn request_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Replaces the consent policy.
    #[must_use]
    pub fn consent_policy(mut self, policy: impl ConsentPolicy + 'static) -> Self {
        self.consent_policy = Arc::new(policy);
        self
    }

    /// Adds a redirection state extension.
    #[must_use]
    pub fn redirection_state_extension(
        mut self,
        extension: impl RedirectionStateExtension + 'static,
    ) -> Self {
        self.state_extensions.push(Arc::new(extension));
        self
    }

    /// Adds a code registration extension.
    #[must_use]
    pub fn code_registration_extension(
        mut self,
        extension: impl CodeRegistrationExtension + 'static,
    ) -> Self {
        self.registration_extensions.push(Arc::new(extension));
        self
    }

    /// Sets the store parking authorizations awaiting consent.
    #[must_use]
    pub fn consent_sessions(mut self, sessions: Arc<dyn ConsentSessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Sets the pre-authorized token provider.
    #[must_use]
    pub fn preauthorized_tokens(mut self, tokens: Arc<dyn PreauthorizedTokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Sets the audit event listener.
    #[must_use]
    pub fn event_listener(mut self, events: Arc<dyn EventListener>) -> Self {
        self.events = events;
        self
    }

    /// Applies the code lifespan from the authorization configuration.
    ///
    /// The lifespan also bounds how long a consent form stays valid. Values
    /// outside `1..=MAX_CODE_LIFESPAN_SECS` make every authorization fail with
    /// `server_error`.
    #[must_use]
    pub fn authorization_config(mut self, config: &AuthorizationConfig) -> Self {
        self.code_lifespan_secs = config.code_lifespan_secs;
        self
    }

    /// Builds the service.
    #[must_use]
    pub fn build(self) -> AuthorizationCodeGrantService {
        if !(1..=MAX_CODE_LIFESPAN_SECS).contains(&self.code_lifespan_secs) {
            tracing::warn!(
                code_lifespan_secs = self.code_lifespan_secs,
                "code lifespan out of range, authorizations will fail"
            );
        }
        AuthorizationCodeGrantService {
            clients: self.clients,
            scopes: self.scopes,
            codes: self.codes,
            sessions: self.sessions,
            tokens: self.tokens,
            validators: self.validators,
            consent_policy: self.consent_policy,
            state_extensions: self.state_extensions,
            registration_extensions: self.registration_extensions,
            events: self.events,
            code_lifespan_secs: self.code_lifespan_secs,
        }
    }
}

fn ensure_code_response_type(response_type: &str) -> GrantResult<()> {
    if response_type == CODE_RESPONSE_TYPE {
        Ok(())
    } else if response_type.is_empty() {
        Err(GrantError::InvalidRequest("response_type is required".to_string()))
    } else {
        Err(GrantError::UnsupportedResponseType(response_type.to_string()))
    }
}

/// Picks the redirect URI for a request.
///
/// A requested URI must match a registered one exactly. Without one, a
/// client with a single registered URI gets that URI.
fn resolve_redirect_uri(client: &Client, requested: Option<&str>) -> GrantResult<String> {
    match requested {
        Some(uri) if client.redirect_uris.iter().any(|r| r == uri) => Ok(uri.to_string()),
        Some(uri) => Err(GrantError::InvalidRequest(format!(
            "redirect_uri '{uri}' is not registered for client '{}'",
            client.client_id
        ))),
        None => match client.redirect_uris.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err(GrantError::InvalidRequest(format!(
                "client '{}' has no registered redirect_uri",
                client.client_id
            ))),
            _ => Err(GrantError::InvalidRequest("redirect_uri is required".to_string())),
        },
    }
}

fn build_redirect_location(redirect_uri: &str, code: &str, state: Option<&str>) -> GrantResult<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| GrantError::InvalidRequest(format!("invalid redirect_uri: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("code", code);
        if let Some(state) = state {
            query.append_pair(names::STATE, state);
        }
    }
    Ok(url.into())
}

fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LENGTH)
}
