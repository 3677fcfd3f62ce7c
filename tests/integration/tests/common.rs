//! Common test utilities and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use op_core::config::{
    ENV_AUTH_CODE_LIFESPAN, ENV_LOG_FILTER, ENV_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE,
};
use op_core::{logging, Config, RecordingEventListener};
use op_grant::{
    AuthorizationCodeGrantService, Client, ClientRegistry, GrantResult,
    InMemoryAuthorizationCodeStore, InMemoryClientRegistry, InMemoryTokenRegistry, RequestParams,
    StaticScopeResolver, UserSubject,
};
use op_oidc::OidcGrantServiceExt;

/// Client registered in every test environment.
pub const CLIENT_ID: &str = "test-client";

/// Its only registered redirect URI.
pub const REDIRECT_URI: &str = "https://rp.example.com/callback";

/// Client registry that counts lookups.
#[derive(Debug)]
pub struct CountingClientRegistry {
    inner: InMemoryClientRegistry,
    lookups: AtomicUsize,
}

impl CountingClientRegistry {
    /// Number of `find_client` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientRegistry for CountingClientRegistry {
    async fn find_client(&self, client_id: &str) -> GrantResult<Option<Client>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_client(client_id).await
    }
}

/// Test environment wiring the OIDC grant service to in-memory collaborators.
pub struct TestEnv {
    /// Service under test.
    pub service: AuthorizationCodeGrantService,
    /// Client registry.
    pub clients: Arc<CountingClientRegistry>,
    /// Issued codes.
    pub codes: Arc<InMemoryAuthorizationCodeStore>,
    /// Previously issued access tokens.
    pub tokens: Arc<InMemoryTokenRegistry>,
    /// Audit events.
    pub events: Arc<RecordingEventListener>,
}

impl TestEnv {
    /// Creates an environment with the `openid` consent shortcut on or off.
    pub fn new(skip_authorization_with_oidc_scope: bool) -> anyhow::Result<Self> {
        let flag = skip_authorization_with_oidc_scope.to_string();
        let vars = HashMap::from([
            (ENV_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE, flag.as_str()),
            (ENV_AUTH_CODE_LIFESPAN, "120"),
            (ENV_LOG_FILTER, "op_grant=debug,op_oidc=debug"),
        ]);
        let config = Config::from_lookup(|key: &str| vars.get(key).map(|v| (*v).to_string()))?;
        config.validate()?;
        Ok(Self::with_config(&config))
    }

    /// Creates an environment from a full configuration.
    pub fn with_config(config: &Config) -> Self {
        logging::init_test_tracing(&config.log_filter);

        let clients = Arc::new(CountingClientRegistry {
            inner: InMemoryClientRegistry::with_clients([Client::new(CLIENT_ID)
                .with_name("Test Client")
                .with_redirect_uri(REDIRECT_URI)]),
            lookups: AtomicUsize::new(0),
        });
        let codes = Arc::new(InMemoryAuthorizationCodeStore::new());
        let tokens = Arc::new(InMemoryTokenRegistry::new());
        let events = Arc::new(RecordingEventListener::new());

        let service = AuthorizationCodeGrantService::builder(
            clients.clone(),
            Arc::new(StaticScopeResolver::with_oidc_scopes()),
            codes.clone(),
        )
        .with_oidc(&config.authorization)
        .preauthorized_tokens(tokens.clone())
        .event_listener(events.clone())
        .build();

        Self {
            service,
            clients,
            codes,
            tokens,
            events,
        }
    }

    /// Builds an authorization request for the test client.
    pub fn authorization_request(&self, scope: &str) -> RequestParams {
        RequestParams::new()
            .with("client_id", CLIENT_ID)
            .with("response_type", "code")
            .with("redirect_uri", REDIRECT_URI)
            .with("scope", scope)
            .with("state", "af0ifjsldkj")
            .with("nonce", "n-0S6_WzA2Mj")
    }

    /// The authenticated end user.
    pub fn user(&self) -> UserSubject {
        UserSubject::new("testuser").with_id("4a6f1c2e")
    }
}
