//! Collaborators the grant service resolves requests against.
//!
//! Each collaborator is an async trait so storage-backed implementations can
//! plug in; the in-memory implementations here back tests and embedded use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{GrantError, GrantResult};
use crate::model::{Client, OAuthPermission, ServerAccessToken, UserSubject, OPENID_SCOPE};

// ============================================================================
// Clients
// ============================================================================

/// Looks up registered clients.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Finds a client by its OAuth `client_id`.
    async fn find_client(&self, client_id: &str) -> GrantResult<Option<Client>>;
}

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given clients.
    #[must_use]
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        Self {
            clients: RwLock::new(
                clients
                    .into_iter()
                    .map(|c| (c.client_id.clone(), c))
                    .collect(),
            ),
        }
    }

    /// Registers or replaces a client.
    pub async fn register(&self, client: Client) {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn find_client(&self, client_id: &str) -> GrantResult<Option<Client>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// Resolves requested scopes into displayable permissions.
#[async_trait]
pub trait ScopeResolver: Send + Sync {
    /// Returns one permission per requested scope, in request order.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidScope`] for unknown or disallowed scopes.
    async fn resolve_permissions(
        &self,
        client: &Client,
        requested_scope: &[String],
    ) -> GrantResult<Vec<OAuthPermission>>;
}

/// Scope resolver backed by a fixed permission table.
#[derive(Debug, Clone, Default)]
pub struct StaticScopeResolver {
    permissions: HashMap<String, OAuthPermission>,
}

impl StaticScopeResolver {
    /// Creates a resolver with no known scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver knowing the standard OIDC scopes.
    ///
    /// `openid` is a default permission; `profile`, `email`, `address` and
    /// `phone` must be approved individually.
    #[must_use]
    pub fn with_oidc_scopes() -> Self {
        Self::new()
            .with_permission(
                OAuthPermission::new(OPENID_SCOPE, "Sign you in with your account").as_default(),
            )
            .with_permission(OAuthPermission::new("profile", "Read your basic profile"))
            .with_permission(OAuthPermission::new("email", "Read your email address"))
            .with_permission(OAuthPermission::new("address", "Read your postal address"))
            .with_permission(OAuthPermission::new("phone", "Read your phone number"))
    }

    /// Adds or replaces a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: OAuthPermission) -> Self {
        self.permissions
            .insert(permission.permission.clone(), permission);
        self
    }
}

#[async_trait]
impl ScopeResolver for StaticScopeResolver {
    async fn resolve_permissions(
        &self,
        client: &Client,
        requested_scope: &[String],
    ) -> GrantResult<Vec<OAuthPermission>> {
        requested_scope
            .iter()
            .map(|scope| {
                if !client.allows_scope(scope) {
                    return Err(GrantError::InvalidScope(format!(
                        "scope '{scope}' is not allowed for client '{}'",
                        client.client_id
                    )));
                }
                self.permissions
                    .get(scope)
                    .cloned()
                    .ok_or_else(|| GrantError::InvalidScope(format!("unknown scope '{scope}'")))
            })
            .collect()
    }
}

// ============================================================================
// Pre-authorized tokens
// ============================================================================

/// Finds tokens already issued to a client on behalf of a user.
#[async_trait]
pub trait PreauthorizedTokenProvider: Send + Sync {
    /// Returns the most recent live token, if any.
    async fn find_token(
        &self,
        client: &Client,
        subject: &UserSubject,
    ) -> GrantResult<Option<ServerAccessToken>>;
}

/// Provider that never pre-authorizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreauthorizedTokens;

#[async_trait]
impl PreauthorizedTokenProvider for NoPreauthorizedTokens {
    async fn find_token(
        &self,
        _client: &Client,
        _subject: &UserSubject,
    ) -> GrantResult<Option<ServerAccessToken>> {
        Ok(None)
    }
}

/// In-memory token registry.
#[derive(Debug, Default)]
pub struct InMemoryTokenRegistry {
    tokens: RwLock<Vec<ServerAccessToken>>,
}

impl InMemoryTokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issued token.
    pub async fn add(&self, token: ServerAccessToken) {
        self.tokens.write().await.push(token);
    }
}

#[async_trait]
impl PreauthorizedTokenProvider for InMemoryTokenRegistry {
    async fn find_token(
        &self,
        client: &Client,
        subject: &UserSubject,
    ) -> GrantResult<Option<ServerAccessToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .filter(|t| t.client_id == client.client_id && t.subject == subject.login)
            .filter(|t| !t.is_expired())
            .max_by_key(|t| t.issued_at)
            .cloned())
    }
}
