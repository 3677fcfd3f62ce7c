//! Authorization code and consent session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::GrantResult;
use crate::model::{PendingAuthorization, ServerAuthorizationCodeGrant};

/// Provider for storing and redeeming authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Stores an issued code.
    async fn store_code(&self, grant: &ServerAuthorizationCodeGrant) -> GrantResult<()>;

    /// Removes and returns a code. Expired codes are removed but not returned.
    async fn take_code(&self, code: &str) -> GrantResult<Option<ServerAuthorizationCodeGrant>>;

    /// Removes all expired codes (cleanup).
    async fn remove_expired_codes(&self) -> GrantResult<u64>;
}

/// In-memory authorization code store.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationCodeStore {
    codes: RwLock<HashMap<String, ServerAuthorizationCodeGrant>>,
}

impl InMemoryAuthorizationCodeStore {
    /// Creates a new in-memory code store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes, expired ones included.
    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    /// Checks if no code is stored.
    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryAuthorizationCodeStore {
    async fn store_code(&self, grant: &ServerAuthorizationCodeGrant) -> GrantResult<()> {
        self.codes
            .write()
            .await
            .insert(grant.code.clone(), grant.clone());
        Ok(())
    }

    async fn take_code(&self, code: &str) -> GrantResult<Option<ServerAuthorizationCodeGrant>> {
        let grant = self.codes.write().await.remove(code);
        Ok(grant.filter(|g| !g.is_expired()))
    }

    async fn remove_expired_codes(&self) -> GrantResult<u64> {
        let mut codes = self.codes.write().await;
        let now = Utc::now();
        let initial_len = codes.len();
        codes.retain(|_, grant| grant.expires_at > now);
        Ok((initial_len - codes.len()) as u64)
    }
}

/// Provider for authorizations awaiting the user's consent decision.
#[async_trait]
pub trait ConsentSessionStore: Send + Sync {
    /// Parks an authorization under its session token.
    async fn save_pending(&self, pending: &PendingAuthorization) -> GrantResult<()>;

    /// Removes and returns a parked authorization. Expired sessions are
    /// removed but not returned.
    async fn take_pending(&self, session_token: &str) -> GrantResult<Option<PendingAuthorization>>;
}

/// In-memory consent session store.
#[derive(Debug, Default)]
pub struct InMemoryConsentSessionStore {
    sessions: RwLock<HashMap<String, PendingAuthorization>>,
}

impl InMemoryConsentSessionStore {
    /// Creates a new in-memory session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parked authorizations.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Checks if no authorization is parked.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl ConsentSessionStore for InMemoryConsentSessionStore {
    async fn save_pending(&self, pending: &PendingAuthorization) -> GrantResult<()> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, p| p.expires_at > now);
        sessions.insert(pending.session_token.clone(), pending.clone());
        Ok(())
    }

    async fn take_pending(&self, session_token: &str) -> GrantResult<Option<PendingAuthorization>> {
        let pending = self.sessions.write().await.remove(session_token);
        Ok(pending.filter(|p| !p.is_expired()))
    }
}
