//! Authorization code grant domain model.
//!
//! An authorization request is parsed into an [`OAuthRedirectionState`], which
//! survives the consent round trip and is finally turned into an
//! [`AuthorizationCodeRegistration`] from which the code is minted.
//!
//! Both records carry an [`ExtraProperties`] mapping. It is the only channel
//! through which profile-specific request data (such as an OIDC claims
//! request) reaches the code, so every entry of the state's mapping must be
//! present in the registration's mapping when the code is issued.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `openid` scope value.
pub const OPENID_SCOPE: &str = "openid";

/// Registered OAuth 2.0 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// OAuth `client_id`.
    pub client_id: String,

    /// Display name shown on the consent form.
    pub name: Option<String>,

    /// Registered redirection endpoints.
    pub redirect_uris: Vec<String>,

    /// Scopes the client may request. Empty means unrestricted.
    pub allowed_scopes: Vec<String>,
}

impl Client {
    /// Creates a client with no redirect URIs and unrestricted scopes.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            name: None,
            redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a registered redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Restricts the scopes this client may request.
    #[must_use]
    pub fn with_allowed_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Checks whether the client may request a scope.
    #[must_use]
    pub fn allows_scope(&self, scope: &str) -> bool {
        self.allowed_scopes.is_empty() || self.allowed_scopes.iter().any(|s| s == scope)
    }
}

/// Authenticated end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubject {
    /// Login name.
    pub login: String,

    /// Stable subject identifier.
    pub id: Option<String>,
}

impl UserSubject {
    /// Creates a subject with the given login name.
    #[must_use]
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            id: None,
        }
    }

    /// Sets the stable subject identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Resolved, displayable form of one requested scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthPermission {
    /// Scope value this permission was resolved from.
    pub permission: String,

    /// Description shown on the consent form.
    pub description: String,

    /// Default permissions are always approved once the user consents.
    pub default: bool,
}

impl OAuthPermission {
    /// Creates a non-default permission.
    #[must_use]
    pub fn new(permission: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            description: description.into(),
            default: false,
        }
    }

    /// Marks the permission as default.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Already issued access token that may pre-authorize a returning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAccessToken {
    /// Token identifier.
    pub token_key: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Login name of the resource owner.
    pub subject: String,

    /// Scopes granted to the token.
    pub scopes: Vec<String>,

    /// Issue time.
    pub issued_at: DateTime<Utc>,

    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl ServerAccessToken {
    /// Checks if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Checks whether the token already grants every requested scope.
    #[must_use]
    pub fn covers(&self, requested_scope: &[String]) -> bool {
        requested_scope.iter().all(|s| self.scopes.contains(s))
    }
}

/// String-keyed extension data carried alongside OAuth 2.0 state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraProperties(BTreeMap<String, String>);

impl ExtraProperties {
    /// OIDC claims request (the raw `claims` parameter).
    pub const CLAIMS: &'static str = "claims";

    /// Response type of the originating request.
    pub const RESPONSE_TYPE: &'static str = "response_type";

    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Stores a value only if the key is not present yet.
    ///
    /// Returns `true` if the value was stored.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let mut inserted = false;
        self.0.entry(key.into()).or_insert_with(|| {
            inserted = true;
            value.into()
        });
        inserted
    }

    /// Copies every entry of `other` into this mapping; `other` wins on collisions.
    pub fn merge_from(&mut self, other: &Self) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Checks whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtraProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// In-flight authorization transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirectionState {
    /// OAuth `client_id`.
    pub client_id: String,

    /// Redirection endpoint the response goes to.
    pub redirect_uri: Option<String>,

    /// Anti-forgery `state` echoed back to the client.
    pub state: Option<String>,

    /// Requested scopes in request order.
    pub requested_scope: Vec<String>,

    /// Requested response type.
    pub response_type: String,

    /// OIDC nonce.
    pub nonce: Option<String>,

    /// Intended token audience.
    pub audience: Option<String>,

    /// Extension data that must reach the code registration.
    pub extra_properties: ExtraProperties,
}

/// Write record used to mint an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeRegistration {
    /// OAuth `client_id`.
    pub client_id: String,

    /// Resource owner.
    pub subject: UserSubject,

    /// Scopes requested by the client.
    pub requested_scope: Vec<String>,

    /// Scopes approved by the consent policy or the user.
    pub approved_scope: Vec<String>,

    /// Redirection endpoint bound to the code.
    pub redirect_uri: String,

    /// OIDC nonce.
    pub nonce: Option<String>,

    /// Intended token audience.
    pub audience: Option<String>,

    /// Key of the pre-authorized token the approval relied on.
    pub preauthorized_token_key: Option<String>,

    /// Extension data carried to token issuance.
    pub extra_properties: ExtraProperties,
}

/// Issued authorization code awaiting exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAuthorizationCodeGrant {
    /// Code value.
    pub code: String,

    /// Registration the code was minted from.
    pub registration: AuthorizationCodeRegistration,

    /// Issue time.
    pub issued_at: DateTime<Utc>,

    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl ServerAuthorizationCodeGrant {
    /// Checks if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Authorization parked server-side while the consent form is shown.
///
/// Keyed by a session authenticity token that the consent form posts back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Token the consent form carries.
    pub session_token: String,

    /// Validated redirection state of the initial request.
    pub state: OAuthRedirectionState,

    /// Login name of the user the form was shown to.
    pub subject: String,

    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Checks if the consent session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
