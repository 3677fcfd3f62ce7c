//! Multi-valued request parameters.
//!
//! Authorization requests arrive as query strings or form bodies where any
//! parameter may repeat. [`RequestParams`] keeps every value in arrival order;
//! protocol logic almost always reads the first one.

use std::collections::BTreeMap;

/// Well-known authorization request parameter names.
pub mod names {
    /// OAuth `client_id`.
    pub const CLIENT_ID: &str = "client_id";
    /// Redirection endpoint.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Space-separated scope list.
    pub const SCOPE: &str = "scope";
    /// Anti-forgery state value echoed back to the client.
    pub const STATE: &str = "state";
    /// Requested response type.
    pub const RESPONSE_TYPE: &str = "response_type";
    /// Replay protection value bound into the ID token.
    pub const NONCE: &str = "nonce";
    /// Intended audience of the issued token.
    pub const AUDIENCE: &str = "audience";
    /// Consent form decision (`allow` or `deny`).
    pub const DECISION: &str = "oauthDecision";
    /// Consent form field binding the submission to a parked authorization.
    pub const SESSION_TOKEN: &str = "session_authenticity_token";
    /// Suffix of the per-scope consent form field (`<scope>_status`).
    pub const SCOPE_STATUS_SUFFIX: &str = "_status";
    /// Decision / status value approving the request.
    pub const ALLOW: &str = "allow";
    /// Decision value declining the request.
    pub const DENY: &str = "deny";
}

/// Ordered multi-valued parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: BTreeMap<String, Vec<String>>,
}

impl RequestParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn from_form(input: &str) -> Self {
        url::form_urlencoded::parse(input.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect()
    }

    /// Serializes to an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn to_form(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.values {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }

    /// Appends a value, keeping values already present for the name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    /// Sets a single value, replacing any values present for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), vec![value.into()]);
    }

    /// Builder-style [`append`](Self::append).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Returns the first value for a name.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Returns every value for a name.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    /// Checks whether at least one value exists for a name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Returns the scopes of the first `scope` value, split on whitespace.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.first(names::SCOPE)
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Number of distinct parameter names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks if no parameter is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.append(name, value);
        }
        params
    }
}
