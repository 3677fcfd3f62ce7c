//! Configuration management for the OpenID provider.
//!
//! Configuration is loaded from environment variables (optionally seeded from a
//! `.env` file) with defaults for every setting. Once built, a [`Config`] is
//! never mutated; components copy the values they need at construction time.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable enabling consent skip for `openid`-only requests.
pub const ENV_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE: &str = "OP_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE";

/// Environment variable holding the authorization code lifespan in seconds.
pub const ENV_AUTH_CODE_LIFESPAN: &str = "OP_AUTH_CODE_LIFESPAN";

/// Longest accepted authorization code lifespan (one day).
pub const MAX_CODE_LIFESPAN_SECS: i64 = 86_400;

/// Environment variable holding the log filter directive.
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authorization endpoint behaviour.
    pub authorization: AuthorizationConfig,

    /// `tracing` filter directive (e.g. `info`, `op_oidc=debug`).
    pub log_filter: String,
}

/// Authorization endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Skip the consent form when `openid` is the only requested scope.
    pub skip_authorization_with_oidc_scope: bool,

    /// Authorization code lifespan in seconds, `1..=MAX_CODE_LIFESPAN_SECS`.
    pub code_lifespan_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authorization: AuthorizationConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            skip_authorization_with_oidc_scope: false,
            code_lifespan_secs: 600, // 10 minutes
        }
    }
}

impl AuthorizationConfig {
    /// Returns a copy with the `openid` consent shortcut set.
    #[must_use]
    pub const fn with_skip_authorization_with_oidc_scope(mut self, skip: bool) -> Self {
        self.skip_authorization_with_oidc_scope = skip;
        self
    }

    /// Returns a copy with the given code lifespan.
    #[must_use]
    pub const fn with_code_lifespan_secs(mut self, secs: i64) -> Self {
        self.code_lifespan_secs = secs;
        self
    }
}

impl Config {
    /// Checks values that deserialization alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a code lifespan outside
    /// `1..=MAX_CODE_LIFESPAN_SECS`.
    pub fn validate(&self) -> Result<()> {
        let secs = self.authorization.code_lifespan_secs;
        if !(1..=MAX_CODE_LIFESPAN_SECS).contains(&secs) {
            return Err(Error::Validation(format!(
                "code_lifespan_secs must be between 1 and {MAX_CODE_LIFESPAN_SECS}, got {secs}"
            )));
        }
        Ok(())
    }

    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let skip_authorization_with_oidc_scope = match lookup(ENV_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE)
        {
            Some(raw) => parse_bool(ENV_SKIP_AUTHORIZATION_WITH_OIDC_SCOPE, &raw)?,
            None => defaults.authorization.skip_authorization_with_oidc_scope,
        };

        let code_lifespan_secs = match lookup(ENV_AUTH_CODE_LIFESPAN) {
            Some(raw) => parse_lifespan(ENV_AUTH_CODE_LIFESPAN, &raw)?,
            None => defaults.authorization.code_lifespan_secs,
        };

        let log_filter = lookup(ENV_LOG_FILTER)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            authorization: AuthorizationConfig {
                skip_authorization_with_oidc_scope,
                code_lifespan_secs,
            },
            log_filter,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key} must be a boolean, got '{other}'"))),
    }
}

fn parse_lifespan(key: &str, raw: &str) -> Result<i64> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be an integer, got '{raw}'")))?;
    if !(1..=MAX_CODE_LIFESPAN_SECS).contains(&secs) {
        return Err(Error::Config(format!(
            "{key} must be between 1 and {MAX_CODE_LIFESPAN_SECS}, got {secs}"
        )));
    }
    Ok(secs)
}
