//! `prompt` parameter validation (OIDC Core Section 3.1.2.1).

use std::fmt;
use std::str::FromStr;

use op_grant::{GrantError, GrantResult, RequestParams, RequestValidator};
use serde::{Deserialize, Serialize};

/// The `prompt` request parameter.
pub const PROMPT: &str = "prompt";

/// OIDC prompt values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prompt {
    /// No UI should be displayed.
    #[serde(rename = "none")]
    None,

    /// Force re-authentication.
    #[serde(rename = "login")]
    Login,

    /// Force consent screen.
    #[serde(rename = "consent")]
    Consent,

    /// Force account selection.
    #[serde(rename = "select_account")]
    SelectAccount,
}

impl Prompt {
    /// Returns the parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Consent => "consent",
            Self::SelectAccount => "select_account",
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prompt {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "consent" => Ok(Self::Consent),
            "select_account" => Ok(Self::SelectAccount),
            _ => Err(GrantError::InvalidRequest(format!("unknown prompt value '{s}'"))),
        }
    }
}

/// Rejects `prompt` lists combining `none` with any other value.
///
/// Only the first `prompt` value is inspected. A single token is always
/// accepted, known or not; handling a lone `none` is up to the grant engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptValidator;

impl PromptValidator {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RequestValidator for PromptValidator {
    fn validate(&self, params: &RequestParams) -> GrantResult<()> {
        let Some(raw) = params.first(PROMPT) else {
            return Ok(());
        };

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.len() > 1 && tokens.iter().any(|t| matches!(t.parse::<Prompt>(), Ok(Prompt::None))) {
            tracing::debug!(prompt = raw, "rejecting prompt combining none with other values");
            return Err(GrantError::InvalidRequest(format!(
                "prompt '{raw}' combines none with other values"
            )));
        }
        Ok(())
    }
}
