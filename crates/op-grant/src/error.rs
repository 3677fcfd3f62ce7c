//! Grant engine error types.
//!
//! Implements the OAuth 2.0 authorization endpoint error codes of RFC 6749
//! Section 4.1.2.1.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authorization code grant errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Unknown or disabled client.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Requested scope is unknown or not allowed for the client.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// Unsupported response type.
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),

    /// Access denied by the resource owner.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Server error.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl GrantError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::AccessDenied(_) => "access_denied",
            Self::Storage(_) | Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::InvalidScope(_) | Self::UnsupportedResponseType(_) => {
                400
            }
            Self::InvalidClient(_) => 401,
            Self::AccessDenied(_) => 403,
            Self::Storage(_) | Self::ServerError(_) => 500,
        }
    }

    /// Creates an error response for OAuth 2.0.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.to_string()),
            error_uri: None,
        }
    }
}

/// OAuth 2.0 error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Result type for grant operations.
pub type GrantResult<T> = Result<T, GrantError>;
