//! Authorization phase machine.
//!
//! ```text
//! RECEIVED ──► VALIDATED ──► CONSENT_SKIPPED ──┐
//!    │             │                           ├──► APPROVED ──► CODE_ISSUED
//!    ▼             └───────► CONSENT_PENDING ──┘
//! REJECTED
//! ```
//!
//! `REJECTED` and `CODE_ISSUED` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GrantError, GrantResult};

/// Phase of one authorization transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationPhase {
    /// Request arrived, nothing checked yet.
    Received,
    /// Request validators passed.
    Validated,
    /// Consent form bypassed.
    ConsentSkipped,
    /// Waiting for the end user to answer the consent form.
    ConsentPending,
    /// Scopes approved.
    Approved,
    /// Code minted and stored.
    CodeIssued,
    /// Request refused by a validator.
    Rejected,
}

impl AuthorizationPhase {
    /// Checks if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::CodeIssued)
    }

    /// Checks whether `next` directly follows this phase.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Validated | Self::Rejected)
                | (Self::Validated, Self::ConsentSkipped | Self::ConsentPending)
                | (Self::ConsentSkipped | Self::ConsentPending, Self::Approved)
                | (Self::Approved, Self::CodeIssued)
        )
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::ServerError`] for a transition the machine does not allow.
    pub fn transition_to(self, next: Self) -> GrantResult<Self> {
        if self.can_transition_to(next) {
            tracing::debug!(from = %self, to = %next, "authorization phase transition");
            Ok(next)
        } else {
            Err(GrantError::ServerError(format!(
                "illegal authorization phase transition {self} -> {next}"
            )))
        }
    }
}

impl fmt::Display for AuthorizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "RECEIVED",
            Self::Validated => "VALIDATED",
            Self::ConsentSkipped => "CONSENT_SKIPPED",
            Self::ConsentPending => "CONSENT_PENDING",
            Self::Approved => "APPROVED",
            Self::CodeIssued => "CODE_ISSUED",
            Self::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}
