//! Audit events for the authorization flow.
//!
//! Every security-relevant decision taken on an authorization request (a
//! rejected request, a skipped or required consent, an issued code) is
//! described by an [`Event`] and handed to an [`EventListener`].
//!
//! All events include:
//! - Timestamp (ISO 8601)
//! - Event type
//! - Client and user identity (when available)
//! - Outcome (success/failure)

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Authorization request received and validated.
    AuthorizationRequested,
    /// Request rejected by a request validator.
    RequestRejected,
    /// Consent form bypassed.
    ConsentSkipped,
    /// Consent form must be shown.
    ConsentRequired,
    /// End user declined the consent form.
    ConsentDenied,
    /// Authorization code issued.
    CodeIssued,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Client ID associated with the event.
    pub client_id: Option<String>,

    /// Login name of the end user.
    pub user: Option<String>,

    /// Error code (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the value of a detail entry.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    client_id: Option<String>,
    user: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            client_id: None,
            user: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with an error code.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the end user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            client_id: self.client_id,
            user: self.user,
            error: self.error,
            details: self.details,
        }
    }
}

/// Receives audit events.
pub trait EventListener: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &Event);
}

/// Event listener that writes to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventListener;

impl TracingEventListener {
    /// Creates a new tracing listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventListener for TracingEventListener {
    fn on_event(&self, event: &Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            client_id = ?event.client_id,
            user = ?event.user,
            error = ?event.error,
            details = ?event.details,
            "authorization_event"
        );
    }
}

/// Event listener that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventListener {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the recorded event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.lock().iter().map(|e| e.event_type).collect()
    }
}

impl EventListener for RecordingEventListener {
    fn on_event(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
