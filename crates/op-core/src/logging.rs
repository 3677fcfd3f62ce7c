//! `tracing` subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Installs the global `tracing` subscriber with the given filter directive.
///
/// # Errors
///
/// Returns [`Error::Logging`] if the directive does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

/// Installs a test-friendly subscriber, ignoring an already installed one.
pub fn init_test_tracing(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
