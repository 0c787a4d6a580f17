//! Structured logging bootstrap
//!
//! Wraps `tracing-subscriber` setup behind the [`LoggingConfig`] section so
//! the binary initializes logging with one call after configuration is
//! loaded. `RUST_LOG` takes precedence over the configured default filter.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Error initializing the global tracing subscriber
#[derive(Debug, thiserror::Error)]
pub enum InitTracingError {
    #[error("Invalid log filter directive: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Install the global tracing subscriber.
///
/// Must be called at most once per process; a second call returns
/// [`InitTracingError::Install`].
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InitTracingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| InitTracingError::Filter(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| InitTracingError::Install(e.to_string()))?,
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| InitTracingError::Install(e.to_string()))?,
    }

    Ok(())
}
