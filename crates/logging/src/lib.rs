//! Logging for the image classifier service
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured level so operators can raise verbosity without editing
//! config files.

use tracing_subscriber::EnvFilter;

use common::error::{Error, Result};
use service_config::{LogFormat, LoggingSettings};

/// Builds the filter from `RUST_LOG`, falling back to the configured level
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| Error::Config(format!("invalid log level '{}': {}", settings.level, e))),
    }
}

/// Installs the global subscriber
///
/// Returns an error if the level directive is invalid or a subscriber is
/// already installed.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let filter = build_filter(settings)?;
    
    let installed = match settings.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init(),
    };
    
    installed.map_err(|e| Error::Internal(format!("failed to install log subscriber: {}", e)))
}

/// Installs the default subscriber, tolerating an already-installed one
///
/// Used by the training programs, which have no configuration file. Filter
/// errors are still returned.
pub fn init_default() -> Result<()> {
    match init(&LoggingSettings::default()) {
        // a global subscriber is already in place
        Err(Error::Internal(_)) => Ok(()),
        other => other,
    }
}
