//! Structured logging setup.
//!
//! Log records carry consistent fields so they can be shipped to a log
//! aggregator unchanged:
//! - `timestamp`, `level`, `target`
//! - `service`: service name from [`TelemetryConfig`]
//! - span fields from `#[instrument]`ed ledger entry points

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Handle returned once the global subscriber is installed.
pub struct LoggingHandle {
    service_name: String,
}

impl LoggingHandle {
    /// Service name the subscriber was configured with.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Install the global `tracing` subscriber.
///
/// Fails with [`TelemetryError::LoggingInit`] when a global subscriber is
/// already installed (e.g. a second call in the same test binary).
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingHandle, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let fmt_layer = if !config.console_output {
        None
    } else if config.json_logs {
        // JSON output for containers/production
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        )
    } else {
        // Pretty output for development
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(LoggingHandle {
        service_name: config.service_name.clone(),
    })
}
