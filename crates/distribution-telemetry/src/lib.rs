//! # Distribution Telemetry
//!
//! Observability wiring for the distribution ledger.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters for seeding and claim settlement
//!
//! ## Usage
//!
//! ```rust,ignore
//! use distribution_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DL_SERVICE_NAME` | `distribution-ledger` | Service name in log records |
//! | `DL_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `DL_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `DL_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingHandle};
pub use metrics::{
    encode_metrics, record_batch_outcome, record_claim_settled, record_distribution_seeded,
    register_metrics, BatchOutcome, MetricsHandle, CLAIMS_SETTLED, CLAIM_BATCHES,
    DISTRIBUTIONS_SEEDED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics together.
///
/// Returns a guard that should be held for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let logging = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logging: logging,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingHandle,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
