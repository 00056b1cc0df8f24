//! Prometheus metrics for the distribution ledger.
//!
//! All metrics follow the naming convention: `dl_<metric>_<unit>`.
//! Counters are updated whether or not they have been registered; only
//! registered metrics appear in [`encode_metrics`] output.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Distributions created by `seed_allocations`
    pub static ref DISTRIBUTIONS_SEEDED: IntCounter = IntCounter::new(
        "dl_distributions_seeded_total",
        "Total number of distributions registered with a funded root"
    ).expect("metric creation failed");

    /// Individual claim lines settled
    pub static ref CLAIMS_SETTLED: IntCounter = IntCounter::new(
        "dl_claims_settled_total",
        "Total number of individual claims settled"
    ).expect("metric creation failed");

    /// Claim batches by outcome
    pub static ref CLAIM_BATCHES: IntCounterVec = IntCounterVec::new(
        Opts::new("dl_claim_batches_total", "Claim batches processed"),
        &["outcome"]  // outcome: committed/rejected/rolled_back
    ).expect("metric creation failed");
}

/// Outcome label for [`CLAIM_BATCHES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Batch fully applied.
    Committed,
    /// Batch failed validation before any external side effect.
    Rejected,
    /// Batch failed after a custody side effect and was undone.
    RolledBack,
}

impl BatchOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// Handle proving the metrics were registered.
pub struct MetricsHandle {
    _registered: bool,
}

/// Register all metrics with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    register(Box::new(DISTRIBUTIONS_SEEDED.clone()))?;
    register(Box::new(CLAIMS_SETTLED.clone()))?;
    register(Box::new(CLAIM_BATCHES.clone()))?;

    Ok(MetricsHandle { _registered: true })
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<(), TelemetryError> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(TelemetryError::MetricsInit(e.to_string())),
    }
}

/// Record one successfully seeded distribution.
pub fn record_distribution_seeded() {
    DISTRIBUTIONS_SEEDED.inc();
}

/// Record `count` settled claim lines.
pub fn record_claim_settled(count: u64) {
    CLAIMS_SETTLED.inc_by(count);
}

/// Record the outcome of one claim batch.
pub fn record_batch_outcome(outcome: BatchOutcome) {
    CLAIM_BATCHES.with_label_values(&[outcome.label()]).inc();
}

/// Render registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
