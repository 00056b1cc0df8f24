//! Distributor limits.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default cap on claim lines per batch.
pub const DEFAULT_MAX_CLAIMS_PER_BATCH: usize = 1024;

/// Default cap on proof length. A 256-deep tree covers any 256-bit index.
pub const DEFAULT_MAX_PROOF_DEPTH: usize = 256;

/// Default cap on range query length.
pub const DEFAULT_MAX_RANGE_LEN: usize = 10_000;

/// Distributor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorConfig {
    /// Claim lines accepted in one batch (`BatchTooLarge` above).
    pub max_claims_per_batch: usize,
    /// Longest accepted proof; longer proofs are rejected as invalid.
    pub max_proof_depth: usize,
    /// Longest accepted range query (`InvalidRange` above).
    pub max_range_len: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            max_claims_per_batch: DEFAULT_MAX_CLAIMS_PER_BATCH,
            max_proof_depth: DEFAULT_MAX_PROOF_DEPTH,
            max_range_len: DEFAULT_MAX_RANGE_LEN,
        }
    }
}

impl DistributorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_claims_per_batch: env_usize(
                "DL_MAX_CLAIMS_PER_BATCH",
                defaults.max_claims_per_batch,
            ),
            max_proof_depth: env_usize("DL_MAX_PROOF_DEPTH", defaults.max_proof_depth),
            max_range_len: env_usize("DL_MAX_RANGE_LEN", defaults.max_range_len),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(raw) => parse_usize(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_usize(name: &str, raw: &str, default: usize) -> usize {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(variable = name, value = raw, "Ignoring unparsable value");
            default
        }
    }
}
