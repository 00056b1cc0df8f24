//! # Distribution Ledger - Merkle Reward Distributor
//!
//! Rewarders fund a distribution of a token and commit to its payouts with a
//! single Merkle root; recipients claim their own line with an inclusion
//! proof. The ledger guarantees:
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | One root per `(token, rewarder, distribution)` | `domain/ledger.rs` - `register_root()` |
//! | Exactly-once claim per recipient | `domain/ledger.rs` - `settle_claim()` |
//! | Claims never exceed the pooled balance | `domain/ledger.rs` - `settle_claim()`, `domain/processor.rs` |
//! | Amount bound to a leaf by proof | `domain/merkle.rs` - `verify()` |
//! | Batches commit all-or-nothing | `service.rs` - staged `LedgerTransaction` + custody rollback |
//!
//! ## Leaf format
//!
//! `keccak256(recipient[20] || amount[32, big-endian])`, sorted-pair node
//! hashing. See [`domain::merkle`].
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `CustodyService` | Holds token balances, deposits and batched payouts |
//! | `DistributorCallback` | Optional post-claim hook |
//! | `EventSink` | `FundsAdded` / `RewardPaid` notifications |
//!
//! ## Usage Example
//!
//! ```ignore
//! use distribution_ledger::prelude::*;
//!
//! let distributor = DistributorService::new(custody, sink, DistributorConfig::from_env());
//! distributor.seed_allocations(rewarder, token, 0, root, U256::from(150u64))?;
//! let receipt = distributor.claim(alice, alice, &claims, &[token])?;
//! ```

// Crate-level lints
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        ClaimKey, ClaimReceipt, ClaimRequest, DistributionKey, PayoutDestination, PoolKey,
        TransferMode, TransferOp,
    };

    // Value objects
    pub use crate::domain::value_objects::{Address, DistributionId, Hash, U256};

    // Merkle
    pub use crate::domain::merkle::{encode_leaf, hash_pair, keccak256, verify};
    #[cfg(any(test, feature = "test-utils"))]
    pub use crate::domain::merkle::MerkleTree;

    // Ports
    pub use crate::ports::inbound::DistributorApi;
    pub use crate::ports::outbound::{
        CustodyReceipt, CustodyService, DistributorCallback, EventSink,
    };

    // Adapters
    pub use crate::adapters::{BroadcastEventSink, InMemoryCustody, InMemoryEventLog};

    // Events
    pub use crate::events::{topics, DistributionEvent};

    // Errors
    pub use crate::errors::{
        CallbackError, CustodyError, DistributorError, DistributorErrorKind,
        DistributorErrorPayload,
    };

    // Service
    pub use crate::config::DistributorConfig;
    pub use crate::service::{DistributorService, ServiceStats};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component name used in logs and metrics.
pub const COMPONENT_NAME: &str = "distribution-ledger";
