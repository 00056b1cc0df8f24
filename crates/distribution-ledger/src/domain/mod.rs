//! # Domain Layer (Inner Hexagon)
//!
//! Pure distribution logic: Merkle verification, the ledger tables and the
//! claim processor. No I/O and no locking; both live in the service.

pub mod entities;
pub mod invariants;
pub mod ledger;
pub mod merkle;
pub mod processor;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use ledger::{LedgerChanges, LedgerState, LedgerTransaction};
pub use processor::{claim_proof_valid, process_claims, ClaimBatch, ProcessedBatch};
pub use value_objects::*;
