//! # Error Types
//!
//! Every error aborts the enclosing unit of work with no partial effect and
//! surfaces to the caller of the public entry point. Nothing here is retried.

use crate::domain::value_objects::{Address, DistributionId, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// DISTRIBUTOR ERRORS
// =============================================================================

/// Errors returned by ledger, claim processor and entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistributorError {
    /// A root is already registered for this distribution.
    #[error("duplicate root: token {token}, rewarder {rewarder}, distribution {distribution_id}")]
    DuplicateRoot {
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
    },

    /// The recipient already claimed this distribution.
    #[error("already claimed: distribution {distribution_id} by {recipient}")]
    AlreadyClaimed {
        distribution_id: DistributionId,
        recipient: Address,
    },

    /// The Merkle proof does not lead to the distribution's root.
    #[error("invalid proof for distribution {distribution_id}")]
    InvalidProof { distribution_id: DistributionId },

    /// The pooled supplied balance cannot cover the claim.
    #[error("insufficient supply: required {required}, available {available}")]
    InsufficientSupply { required: U256, available: U256 },

    /// A claim references a token index outside the batch's token list.
    #[error("token index {index} out of range ({len} tokens)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Range query with `begin > end` or above the configured length.
    #[error("invalid range: begin {begin}, end {end}")]
    InvalidRange {
        begin: DistributionId,
        end: DistributionId,
    },

    /// Caller is not the liquidity provider it claims for.
    #[error("unauthorized: caller {caller} is not {expected}")]
    Unauthorized { caller: Address, expected: Address },

    /// The custody service refused or failed the operation.
    #[error("custody failure: {0}")]
    CustodyFailure(#[from] CustodyError),

    /// The post-claim callback failed.
    #[error("callback failure: {0}")]
    CallbackFailure(#[from] CallbackError),

    /// Balance or aggregate arithmetic overflowed 256 bits.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Batch exceeds the configured number of claim lines.
    #[error("batch too large: {size} > {max} claims")]
    BatchTooLarge { size: usize, max: usize },

    /// Entry point invoked again while a unit of work is in progress.
    #[error("reentrant call into the distributor")]
    ReentrantCall,

    /// A batch broke a ledger accounting invariant and was discarded.
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl DistributorError {
    /// Serializable discriminant of this error.
    #[must_use]
    pub fn kind(&self) -> DistributorErrorKind {
        match self {
            Self::DuplicateRoot { .. } => DistributorErrorKind::DuplicateRoot,
            Self::AlreadyClaimed { .. } => DistributorErrorKind::AlreadyClaimed,
            Self::InvalidProof { .. } => DistributorErrorKind::InvalidProof,
            Self::InsufficientSupply { .. } => DistributorErrorKind::InsufficientSupply,
            Self::IndexOutOfRange { .. } => DistributorErrorKind::IndexOutOfRange,
            Self::InvalidRange { .. } => DistributorErrorKind::InvalidRange,
            Self::Unauthorized { .. } => DistributorErrorKind::Unauthorized,
            Self::CustodyFailure(_) => DistributorErrorKind::CustodyFailure,
            Self::CallbackFailure(_) => DistributorErrorKind::CallbackFailure,
            Self::ArithmeticOverflow => DistributorErrorKind::ArithmeticOverflow,
            Self::BatchTooLarge { .. } => DistributorErrorKind::BatchTooLarge,
            Self::ReentrantCall => DistributorErrorKind::ReentrantCall,
            Self::InvariantViolation(_) => DistributorErrorKind::InvariantViolation,
        }
    }
}

/// Error type enumeration for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributorErrorKind {
    DuplicateRoot,
    AlreadyClaimed,
    InvalidProof,
    InsufficientSupply,
    IndexOutOfRange,
    InvalidRange,
    Unauthorized,
    CustodyFailure,
    CallbackFailure,
    ArithmeticOverflow,
    BatchTooLarge,
    ReentrantCall,
    InvariantViolation,
}

/// Serializable error for callers across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorErrorPayload {
    pub kind: DistributorErrorKind,
    pub message: String,
}

impl From<&DistributorError> for DistributorErrorPayload {
    fn from(err: &DistributorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// CUSTODY ERRORS
// =============================================================================

/// Errors from the external custody service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// Payer cannot cover a deposit.
    #[error("insufficient funds for {holder}: required {required}, available {available}")]
    InsufficientFunds {
        holder: Address,
        required: U256,
        available: U256,
    },

    /// Custody service is not reachable or refused the call.
    #[error("custody service unavailable")]
    Unavailable,

    /// A receipt could not be rolled back.
    #[error("rollback failed for receipt {receipt_id}")]
    RollbackFailed { receipt_id: u64 },

    /// Other custody error.
    #[error("custody error: {0}")]
    Other(String),
}

// =============================================================================
// CALLBACK ERRORS
// =============================================================================

/// Errors raised by a callback target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// The target rejected the call.
    #[error("callback rejected: {0}")]
    Rejected(String),

    /// The target tried to re-enter the distributor.
    #[error("callback re-entered the distributor")]
    Reentered,
}

// =============================================================================
// TESTS
// =============================================================================
