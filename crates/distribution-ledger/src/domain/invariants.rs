//! # Domain Invariants
//!
//! Accounting checks run over a processed claim batch before it may commit.
//!
//! - Supply conservation: every pool touched by a batch ends exactly
//!   `settled` below where it started.
//! - Transfer shape: one transfer per batch token, same order.
//! - Aggregate total: the transfers pay out exactly the sum of the claim lines.

use super::entities::{ClaimRequest, PoolKey, TransferOp};
use super::value_objects::{Address, U256};

/// Balance movement of one pool within a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolMovement {
    pub pool: PoolKey,
    /// Pooled balance before the first claim of the batch touched it.
    pub before: U256,
    /// Pooled balance after the last claim of the batch.
    pub after: U256,
    /// Sum of claim lines settled against the pool.
    pub settled: U256,
}

impl PoolMovement {
    #[must_use]
    pub fn new(pool: PoolKey, before: U256) -> Self {
        Self {
            pool,
            before,
            after: before,
            settled: U256::zero(),
        }
    }
}

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// `before == after + settled` for a pool.
#[must_use]
pub fn check_supply_conservation(movement: &PoolMovement) -> bool {
    movement.before.checked_sub(movement.settled) == Some(movement.after)
}

/// One transfer per token, in token order.
#[must_use]
pub fn check_transfer_shape(tokens: &[Address], transfers: &[TransferOp]) -> bool {
    tokens.len() == transfers.len()
        && tokens
            .iter()
            .zip(transfers)
            .all(|(token, op)| *token == op.token)
}

/// Sum of claim balances equals sum of transfer amounts.
///
/// An overflowing sum on either side counts as a mismatch.
#[must_use]
pub fn check_aggregate_total(claims: &[ClaimRequest], transfers: &[TransferOp]) -> bool {
    let claimed = checked_sum(claims.iter().map(|c| c.balance));
    let paid = checked_sum(transfers.iter().map(|op| op.amount));
    matches!((claimed, paid), (Some(c), Some(p)) if c == p)
}

fn checked_sum(values: impl Iterator<Item = U256>) -> Option<U256> {
    values.fold(Some(U256::zero()), |acc, v| acc?.checked_add(v))
}

/// Check all batch invariants at once.
#[must_use]
pub fn check_batch_invariants<'a>(
    movements: impl IntoIterator<Item = &'a PoolMovement>,
    claims: &[ClaimRequest],
    tokens: &[Address],
    transfers: &[TransferOp],
) -> InvariantCheckResult {
    let mut violations: Vec<InvariantViolation> = movements
        .into_iter()
        .filter(|m| !check_supply_conservation(m))
        .map(|m| InvariantViolation::SupplyNotConserved {
            pool: m.pool,
            before: m.before,
            after: m.after,
            settled: m.settled,
        })
        .collect();

    if !check_transfer_shape(tokens, transfers) {
        violations.push(InvariantViolation::TransferShapeMismatch {
            tokens: tokens.len(),
            transfers: transfers.len(),
        });
    }

    if !check_aggregate_total(claims, transfers) {
        violations.push(InvariantViolation::AggregateMismatch);
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A pool moved by something other than the settled amount.
    SupplyNotConserved {
        pool: PoolKey,
        before: U256,
        after: U256,
        settled: U256,
    },
    /// Transfers do not line up with the batch tokens.
    TransferShapeMismatch { tokens: usize, transfers: usize },
    /// Paid total differs from claimed total.
    AggregateMismatch,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SupplyNotConserved {
                pool,
                before,
                after,
                settled,
            } => write!(
                f,
                "supply not conserved for {}/{}: {before} - {settled} != {after}",
                pool.token, pool.rewarder
            ),
            Self::TransferShapeMismatch { tokens, transfers } => {
                write!(f, "{transfers} transfers for {tokens} tokens")
            }
            Self::AggregateMismatch => write!(f, "paid total differs from claimed total"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
