//! # Distribution Ledger
//!
//! Owns the three ledger tables and is the only code that mutates them.
//!
//! ## Unit of work
//!
//! Writes never touch [`LedgerState`] directly. An entry point opens a
//! [`LedgerTransaction`] over the committed state; every read goes through
//! the transaction's staged overlay first, every write lands in the overlay.
//! Only [`LedgerState::commit`] applies the staged [`LedgerChanges`]. Dropping
//! a transaction (or its changes) discards the whole unit of work, so a
//! failure at any step leaves committed state untouched.
//!
//! ## Invariants
//!
//! - A root is write-once per [`DistributionKey`].
//! - A claimed flag only ever goes false → true.
//! - A pooled balance is never decremented below zero.

use std::collections::{HashMap, HashSet};

use super::entities::{ClaimKey, DistributionKey, PoolKey};
use super::value_objects::{Address, DistributionId, Hash, U256};
use crate::errors::DistributorError;
use crate::events::DistributionEvent;

/// Committed ledger tables.
#[derive(Debug, Default, Clone)]
pub struct LedgerState {
    roots: HashMap<DistributionKey, Hash>,
    claimed: HashSet<ClaimKey>,
    supplied: HashMap<PoolKey, U256>,
}

impl LedgerState {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of a distribution, if registered.
    #[must_use]
    pub fn root(&self, key: &DistributionKey) -> Option<Hash> {
        self.roots.get(key).copied()
    }

    /// Whether `key.recipient` already claimed `key.distribution`.
    #[must_use]
    pub fn is_claimed(&self, key: &ClaimKey) -> bool {
        self.claimed.contains(key)
    }

    /// Deposited but unclaimed balance of a pool.
    #[must_use]
    pub fn supplied_balance(&self, pool: &PoolKey) -> U256 {
        self.supplied.get(pool).copied().unwrap_or_default()
    }

    /// Roots of distributions `begin..=end` of a pool (`None` when unset).
    pub fn roots_in_range(
        &self,
        pool: PoolKey,
        begin: DistributionId,
        end: DistributionId,
        max_len: usize,
    ) -> Result<Vec<Option<Hash>>, DistributorError> {
        check_range(begin, end, max_len)?;
        Ok((begin..=end)
            .map(|id| self.root(&pool.distribution(id)))
            .collect())
    }

    /// Claimed flags of `recipient` for distributions `begin..=end`.
    pub fn claim_status_in_range(
        &self,
        pool: PoolKey,
        recipient: Address,
        begin: DistributionId,
        end: DistributionId,
        max_len: usize,
    ) -> Result<Vec<bool>, DistributorError> {
        check_range(begin, end, max_len)?;
        Ok((begin..=end)
            .map(|id| self.is_claimed(&pool.distribution(id).claim(recipient)))
            .collect())
    }

    /// Number of registered distributions.
    #[must_use]
    pub fn distribution_count(&self) -> usize {
        self.roots.len()
    }

    /// Open a unit of work over this state.
    #[must_use]
    pub fn begin(&self) -> LedgerTransaction<'_> {
        LedgerTransaction {
            base: self,
            changes: LedgerChanges::default(),
        }
    }

    /// Apply a finished unit of work, returning its events for publication.
    pub fn commit(&mut self, changes: LedgerChanges) -> Vec<DistributionEvent> {
        self.roots.extend(changes.roots);
        self.claimed.extend(changes.claimed);
        self.supplied.extend(changes.supplied);
        changes.events
    }
}

/// Validate an inclusive range query.
fn check_range(
    begin: DistributionId,
    end: DistributionId,
    max_len: usize,
) -> Result<(), DistributorError> {
    if begin > end {
        return Err(DistributorError::InvalidRange { begin, end });
    }
    let len = u128::from(end - begin) + 1;
    if len > max_len as u128 {
        return Err(DistributorError::InvalidRange { begin, end });
    }
    Ok(())
}

/// Staged writes and pending events of one unit of work.
#[derive(Debug, Default)]
pub struct LedgerChanges {
    roots: HashMap<DistributionKey, Hash>,
    claimed: HashSet<ClaimKey>,
    /// New absolute balances, not deltas.
    supplied: HashMap<PoolKey, U256>,
    events: Vec<DistributionEvent>,
}

impl LedgerChanges {
    /// Events that will be published on commit.
    #[must_use]
    pub fn events(&self) -> &[DistributionEvent] {
        &self.events
    }

    /// Number of claim flags this unit of work sets.
    #[must_use]
    pub fn claims_staged(&self) -> usize {
        self.claimed.len()
    }

    /// True if nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
            && self.claimed.is_empty()
            && self.supplied.is_empty()
            && self.events.is_empty()
    }
}

/// Read-through, write-staged view of the ledger.
pub struct LedgerTransaction<'a> {
    base: &'a LedgerState,
    changes: LedgerChanges,
}

impl LedgerTransaction<'_> {
    /// Root as seen by this unit of work.
    #[must_use]
    pub fn root(&self, key: &DistributionKey) -> Option<Hash> {
        self.changes
            .roots
            .get(key)
            .copied()
            .or_else(|| self.base.root(key))
    }

    /// Claimed flag as seen by this unit of work.
    #[must_use]
    pub fn is_claimed(&self, key: &ClaimKey) -> bool {
        self.changes.claimed.contains(key) || self.base.is_claimed(key)
    }

    /// Pooled balance as seen by this unit of work.
    #[must_use]
    pub fn supplied_balance(&self, pool: &PoolKey) -> U256 {
        self.changes
            .supplied
            .get(pool)
            .copied()
            .unwrap_or_else(|| self.base.supplied_balance(pool))
    }

    /// Register a distribution root and credit its deposit to the pool.
    ///
    /// Fails with `DuplicateRoot` (leaving the balance untouched) when the
    /// key already has a root. Stages a `FundsAdded` event.
    pub fn register_root(
        &mut self,
        key: DistributionKey,
        root: Hash,
        deposit: U256,
    ) -> Result<(), DistributorError> {
        if self.root(&key).is_some() {
            return Err(DistributorError::DuplicateRoot {
                token: key.token,
                rewarder: key.rewarder,
                distribution_id: key.distribution_id,
            });
        }

        let pool = key.pool();
        let balance = self
            .supplied_balance(&pool)
            .checked_add(deposit)
            .ok_or(DistributorError::ArithmeticOverflow)?;

        self.changes.roots.insert(key, root);
        self.changes.supplied.insert(pool, balance);
        self.changes.events.push(DistributionEvent::FundsAdded {
            token: key.token,
            amount: deposit,
        });
        Ok(())
    }

    /// Mark a claim as settled and debit the pool.
    ///
    /// Proofs are not checked here; the caller verifies them first.
    pub fn settle_claim(&mut self, key: ClaimKey, amount: U256) -> Result<(), DistributorError> {
        if self.is_claimed(&key) {
            return Err(DistributorError::AlreadyClaimed {
                distribution_id: key.distribution.distribution_id,
                recipient: key.recipient,
            });
        }

        let pool = key.distribution.pool();
        let available = self.supplied_balance(&pool);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(DistributorError::InsufficientSupply {
                    required: amount,
                    available,
                })?;

        self.changes.claimed.insert(key);
        self.changes.supplied.insert(pool, remaining);
        Ok(())
    }

    /// Queue an event for publication on commit.
    pub fn emit(&mut self, event: DistributionEvent) {
        self.changes.events.push(event);
    }

    /// Finish the unit of work, releasing the borrow of committed state.
    #[must_use]
    pub fn into_changes(self) -> LedgerChanges {
        self.changes
    }
}

// =============================================================================
// TESTS
// =============================================================================
