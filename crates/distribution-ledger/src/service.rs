//! # Distributor Service
//!
//! Entry points over the ledger. Each mutating call runs as one unit of work
//! under a single global lock:
//!
//! 1. stage ledger writes in a [`LedgerTransaction`](crate::domain::LedgerTransaction)
//! 2. run the custody operation (and the callback, if any)
//! 3. commit the staged writes
//! 4. publish the staged events
//!
//! A failure in 1 or 2 drops the staged writes; a failure after the custody
//! operation also rolls the custody operation back by receipt, and so does a
//! callback that panics. After 3 the receipt is released. Events are only
//! published after 3.
//!
//! ## Reentrancy
//!
//! The lock is reentrant so a callback running on the same thread can still
//! read the ledger (it sees the state before the current claim). Any mutating
//! entry point called while a unit of work is in progress fails with
//! `ReentrantCall` instead of deadlocking.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Instant;

use distribution_telemetry::{
    record_batch_outcome, record_claim_settled, record_distribution_seeded, BatchOutcome,
};
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::config::DistributorConfig;
use crate::domain::entities::{
    ClaimReceipt, ClaimRequest, DistributionKey, PayoutDestination, PoolKey,
};
use crate::domain::ledger::{LedgerChanges, LedgerState};
use crate::domain::merkle;
use crate::domain::processor::{claim_proof_valid, process_claims, ClaimBatch};
use crate::domain::value_objects::{Address, DistributionId, Hash, U256};
use crate::errors::DistributorError;
use crate::ports::inbound::DistributorApi;
use crate::ports::outbound::{CustodyReceipt, CustodyService, DistributorCallback, EventSink};

/// Statistics for the distributor service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Distributions registered.
    pub distributions_seeded: u64,
    /// Claim batches committed.
    pub batches_committed: u64,
    /// Claim batches refused before any custody effect.
    pub batches_rejected: u64,
    /// Claim batches undone after a custody or callback failure.
    pub batches_rolled_back: u64,
    /// Claim lines settled in committed batches.
    pub claims_settled: u64,
    /// Requests refused for a caller/provider mismatch.
    pub rejected_requests: u64,
    /// Events handed to the sink.
    pub events_published: u64,
    /// Average wall time of a committed batch, in microseconds.
    pub avg_batch_time_us: u64,
}

/// Ledger plus the in-progress flag, guarded together.
#[derive(Default)]
struct LedgerCell {
    state: RefCell<LedgerState>,
    busy: Cell<bool>,
}

/// Marks a unit of work as in progress for as long as it lives.
struct UnitOfWork<'a>(&'a Cell<bool>);

impl<'a> UnitOfWork<'a> {
    fn enter(busy: &'a Cell<bool>) -> Result<Self, DistributorError> {
        if busy.replace(true) {
            return Err(DistributorError::ReentrantCall);
        }
        Ok(Self(busy))
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Custody operation of the current unit of work.
///
/// Rolled back when dropped unless released after commit, so an early return
/// or a panic unwinding out of a callback cannot leave custody ahead of the
/// ledger.
struct OpenReceipt<'a, C: CustodyService> {
    custody: &'a C,
    receipt: Option<CustodyReceipt>,
}

impl<'a, C: CustodyService> OpenReceipt<'a, C> {
    fn new(custody: &'a C, receipt: CustodyReceipt) -> Self {
        Self {
            custody,
            receipt: Some(receipt),
        }
    }

    /// Undo the operation now, surfacing a failed revert.
    fn rollback(mut self) -> Result<(), DistributorError> {
        let Some(receipt) = self.receipt.take() else {
            return Ok(());
        };
        self.custody.rollback(receipt).map_err(|e| {
            error!(receipt = receipt.id, error = %e, "Custody rollback failed");
            DistributorError::from(e)
        })
    }

    /// Close the operation once the ledger has committed.
    fn release(mut self) {
        if let Some(receipt) = self.receipt.take() {
            self.custody.release(receipt);
        }
    }
}

impl<C: CustodyService> Drop for OpenReceipt<'_, C> {
    fn drop(&mut self) {
        if let Some(receipt) = self.receipt.take() {
            warn!(receipt = receipt.id, "Unit of work abandoned, rolling back custody");
            if let Err(e) = self.custody.rollback(receipt) {
                error!(receipt = receipt.id, error = %e, "Custody rollback failed");
            }
        }
    }
}

/// Post-claim callback and its payload.
type CallbackCall<'a> = (&'a dyn DistributorCallback, &'a [u8]);

/// The reward distributor.
pub struct DistributorService<C: CustodyService, E: EventSink> {
    config: DistributorConfig,
    custody: Arc<C>,
    events: Arc<E>,
    ledger: ReentrantMutex<LedgerCell>,
    stats: RwLock<ServiceStats>,
}

impl<C: CustodyService, E: EventSink> DistributorService<C, E> {
    /// Create a distributor over an empty ledger.
    pub fn new(custody: Arc<C>, events: Arc<E>, config: DistributorConfig) -> Self {
        info!(
            max_claims_per_batch = config.max_claims_per_batch,
            max_proof_depth = config.max_proof_depth,
            max_range_len = config.max_range_len,
            "Distributor service created"
        );
        Self {
            config,
            custody,
            events,
            ledger: ReentrantMutex::new(LedgerCell::default()),
            stats: RwLock::new(ServiceStats::default()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    /// Get current service statistics.
    pub fn stats(&self) -> ServiceStats {
        self.stats.read().clone()
    }

    /// Number of registered distributions.
    pub fn distribution_count(&self) -> usize {
        self.read(LedgerState::distribution_count)
    }

    fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let guard = self.ledger.lock();
        let state = guard.state.borrow();
        f(&state)
    }

    fn authorize(&self, caller: Address, liquidity_provider: Address) -> Result<(), DistributorError> {
        if caller != liquidity_provider {
            warn!(
                caller = %caller,
                liquidity_provider = %liquidity_provider,
                "Unauthorized claim"
            );
            self.stats.write().rejected_requests += 1;
            return Err(DistributorError::Unauthorized {
                caller,
                expected: liquidity_provider,
            });
        }
        Ok(())
    }

    /// Commit staged changes and publish their events.
    fn commit(&self, cell: &LedgerCell, changes: LedgerChanges) {
        let events = cell.state.borrow_mut().commit(changes);
        let count = events.len() as u64;
        for event in events {
            self.events.publish(event);
        }
        self.stats.write().events_published += count;
    }

    fn execute_claim(
        &self,
        caller: Address,
        batch: &ClaimBatch<'_>,
        callback: Option<CallbackCall<'_>>,
    ) -> Result<ClaimReceipt, DistributorError> {
        let started = Instant::now();
        let result = self
            .authorize(caller, batch.liquidity_provider)
            .and_then(|()| self.run_claim(batch, callback));
        self.record_batch(&result, started);
        result
    }

    fn run_claim(
        &self,
        batch: &ClaimBatch<'_>,
        callback: Option<CallbackCall<'_>>,
    ) -> Result<ClaimReceipt, DistributorError> {
        let guard = self.ledger.lock();
        let _unit = UnitOfWork::enter(&guard.busy)?;

        let (changes, receipt, transfer) = {
            let state = guard.state.borrow();
            let mut tx = state.begin();
            let processed = process_claims(&mut tx, batch, &self.config)?;

            let transfer = OpenReceipt::new(
                self.custody.as_ref(),
                self.custody.batch_transfer(&processed.transfers)?,
            );

            if let Some((target, data)) = callback {
                if let Err(e) = target.distributor_callback(data) {
                    warn!(callback = %target.callback_address(), error = %e, "Callback failed");
                    transfer.rollback()?;
                    return Err(e.into());
                }
            }

            (tx.into_changes(), processed.receipt, transfer)
        };

        self.commit(&guard, changes);
        transfer.release();
        Ok(receipt)
    }

    fn record_batch(&self, result: &Result<ClaimReceipt, DistributorError>, started: Instant) {
        let mut stats = self.stats.write();
        match result {
            Ok(receipt) => {
                let settled = receipt.claims_settled as u64;
                let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

                stats.batches_committed += 1;
                stats.claims_settled += settled;
                stats.avg_batch_time_us = stats
                    .avg_batch_time_us
                    .saturating_mul(stats.batches_committed - 1)
                    .saturating_add(elapsed)
                    / stats.batches_committed;

                record_batch_outcome(BatchOutcome::Committed);
                record_claim_settled(settled);
                info!(
                    recipient = %receipt.payout_recipient,
                    claims = receipt.claims_settled,
                    tokens = receipt.tokens.len(),
                    elapsed_us = elapsed,
                    "Claim batch committed"
                );
            }
            Err(e @ (DistributorError::CustodyFailure(_) | DistributorError::CallbackFailure(_))) => {
                stats.batches_rolled_back += 1;
                record_batch_outcome(BatchOutcome::RolledBack);
                warn!(error = %e, "Claim batch rolled back");
            }
            Err(e) => {
                stats.batches_rejected += 1;
                record_batch_outcome(BatchOutcome::Rejected);
                debug!(error = %e, kind = ?e.kind(), "Claim batch rejected");
            }
        }
    }

    fn run_seed(&self, key: DistributionKey, root: Hash, amount: U256) -> Result<(), DistributorError> {
        let guard = self.ledger.lock();
        let _unit = UnitOfWork::enter(&guard.busy)?;

        let (changes, deposit) = {
            let state = guard.state.borrow();
            let mut tx = state.begin();

            // funds are pulled before the pool is credited
            let deposit = OpenReceipt::new(
                self.custody.as_ref(),
                self.custody.deposit(key.rewarder, key.token, amount)?,
            );
            if let Err(e) = tx.register_root(key, root, amount) {
                deposit.rollback()?;
                return Err(e);
            }
            (tx.into_changes(), deposit)
        };

        self.commit(&guard, changes);
        deposit.release();
        Ok(())
    }
}

impl<C: CustodyService, E: EventSink> DistributorApi for DistributorService<C, E> {
    #[instrument(skip_all, fields(caller = %caller, claims = claims.len()))]
    fn claim(
        &self,
        caller: Address,
        liquidity_provider: Address,
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError> {
        let batch = ClaimBatch {
            liquidity_provider,
            payout_recipient: caller,
            claims,
            tokens,
            destination: PayoutDestination::ExternalWithdrawal,
        };
        self.execute_claim(caller, &batch, None)
    }

    #[instrument(skip_all, fields(caller = %caller, claims = claims.len()))]
    fn claim_to_internal_balance(
        &self,
        caller: Address,
        liquidity_provider: Address,
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError> {
        let batch = ClaimBatch {
            liquidity_provider,
            payout_recipient: caller,
            claims,
            tokens,
            destination: PayoutDestination::InternalCredit,
        };
        self.execute_claim(caller, &batch, None)
    }

    #[instrument(
        skip_all,
        fields(caller = %caller, callback = %callback.callback_address(), claims = claims.len())
    )]
    fn claim_with_callback(
        &self,
        caller: Address,
        liquidity_provider: Address,
        callback: &dyn DistributorCallback,
        data: &[u8],
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError> {
        let batch = ClaimBatch {
            liquidity_provider,
            payout_recipient: callback.callback_address(),
            claims,
            tokens,
            destination: PayoutDestination::InternalCredit,
        };
        self.execute_claim(caller, &batch, Some((callback, data)))
    }

    #[instrument(skip_all, fields(caller = %caller, token = %token, distribution_id = distribution_id))]
    fn seed_allocations(
        &self,
        caller: Address,
        token: Address,
        distribution_id: DistributionId,
        root: Hash,
        amount: U256,
    ) -> Result<(), DistributorError> {
        let key = DistributionKey::new(token, caller, distribution_id);
        match self.run_seed(key, root, amount) {
            Ok(()) => {
                self.stats.write().distributions_seeded += 1;
                record_distribution_seeded();
                info!(root = %root, amount = %amount, "Distribution seeded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Seeding failed");
                Err(e)
            }
        }
    }

    fn is_claimed(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
        recipient: Address,
    ) -> bool {
        let key = DistributionKey::new(token, rewarder, distribution_id).claim(recipient);
        self.read(|state| state.is_claimed(&key))
    }

    fn claim_status_in_range(
        &self,
        token: Address,
        rewarder: Address,
        recipient: Address,
        begin: DistributionId,
        end: DistributionId,
    ) -> Result<Vec<bool>, DistributorError> {
        let pool = PoolKey::new(token, rewarder);
        self.read(|state| {
            state.claim_status_in_range(pool, recipient, begin, end, self.config.max_range_len)
        })
    }

    fn roots_in_range(
        &self,
        token: Address,
        rewarder: Address,
        begin: DistributionId,
        end: DistributionId,
    ) -> Result<Vec<Option<Hash>>, DistributorError> {
        let pool = PoolKey::new(token, rewarder);
        self.read(|state| state.roots_in_range(pool, begin, end, self.config.max_range_len))
    }

    fn verify_proof(&self, proof: &[Hash], root: Hash, leaf: Hash) -> bool {
        merkle::verify(proof, root, leaf)
    }

    fn verify_claim(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
        claimer: Address,
        balance: U256,
        proof: &[Hash],
    ) -> bool {
        let root = self.distribution_root(token, rewarder, distribution_id);
        claim_proof_valid(root, claimer, balance, proof, self.config.max_proof_depth)
    }

    fn distribution_root(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
    ) -> Option<Hash> {
        let key = DistributionKey::new(token, rewarder, distribution_id);
        self.read(|state| state.root(&key))
    }

    fn remaining_balance(&self, token: Address, rewarder: Address) -> U256 {
        let pool = PoolKey::new(token, rewarder);
        self.read(|state| state.supplied_balance(&pool))
    }
}

// =============================================================================
// TESTS
// =============================================================================
