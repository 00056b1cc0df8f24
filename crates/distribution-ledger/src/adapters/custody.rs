//! # Custody Adapter
//!
//! In-memory custody for testing and local wiring. Tracks external
//! balances, internal (custody-held) balances per holder and the
//! distributor's own custody account, and journals every operation so it
//! can be rolled back by receipt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::{TransferMode, TransferOp};
use crate::domain::value_objects::{Address, U256};
use crate::errors::CustodyError;
use crate::ports::outbound::{CustodyReceipt, CustodyService};

/// One journaled balance movement.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Movement {
    Deposit {
        payer: Address,
        token: Address,
        amount: U256,
    },
    Transfer(TransferOp),
}

#[derive(Clone, Debug, Default)]
struct Book {
    /// (holder, token) -> externally held balance
    external: HashMap<(Address, Address), U256>,
    /// (holder, token) -> internal balance kept by custody
    internal: HashMap<(Address, Address), U256>,
    /// token -> balance of the distributor's custody account
    held: HashMap<Address, U256>,
}

fn credit<K: std::hash::Hash + Eq>(
    table: &mut HashMap<K, U256>,
    key: K,
    amount: U256,
) -> Result<(), CustodyError> {
    let slot = table.entry(key).or_default();
    *slot = slot
        .checked_add(amount)
        .ok_or_else(|| CustodyError::Other("balance overflow".to_string()))?;
    Ok(())
}

fn debit<K: std::hash::Hash + Eq>(
    table: &mut HashMap<K, U256>,
    key: K,
    holder: Address,
    amount: U256,
) -> Result<(), CustodyError> {
    let slot = table.entry(key).or_default();
    let available = *slot;
    *slot = available
        .checked_sub(amount)
        .ok_or(CustodyError::InsufficientFunds {
            holder,
            required: amount,
            available,
        })?;
    Ok(())
}

impl Book {
    fn apply(&mut self, account: Address, movement: &Movement) -> Result<(), CustodyError> {
        match movement {
            Movement::Deposit {
                payer,
                token,
                amount,
            } => {
                debit(&mut self.external, (*payer, *token), *payer, *amount)?;
                credit(&mut self.held, *token, *amount)
            }
            Movement::Transfer(op) => {
                debit(&mut self.held, op.token, account, op.amount)?;
                match op.mode {
                    TransferMode::WithdrawToExternal => {
                        credit(&mut self.external, (op.destination, op.token), op.amount)
                    }
                    TransferMode::CreditInternal => {
                        credit(&mut self.internal, (op.destination, op.token), op.amount)
                    }
                }
            }
        }
    }

    fn revert(&mut self, account: Address, movement: &Movement) -> Result<(), CustodyError> {
        match movement {
            Movement::Deposit {
                payer,
                token,
                amount,
            } => {
                debit(&mut self.held, *token, account, *amount)?;
                credit(&mut self.external, (*payer, *token), *amount)
            }
            Movement::Transfer(op) => {
                match op.mode {
                    TransferMode::WithdrawToExternal => debit(
                        &mut self.external,
                        (op.destination, op.token),
                        op.destination,
                        op.amount,
                    )?,
                    TransferMode::CreditInternal => debit(
                        &mut self.internal,
                        (op.destination, op.token),
                        op.destination,
                        op.amount,
                    )?,
                }
                credit(&mut self.held, op.token, op.amount)
            }
        }
    }
}

#[derive(Debug, Default)]
struct CustodyInner {
    book: Book,
    journal: HashMap<u64, Vec<Movement>>,
}

/// In-memory custody service.
#[derive(Debug)]
pub struct InMemoryCustody {
    /// The distributor's own custody account.
    account: Address,
    inner: Mutex<CustodyInner>,
    next_receipt: AtomicU64,
    fail_deposits: AtomicBool,
    fail_transfers: AtomicBool,
    transfer_calls: AtomicU64,
}

impl InMemoryCustody {
    /// Create an empty custody with `account` as the distributor's account.
    #[must_use]
    pub fn new(account: Address) -> Self {
        Self {
            account,
            inner: Mutex::new(CustodyInner::default()),
            next_receipt: AtomicU64::new(1),
            fail_deposits: AtomicBool::new(false),
            fail_transfers: AtomicBool::new(false),
            transfer_calls: AtomicU64::new(0),
        }
    }

    /// Give `holder` an external balance of `token`.
    pub fn mint_external(&self, holder: Address, token: Address, amount: U256) {
        let mut inner = self.inner.lock();
        let slot = inner.book.external.entry((holder, token)).or_default();
        *slot = slot.saturating_add(amount);
    }

    /// Externally held balance of `holder`.
    #[must_use]
    pub fn external_balance(&self, holder: Address, token: Address) -> U256 {
        self.inner
            .lock()
            .book
            .external
            .get(&(holder, token))
            .copied()
            .unwrap_or_default()
    }

    /// Internal balance of `holder`.
    #[must_use]
    pub fn internal_balance(&self, holder: Address, token: Address) -> U256 {
        self.inner
            .lock()
            .book
            .internal
            .get(&(holder, token))
            .copied()
            .unwrap_or_default()
    }

    /// Balance of `token` held in the distributor's custody account.
    #[must_use]
    pub fn held_balance(&self, token: Address) -> U256 {
        self.inner
            .lock()
            .book
            .held
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    /// Make every subsequent deposit fail with `Unavailable`.
    pub fn set_deposits_failing(&self, failing: bool) {
        self.fail_deposits.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent batch transfer fail with `Unavailable`.
    pub fn set_transfers_failing(&self, failing: bool) {
        self.fail_transfers.store(failing, Ordering::SeqCst);
    }

    /// Number of `batch_transfer` calls received, failed ones included.
    #[must_use]
    pub fn transfer_calls(&self) -> u64 {
        self.transfer_calls.load(Ordering::SeqCst)
    }

    /// Number of operations neither released nor rolled back.
    #[must_use]
    pub fn open_receipts(&self) -> usize {
        self.inner.lock().journal.len()
    }

    /// Apply `movements` all-or-nothing and journal them under a new receipt.
    fn execute(&self, movements: Vec<Movement>) -> Result<CustodyReceipt, CustodyError> {
        let mut inner = self.inner.lock();
        let mut next = inner.book.clone();
        for movement in &movements {
            next.apply(self.account, movement)?;
        }
        inner.book = next;

        let id = self.next_receipt.fetch_add(1, Ordering::SeqCst);
        let receipt = CustodyReceipt {
            id,
            movements: movements.len(),
        };
        inner.journal.insert(id, movements);
        Ok(receipt)
    }
}

impl CustodyService for InMemoryCustody {
    fn deposit(
        &self,
        payer: Address,
        token: Address,
        amount: U256,
    ) -> Result<CustodyReceipt, CustodyError> {
        if self.fail_deposits.load(Ordering::SeqCst) {
            warn!(payer = %payer, "Custody deposit refused (outage)");
            return Err(CustodyError::Unavailable);
        }
        let receipt = self.execute(vec![Movement::Deposit {
            payer,
            token,
            amount,
        }])?;
        debug!(receipt = receipt.id, payer = %payer, token = %token, amount = %amount, "Deposit");
        Ok(receipt)
    }

    fn batch_transfer(&self, ops: &[TransferOp]) -> Result<CustodyReceipt, CustodyError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transfers.load(Ordering::SeqCst) {
            warn!(ops = ops.len(), "Custody batch transfer refused (outage)");
            return Err(CustodyError::Unavailable);
        }
        let receipt = self.execute(ops.iter().cloned().map(Movement::Transfer).collect())?;
        debug!(receipt = receipt.id, ops = ops.len(), "Batch transfer");
        Ok(receipt)
    }

    fn rollback(&self, receipt: CustodyReceipt) -> Result<(), CustodyError> {
        let mut inner = self.inner.lock();
        let movements = inner
            .journal
            .get(&receipt.id)
            .cloned()
            .ok_or(CustodyError::RollbackFailed {
                receipt_id: receipt.id,
            })?;

        let mut next = inner.book.clone();
        for movement in movements.iter().rev() {
            next.revert(self.account, movement)
                .map_err(|_| CustodyError::RollbackFailed {
                    receipt_id: receipt.id,
                })?;
        }
        inner.book = next;
        inner.journal.remove(&receipt.id);
        debug!(receipt = receipt.id, "Rolled back");
        Ok(())
    }

    fn release(&self, receipt: CustodyReceipt) {
        if self.inner.lock().journal.remove(&receipt.id).is_none() {
            warn!(receipt = receipt.id, "Release of unknown receipt");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
