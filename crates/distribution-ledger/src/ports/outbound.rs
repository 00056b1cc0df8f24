//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators the distributor depends on but does not own:
//! - custody of the actual token balances
//! - the optional post-claim callback target
//! - the event sink notified after each committed unit of work
//!
//! All calls are synchronous and happen while the distributor lock is held.

use serde::{Deserialize, Serialize};

use crate::domain::entities::TransferOp;
use crate::domain::value_objects::{Address, U256};
use crate::errors::{CallbackError, CustodyError};
use crate::events::DistributionEvent;

// =============================================================================
// CUSTODY SERVICE
// =============================================================================

/// Handle on a custody operation.
///
/// Open from issue until the enclosing unit of work either releases it
/// (commit) or rolls it back. Only open receipts can be rolled back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustodyReceipt {
    /// Custody-assigned identifier.
    pub id: u64,
    /// Number of balance movements the operation made.
    pub movements: usize,
}

/// Holds token balances on behalf of the distributor.
pub trait CustodyService: Send + Sync {
    /// Pull `amount` of `token` from `payer`'s external balance into the
    /// distributor's custody account.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when the payer cannot cover the amount.
    fn deposit(
        &self,
        payer: Address,
        token: Address,
        amount: U256,
    ) -> Result<CustodyReceipt, CustodyError>;

    /// Move balances out of the custody account as one all-or-nothing call.
    fn batch_transfer(&self, ops: &[TransferOp]) -> Result<CustodyReceipt, CustodyError>;

    /// Undo an open operation.
    ///
    /// Used when a later step of the same unit of work fails.
    ///
    /// # Errors
    ///
    /// `RollbackFailed` when the receipt is not open or cannot be reverted.
    fn rollback(&self, receipt: CustodyReceipt) -> Result<(), CustodyError>;

    /// Close an operation once its unit of work has committed. A released
    /// receipt can no longer be rolled back.
    fn release(&self, receipt: CustodyReceipt);
}

// =============================================================================
// CALLBACK TARGET
// =============================================================================

/// Receiver of claimed funds that is invoked after settlement.
///
/// Returning an error aborts the whole claim, custody transfer included.
pub trait DistributorCallback {
    /// Address the claimed funds are credited to.
    fn callback_address(&self) -> Address;

    /// Opaque post-claim hook.
    fn distributor_callback(&self, data: &[u8]) -> Result<(), CallbackError>;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Destination of committed ledger events.
pub trait EventSink: Send + Sync {
    /// Publish one event, returning how many receivers saw it.
    fn publish(&self, event: DistributionEvent) -> usize;

    /// Total events published so far.
    fn events_published(&self) -> u64;
}
