//! # Domain Entities
//!
//! Composite keys for the three ledger tables, claim requests and the
//! custody transfer instructions a claim batch produces.
//!
//! ## Table keys
//!
//! | Table | Key |
//! |-------|-----|
//! | roots | [`DistributionKey`] `(token, rewarder, distribution_id)` |
//! | claimed flags | [`ClaimKey`] `(token, rewarder, distribution_id, recipient)` |
//! | supplied balance | [`PoolKey`] `(token, rewarder)` |

use serde::{Deserialize, Serialize};

use super::value_objects::{Address, DistributionId, Hash, U256};

/// Key of the pooled supplied balance.
///
/// Every distribution of one rewarder for one token draws from the same pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub token: Address,
    pub rewarder: Address,
}

impl PoolKey {
    #[must_use]
    pub const fn new(token: Address, rewarder: Address) -> Self {
        Self { token, rewarder }
    }

    /// Key of distribution `distribution_id` within this pool.
    #[must_use]
    pub const fn distribution(&self, distribution_id: DistributionId) -> DistributionKey {
        DistributionKey {
            token: self.token,
            rewarder: self.rewarder,
            distribution_id,
        }
    }
}

/// Key of one distribution root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributionKey {
    pub token: Address,
    pub rewarder: Address,
    pub distribution_id: DistributionId,
}

impl DistributionKey {
    #[must_use]
    pub const fn new(token: Address, rewarder: Address, distribution_id: DistributionId) -> Self {
        Self {
            token,
            rewarder,
            distribution_id,
        }
    }

    /// The pool this distribution draws from.
    #[must_use]
    pub const fn pool(&self) -> PoolKey {
        PoolKey::new(self.token, self.rewarder)
    }

    /// Claim-flag key for `recipient` in this distribution.
    #[must_use]
    pub const fn claim(&self, recipient: Address) -> ClaimKey {
        ClaimKey {
            distribution: *self,
            recipient,
        }
    }
}

/// Key of one claimed flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimKey {
    pub distribution: DistributionKey,
    pub recipient: Address,
}

/// One claim line submitted by a caller. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Distribution being claimed from.
    pub distribution_id: DistributionId,
    /// Amount committed in the leaf.
    pub balance: U256,
    /// Rewarder that seeded the distribution.
    pub rewarder: Address,
    /// Position of the token in the batch's token list.
    pub token_index: usize,
    /// Sibling hashes from leaf to root.
    pub merkle_proof: Vec<Hash>,
}

/// Where claimed funds end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutDestination {
    /// Withdraw to the recipient's externally held balance.
    ExternalWithdrawal,
    /// Credit the recipient's internal balance in the custody service.
    InternalCredit,
}

/// Transfer mode understood by the custody service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    WithdrawToExternal,
    CreditInternal,
}

impl From<PayoutDestination> for TransferMode {
    fn from(destination: PayoutDestination) -> Self {
        match destination {
            PayoutDestination::ExternalWithdrawal => Self::WithdrawToExternal,
            PayoutDestination::InternalCredit => Self::CreditInternal,
        }
    }
}

/// One entry of a batched custody transfer, out of the ledger's account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOp {
    pub token: Address,
    pub amount: U256,
    pub destination: Address,
    pub mode: TransferMode,
}

/// Result of a committed claim batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    /// Who received the funds.
    pub payout_recipient: Address,
    /// Tokens of the batch, in caller order.
    pub tokens: Vec<Address>,
    /// Aggregated amount per entry of `tokens`.
    pub amounts: Vec<U256>,
    /// Number of claim lines settled.
    pub claims_settled: usize,
}

impl ClaimReceipt {
    /// Total paid out for `token` in this batch.
    #[must_use]
    pub fn amount_for(&self, token: Address) -> U256 {
        self.tokens
            .iter()
            .zip(&self.amounts)
            .filter(|(t, _)| **t == token)
            .fold(U256::zero(), |acc, (_, amount)| acc.saturating_add(*amount))
    }
}
