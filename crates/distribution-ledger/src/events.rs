//! # Event Schema
//!
//! Notifications emitted by the ledger. They fire only after a unit of work
//! commits and are never an error-reporting channel.
//!
//! | Event | Emitted | Granularity |
//! |-------|---------|-------------|
//! | `FundsAdded` | `seed_allocations` | one per seeded distribution |
//! | `RewardPaid` | every claim entry point | one per claim line, not per token |

use crate::domain::value_objects::{Address, U256};
use serde::{Deserialize, Serialize};

/// Ledger notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionEvent {
    /// A rewarder deposited funds backing a new distribution.
    FundsAdded {
        /// Deposited token.
        token: Address,
        /// Deposited amount.
        amount: U256,
    },
    /// A claim line was paid.
    RewardPaid {
        /// Payout recipient (the caller, or the callback target).
        recipient: Address,
        /// Paid token.
        token: Address,
        /// Amount of this single claim line.
        amount: U256,
    },
}

impl DistributionEvent {
    /// Topic this event is published under.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::FundsAdded { .. } => topics::FUNDS_ADDED,
            Self::RewardPaid { .. } => topics::REWARD_PAID,
        }
    }

    /// Token the event concerns.
    #[must_use]
    pub fn token(&self) -> Address {
        match self {
            Self::FundsAdded { token, .. } | Self::RewardPaid { token, .. } => *token,
        }
    }
}

/// Event topics.
pub mod topics {
    /// Funds deposited for a new distribution.
    pub const FUNDS_ADDED: &str = "distribution.funds_added";

    /// One claim line paid out.
    pub const REWARD_PAID: &str = "distribution.reward_paid";
}
