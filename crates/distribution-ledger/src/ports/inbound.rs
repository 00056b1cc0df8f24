//! # Driving Ports (API - Inbound)
//!
//! Public surface of the distributor. Every mutating call is one
//! all-or-nothing unit of work; every read is side-effect free.

use crate::domain::entities::{ClaimReceipt, ClaimRequest};
use crate::domain::value_objects::{Address, DistributionId, Hash, U256};
use crate::errors::DistributorError;
use crate::ports::outbound::DistributorCallback;

/// Primary API of the reward distributor.
///
/// ## Usage
///
/// ```ignore
/// distributor.seed_allocations(rewarder, token, 0, root, amount)?;
/// let receipt = distributor.claim(alice, alice, &claims, &[token])?;
/// ```
pub trait DistributorApi {
    // -------------------------------------------------------------------------
    // Entry points
    // -------------------------------------------------------------------------

    /// Claim `claims` for `liquidity_provider`, withdrawing to the caller.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller == liquidity_provider`, plus any claim
    /// processing or custody error.
    fn claim(
        &self,
        caller: Address,
        liquidity_provider: Address,
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError>;

    /// As [`claim`](Self::claim), crediting the caller's internal balance.
    fn claim_to_internal_balance(
        &self,
        caller: Address,
        liquidity_provider: Address,
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError>;

    /// Claim into the callback's internal balance, then invoke it with `data`.
    ///
    /// A failing callback rolls back the claim and its custody transfer.
    fn claim_with_callback(
        &self,
        caller: Address,
        liquidity_provider: Address,
        callback: &dyn DistributorCallback,
        data: &[u8],
        claims: &[ClaimRequest],
        tokens: &[Address],
    ) -> Result<ClaimReceipt, DistributorError>;

    /// Fund and register distribution `distribution_id` of `token`, with the
    /// caller as rewarder.
    fn seed_allocations(
        &self,
        caller: Address,
        token: Address,
        distribution_id: DistributionId,
        root: Hash,
        amount: U256,
    ) -> Result<(), DistributorError>;

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Whether `recipient` claimed the distribution.
    fn is_claimed(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
        recipient: Address,
    ) -> bool;

    /// Claimed flags of `recipient` for `begin..=end`.
    fn claim_status_in_range(
        &self,
        token: Address,
        rewarder: Address,
        recipient: Address,
        begin: DistributionId,
        end: DistributionId,
    ) -> Result<Vec<bool>, DistributorError>;

    /// Roots for `begin..=end`, `None` where unregistered.
    fn roots_in_range(
        &self,
        token: Address,
        rewarder: Address,
        begin: DistributionId,
        end: DistributionId,
    ) -> Result<Vec<Option<Hash>>, DistributorError>;

    /// Plain Merkle inclusion check.
    fn verify_proof(&self, proof: &[Hash], root: Hash, leaf: Hash) -> bool;

    /// Whether `claimer` could claim `balance` with `proof` right now,
    /// ignoring the claimed flag and solvency.
    fn verify_claim(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
        claimer: Address,
        balance: U256,
        proof: &[Hash],
    ) -> bool;

    /// Root of one distribution.
    fn distribution_root(
        &self,
        token: Address,
        rewarder: Address,
        distribution_id: DistributionId,
    ) -> Option<Hash>;

    /// Pooled unclaimed balance of `(token, rewarder)`.
    fn remaining_balance(&self, token: Address, rewarder: Address) -> U256;
}
