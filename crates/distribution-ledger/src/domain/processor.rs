//! # Claim Processor
//!
//! Validates a batch of claim lines against the ledger and the Merkle
//! verifier, settles them inside the caller's [`LedgerTransaction`] and
//! produces the single batched custody transfer that pays them out.
//!
//! The processor performs no I/O. Executing the transfer, and discarding
//! the transaction when it fails, is up to the caller.
//!
//! ## Per-line order
//!
//! 1. resolve `tokens[token_index]` (`IndexOutOfRange`)
//! 2. `AlreadyClaimed`
//! 3. proof against the stored root, leaf built from the liquidity provider
//!    (`InvalidProof`; a missing root rejects every proof)
//! 4. `InsufficientSupply` against the pooled balance
//! 5. settle through the ledger
//! 6. aggregate into `amounts[token_index]`
//! 7. stage one `RewardPaid` event

use std::collections::HashMap;

use tracing::trace;

use super::entities::{
    ClaimReceipt, ClaimRequest, DistributionKey, PayoutDestination, PoolKey, TransferMode,
    TransferOp,
};
use super::invariants::{check_batch_invariants, InvariantCheckResult, PoolMovement};
use super::ledger::LedgerTransaction;
use super::merkle;
use super::value_objects::{Address, Hash, U256};
use crate::config::DistributorConfig;
use crate::errors::DistributorError;
use crate::events::DistributionEvent;

/// One batch of claim lines submitted by a liquidity provider.
#[derive(Debug, Clone, Copy)]
pub struct ClaimBatch<'a> {
    /// Whose leaves are being claimed.
    pub liquidity_provider: Address,
    /// Who receives the payout.
    pub payout_recipient: Address,
    pub claims: &'a [ClaimRequest],
    pub tokens: &'a [Address],
    pub destination: PayoutDestination,
}

/// Output of a successfully processed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedBatch {
    /// The one custody call that pays the batch out.
    pub transfers: Vec<TransferOp>,
    pub receipt: ClaimReceipt,
}

/// Decide whether `claimer` may claim `balance` from a distribution.
///
/// False when no root is registered or the proof exceeds `max_depth`.
#[must_use]
pub fn claim_proof_valid(
    root: Option<Hash>,
    claimer: Address,
    balance: U256,
    proof: &[Hash],
    max_depth: usize,
) -> bool {
    match root {
        Some(root) if proof.len() <= max_depth => {
            merkle::verify(proof, root, merkle::encode_leaf(claimer, balance))
        }
        _ => false,
    }
}

/// Process a claim batch inside `tx`.
///
/// On error the transaction holds partial writes and must be dropped.
pub fn process_claims(
    tx: &mut LedgerTransaction<'_>,
    batch: &ClaimBatch<'_>,
    config: &DistributorConfig,
) -> Result<ProcessedBatch, DistributorError> {
    if batch.claims.len() > config.max_claims_per_batch {
        return Err(DistributorError::BatchTooLarge {
            size: batch.claims.len(),
            max: config.max_claims_per_batch,
        });
    }

    let mut amounts = vec![U256::zero(); batch.tokens.len()];
    let mut movements: HashMap<PoolKey, PoolMovement> = HashMap::new();

    for claim in batch.claims {
        let token = *batch
            .tokens
            .get(claim.token_index)
            .ok_or(DistributorError::IndexOutOfRange {
                index: claim.token_index,
                len: batch.tokens.len(),
            })?;

        let key = DistributionKey::new(token, claim.rewarder, claim.distribution_id);
        let claim_key = key.claim(batch.liquidity_provider);

        if tx.is_claimed(&claim_key) {
            return Err(DistributorError::AlreadyClaimed {
                distribution_id: claim.distribution_id,
                recipient: batch.liquidity_provider,
            });
        }

        if !claim_proof_valid(
            tx.root(&key),
            batch.liquidity_provider,
            claim.balance,
            &claim.merkle_proof,
            config.max_proof_depth,
        ) {
            return Err(DistributorError::InvalidProof {
                distribution_id: claim.distribution_id,
            });
        }

        let pool = key.pool();
        let available = tx.supplied_balance(&pool);
        if available < claim.balance {
            return Err(DistributorError::InsufficientSupply {
                required: claim.balance,
                available,
            });
        }

        tx.settle_claim(claim_key, claim.balance)?;

        let movement = movements
            .entry(pool)
            .or_insert_with(|| PoolMovement::new(pool, available));
        movement.settled = movement
            .settled
            .checked_add(claim.balance)
            .ok_or(DistributorError::ArithmeticOverflow)?;
        movement.after = tx.supplied_balance(&pool);

        let slot = &mut amounts[claim.token_index];
        *slot = slot
            .checked_add(claim.balance)
            .ok_or(DistributorError::ArithmeticOverflow)?;

        tx.emit(DistributionEvent::RewardPaid {
            recipient: batch.payout_recipient,
            token,
            amount: claim.balance,
        });

        trace!(
            distribution_id = claim.distribution_id,
            token = %token,
            amount = %claim.balance,
            "Claim line settled"
        );
    }

    let mode = TransferMode::from(batch.destination);
    let transfers: Vec<TransferOp> = batch
        .tokens
        .iter()
        .zip(&amounts)
        .map(|(token, amount)| TransferOp {
            token: *token,
            amount: *amount,
            destination: batch.payout_recipient,
            mode,
        })
        .collect();

    if let InvariantCheckResult::Invalid(violations) =
        check_batch_invariants(movements.values(), batch.claims, batch.tokens, &transfers)
    {
        let details = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(DistributorError::InvariantViolation(details));
    }

    Ok(ProcessedBatch {
        transfers,
        receipt: ClaimReceipt {
            payout_recipient: batch.payout_recipient,
            tokens: batch.tokens.to_vec(),
            amounts,
            claims_settled: batch.claims.len(),
        },
    })
}

// =============================================================================
// TESTS
// =============================================================================
