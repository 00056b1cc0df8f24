//! # Test Fixtures
//!
//! A wired distributor over in-memory custody, plus allocation helpers
//! shared by the integration tests and the benchmarks.

use std::sync::Arc;

use distribution_ledger::prelude::*;

/// Distributor wired to in-memory adapters.
pub struct Deployment<E: EventSink> {
    pub distributor: Arc<DistributorService<InMemoryCustody, E>>,
    pub custody: Arc<InMemoryCustody>,
    pub sink: Arc<E>,
}

impl<E: EventSink> Deployment<E> {
    /// Wire a distributor with the given sink and config.
    pub fn with_sink(sink: Arc<E>, config: DistributorConfig) -> Self {
        let custody = Arc::new(InMemoryCustody::new(custody_account()));
        let distributor = Arc::new(DistributorService::new(
            custody.clone(),
            sink.clone(),
            config,
        ));
        Self {
            distributor,
            custody,
            sink,
        }
    }

    /// Mint `amount` for `rewarder` and seed distribution `id` with it.
    pub fn fund_and_seed(
        &self,
        rewarder: Address,
        token: Address,
        id: DistributionId,
        root: Hash,
        amount: U256,
    ) -> Result<(), DistributorError> {
        self.custody.mint_external(rewarder, token, amount);
        self.distributor
            .seed_allocations(rewarder, token, id, root, amount)
    }
}

impl Deployment<InMemoryEventLog> {
    /// Distributor recording events in memory, default limits.
    pub fn recording() -> Self {
        Self::with_sink(Arc::new(InMemoryEventLog::new()), DistributorConfig::default())
    }
}

/// The distributor's custody account.
pub fn custody_account() -> Address {
    Address::new([0xDD; 20])
}

/// Address whose every byte is `byte`.
pub fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

/// `n` distinct recipients with increasing amounts.
pub fn allocations(n: usize) -> Vec<(Address, U256)> {
    (0..n)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[..8].copy_from_slice(&(i as u64 + 1).to_be_bytes());
            (Address::new(bytes), U256::from(100 + i as u64))
        })
        .collect()
}

/// Sum of allocation amounts.
pub fn total(allocations: &[(Address, U256)]) -> U256 {
    allocations
        .iter()
        .fold(U256::zero(), |acc, (_, amount)| acc + *amount)
}

/// Claim line for leaf `index` of `tree`.
pub fn claim_line(
    tree: &MerkleTree,
    allocations: &[(Address, U256)],
    index: usize,
    distribution_id: DistributionId,
    rewarder: Address,
    token_index: usize,
) -> ClaimRequest {
    ClaimRequest {
        distribution_id,
        balance: allocations[index].1,
        rewarder,
        token_index,
        merkle_proof: tree.proof(index).unwrap_or_default(),
    }
}
