//! # Concurrency
//!
//! Many threads against one distributor. The global lock must serialize
//! entry points so exactly-once and solvency hold under contention.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use distribution_ledger::prelude::*;

    use crate::fixtures::{addr, allocations, claim_line, total, Deployment};

    const THREADS: usize = 8;

    fn rewarder() -> Address {
        addr(0x80)
    }

    fn token() -> Address {
        addr(0x70)
    }

    #[test]
    fn test_parallel_disjoint_claims_drain_pool() {
        let d = Deployment::recording();
        let allocs = allocations(64);
        let tree = MerkleTree::from_allocations(&allocs);
        d.fund_and_seed(rewarder(), token(), 0, tree.root(), total(&allocs))
            .unwrap();

        let tree = Arc::new(tree);
        let allocs = Arc::new(allocs);
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let distributor = d.distributor.clone();
                let tree = tree.clone();
                let allocs = allocs.clone();
                thread::spawn(move || {
                    for i in (t..allocs.len()).step_by(THREADS) {
                        let recipient = allocs[i].0;
                        let line = claim_line(&tree, &allocs, i, 0, rewarder(), 0);
                        distributor
                            .claim(recipient, recipient, &[line], &[token()])
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            d.distributor.remaining_balance(token(), rewarder()),
            U256::zero()
        );
        assert_eq!(d.custody.held_balance(token()), U256::zero());
        assert_eq!(d.distributor.stats().claims_settled, 64);
        assert_eq!(d.custody.open_receipts(), 0);
    }

    #[test]
    fn test_racing_double_claim_pays_once() {
        let d = Deployment::recording();
        let allocs = allocations(4);
        let tree = MerkleTree::from_allocations(&allocs);
        // over-funded so only the claimed flag can stop a second payout
        d.fund_and_seed(rewarder(), token(), 0, tree.root(), U256::from(1_000_000u64))
            .unwrap();

        let lp = allocs[2].0;
        let line = claim_line(&tree, &allocs, 2, 0, rewarder(), 0);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let distributor = d.distributor.clone();
                let line = line.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    distributor.claim(lp, lp, &[line], &[token()])
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let paid = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(paid, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DistributorError::AlreadyClaimed { .. })));
        assert_eq!(d.custody.external_balance(lp, token()), allocs[2].1);
    }

    #[test]
    fn test_racing_seeds_register_once() {
        let d = Deployment::recording();
        let root = Hash::new([0x42; 32]);
        d.custody
            .mint_external(rewarder(), token(), U256::from(10_000u64));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let distributor = d.distributor.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    distributor.seed_allocations(rewarder(), token(), 0, root, U256::from(100u64))
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            d.distributor.remaining_balance(token(), rewarder()),
            U256::from(100u64)
        );
        // refused seeds got their deposit back
        assert_eq!(d.custody.held_balance(token()), U256::from(100u64));
        assert_eq!(
            d.custody.external_balance(rewarder(), token()),
            U256::from(9_900u64)
        );
    }
}
