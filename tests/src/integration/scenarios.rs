//! # End-to-End Scenarios
//!
//! 1. **Scenario A**: Alice and Bob claim a funded distribution, Alice retries
//! 2. **Scenario B**: Bob replays Alice's proof under his own identity
//! 3. **Scenario C**: custody outage on a two-token batch rolls back both lines
//! 4. **Callback flow**: claimed funds credited to a callback target
//! 5. **Multi-distribution batch**: many lines, one custody call

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use distribution_ledger::prelude::*;

    use crate::fixtures::{addr, allocations, claim_line, total, Deployment};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn alice() -> Address {
        addr(0xA1)
    }

    fn bob() -> Address {
        addr(0xB0)
    }

    fn rewarder() -> Address {
        addr(0x80)
    }

    fn token_t() -> Address {
        addr(0x70)
    }

    fn token_u() -> Address {
        addr(0x71)
    }

    fn alice_bob() -> (MerkleTree, ClaimRequest, ClaimRequest) {
        let tree = MerkleTree::from_allocations(&[
            (alice(), U256::from(100u64)),
            (bob(), U256::from(50u64)),
        ]);
        let alice_line = ClaimRequest {
            distribution_id: 0,
            balance: U256::from(100u64),
            rewarder: rewarder(),
            token_index: 0,
            merkle_proof: tree.proof(0).unwrap(),
        };
        let bob_line = ClaimRequest {
            distribution_id: 0,
            balance: U256::from(50u64),
            rewarder: rewarder(),
            token_index: 0,
            merkle_proof: tree.proof(1).unwrap(),
        };
        (tree, alice_line, bob_line)
    }

    // =============================================================================
    // SCENARIO A: HAPPY PATH
    // =============================================================================

    #[test]
    fn test_scenario_a_alice_and_bob_claim() {
        let d = Deployment::recording();
        let (tree, alice_line, bob_line) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        // Alice claims 100
        let receipt = d
            .distributor
            .claim(alice(), alice(), &[alice_line.clone()], &[token_t()])
            .unwrap();
        assert_eq!(receipt.amounts, vec![U256::from(100u64)]);
        assert_eq!(
            d.distributor.remaining_balance(token_t(), rewarder()),
            U256::from(50u64)
        );
        assert_eq!(
            d.custody.external_balance(alice(), token_t()),
            U256::from(100u64)
        );

        // Bob claims 50
        d.distributor
            .claim(bob(), bob(), &[bob_line], &[token_t()])
            .unwrap();
        assert_eq!(
            d.distributor.remaining_balance(token_t(), rewarder()),
            U256::zero()
        );
        assert_eq!(d.custody.external_balance(bob(), token_t()), U256::from(50u64));

        // Alice again
        let err = d
            .distributor
            .claim(alice(), alice(), &[alice_line], &[token_t()])
            .unwrap_err();
        assert_eq!(
            err,
            DistributorError::AlreadyClaimed {
                distribution_id: 0,
                recipient: alice(),
            }
        );

        assert_eq!(
            d.sink.events(),
            vec![
                DistributionEvent::FundsAdded {
                    token: token_t(),
                    amount: U256::from(150u64),
                },
                DistributionEvent::RewardPaid {
                    recipient: alice(),
                    token: token_t(),
                    amount: U256::from(100u64),
                },
                DistributionEvent::RewardPaid {
                    recipient: bob(),
                    token: token_t(),
                    amount: U256::from(50u64),
                },
            ]
        );
        assert_eq!(d.custody.open_receipts(), 0);
    }

    // =============================================================================
    // SCENARIO B: STOLEN PROOF
    // =============================================================================

    #[test]
    fn test_scenario_b_stolen_proof() {
        let d = Deployment::recording();
        let (tree, alice_line, _) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        let err = d
            .distributor
            .claim(bob(), bob(), &[alice_line], &[token_t()])
            .unwrap_err();

        assert_eq!(err, DistributorError::InvalidProof { distribution_id: 0 });
        assert_eq!(
            d.distributor.remaining_balance(token_t(), rewarder()),
            U256::from(150u64)
        );
        assert!(!d.distributor.is_claimed(token_t(), rewarder(), 0, bob()));
        assert!(!d.distributor.is_claimed(token_t(), rewarder(), 0, alice()));
        assert_eq!(d.custody.transfer_calls(), 0);
        assert_eq!(d.sink.events().len(), 1);
    }

    // =============================================================================
    // SCENARIO C: CUSTODY OUTAGE
    // =============================================================================

    #[test]
    fn test_scenario_c_custody_outage_rolls_back_both_tokens() {
        let d = Deployment::recording();
        let (tree, alice_line, _) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();
        d.fund_and_seed(rewarder(), token_u(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        let lines = [
            alice_line.clone(),
            ClaimRequest {
                token_index: 1,
                ..alice_line
            },
        ];
        let tokens = [token_t(), token_u()];

        d.custody.set_transfers_failing(true);
        let err = d
            .distributor
            .claim(alice(), alice(), &lines, &tokens)
            .unwrap_err();
        assert_eq!(err, DistributorError::CustodyFailure(CustodyError::Unavailable));

        for token in tokens {
            assert!(!d.distributor.is_claimed(token, rewarder(), 0, alice()));
            assert_eq!(
                d.distributor.remaining_balance(token, rewarder()),
                U256::from(150u64)
            );
            assert_eq!(d.custody.external_balance(alice(), token), U256::zero());
        }
        assert!(d.sink.by_topic(topics::REWARD_PAID).is_empty());
        assert_eq!(d.distributor.stats().batches_rolled_back, 1);

        // service recovers; the same batch now goes through
        d.custody.set_transfers_failing(false);
        let receipt = d
            .distributor
            .claim(alice(), alice(), &lines, &tokens)
            .unwrap();
        assert_eq!(receipt.amounts, vec![U256::from(100u64), U256::from(100u64)]);
        assert_eq!(d.custody.transfer_calls(), 2);
        assert_eq!(d.sink.by_topic(topics::REWARD_PAID).len(), 2);
        assert_eq!(d.custody.open_receipts(), 0);
    }

    // =============================================================================
    // CALLBACK FLOW
    // =============================================================================

    /// Callback that records what it saw, optionally refusing.
    struct Vault {
        address: Address,
        refuse: bool,
        calls: RefCell<Vec<Vec<u8>>>,
    }

    impl DistributorCallback for Vault {
        fn callback_address(&self) -> Address {
            self.address
        }

        fn distributor_callback(&self, data: &[u8]) -> Result<(), CallbackError> {
            self.calls.borrow_mut().push(data.to_vec());
            if self.refuse {
                return Err(CallbackError::Rejected("vault paused".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_claim_with_callback_credits_target() {
        let d = Deployment::recording();
        let (tree, alice_line, _) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        let vault = Vault {
            address: addr(0xCB),
            refuse: false,
            calls: RefCell::new(Vec::new()),
        };
        d.distributor
            .claim_with_callback(alice(), alice(), &vault, b"stake", &[alice_line], &[token_t()])
            .unwrap();

        assert_eq!(vault.calls.borrow().len(), 1);
        assert_eq!(
            d.custody.internal_balance(addr(0xCB), token_t()),
            U256::from(100u64)
        );
        assert_eq!(
            d.sink.by_topic(topics::REWARD_PAID),
            vec![DistributionEvent::RewardPaid {
                recipient: addr(0xCB),
                token: token_t(),
                amount: U256::from(100u64),
            }]
        );
    }

    #[test]
    fn test_refusing_callback_undoes_transfer() {
        let d = Deployment::recording();
        let (tree, alice_line, _) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        let vault = Vault {
            address: addr(0xCB),
            refuse: true,
            calls: RefCell::new(Vec::new()),
        };
        let err = d
            .distributor
            .claim_with_callback(alice(), alice(), &vault, b"stake", &[alice_line], &[token_t()])
            .unwrap_err();

        assert!(matches!(
            err,
            DistributorError::CallbackFailure(CallbackError::Rejected(_))
        ));
        // the transfer happened, then was undone
        assert_eq!(d.custody.transfer_calls(), 1);
        assert_eq!(d.custody.internal_balance(addr(0xCB), token_t()), U256::zero());
        assert_eq!(d.custody.held_balance(token_t()), U256::from(150u64));
        assert!(!d.distributor.is_claimed(token_t(), rewarder(), 0, alice()));
    }

    #[test]
    fn test_callback_requires_liquidity_provider() {
        let d = Deployment::recording();
        let (tree, alice_line, _) = alice_bob();
        d.fund_and_seed(rewarder(), token_t(), 0, tree.root(), U256::from(150u64))
            .unwrap();

        let vault = Vault {
            address: addr(0xCB),
            refuse: false,
            calls: RefCell::new(Vec::new()),
        };
        let err = d
            .distributor
            .claim_with_callback(bob(), alice(), &vault, &[], &[alice_line], &[token_t()])
            .unwrap_err();
        assert!(matches!(err, DistributorError::Unauthorized { .. }));
        assert!(vault.calls.borrow().is_empty());
    }

    // =============================================================================
    // MULTI-DISTRIBUTION BATCH
    // =============================================================================

    #[test]
    fn test_large_batch_single_custody_call() {
        let d = Deployment::recording();
        let lp = allocations(1)[0].0;
        let tokens = [token_t(), token_u(), addr(0x72)];

        // 12 distributions over two tokens, each containing the provider
        let mut lines = Vec::new();
        let mut expected = [U256::zero(); 3];
        for id in 0..12u64 {
            let mut allocs = allocations(5);
            allocs[0].1 = U256::from(10 + id);
            let tree = MerkleTree::from_allocations(&allocs);
            let token_index = (id % 2) as usize;
            d.fund_and_seed(rewarder(), tokens[token_index], id, tree.root(), total(&allocs))
                .unwrap();
            lines.push(claim_line(&tree, &allocs, 0, id, rewarder(), token_index));
            expected[token_index] = expected[token_index] + allocs[0].1;
        }

        let receipt = d
            .distributor
            .claim_to_internal_balance(lp, lp, &lines, &tokens)
            .unwrap();

        assert_eq!(receipt.claims_settled, 12);
        assert_eq!(receipt.amounts, expected.to_vec());
        assert_eq!(d.custody.transfer_calls(), 1);
        assert_eq!(d.custody.internal_balance(lp, addr(0x72)), U256::zero());
        assert_eq!(d.sink.by_topic(topics::REWARD_PAID).len(), 12);

        let flags = d
            .distributor
            .claim_status_in_range(token_t(), rewarder(), lp, 0, 11)
            .unwrap();
        // even ids were paid in token T, odd ids in U
        assert_eq!(
            flags,
            (0..12u64).map(|id| id % 2 == 0).collect::<Vec<_>>()
        );
    }
}
