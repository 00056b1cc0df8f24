//! # Event Publication
//!
//! Events reach subscribers through the broadcast sink, only after commit,
//! one `RewardPaid` per claim line.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use distribution_ledger::prelude::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::timeout;

    use crate::fixtures::{addr, allocations, claim_line, total, Deployment};

    fn rewarder() -> Address {
        addr(0x80)
    }

    fn token() -> Address {
        addr(0x70)
    }

    fn broadcasting() -> Deployment<BroadcastEventSink> {
        Deployment::with_sink(
            Arc::new(BroadcastEventSink::with_capacity(64)),
            DistributorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_subscriber_sees_seed_and_claim() {
        let d = broadcasting();
        let mut events = d.sink.subscribe();

        let allocs = allocations(3);
        let tree = MerkleTree::from_allocations(&allocs);
        d.fund_and_seed(rewarder(), token(), 0, tree.root(), total(&allocs))
            .unwrap();

        let lp = allocs[1].0;
        d.distributor
            .claim(lp, lp, &[claim_line(&tree, &allocs, 1, 0, rewarder(), 0)], &[token()])
            .unwrap();

        let first = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.topic(), topics::FUNDS_ADDED);

        let second = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            second,
            DistributionEvent::RewardPaid {
                recipient: lp,
                token: token(),
                amount: allocs[1].1,
            }
        );
        assert_eq!(d.sink.events_published(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_publishes_nothing() {
        let d = broadcasting();
        let allocs = allocations(2);
        let tree = MerkleTree::from_allocations(&allocs);
        d.fund_and_seed(rewarder(), token(), 0, tree.root(), total(&allocs))
            .unwrap();

        let mut events = d.sink.subscribe();
        d.custody.set_transfers_failing(true);

        let lp = allocs[0].0;
        let result = d.distributor.claim(
            lp,
            lp,
            &[claim_line(&tree, &allocs, 0, 0, rewarder(), 0)],
            &[token()],
        );
        assert!(result.is_err());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_event_and_error_payloads_serialize() {
        let event = DistributionEvent::FundsAdded {
            token: token(),
            amount: U256::from(150u64),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DistributionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);

        let err = DistributorError::InvalidRange { begin: 5, end: 3 };
        let payload = DistributorErrorPayload::from(&err);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "InvalidRange");
    }
}
