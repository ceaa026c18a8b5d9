//! Locally generated node: random blocks on a fixed cadence, no network.
//!
//! Lets the indexer run end to end without a real node. The feed starts at a
//! configurable slot above genesis so the backfill worker has history to
//! fetch.

use async_trait::async_trait;
use rand::{thread_rng, Rng};
use tokio::time::sleep;

use std::time::Duration;

use crate::models::{
    Block, BlockHeader, HexBytes, Note, Operation, OperationContent, OperationProof,
    ProofOfLeadership, Transaction,
};
use crate::node::{BlockFeed, NodeApi, NodeError};

pub struct FakeNodeApi {
    start_slot: i64,
    block_interval: Duration,
}

impl FakeNodeApi {
    pub fn new(start_slot: i64, block_interval: Duration) -> Self {
        Self {
            start_slot,
            block_interval,
        }
    }
}

#[async_trait]
impl NodeApi for FakeNodeApi {
    async fn get_health(&self) -> Result<bool, NodeError> {
        // Flaky on purpose so callers exercise their unhealthy path.
        Ok(thread_rng().gen::<f64>() >= 0.1)
    }

    async fn get_blocks(&self, slot_from: i64, slot_to: i64) -> Result<Vec<Block>, NodeError> {
        Ok((slot_from..=slot_to).map(random_block).collect())
    }

    async fn subscribe_blocks(&self) -> Result<Box<dyn BlockFeed>, NodeError> {
        Ok(Box::new(FakeBlockFeed {
            next_slot: self.start_slot,
            block_interval: self.block_interval,
        }))
    }
}

struct FakeBlockFeed {
    next_slot: i64,
    block_interval: Duration,
}

#[async_trait]
impl BlockFeed for FakeBlockFeed {
    async fn next_block(&mut self) -> Result<Block, NodeError> {
        sleep(self.block_interval).await;
        let block = random_block(self.next_slot);
        self.next_slot += 1;
        Ok(block)
    }

    async fn close(&mut self) {}
}

fn random_bytes(n: usize) -> HexBytes {
    let mut buf = vec![0u8; n];
    thread_rng().fill(&mut buf[..]);
    HexBytes::new(buf)
}

fn random_transaction() -> Transaction {
    Transaction {
        id: 0,
        block_id: 0,
        hash: random_bytes(32),
        operations: vec![Operation {
            content: OperationContent::LeaderClaim {
                rewards_root: random_bytes(8),
                voucher_nullifier: random_bytes(8),
                mantle_tx_hash: random_bytes(8),
            },
            proof: OperationProof::Ed25519 {
                signature: random_bytes(64),
            },
        }],
        inputs: vec![random_bytes(32)],
        outputs: vec![Note {
            value: thread_rng().gen_range(1..100),
            public_key: random_bytes(32),
        }],
        proof: random_bytes(128),
        execution_gas_price: thread_rng().gen_range(1..10_000),
        storage_gas_price: thread_rng().gen_range(1..10_000),
    }
}

/// A syntactically valid block for the given slot with random hashes and one
/// to three random transactions.
pub fn random_block(slot: i64) -> Block {
    let transactions = (0..thread_rng().gen_range(1..=3))
        .map(|_| random_transaction())
        .collect();
    Block {
        id: 0,
        slot,
        hash: random_bytes(32),
        parent_hash: random_bytes(32),
        header: BlockHeader {
            block_root: random_bytes(32),
            proof_of_leadership: ProofOfLeadership::Groth16 {
                entropy_contribution: random_bytes(32),
                leader_key: random_bytes(32),
                proof: random_bytes(128),
                public: None,
                voucher_cm: random_bytes(32),
            },
        },
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_blocks_covers_range() {
        let api = FakeNodeApi::new(5, Duration::from_millis(1));
        let blocks = api.get_blocks(2, 5).await.unwrap();
        let slots: Vec<i64> = blocks.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![2, 3, 4, 5]);
        assert!(blocks.iter().all(|b| !b.transactions.is_empty()));
    }

    #[tokio::test]
    async fn test_feed_starts_at_start_slot() {
        let api = FakeNodeApi::new(5, Duration::from_millis(1));
        let mut feed = api.subscribe_blocks().await.unwrap();
        assert_eq!(feed.next_block().await.unwrap().slot, 5);
        assert_eq!(feed.next_block().await.unwrap().slot, 6);
        feed.close().await;
    }
}
