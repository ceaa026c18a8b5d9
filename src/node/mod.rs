//! Node API client: live block feed, historical batch fetches and health.
//!
//! The concrete implementation (real HTTP node vs. locally generated fake) is
//! a closed set selected once at startup from configuration.

pub mod fake;
pub mod http;
pub mod manager;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, NodeApiKind};
use crate::models::Block;

#[derive(Debug)]
pub enum NodeError {
    /// Node unreachable or timed out; the calling loop retries.
    Transient(String),
    /// Malformed payload; the offending item is skipped.
    Decode(String),
    /// The live feed ended for good; fatal to the subscription worker.
    Terminated,
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Transient(msg) => write!(f, "Transient node error: {}", msg),
            NodeError::Decode(msg) => write!(f, "Decode error: {}", msg),
            NodeError::Terminated => write!(f, "Node block feed terminated"),
        }
    }
}

impl std::error::Error for NodeError {}

/// Handle on the node's live block feed.
///
/// `next_block` suspends until the node produces the next block. Implementors
/// must release the underlying subscription in `close`; workers call it
/// before finishing so no dangling feed outlives its task.
#[async_trait]
pub trait BlockFeed: Send {
    async fn next_block(&mut self) -> Result<Block, NodeError>;

    async fn close(&mut self);
}

#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn get_health(&self) -> Result<bool, NodeError>;

    /// Historical blocks for the inclusive slot range. Idempotent; the
    /// backfill worker retries it freely.
    async fn get_blocks(&self, slot_from: i64, slot_to: i64) -> Result<Vec<Block>, NodeError>;

    /// Open the live feed of newly produced blocks.
    async fn subscribe_blocks(&self) -> Result<Box<dyn BlockFeed>, NodeError>;
}

pub fn build_node_api(config: &Config) -> Result<Arc<dyn NodeApi>, NodeError> {
    match config.node_api {
        NodeApiKind::Http => Ok(Arc::new(http::HttpNodeApi::new(config)?)),
        NodeApiKind::Fake => Ok(Arc::new(fake::FakeNodeApi::new(
            config.fake_start_slot,
            config.fake_block_interval,
        ))),
    }
}
