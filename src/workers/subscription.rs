//! Live ingestion: tail the node's block feed into the store.

use std::sync::Arc;
use std::time::Duration;

use crate::node::{BlockFeed, NodeApi, NodeError};
use crate::repository::BlockRepository;
use crate::shutdown::ShutdownToken;
use crate::workers::{ExponentialBackoff, WorkerError, WorkerHealth};

const SUBSCRIBE_INITIAL_DELAY: Duration = Duration::from_secs(1);
const SUBSCRIBE_MAX_DELAY: Duration = Duration::from_secs(30);
const SUBSCRIBE_MAX_RETRIES: u32 = 10;

/// Run the subscription worker until the feed terminates or shutdown fires.
///
/// Re-delivered blocks are swallowed by the repository, so a node replaying
/// recent history on reconnect is harmless. A terminated feed is fatal; the
/// caller decides whether to restart the process.
pub async fn run(
    api: Arc<dyn NodeApi>,
    repository: BlockRepository,
    health: Arc<WorkerHealth>,
    mut shutdown: ShutdownToken,
) -> Result<(), WorkerError> {
    let mut feed = match subscribe(api.as_ref(), &mut shutdown).await {
        Ok(Some(feed)) => feed,
        Ok(None) => return Ok(()),
        Err(e) => return Err(e),
    };

    health.set_subscription_live(true);
    log::info!("🔌 Subscribed to live block feed");

    let result = drain(feed.as_mut(), &repository, &mut shutdown).await;

    feed.close().await;
    health.set_subscription_live(false);
    result
}

/// Open the feed, retrying transient failures, bailing out on shutdown.
async fn subscribe(
    api: &dyn NodeApi,
    shutdown: &mut ShutdownToken,
) -> Result<Option<Box<dyn BlockFeed>>, WorkerError> {
    let mut backoff = ExponentialBackoff::new(
        SUBSCRIBE_INITIAL_DELAY,
        SUBSCRIBE_MAX_DELAY,
        SUBSCRIBE_MAX_RETRIES,
    );
    loop {
        let attempt = tokio::select! {
            _ = shutdown.cancelled() => return Ok(None),
            attempt = api.subscribe_blocks() => attempt,
        };
        match attempt {
            Ok(feed) => return Ok(Some(feed)),
            Err(NodeError::Transient(msg)) => {
                log::warn!("Subscribe failed: {}", msg);
                if backoff.sleep().await.is_err() {
                    return Err(WorkerError::RetriesExhausted);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn drain(
    feed: &mut dyn BlockFeed,
    repository: &BlockRepository,
    shutdown: &mut ShutdownToken,
) -> Result<(), WorkerError> {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("Subscription worker shutting down");
                return Ok(());
            }
            next = feed.next_block() => next,
        };
        match next {
            Ok(block) => {
                let slot = block.slot;
                match repository.create(std::slice::from_ref(&block)) {
                    Ok(0) => log::debug!("Block at slot {} already stored", slot),
                    Ok(_) => log::debug!(
                        "Stored block at slot {} ({} transactions)",
                        slot,
                        block.transactions.len()
                    ),
                    // Keep tailing; the backfill pass will recover the slot.
                    Err(e) => log::error!("Failed to store block at slot {}: {}", slot, e),
                }
            }
            Err(NodeError::Transient(msg)) => log::warn!("Feed hiccup: {}", msg),
            Err(NodeError::Decode(msg)) => log::warn!("Skipping undecodable block: {}", msg),
            Err(NodeError::Terminated) => {
                log::error!("Live block feed terminated");
                return Err(WorkerError::StreamTerminated);
            }
        }
    }
}
