//! Historical ingestion: close the gap between the earliest stored block and
//! genesis.
//!
//! The live subscription starts mid-chain, so the store has at most one gap:
//! from genesis up to the earliest stored block. This worker waits for the
//! subscription to land a first block, then walks slot ranges downward in
//! batches until slot 0 is covered. Batches are fetched with retries and
//! inserted through the conflict-swallowing repository, so a crashed run can
//! simply start over.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::node::{NodeApi, NodeError};
use crate::repository::BlockRepository;
use crate::shutdown::ShutdownToken;
use crate::workers::{ExponentialBackoff, WorkerError, WorkerHealth};

const FETCH_INITIAL_DELAY: Duration = Duration::from_secs(1);
const FETCH_MAX_DELAY: Duration = Duration::from_secs(30);
const FETCH_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Slots per historical batch request.
    pub batch_size: i64,
    /// How often to re-check an empty store for the first live block.
    pub poll_interval: Duration,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            poll_interval: Duration::from_secs(3),
        }
    }
}

/// Run the backfill worker to completion (or shutdown).
pub async fn run(
    api: Arc<dyn NodeApi>,
    repository: BlockRepository,
    config: BackfillConfig,
    health: Arc<WorkerHealth>,
    mut shutdown: ShutdownToken,
) -> Result<(), WorkerError> {
    log::info!("Checking for block gaps to backfill...");

    let earliest = match wait_for_earliest(&repository, &config, &mut shutdown).await? {
        Some(block) => block,
        None => return Ok(()),
    };

    if earliest.slot == 0 {
        log::info!("No blocks to backfill");
        health.set_backfill_complete();
        return Ok(());
    }

    let mut slot_to = earliest.slot - 1;
    log::info!("Backfilling blocks from slot {} down to 0...", slot_to);

    loop {
        if shutdown.is_cancelled() {
            log::info!("Backfill worker shutting down");
            return Ok(());
        }

        let slot_from = (slot_to - config.batch_size + 1).max(0);
        let span = slot_to - slot_from + 1;

        // One block per slot: a fully populated range needs no refetch.
        if repository.count_in_slot_range(slot_from, slot_to)? == span {
            log::debug!("Slots {}..={} already filled, skipping", slot_from, slot_to);
        } else {
            let blocks = match fetch_batch(api.as_ref(), slot_from, slot_to).await {
                Ok(blocks) => blocks,
                Err(e) => {
                    log::error!("Backfill giving up on slots {}..={}: {}", slot_from, slot_to, e);
                    health.set_backfill_failed();
                    return Err(e);
                }
            };
            let inserted = repository.create(&blocks)?;
            log::debug!(
                "Backfilled slots {}..={} ({} new blocks)",
                slot_from,
                slot_to,
                inserted
            );
        }

        if slot_from == 0 {
            break;
        }
        slot_to = slot_from - 1;
    }

    health.set_backfill_complete();
    log::info!("✅ Backfilling blocks completed");
    Ok(())
}

/// Poll until the subscription stores a first block. Returns `None` on
/// shutdown.
async fn wait_for_earliest(
    repository: &BlockRepository,
    config: &BackfillConfig,
    shutdown: &mut ShutdownToken,
) -> Result<Option<crate::models::Block>, WorkerError> {
    loop {
        if let Some(block) = repository.get_earliest()? {
            return Ok(Some(block));
        }
        log::debug!("No blocks in the store yet, waiting...");
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(None),
            _ = sleep(config.poll_interval) => {}
        }
    }
}

async fn fetch_batch(
    api: &dyn NodeApi,
    slot_from: i64,
    slot_to: i64,
) -> Result<Vec<crate::models::Block>, WorkerError> {
    let mut backoff =
        ExponentialBackoff::new(FETCH_INITIAL_DELAY, FETCH_MAX_DELAY, FETCH_MAX_RETRIES);
    loop {
        match api.get_blocks(slot_from, slot_to).await {
            Ok(blocks) => return Ok(blocks),
            Err(NodeError::Transient(msg)) => {
                log::warn!("Fetching slots {}..={} failed: {}", slot_from, slot_to, msg);
                if backoff.sleep().await.is_err() {
                    return Err(WorkerError::RetriesExhausted);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}
