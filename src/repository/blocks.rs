use std::time::Duration;

use tokio::time::sleep;

use crate::models::Block;
use crate::repository::{Cursor, DEFAULT_POLL_INTERVAL, POLL_BATCH_LIMIT};
use crate::store::{Store, StoreError};

/// Block queries with cursor semantics over the entity store.
#[derive(Clone)]
pub struct BlockRepository {
    store: Store,
    poll_interval: Duration,
}

impl BlockRepository {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Persist a batch of blocks (with their owned transactions).
    ///
    /// A conflicting batch is re-inserted block by block so that benign
    /// re-delivery (same hash or slot arriving twice) is swallowed while any
    /// genuinely new rows in the batch still land. Returns how many blocks
    /// were actually inserted.
    pub fn create(&self, blocks: &[Block]) -> Result<usize, StoreError> {
        match self.store.insert_blocks(blocks) {
            Ok(inserted) => Ok(inserted),
            Err(StoreError::Conflict(reason)) => {
                log::debug!(
                    "Block batch conflicted ({}); re-inserting individually",
                    reason
                );
                let mut inserted = 0;
                for block in blocks {
                    match self.store.insert_blocks(std::slice::from_ref(block)) {
                        Ok(n) => inserted += n,
                        Err(StoreError::Conflict(_)) => {
                            log::debug!("Skipping re-delivered block at slot {}", block.slot);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(inserted)
            }
            Err(e) => Err(e),
        }
    }

    pub fn get_latest(&self, limit: usize, ascending: bool) -> Result<Vec<Block>, StoreError> {
        self.store.latest_blocks(limit, ascending)
    }

    pub fn get_earliest(&self) -> Result<Option<Block>, StoreError> {
        self.store.earliest_block()
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<Block>, StoreError> {
        self.store.block_by_id(id)
    }

    pub fn get_in_slot_range(&self, slot_from: i64, slot_to: i64) -> Result<Vec<Block>, StoreError> {
        self.store.blocks_in_slot_range(slot_from, slot_to)
    }

    pub fn count_in_slot_range(&self, slot_from: i64, slot_to: i64) -> Result<i64, StoreError> {
        self.store.count_blocks_in_slot_range(slot_from, slot_to)
    }

    /// Infinite, cursor-restartable stream of block batches at and after
    /// `cursor`, in ascending `(slot, id)` order.
    pub fn updates_stream(&self, cursor: Cursor) -> BlockUpdates {
        BlockUpdates {
            store: self.store.clone(),
            cursor,
            poll_interval: self.poll_interval,
        }
    }
}

/// Pull-based tail over the block log.
///
/// Each `next_batch` call polls the cursor range; an empty poll suspends for
/// the poll interval and retries, so the returned batch is never empty.
/// Storage errors are not retried here; the caller decides whether to abort
/// or restart the stream.
pub struct BlockUpdates {
    store: Store,
    cursor: Cursor,
    poll_interval: Duration,
}

impl BlockUpdates {
    pub async fn next_batch(&mut self) -> Result<Vec<Block>, StoreError> {
        loop {
            let batch =
                self.store
                    .blocks_since(self.cursor.slot, self.cursor.id, POLL_BATCH_LIMIT)?;
            if let Some(last) = batch.last() {
                self.cursor = Cursor::after(last.slot, last.id);
                return Ok(batch);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// The position the next batch will start from.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::block_at_slot;

    fn repository() -> BlockRepository {
        BlockRepository::new(Store::open_in_memory().unwrap())
            .with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_create_is_idempotent() {
        let repo = repository();
        let block = block_at_slot(3, 1);
        assert_eq!(repo.create(std::slice::from_ref(&block)).unwrap(), 1);
        // Re-delivery: swallowed, nothing inserted, no error.
        assert_eq!(repo.create(std::slice::from_ref(&block)).unwrap(), 0);
        assert_eq!(repo.count_in_slot_range(0, 10).unwrap(), 1);
    }

    #[test]
    fn test_create_partial_duplicate_batch() {
        let repo = repository();
        repo.create(&[block_at_slot(0, 0), block_at_slot(1, 0)])
            .unwrap();

        // A batch mixing known and new blocks lands the new ones.
        let batch = vec![block_at_slot(1, 0), block_at_slot(2, 0), block_at_slot(3, 0)];
        assert_eq!(repo.create(&batch).unwrap(), 2);
        assert_eq!(repo.count_in_slot_range(0, 3).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_updates_stream_delivers_exactly_once() {
        let repo = repository();
        repo.create(&[block_at_slot(0, 0), block_at_slot(1, 0)])
            .unwrap();

        let mut stream = repo.updates_stream(Cursor::GENESIS);
        let first = stream.next_batch().await.unwrap();
        let slots: Vec<i64> = first.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![0, 1]);

        // New inserts show up in the next batch, earlier ones never repeat.
        repo.create(&[block_at_slot(2, 0)]).unwrap();
        let second = stream.next_batch().await.unwrap();
        let slots: Vec<i64> = second.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![2]);
    }

    #[tokio::test]
    async fn test_updates_stream_restarts_from_cursor() {
        let repo = repository();
        let blocks: Vec<_> = (0..4).map(|slot| block_at_slot(slot, 0)).collect();
        repo.create(&blocks).unwrap();

        let mut stream = repo.updates_stream(Cursor::GENESIS);
        let batch = stream.next_batch().await.unwrap();
        assert_eq!(batch.len(), 4);
        let resume = stream.cursor();

        // A fresh stream from the recorded cursor sees only what comes after.
        repo.create(&[block_at_slot(4, 0)]).unwrap();
        let mut resumed = repo.updates_stream(resume);
        let batch = resumed.next_batch().await.unwrap();
        let slots: Vec<i64> = batch.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![4]);
    }

    #[tokio::test]
    async fn test_updates_stream_waits_for_data() {
        let repo = repository();
        let mut stream = repo.updates_stream(Cursor::GENESIS);

        let pending = tokio::time::timeout(Duration::from_millis(30), stream.next_batch()).await;
        assert!(pending.is_err(), "empty store must keep the stream pending");

        repo.create(&[block_at_slot(0, 0)]).unwrap();
        let batch = tokio::time::timeout(Duration::from_millis(200), stream.next_batch())
            .await
            .expect("stream should wake up after insert")
            .unwrap();
        assert_eq!(batch[0].slot, 0);
    }
}
