use std::time::Duration;

use tokio::time::sleep;

use crate::models::Transaction;
use crate::repository::{Cursor, DEFAULT_POLL_INTERVAL, POLL_BATCH_LIMIT};
use crate::store::{Store, StoreError};

/// Transaction queries with cursor semantics.
///
/// Transactions are created only as part of their owning block's insert, so
/// there is no `create` here; "latest" and the update stream order through
/// the owning block's `(slot, id)`.
#[derive(Clone)]
pub struct TransactionRepository {
    store: Store,
    poll_interval: Duration,
}

impl TransactionRepository {
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

    pub fn get_latest(&self, limit: usize, ascending: bool) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .get_latest_with_slots(limit, ascending)?
            .into_iter()
            .map(|(_, transaction)| transaction)
            .collect())
    }

    /// Like `get_latest`, but keeps each transaction's owning slot. The
    /// stream composer needs the slot of the last bootstrap entry to derive
    /// its tail cursor.
    pub fn get_latest_with_slots(
        &self,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<(i64, Transaction)>, StoreError> {
        self.store.latest_transactions(limit, ascending)
    }

    pub fn get_earliest(&self) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .store
            .earliest_transaction()?
            .map(|(_, transaction)| transaction))
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        self.store.transaction_by_id(id)
    }

    /// Infinite, cursor-restartable stream of transaction batches ordered by
    /// `(block.slot, block.id, transaction.id)`.
    pub fn updates_stream(&self, cursor: Cursor) -> TransactionUpdates {
        TransactionUpdates {
            store: self.store.clone(),
            cursor,
            poll_interval: self.poll_interval,
        }
    }
}

/// Pull-based tail over the transaction log; see `BlockUpdates`.
pub struct TransactionUpdates {
    store: Store,
    cursor: Cursor,
    poll_interval: Duration,
}

impl TransactionUpdates {
    pub async fn next_batch(&mut self) -> Result<Vec<Transaction>, StoreError> {
        loop {
            let batch =
                self.store
                    .transactions_since(self.cursor.slot, self.cursor.id, POLL_BATCH_LIMIT)?;
            if let Some((slot, last)) = batch.last() {
                self.cursor = Cursor::after(*slot, last.id);
                return Ok(batch
                    .into_iter()
                    .map(|(_, transaction)| transaction)
                    .collect());
            }
            sleep(self.poll_interval).await;
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::block_at_slot;
    use crate::repository::BlockRepository;

    fn repositories() -> (BlockRepository, TransactionRepository) {
        let store = Store::open_in_memory().unwrap();
        (
            BlockRepository::new(store.clone()).with_poll_interval(Duration::from_millis(10)),
            TransactionRepository::new(store).with_poll_interval(Duration::from_millis(10)),
        )
    }

    #[test]
    fn test_latest_follows_block_order() {
        let (blocks, transactions) = repositories();
        blocks
            .create(&[block_at_slot(0, 2), block_at_slot(1, 1), block_at_slot(2, 2)])
            .unwrap();

        let latest = transactions.get_latest_with_slots(3, true).unwrap();
        let slots: Vec<i64> = latest.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![1, 2, 2]);

        let plain = transactions.get_latest(3, true).unwrap();
        assert_eq!(plain.len(), 3);
        assert_eq!(plain[0], latest[0].1);
    }

    #[tokio::test]
    async fn test_updates_stream_spans_blocks() {
        let (blocks, transactions) = repositories();
        blocks
            .create(&[block_at_slot(0, 1), block_at_slot(1, 2)])
            .unwrap();

        let mut stream = transactions.updates_stream(Cursor::GENESIS);
        let first = stream.next_batch().await.unwrap();
        assert_eq!(first.len(), 3);

        blocks.create(&[block_at_slot(2, 2)]).unwrap();
        let second = stream.next_batch().await.unwrap();
        assert_eq!(second.len(), 2);

        // Nothing delivered twice.
        let mut ids: Vec<i64> = first.iter().chain(second.iter()).map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }
}
