//! NDJSON stream composition.
//!
//! A composed stream is a bounded bootstrap (the latest `prefetch_limit`
//! entities, oldest first) followed by the infinite cursor tail starting
//! right after the bootstrap's last entity. Consumers therefore see a
//! contiguous, duplicate-free sequence no matter when they attach. Output is
//! NDJSON: one JSON value per line, and never an empty chunk.

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Block, Transaction};
use crate::repository::{
    BlockRepository, BlockUpdates, Cursor, TransactionRepository, TransactionUpdates,
};
use crate::store::StoreError;

#[derive(Debug)]
pub enum StreamError {
    Store(StoreError),
    Encode(serde_json::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Store(e) => write!(f, "Store error: {}", e),
            StreamError::Encode(e) => write!(f, "NDJSON encoding error: {}", e),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<StoreError> for StreamError {
    fn from(e: StoreError) -> Self {
        StreamError::Store(e)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Encode(e)
    }
}

/// Encode a batch as NDJSON: one JSON value per line.
pub fn into_ndjson<T: Serialize>(items: &[T]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for item in items {
        out.extend_from_slice(serde_json::to_string(item)?.as_bytes());
        out.push(b'\n');
    }
    Ok(out)
}

/// Source of ordered entity batches for a composed stream.
#[async_trait]
pub trait UpdateStream: Send {
    type Item: Serialize + Send;

    async fn next_batch(&mut self) -> Result<Vec<Self::Item>, StoreError>;
}

#[async_trait]
impl UpdateStream for BlockUpdates {
    type Item = Block;

    async fn next_batch(&mut self) -> Result<Vec<Block>, StoreError> {
        BlockUpdates::next_batch(self).await
    }
}

#[async_trait]
impl UpdateStream for TransactionUpdates {
    type Item = Transaction;

    async fn next_batch(&mut self) -> Result<Vec<Transaction>, StoreError> {
        TransactionUpdates::next_batch(self).await
    }
}

/// Bootstrap-then-tail NDJSON stream over one entity kind.
pub struct StreamComposer<S: UpdateStream> {
    bootstrap: Option<Vec<S::Item>>,
    tail: S,
}

impl StreamComposer<BlockUpdates> {
    /// Compose a block stream: up to `prefetch_limit` latest blocks (oldest
    /// first), then every block after them.
    pub fn blocks(
        repository: &BlockRepository,
        prefetch_limit: usize,
    ) -> Result<Self, StoreError> {
        let bootstrap = repository.get_latest(prefetch_limit, true)?;
        let cursor = bootstrap
            .last()
            .map(|block| Cursor::after(block.slot, block.id))
            .unwrap_or(Cursor::GENESIS);
        Ok(Self {
            bootstrap: Some(bootstrap),
            tail: repository.updates_stream(cursor),
        })
    }
}

impl StreamComposer<TransactionUpdates> {
    pub fn transactions(
        repository: &TransactionRepository,
        prefetch_limit: usize,
    ) -> Result<Self, StoreError> {
        let bootstrap = repository.get_latest_with_slots(prefetch_limit, true)?;
        let cursor = bootstrap
            .last()
            .map(|(slot, transaction)| Cursor::after(*slot, transaction.id))
            .unwrap_or(Cursor::GENESIS);
        Ok(Self {
            bootstrap: Some(
                bootstrap
                    .into_iter()
                    .map(|(_, transaction)| transaction)
                    .collect(),
            ),
            tail: repository.updates_stream(cursor),
        })
    }
}

impl<S: UpdateStream> StreamComposer<S> {
    /// The next non-empty NDJSON chunk. Suspends until one is available.
    pub async fn next_chunk(&mut self) -> Result<Vec<u8>, StreamError> {
        loop {
            if let Some(bootstrap) = self.bootstrap.take() {
                if bootstrap.is_empty() {
                    log::debug!("Empty bootstrap, suppressed");
                    continue;
                }
                return Ok(into_ndjson(&bootstrap)?);
            }
            let batch = self.tail.next_batch().await?;
            if batch.is_empty() {
                log::debug!("Empty batch, suppressed");
                continue;
            }
            return Ok(into_ndjson(&batch)?);
        }
    }
}
