//! Background ingestion workers.
//!
//! Two long-running tasks feed the store: the subscription worker tails the
//! node's live block feed, and the backfill worker walks history down to
//! genesis. Both honor the shutdown token and report through `WorkerHealth`.

pub mod backfill;
mod backoff;
pub mod subscription;

pub use backfill::BackfillConfig;
pub use backoff::ExponentialBackoff;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::node::NodeError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum WorkerError {
    /// The live feed ended and will not resume.
    StreamTerminated,
    /// Retries against the node ran out.
    RetriesExhausted,
    Node(NodeError),
    Store(StoreError),
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerError::StreamTerminated => write!(f, "Live block feed terminated"),
            WorkerError::RetriesExhausted => write!(f, "Node retries exhausted"),
            WorkerError::Node(e) => write!(f, "Node error: {}", e),
            WorkerError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<NodeError> for WorkerError {
    fn from(e: NodeError) -> Self {
        WorkerError::Node(e)
    }
}

impl From<StoreError> for WorkerError {
    fn from(e: StoreError) -> Self {
        WorkerError::Store(e)
    }
}

/// Shared worker status flags, readable from any task.
///
/// A halted subscription or a permanently failed backfill must be observable
/// without joining the worker task.
#[derive(Debug, Default)]
pub struct WorkerHealth {
    subscription_live: AtomicBool,
    backfill_complete: AtomicBool,
    backfill_failed: AtomicBool,
}

impl WorkerHealth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscription_live(&self) -> bool {
        self.subscription_live.load(Ordering::Relaxed)
    }

    pub fn backfill_complete(&self) -> bool {
        self.backfill_complete.load(Ordering::Relaxed)
    }

    pub fn backfill_failed(&self) -> bool {
        self.backfill_failed.load(Ordering::Relaxed)
    }

    pub(crate) fn set_subscription_live(&self, live: bool) {
        self.subscription_live.store(live, Ordering::Relaxed);
    }

    pub(crate) fn set_backfill_complete(&self) {
        self.backfill_complete.store(true, Ordering::Relaxed);
    }

    pub(crate) fn set_backfill_failed(&self) {
        self.backfill_failed.store(true, Ordering::Relaxed);
    }
}
