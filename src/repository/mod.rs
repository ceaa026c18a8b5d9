//! Per-entity repositories: point lookups plus cursor-based update streams
//! over the entity store.

mod blocks;
mod transactions;

pub use blocks::{BlockRepository, BlockUpdates};
pub use transactions::{TransactionRepository, TransactionUpdates};

use std::time::Duration;

/// Default sleep between polls when an update stream finds nothing new.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cap on entities returned by a single cursor poll.
pub(crate) const POLL_BATCH_LIMIT: usize = 1000;

/// Position of the next unseen entity in an ordered stream.
///
/// Compares as `(slot, id)`; a cursor only ever moves forward. Re-querying
/// from the same cursor never re-delivers an already-seen entity and never
/// skips one with a sort key at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub slot: i64,
    pub id: i64,
}

impl Cursor {
    /// The lowest possible position: everything in the store is ahead of it.
    pub const GENESIS: Cursor = Cursor { slot: 0, id: 0 };

    /// The position immediately after an entity with the given sort key.
    pub fn after(slot: i64, id: i64) -> Self {
        Cursor { slot, id: id + 1 }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(slot={}, id={})", self.slot, self.id)
    }
}
