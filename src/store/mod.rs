//! SQLite-backed entity store for blocks and transactions.
//!
//! Thin ordered-query facade: transactional inserts plus the indexed range
//! scans the repositories build their cursor semantics on. Every operation
//! locks the connection for a single short-lived unit of work; no lock is
//! ever held across an await point.

mod blocks;
mod transactions;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint (hash, or one-block-per-slot) was violated.
    Conflict(String),
    Database(rusqlite::Error),
    /// A persisted JSON/hex column failed to decode back into its model.
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "uniqueness constraint violated".to_string()),
                )
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Corrupt(msg) => write!(f, "Corrupt stored data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blocks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slot        INTEGER NOT NULL UNIQUE,
    hash        TEXT NOT NULL UNIQUE,
    parent_hash TEXT NOT NULL,
    header      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id            INTEGER NOT NULL REFERENCES blocks(id) ON DELETE CASCADE,
    hash                TEXT NOT NULL UNIQUE,
    operations          TEXT NOT NULL,
    inputs              TEXT NOT NULL,
    outputs             TEXT NOT NULL,
    proof               TEXT NOT NULL,
    execution_gas_price INTEGER NOT NULL,
    storage_gas_price   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_block_id ON transactions(block_id);
"#;

/// Handle to the SQLite store. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
