//! Ordered block queries. Sort key is `(slot, id)` throughout.

use rusqlite::{params, Connection, Row};

use crate::models::{Block, BlockHeader, HexBytes};
use crate::store::transactions::transactions_for_block;
use crate::store::{Store, StoreError};

const SELECT_COLUMNS: &str = "id, slot, hash, parent_hash, header";

pub(crate) fn hex_column(value: &str) -> Result<HexBytes, StoreError> {
    HexBytes::from_hex(value).map_err(|e| StoreError::Corrupt(format!("bad hex column: {}", e)))
}

struct BlockRow {
    id: i64,
    slot: i64,
    hash: String,
    parent_hash: String,
    header: String,
}

fn block_row(row: &Row<'_>) -> rusqlite::Result<BlockRow> {
    Ok(BlockRow {
        id: row.get(0)?,
        slot: row.get(1)?,
        hash: row.get(2)?,
        parent_hash: row.get(3)?,
        header: row.get(4)?,
    })
}

fn into_block(conn: &Connection, row: BlockRow) -> Result<Block, StoreError> {
    let header: BlockHeader = serde_json::from_str(&row.header)?;
    let transactions = transactions_for_block(conn, row.id)?;
    Ok(Block {
        id: row.id,
        slot: row.slot,
        hash: hex_column(&row.hash)?,
        parent_hash: hex_column(&row.parent_hash)?,
        header,
        transactions,
    })
}

fn query_blocks(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Block>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, block_row)?;
    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }
    raw.into_iter().map(|row| into_block(conn, row)).collect()
}

impl Store {
    /// Insert blocks with their owned transactions in a single transaction.
    ///
    /// A uniqueness violation (hash or slot) rolls the whole batch back and
    /// surfaces as `StoreError::Conflict`; the repositories decide whether
    /// that is benign re-delivery.
    pub fn insert_blocks(&self, blocks: &[Block]) -> Result<usize, StoreError> {
        if blocks.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for block in blocks {
            let header = serde_json::to_string(&block.header)?;
            tx.execute(
                "INSERT INTO blocks (slot, hash, parent_hash, header) VALUES (?1, ?2, ?3, ?4)",
                params![
                    block.slot,
                    block.hash.to_string(),
                    block.parent_hash.to_string(),
                    header
                ],
            )?;
            let block_id = tx.last_insert_rowid();
            for transaction in &block.transactions {
                tx.execute(
                    "INSERT INTO transactions
                     (block_id, hash, operations, inputs, outputs, proof,
                      execution_gas_price, storage_gas_price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        block_id,
                        transaction.hash.to_string(),
                        serde_json::to_string(&transaction.operations)?,
                        serde_json::to_string(&transaction.inputs)?,
                        serde_json::to_string(&transaction.outputs)?,
                        transaction.proof.to_string(),
                        transaction.execution_gas_price,
                        transaction.storage_gas_price,
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(blocks.len())
    }

    /// At most `limit` most-recent blocks by `(slot, id)`, reordered for the
    /// requested output direction. `limit == 0` short-circuits to an empty
    /// result without touching the connection.
    pub fn latest_blocks(&self, limit: usize, ascending: bool) -> Result<Vec<Block>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // Fetch latest, then reorder (the inner select pins which rows are
        // "the latest N" independently of output direction).
        let sql = if ascending {
            format!(
                "SELECT {c} FROM
                   (SELECT {c} FROM blocks ORDER BY slot DESC, id DESC LIMIT ?1)
                 ORDER BY slot ASC, id ASC",
                c = SELECT_COLUMNS
            )
        } else {
            format!(
                "SELECT {c} FROM
                   (SELECT {c} FROM blocks ORDER BY slot DESC, id DESC LIMIT ?1)
                 ORDER BY slot DESC, id DESC",
                c = SELECT_COLUMNS
            )
        };
        let conn = self.lock();
        query_blocks(&conn, &sql, &[&(limit as i64)])
    }

    /// The lowest-sort-key block, if any.
    pub fn earliest_block(&self) -> Result<Option<Block>, StoreError> {
        let sql = format!(
            "SELECT {} FROM blocks ORDER BY slot ASC, id ASC LIMIT 1",
            SELECT_COLUMNS
        );
        let conn = self.lock();
        Ok(query_blocks(&conn, &sql, &[])?.into_iter().next())
    }

    pub fn block_by_id(&self, id: i64) -> Result<Option<Block>, StoreError> {
        let sql = format!("SELECT {} FROM blocks WHERE id = ?1", SELECT_COLUMNS);
        let conn = self.lock();
        Ok(query_blocks(&conn, &sql, &[&id])?.into_iter().next())
    }

    /// Ascending scan of all blocks with sort key `>= (slot_floor, id_floor)`,
    /// capped at `limit`. The cursor-range query behind `updates_stream`.
    pub fn blocks_since(
        &self,
        slot_floor: i64,
        id_floor: i64,
        limit: usize,
    ) -> Result<Vec<Block>, StoreError> {
        let sql = format!(
            "SELECT {} FROM blocks
             WHERE slot > ?1 OR (slot = ?1 AND id >= ?2)
             ORDER BY slot ASC, id ASC
             LIMIT ?3",
            SELECT_COLUMNS
        );
        let conn = self.lock();
        query_blocks(&conn, &sql, &[&slot_floor, &id_floor, &(limit as i64)])
    }

    /// Inclusive ascending slot-range scan.
    pub fn blocks_in_slot_range(
        &self,
        slot_from: i64,
        slot_to: i64,
    ) -> Result<Vec<Block>, StoreError> {
        let sql = format!(
            "SELECT {} FROM blocks
             WHERE slot >= ?1 AND slot <= ?2
             ORDER BY slot ASC, id ASC",
            SELECT_COLUMNS
        );
        let conn = self.lock();
        query_blocks(&conn, &sql, &[&slot_from, &slot_to])
    }

    /// Number of blocks stored in the inclusive slot range.
    pub fn count_blocks_in_slot_range(
        &self,
        slot_from: i64,
        slot_to: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM blocks WHERE slot >= ?1 AND slot <= ?2",
            params![slot_from, slot_to],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
