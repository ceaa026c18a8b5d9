//! Ordered transaction queries.
//!
//! A transaction has no slot of its own; its streaming position is defined
//! through the owning block, so every ordered query here joins `blocks` and
//! sorts by `(block.slot, block.id, transaction.id)`. Join queries return the
//! owning slot alongside each transaction so callers can advance cursors.

use rusqlite::{params, Connection, Row};

use crate::models::Transaction;
use crate::store::blocks::hex_column;
use crate::store::{Store, StoreError};

struct TransactionRow {
    id: i64,
    block_id: i64,
    hash: String,
    operations: String,
    inputs: String,
    outputs: String,
    proof: String,
    execution_gas_price: i64,
    storage_gas_price: i64,
}

fn transaction_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(offset)?,
        block_id: row.get(offset + 1)?,
        hash: row.get(offset + 2)?,
        operations: row.get(offset + 3)?,
        inputs: row.get(offset + 4)?,
        outputs: row.get(offset + 5)?,
        proof: row.get(offset + 6)?,
        execution_gas_price: row.get(offset + 7)?,
        storage_gas_price: row.get(offset + 8)?,
    })
}

fn into_transaction(row: TransactionRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: row.id,
        block_id: row.block_id,
        hash: hex_column(&row.hash)?,
        operations: serde_json::from_str(&row.operations)?,
        inputs: serde_json::from_str(&row.inputs)?,
        outputs: serde_json::from_str(&row.outputs)?,
        proof: hex_column(&row.proof)?,
        execution_gas_price: row.execution_gas_price,
        storage_gas_price: row.storage_gas_price,
    })
}

const TX_COLUMNS: &str = "t.id, t.block_id, t.hash, t.operations, t.inputs, t.outputs, t.proof, \
                          t.execution_gas_price, t.storage_gas_price";

/// Owned transactions of one block, in insertion (id) order.
pub(crate) fn transactions_for_block(
    conn: &Connection,
    block_id: i64,
) -> Result<Vec<Transaction>, StoreError> {
    let sql = format!(
        "SELECT {} FROM transactions t WHERE t.block_id = ?1 ORDER BY t.id ASC",
        TX_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![block_id], |row| transaction_row(row, 0))?;
    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }
    raw.into_iter().map(into_transaction).collect()
}

fn query_slotted(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<(i64, Transaction)>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        let slot: i64 = row.get(0)?;
        Ok((slot, transaction_row(row, 1)?))
    })?;
    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }
    raw.into_iter()
        .map(|(slot, row)| Ok((slot, into_transaction(row)?)))
        .collect()
}

impl Store {
    /// At most `limit` most-recent transactions by `(block.slot, block.id,
    /// transaction.id)`, with each owning slot, reordered for the requested
    /// output direction. `limit == 0` short-circuits without touching the
    /// connection.
    pub fn latest_transactions(
        &self,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<(i64, Transaction)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let direction = if ascending { "ASC" } else { "DESC" };
        let sql = format!(
            "SELECT slot, id, block_id, hash, operations, inputs, outputs, proof,
                    execution_gas_price, storage_gas_price
             FROM (
                 SELECT b.slot AS slot, b.id AS owner_id, {c}
                 FROM transactions t JOIN blocks b ON b.id = t.block_id
                 ORDER BY b.slot DESC, b.id DESC, t.id DESC
                 LIMIT ?1
             )
             ORDER BY slot {d}, owner_id {d}, id {d}",
            c = TX_COLUMNS,
            d = direction
        );
        let conn = self.lock();
        query_slotted(&conn, &sql, &[&(limit as i64)])
    }

    pub fn earliest_transaction(&self) -> Result<Option<(i64, Transaction)>, StoreError> {
        let sql = format!(
            "SELECT b.slot, {} FROM transactions t JOIN blocks b ON b.id = t.block_id
             ORDER BY b.slot ASC, b.id ASC, t.id ASC LIMIT 1",
            TX_COLUMNS
        );
        let conn = self.lock();
        Ok(query_slotted(&conn, &sql, &[])?.into_iter().next())
    }

    pub fn transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        let sql = format!("SELECT {} FROM transactions t WHERE t.id = ?1", TX_COLUMNS);
        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], |row| transaction_row(row, 0))?;
        match rows.next() {
            Some(row) => Ok(Some(into_transaction(row?)?)),
            None => Ok(None),
        }
    }

    /// Ascending scan of all transactions with sort key
    /// `>= (slot_floor, *, id_floor)`, capped at `limit`.
    pub fn transactions_since(
        &self,
        slot_floor: i64,
        id_floor: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Transaction)>, StoreError> {
        let sql = format!(
            "SELECT b.slot, {} FROM transactions t JOIN blocks b ON b.id = t.block_id
             WHERE b.slot > ?1 OR (b.slot = ?1 AND t.id >= ?2)
             ORDER BY b.slot ASC, b.id ASC, t.id ASC
             LIMIT ?3",
            TX_COLUMNS
        );
        let conn = self.lock();
        query_slotted(&conn, &sql, &[&slot_floor, &id_floor, &(limit as i64)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::block_at_slot;
    use crate::models::Block;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        // Slots 0..3 with 2, 1, 3, 1 transactions respectively.
        let blocks: Vec<Block> = [(0, 2), (1, 1), (2, 3), (3, 1)]
            .iter()
            .map(|&(slot, n)| block_at_slot(slot, n))
            .collect();
        store.insert_blocks(&blocks).unwrap();
        store
    }

    #[test]
    fn test_latest_orders_through_owning_block() {
        let store = seeded_store();

        let latest = store.latest_transactions(4, true).unwrap();
        let slots: Vec<i64> = latest.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![2, 2, 2, 3]);
        // Ascending ids within the same block.
        assert!(latest[0].1.id < latest[1].1.id && latest[1].1.id < latest[2].1.id);

        let latest_desc = store.latest_transactions(4, false).unwrap();
        let mut reversed = latest_desc;
        reversed.reverse();
        assert_eq!(reversed, latest);
    }

    #[test]
    fn test_latest_limit_zero() {
        let store = seeded_store();
        assert!(store.latest_transactions(0, true).unwrap().is_empty());
    }

    #[test]
    fn test_earliest_and_by_id() {
        let store = seeded_store();
        let (slot, earliest) = store.earliest_transaction().unwrap().unwrap();
        assert_eq!(slot, 0);

        let by_id = store.transaction_by_id(earliest.id).unwrap().unwrap();
        assert_eq!(by_id, earliest);
        assert!(store.transaction_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn test_transactions_since_cursor() {
        let store = seeded_store();
        let all = store.transactions_since(0, 0, 100).unwrap();
        assert_eq!(all.len(), 7);

        // Floor just past the last slot-2 transaction: only slot 3 remains.
        let last_slot2 = all
            .iter()
            .filter(|(slot, _)| *slot == 2)
            .last()
            .unwrap()
            .1
            .id;
        let tail = store.transactions_since(2, last_slot2 + 1, 100).unwrap();
        let slots: Vec<i64> = tail.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![3]);
    }

    #[test]
    fn test_block_delete_cascades() {
        let store = seeded_store();
        let earliest = store.earliest_block().unwrap().unwrap();
        {
            let conn = store.lock();
            conn.execute("DELETE FROM blocks WHERE id = ?1", params![earliest.id])
                .unwrap();
        }
        // The owned transactions went with the block.
        let remaining = store.transactions_since(0, 0, 100).unwrap();
        assert_eq!(remaining.len(), 5);
        assert!(remaining.iter().all(|(slot, _)| *slot != 0));
    }
}
