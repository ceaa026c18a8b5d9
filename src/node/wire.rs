//! JSON shapes the node speaks on the wire.
//!
//! The node's payloads use short field names (`id`, `mantle_tx`, `ops`,
//! `ledger_tx`, `pk`) and split a transaction into contents and proofs held
//! in parallel lists. These structs mirror that shape exactly and convert
//! into the domain entities, zipping the parallel lists back together.

use serde::Deserialize;

use crate::models::{
    Block, BlockHeader, HexBytes, Note, Operation, OperationContent, OperationProof,
    ProofOfLeadership, Transaction,
};
use crate::node::NodeError;

#[derive(Debug, Deserialize)]
pub struct WireBlock {
    pub header: WireHeader,
    pub transactions: Vec<WireSignedTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct WireHeader {
    #[serde(rename = "id")]
    pub hash: HexBytes,
    pub parent_block: HexBytes,
    pub slot: i64,
    pub block_root: HexBytes,
    pub proof_of_leadership: ProofOfLeadership,
}

#[derive(Debug, Deserialize)]
pub struct WireSignedTransaction {
    #[serde(rename = "mantle_tx")]
    pub transaction: WireTransaction,
    /// One proof per entry in `transaction.operations_contents`, same order.
    #[serde(rename = "ops_proofs")]
    pub operations_proofs: Vec<OperationProof>,
    #[serde(rename = "ledger_tx_proof")]
    pub ledger_transaction_proof: HexBytes,
}

#[derive(Debug, Deserialize)]
pub struct WireTransaction {
    pub hash: HexBytes,
    #[serde(rename = "ops")]
    pub operations_contents: Vec<OperationContent>,
    #[serde(rename = "ledger_tx")]
    pub ledger_transaction: WireLedgerTransaction,
    pub execution_gas_price: i64,
    pub storage_gas_price: i64,
}

#[derive(Debug, Deserialize)]
pub struct WireLedgerTransaction {
    pub inputs: Vec<HexBytes>,
    pub outputs: Vec<WireNote>,
}

#[derive(Debug, Deserialize)]
pub struct WireNote {
    pub value: i64,
    #[serde(rename = "pk")]
    pub public_key: HexBytes,
}

#[derive(Debug, Deserialize)]
pub struct WireHealth {
    pub is_healthy: bool,
}

impl WireBlock {
    pub fn into_block(self) -> Result<Block, NodeError> {
        let transactions = self
            .transactions
            .into_iter()
            .map(WireSignedTransaction::into_transaction)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block {
            id: 0,
            slot: self.header.slot,
            hash: self.header.hash,
            parent_hash: self.header.parent_block,
            header: BlockHeader {
                block_root: self.header.block_root,
                proof_of_leadership: self.header.proof_of_leadership,
            },
            transactions,
        })
    }
}

impl WireSignedTransaction {
    pub fn into_transaction(self) -> Result<Transaction, NodeError> {
        let contents = self.transaction.operations_contents;
        if contents.len() != self.operations_proofs.len() {
            return Err(NodeError::Decode(format!(
                "Operation count ({}) does not match proof count ({})",
                contents.len(),
                self.operations_proofs.len()
            )));
        }
        let operations = contents
            .into_iter()
            .zip(self.operations_proofs)
            .map(|(content, proof)| Operation { content, proof })
            .collect();
        let outputs = self
            .transaction
            .ledger_transaction
            .outputs
            .into_iter()
            .map(|note| Note {
                value: note.value,
                public_key: note.public_key,
            })
            .collect();
        Ok(Transaction {
            id: 0,
            block_id: 0,
            hash: self.transaction.hash,
            operations,
            inputs: self.transaction.ledger_transaction.inputs,
            outputs,
            proof: self.ledger_transaction_proof,
            execution_gas_price: self.transaction.execution_gas_price,
            storage_gas_price: self.transaction.storage_gas_price,
        })
    }
}

/// Decode one NDJSON line from the block stream into a domain block.
pub fn decode_block_line(line: &str) -> Result<Block, NodeError> {
    let wire: WireBlock =
        serde_json::from_str(line).map_err(|e| NodeError::Decode(e.to_string()))?;
    wire.into_block()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block_json(proof_count: usize) -> String {
        let proofs: Vec<String> = (0..proof_count)
            .map(|_| r#"{"type":"Ed25519","signature":"aa"}"#.to_string())
            .collect();
        format!(
            r#"{{
                "header": {{
                    "id": "0b",
                    "parent_block": "0a",
                    "slot": 7,
                    "block_root": "0c",
                    "proof_of_leadership": {{
                        "type": "GROTH16",
                        "entropy_contribution": "01",
                        "leader_key": "02",
                        "proof": "03",
                        "public": null,
                        "voucher_cm": "04"
                    }}
                }},
                "transactions": [{{
                    "mantle_tx": {{
                        "hash": "ff",
                        "ops": [{{
                            "type": "LeaderClaim",
                            "rewards_root": "05",
                            "voucher_nullifier": "06",
                            "mantle_tx_hash": "07"
                        }}],
                        "ledger_tx": {{
                            "inputs": ["08"],
                            "outputs": [{{"value": 42, "pk": "09"}}]
                        }},
                        "execution_gas_price": 3,
                        "storage_gas_price": 4
                    }},
                    "ops_proofs": [{}],
                    "ledger_tx_proof": "1f1f"
                }}]
            }}"#,
            proofs.join(",")
        )
    }

    #[test]
    fn test_decode_block_line() {
        let block = decode_block_line(&sample_block_json(1)).unwrap();
        assert_eq!(block.slot, 7);
        assert_eq!(block.hash.to_string(), "0b");
        assert_eq!(block.transactions.len(), 1);

        let tx = &block.transactions[0];
        assert_eq!(tx.operations.len(), 1);
        assert!(matches!(
            tx.operations[0].proof,
            OperationProof::Ed25519 { .. }
        ));
        assert_eq!(tx.outputs[0].value, 42);
        assert_eq!(tx.outputs[0].public_key.to_string(), "09");
    }

    #[test]
    fn test_proof_arity_mismatch_is_decode_error() {
        let err = decode_block_line(&sample_block_json(2)).unwrap_err();
        assert!(matches!(err, NodeError::Decode(_)));
    }

    #[test]
    fn test_garbage_line_is_decode_error() {
        let err = decode_block_line("not json").unwrap_err();
        assert!(matches!(err, NodeError::Decode(_)));
    }
}
