//! Deterministic entity builders shared by unit tests.

use crate::models::{
    Block, BlockHeader, HexBytes, Note, Operation, OperationContent, OperationProof,
    ProofOfLeadership, Transaction,
};

fn tagged_hash(tag: u8, a: i64, b: i64) -> HexBytes {
    let mut bytes = vec![0u8; 32];
    bytes[0] = tag;
    bytes[1..9].copy_from_slice(&a.to_be_bytes());
    bytes[9..17].copy_from_slice(&b.to_be_bytes());
    HexBytes::new(bytes)
}

/// A block at `slot` with `tx_count` owned transactions. Deterministic:
/// calling this twice with the same slot produces identical hashes.
pub fn block_at_slot(slot: i64, tx_count: usize) -> Block {
    let transactions = (0..tx_count)
        .map(|i| transaction_in_slot(slot, i as i64))
        .collect();
    Block {
        id: 0,
        slot,
        hash: tagged_hash(1, slot, 0),
        parent_hash: tagged_hash(1, slot - 1, 0),
        header: BlockHeader {
            block_root: tagged_hash(2, slot, 0),
            proof_of_leadership: ProofOfLeadership::Groth16 {
                entropy_contribution: tagged_hash(3, slot, 0),
                leader_key: tagged_hash(4, slot, 0),
                proof: tagged_hash(5, slot, 0),
                public: None,
                voucher_cm: tagged_hash(6, slot, 0),
            },
        },
        transactions,
    }
}

pub fn transaction_in_slot(slot: i64, index: i64) -> Transaction {
    Transaction {
        id: 0,
        block_id: 0,
        hash: tagged_hash(7, slot, index),
        operations: vec![Operation {
            content: OperationContent::LeaderClaim {
                rewards_root: tagged_hash(8, slot, index),
                voucher_nullifier: tagged_hash(9, slot, index),
                mantle_tx_hash: tagged_hash(10, slot, index),
            },
            proof: OperationProof::Ed25519 {
                signature: tagged_hash(11, slot, index),
            },
        }],
        inputs: vec![tagged_hash(12, slot, index)],
        outputs: vec![Note {
            value: 100 + index,
            public_key: tagged_hash(13, slot, index),
        }],
        proof: HexBytes::new(vec![0x1f; 128]),
        execution_gas_price: 10,
        storage_gas_price: 20,
    }
}
