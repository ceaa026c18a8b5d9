use serde::{Deserialize, Serialize};

use crate::models::hex_bytes::HexBytes;
use crate::models::transaction::Transaction;

/// A ledger block as persisted and streamed.
///
/// `id` is the store-assigned surrogate key (ordering tie-break); it is 0 on a
/// freshly decoded block and filled in by every store read. Blocks are
/// immutable once inserted and own their transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: i64,
    pub slot: i64,
    pub hash: HexBytes,
    pub parent_hash: HexBytes,
    pub header: BlockHeader,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Structured header payload stored as a JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub block_root: HexBytes,
    pub proof_of_leadership: ProofOfLeadership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProofOfLeadership {
    #[serde(rename = "GROTH16")]
    Groth16 {
        entropy_contribution: HexBytes,
        leader_key: HexBytes,
        proof: HexBytes,
        public: Option<LeaderPublic>,
        voucher_cm: HexBytes,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderPublic {
    pub aged_root: HexBytes,
    pub epoch_nonce: HexBytes,
    pub latest_root: HexBytes,
    pub slot: i64,
    pub total_stake: i64,
}
