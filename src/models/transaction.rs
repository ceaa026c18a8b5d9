use serde::{Deserialize, Serialize};

use crate::models::hex_bytes::HexBytes;

/// A ledger transaction. Belongs to exactly one block via `block_id`; never
/// outlives it (deleting a block cascades).
///
/// Streaming sort key is `(block.slot, block.id, transaction.id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub block_id: i64,
    pub hash: HexBytes,
    pub operations: Vec<Operation>,
    pub inputs: Vec<HexBytes>,
    pub outputs: Vec<Note>,
    pub proof: HexBytes,
    pub execution_gas_price: i64,
    pub storage_gas_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub content: OperationContent,
    pub proof: OperationProof,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationContent {
    ChannelInscribe {
        channel_id: HexBytes,
        inscription: HexBytes,
        parent: HexBytes,
        signer: HexBytes,
    },
    ChannelBlob {
        channel: HexBytes,
        blob: HexBytes,
        blob_size: i64,
        da_storage_gas_price: i64,
        parent: HexBytes,
        signer: HexBytes,
    },
    ChannelSetKeys {
        channel: HexBytes,
        keys: Vec<HexBytes>,
    },
    #[serde(rename = "SDPDeclare")]
    SdpDeclare {
        service_type: SdpServiceType,
        locators: Vec<HexBytes>,
        provider_id: HexBytes,
        zk_id: HexBytes,
        locked_note_id: HexBytes,
    },
    #[serde(rename = "SDPWithdraw")]
    SdpWithdraw {
        declaration_id: HexBytes,
        nonce: HexBytes,
    },
    #[serde(rename = "SDPActive")]
    SdpActive {
        declaration_id: HexBytes,
        nonce: HexBytes,
        metadata: Option<HexBytes>,
    },
    LeaderClaim {
        rewards_root: HexBytes,
        voucher_nullifier: HexBytes,
        mantle_tx_hash: HexBytes,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpServiceType {
    #[serde(rename = "BN")]
    BlendNetwork,
    #[serde(rename = "DA")]
    DataAvailability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationProof {
    Ed25519 {
        signature: HexBytes,
    },
    Zk {
        signature: HexBytes,
    },
    ZkAndEd25519 {
        zk_signature: HexBytes,
        ed25519_signature: HexBytes,
    },
}

/// Ledger note created as a transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub value: i64,
    pub public_key: HexBytes,
}
