mod block;
mod hex_bytes;
mod transaction;

#[cfg(test)]
pub mod test_support;

pub use block::{Block, BlockHeader, LeaderPublic, ProofOfLeadership};
pub use hex_bytes::HexBytes;
pub use transaction::{Note, Operation, OperationContent, OperationProof, SdpServiceType, Transaction};
