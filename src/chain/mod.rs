//! Chain State Source
//!
//! The minimal live facts a signing payload depends on. Facts are fetched fresh
//! for every round and never cached between rounds.

pub mod rpc;

pub use rpc::JsonRpcChainState;

use crate::error::RelayResult;
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Snapshot of chain state taken at a single block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFacts {
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub genesis_hash: H256,
    pub spec_version: u32,
    pub tx_version: u32,
    pub block_number: u64,
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub block_hash: H256,
    /// Next nonce of the queried account, if the node could report it
    pub account_nonce: Option<u64>,
}

/// Source of live chain state
///
/// Implementations must read every field at the same block so the snapshot is
/// consistent. An unreachable source fails with `ChainStateUnavailable`.
pub trait ChainStateSource {
    fn facts(&self, address: &Address) -> RelayResult<ChainFacts>;
}

impl<T: ChainStateSource + ?Sized> ChainStateSource for &T {
    fn facts(&self, address: &Address) -> RelayResult<ChainFacts> {
        (**self).facts(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facts_json_uses_hex_hashes() {
        let facts = ChainFacts {
            genesis_hash: [0xab; 32],
            spec_version: 100,
            tx_version: 1,
            block_number: 100,
            block_hash: [0x01; 32],
            account_nonce: None,
        };
        let json = serde_json::to_value(&facts).unwrap();
        assert_eq!(json["genesis_hash"], format!("0x{}", "ab".repeat(32)));
        assert!(json["account_nonce"].is_null());

        let back: ChainFacts = serde_json::from_value(json).unwrap();
        assert_eq!(back, facts);
    }
}
