//! Chain state over a node's JSON-RPC interface

use crate::api::rpc::{parse_h256, parse_hex_u64, JsonRpcClient};
use crate::config::RelayConfig;
use crate::error::{ErrorCode, RelayError, RelayResult};
use crate::types::Address;
use crate::{log_debug, log_warn};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ChainFacts, ChainStateSource};

#[derive(Deserialize)]
struct Header {
    number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeVersion {
    spec_version: u32,
    transaction_version: u32,
}

/// Reads chain facts from a node
///
/// Block, runtime and genesis reads are pinned to the best block hash fetched
/// first, so they agree even while the chain advances. The nonce comes from
/// `system_accountNextIndex`, which takes no block and also counts the
/// sender's transactions already in the pool.
pub struct JsonRpcChainState {
    client: JsonRpcClient,
}

impl JsonRpcChainState {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        Ok(Self {
            client: JsonRpcClient::new(url, timeout)?,
        })
    }

    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        Self::new(config.rpc_url.clone(), config.request_timeout())
    }

    fn snapshot(&self, address: &Address) -> RelayResult<ChainFacts> {
        let best: String = self.client.call("chain_getBlockHash", json!([]))?;
        let header: Header = self.client.call("chain_getHeader", json!([best]))?;
        let genesis: String = self.client.call("chain_getBlockHash", json!([0]))?;
        let runtime: RuntimeVersion = self.client.call("state_getRuntimeVersion", json!([best]))?;

        let account_nonce = match self
            .client
            .request::<u64>("system_accountNextIndex", json!([address.to_ss58()]))?
        {
            Ok(nonce) => Some(nonce),
            Err(error) => {
                log_warn!("chain", "Nonce query failed", address = address, reason = error.describe());
                None
            }
        };

        Ok(ChainFacts {
            genesis_hash: parse_h256(&genesis)?,
            spec_version: runtime.spec_version,
            tx_version: runtime.transaction_version,
            block_number: parse_hex_u64(&header.number)?,
            block_hash: parse_h256(&best)?,
            account_nonce,
        })
    }
}

impl ChainStateSource for JsonRpcChainState {
    fn facts(&self, address: &Address) -> RelayResult<ChainFacts> {
        let facts = self.snapshot(address).map_err(|e| match e.code {
            ErrorCode::ChainStateUnavailable => e,
            _ => RelayError::chain_state_unavailable(format!(
                "Cannot read chain state for {} from {}",
                address,
                self.client.url()
            ))
            .with_details(e.to_string()),
        })?;

        log_debug!(
            "chain",
            "Chain facts",
            block = facts.block_number,
            spec_version = facts.spec_version,
            nonce = facts.account_nonce.map(|n| n.to_string()).unwrap_or_else(|| "none".to_string()),
        );
        Ok(facts)
    }
}
