//! JSON-RPC Client
//!
//! Blocking JSON-RPC 2.0 over HTTP, shared by the chain state source and the
//! publisher.

use crate::error::{ErrorCode, RelayError, RelayResult};
use crate::log_debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Error object returned by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Message and data joined into one line
    pub fn describe(&self) -> String {
        match &self.data {
            Some(Value::String(data)) => format!("{}: {}", self.message, data),
            Some(Value::Null) | None => self.message.clone(),
            Some(other) => format!("{}: {}", self.message, other),
        }
    }
}

pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| RelayError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a request. Transport failures are the outer error; a JSON-RPC
    /// error object from the node is the inner one.
    pub fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> RelayResult<Result<T, RpcErrorObject>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log_debug!("rpc", "Sending request", method = method, id = id);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&RpcRequest {
                jsonrpc: "2.0",
                method,
                params,
                id,
            })
            .send()?;

        if !response.status().is_success() {
            return Err(RelayError::network(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let reply: RpcResponse = response
            .json()
            .map_err(|e| RelayError::parse_error(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(error) = reply.error {
            return Ok(Err(error));
        }

        let result = reply.result.unwrap_or(Value::Null);
        let value = serde_json::from_value(result)
            .map_err(|e| RelayError::parse_error(format!("Unexpected {} result: {}", method, e)))?;
        Ok(Ok(value))
    }

    /// Like [`request`](Self::request), with node errors folded into
    /// `NetworkError`
    pub fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RelayResult<T> {
        self.request(method, params)?.map_err(|e| {
            RelayError::new(ErrorCode::NetworkError, format!("{} failed", method)).with_details(e.describe())
        })
    }
}

/// Parse a `0x`-prefixed 32-byte hash returned by the node
pub fn parse_h256(value: &str) -> RelayResult<[u8; 32]> {
    let bytes = crate::error::decode_hex(value)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| RelayError::parse_error(format!("Expected 32-byte hash, got {} bytes", b.len())))
}

/// Parse a `0x`-prefixed hex quantity such as a header number
pub fn parse_hex_u64(value: &str) -> RelayResult<u64> {
    let trimmed = value.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).map_err(|e| RelayError::parse_error(format!("Invalid hex number {}: {}", value, e)))
}
