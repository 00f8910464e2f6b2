//! Node API
//!
//! Transport to Substrate nodes.

pub mod rpc;

pub use rpc::{JsonRpcClient, RpcErrorObject};
