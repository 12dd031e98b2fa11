//! Node RPC layer - JSON-RPC 2.0 over HTTP POST
//!
//! This module provides:
//! - Request envelope and endpoint types
//! - RpcTransport trait for swapping the wire implementation in tests
//! - HttpRpcClient backed by reqwest
//! - `call`, a single bounded request with result-envelope validation

pub mod client;
pub mod types;

pub use client::{HttpRpcClient, RpcTransport, call};
pub use types::{NodeEndpoint, RpcError, RpcRequest};
