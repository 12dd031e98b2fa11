//! JSON-RPC wire types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::TransportError;

/// Address of one full node, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeEndpoint(String);

impl NodeEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeEndpoint {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: method.into(),
            params,
        }
    }
}

/// Why a node gave us nothing usable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Network-level failure, including timeouts
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The node answered but the body did not have the expected shape
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RpcError {
    pub fn protocol(message: impl Into<String>) -> Self {
        RpcError::Protocol(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Transport(t) if t.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use serde_json::json;

    #[test]
    fn test_request_envelope() {
        let req = RpcRequest::new("sui_getLatestCheckpointSequenceNumber", json!([]));
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "sui_getLatestCheckpointSequenceNumber",
                "params": []
            })
        );
    }

    #[test]
    fn test_endpoint_serializes_as_string() {
        let ep = NodeEndpoint::new("http://10.0.0.1:9000");
        assert_eq!(serde_json::to_string(&ep).unwrap(), "\"http://10.0.0.1:9000\"");
        assert_eq!(ep.to_string(), "http://10.0.0.1:9000");
    }

    #[test]
    fn test_rpc_error_is_timeout() {
        let timeout: RpcError = TransportError::new(TransportErrorKind::Timeout, "slow").into();
        assert!(timeout.is_timeout());
        assert!(!RpcError::protocol("missing result").is_timeout());
        let refused: RpcError =
            TransportError::new(TransportErrorKind::ConnectionFailure, "refused").into();
        assert!(!refused.is_timeout());
    }
}
