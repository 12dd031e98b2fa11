//! Error types for storewatch
//!
//! Centralized error handling using thiserror. Transport failures carry a
//! structured kind so callers never inspect message text.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::codec::EncodingError;
use crate::rpc::RpcError;

/// Network-level failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The per-call timeout elapsed
    Timeout,
    /// Could not connect to the remote host
    ConnectionFailure,
    /// Anything else the HTTP stack reported
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::ConnectionFailure => write!(f, "connection failure"),
            TransportErrorKind::Other => write!(f, "transport error"),
        }
    }
}

/// A network-level failure for one request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeout after the given budget was exhausted
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("no response within {:.2}s", after.as_secs_f64()),
        )
    }

    /// Classify a reqwest failure by its structured flags
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::ConnectionFailure
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// All error types that can surface from storewatch library calls
#[derive(Debug, Error)]
pub enum WatchError {
    /// Invalid or inconsistent configuration
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Identifier or sequence number could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Node RPC failure
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML config parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for storewatch operations
pub type Result<T> = std::result::Result<T, WatchError>;
