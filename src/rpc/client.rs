//! RPC transport trait and reqwest implementation

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::types::{NodeEndpoint, RpcError, RpcRequest};
use crate::error::{TransportError, TransportErrorKind, WatchError};

/// Sends one JSON-RPC exchange to one node - no retries, no pooling guarantees
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send the request and return the decoded response body as-is
    async fn send(
        &self,
        endpoint: &NodeEndpoint,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<Value, RpcError>;
}

/// JSON-RPC over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpRpcClient {
    client: Client,
}

impl HttpRpcClient {
    pub fn new() -> crate::error::Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| WatchError::Http(format!("Failed to create RPC client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(
        &self,
        endpoint: &NodeEndpoint,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(endpoint.as_str())
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::Other,
                format!("HTTP {} from {}", status, endpoint),
            )
            .into());
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                RpcError::protocol(format!("response is not JSON: {}", e))
            } else {
                TransportError::from_reqwest(&e).into()
            }
        })
    }
}

/// Issue `method` to one node, bounded by `timeout`, and return the
/// contents of the `result` field.
pub async fn call<R: RpcTransport + ?Sized>(
    transport: &R,
    endpoint: &NodeEndpoint,
    method: &str,
    params: Value,
    timeout: Duration,
) -> Result<Value, RpcError> {
    let request = RpcRequest::new(method, params);
    debug!("rpc {} -> {}", method, endpoint);

    let body = match tokio::time::timeout(timeout, transport.send(endpoint, &request, timeout)).await {
        Ok(result) => result?,
        Err(_) => return Err(TransportError::timeout(timeout).into()),
    };

    extract_result(body)
}

fn extract_result(mut body: Value) -> Result<Value, RpcError> {
    match body.get_mut("result").map(Value::take) {
        Some(Value::Null) | None => {
            let reason = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(|m| format!("node returned error: {}", m))
                .unwrap_or_else(|| "no result in response".to_string());
            Err(RpcError::Protocol(reason))
        }
        Some(result) => Ok(result),
    }
}
