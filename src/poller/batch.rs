//! Batch lookup of the latest record ids on every node
//!
//! Mirrors the store probe, but against the nodes themselves: a node that
//! hangs on `sui_multiGetTransactionBlocks` is the same failure mode.

use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Value, json};

use crate::rpc::{NodeEndpoint, RpcError, RpcTransport, call};

pub const MULTI_GET_METHOD: &str = "sui_multiGetTransactionBlocks";

/// One node's answer to the batch lookup
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub endpoint: NodeEndpoint,
    pub requested: usize,
    pub elapsed_secs: f64,
    /// Number of records returned
    pub result: Result<usize, RpcError>,
}

fn batch_params(ids: &[String]) -> Value {
    json!([
        ids,
        {
            "showInput": true,
            "showRawInput": false,
            "showEffects": true,
            "showEvents": false,
            "showObjectChanges": false,
            "showBalanceChanges": true
        }
    ])
}

/// Ask every node for `ids` concurrently; outcomes are in completion order.
pub async fn fetch_batch_all<R: RpcTransport + ?Sized>(
    rpc: &R,
    endpoints: &[NodeEndpoint],
    ids: &[String],
    timeout: Duration,
) -> Vec<BatchOutcome> {
    let params = batch_params(ids);

    let mut pending: FuturesUnordered<_> = endpoints
        .iter()
        .map(|endpoint| {
            let params = params.clone();
            async move {
                let start = Instant::now();
                let result = call(rpc, endpoint, MULTI_GET_METHOD, params, timeout)
                    .await
                    .and_then(|r| {
                        r.as_array()
                            .map(Vec::len)
                            .ok_or_else(|| RpcError::protocol("batch result is not a list"))
                    });
                BatchOutcome {
                    endpoint: endpoint.clone(),
                    requested: ids.len(),
                    elapsed_secs: start.elapsed().as_secs_f64(),
                    result,
                }
            }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(endpoints.len());
    while let Some(outcome) = pending.next().await {
        outcomes.push(outcome);
    }
    outcomes
}
