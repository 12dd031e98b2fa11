//! Node poller - concurrent "latest state" query across every node
//!
//! Every node is queried at once and all outcomes are gathered before a
//! winner is chosen. A hanging node only costs its own timeout.

pub mod batch;
pub mod query;

use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info};

use crate::rpc::{NodeEndpoint, RpcError, RpcTransport};

pub use batch::{BatchOutcome, MULTI_GET_METHOD, fetch_batch_all};
pub use query::{Dialect, NodeQuery, SequencedRecord, fetch_latest};

/// What one node answered this iteration
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub endpoint: NodeEndpoint,
    pub elapsed_secs: f64,
    pub result: Result<SequencedRecord, RpcError>,
}

/// Query every endpoint concurrently. Outcomes are in completion order.
pub async fn poll_all<R: RpcTransport + ?Sized>(
    rpc: &R,
    endpoints: &[NodeEndpoint],
    query: &NodeQuery,
    timeout: Duration,
) -> Vec<NodeOutcome> {
    let mut pending: FuturesUnordered<_> = endpoints
        .iter()
        .map(|endpoint| async move {
            let start = Instant::now();
            let result = fetch_latest(rpc, endpoint, query, timeout).await;
            NodeOutcome {
                endpoint: endpoint.clone(),
                elapsed_secs: start.elapsed().as_secs_f64(),
                result,
            }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(endpoints.len());
    while let Some(outcome) = pending.next().await {
        debug!(
            "node {} answered in {:.2}s (ok: {})",
            outcome.endpoint,
            outcome.elapsed_secs,
            outcome.result.is_ok()
        );
        outcomes.push(outcome);
    }
    outcomes
}

/// Pick the record with the strictly greatest sequence number. On a tie the
/// outcome observed first wins.
pub fn select_latest(outcomes: &[NodeOutcome]) -> Option<&SequencedRecord> {
    let mut latest: Option<&SequencedRecord> = None;
    for record in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        if latest.is_none_or(|l| record.sequence_number > l.sequence_number) {
            latest = Some(record);
        }
    }
    latest
}

/// Every node's answer for one round, plus the most advanced record
#[derive(Debug, Clone)]
pub struct PollRound {
    pub outcomes: Vec<NodeOutcome>,
    pub latest: Option<SequencedRecord>,
}

/// Poll every node and pick the most advanced record, if any node answered
pub async fn poll_latest<R: RpcTransport + ?Sized>(
    rpc: &R,
    endpoints: &[NodeEndpoint],
    query: &NodeQuery,
    timeout: Duration,
) -> PollRound {
    let outcomes = poll_all(rpc, endpoints, query, timeout).await;
    let latest = select_latest(&outcomes).cloned();
    if let Some(record) = &latest {
        info!(
            "latest sequence {} from {}",
            record.sequence_number, record.source_endpoint
        );
    }
    PollRound { outcomes, latest }
}
