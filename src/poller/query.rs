//! Node query dialects and response parsing
//!
//! Each dialect turns one node's answer into a [`SequencedRecord`]. The
//! sequence number is the ordering key used to pick the most advanced node.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::rpc::{NodeEndpoint, RpcError, RpcTransport, call};

pub const QUERY_TRANSACTIONS_METHOD: &str = "suix_queryTransactionBlocks";
pub const LATEST_CHECKPOINT_METHOD: &str = "sui_getLatestCheckpointSequenceNumber";
pub const GET_CHECKPOINT_METHOD: &str = "sui_getCheckpoint";

/// How "latest" is obtained from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeQuery {
    /// Most recent transactions, newest first
    RecentTransactions { limit: u32 },
    /// Latest checkpoint number, then that checkpoint's transactions
    LatestCheckpoint,
}

/// Config-facing name of a [`NodeQuery`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Recent,
    Checkpoint,
}

impl Dialect {
    pub fn query(self, recent_limit: u32) -> NodeQuery {
        match self {
            Dialect::Recent => NodeQuery::RecentTransactions {
                limit: recent_limit,
            },
            Dialect::Checkpoint => NodeQuery::LatestCheckpoint,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Recent => write!(f, "recent"),
            Dialect::Checkpoint => write!(f, "checkpoint"),
        }
    }
}

/// One node's view of the latest ledger state
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRecord {
    /// Ordering key; larger means more advanced
    pub sequence_number: u64,
    /// Record identifiers in node order, never empty
    pub record_ids: Vec<String>,
    /// Raw checkpoint number as reported, when the node gave one
    pub checkpoint: Option<String>,
    pub source_endpoint: NodeEndpoint,
    pub latency_secs: f64,
}

impl SequencedRecord {
    /// Primary record identifier
    pub fn record_id(&self) -> &str {
        self.record_ids.first().map(String::as_str).unwrap_or_default()
    }
}

/// Run `query` against one node. Every RPC call is bounded by `timeout`.
pub async fn fetch_latest<R: RpcTransport + ?Sized>(
    rpc: &R,
    endpoint: &NodeEndpoint,
    query: &NodeQuery,
    timeout: Duration,
) -> Result<SequencedRecord, RpcError> {
    let start = Instant::now();

    let (sequence_number, record_ids, checkpoint) = match query {
        NodeQuery::RecentTransactions { limit } => {
            let params = json!([
                {
                    "filter": null,
                    "options": {
                        "showInput": false,
                        "showEffects": false,
                        "showEvents": false
                    }
                },
                null,
                limit,
                true
            ]);
            let result = call(rpc, endpoint, QUERY_TRANSACTIONS_METHOD, params, timeout).await?;
            parse_recent_transactions(&result)?
        }
        NodeQuery::LatestCheckpoint => {
            let raw = call(rpc, endpoint, LATEST_CHECKPOINT_METHOD, json!([]), timeout).await?;
            let seq = parse_sequence(&raw).ok_or_else(|| {
                RpcError::protocol(format!("unparseable checkpoint sequence number: {}", raw))
            })?;
            let result = call(
                rpc,
                endpoint,
                GET_CHECKPOINT_METHOD,
                json!([seq.to_string()]),
                timeout,
            )
            .await?;
            let ids = parse_checkpoint_transactions(&result)?;
            (seq, ids, Some(seq.to_string()))
        }
    };

    Ok(SequencedRecord {
        sequence_number,
        record_ids,
        checkpoint,
        source_endpoint: endpoint.clone(),
        latency_secs: start.elapsed().as_secs_f64(),
    })
}

/// Sequence numbers arrive either as decimal strings or JSON numbers
pub fn parse_sequence(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn raw_sequence(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `suix_queryTransactionBlocks` result
pub fn parse_recent_transactions(
    result: &Value,
) -> Result<(u64, Vec<String>, Option<String>), RpcError> {
    let data = result
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::protocol("no data in result"))?;

    let mut ids = Vec::with_capacity(data.len());
    let mut best: Option<(u64, String)> = None;
    let mut first_raw: Option<String> = None;

    for tx in data {
        let digest = tx
            .get("digest")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::protocol("transaction without digest"))?;
        ids.push(digest.to_string());

        let Some(checkpoint) = tx.get("checkpoint") else {
            continue;
        };
        if first_raw.is_none() {
            first_raw = raw_sequence(checkpoint);
        }
        if let (Some(seq), Some(raw)) = (parse_sequence(checkpoint), raw_sequence(checkpoint)) {
            if best.as_ref().is_none_or(|(b, _)| seq > *b) {
                best = Some((seq, raw));
            }
        }
    }

    if ids.is_empty() {
        return Err(RpcError::protocol("no transactions returned"));
    }

    Ok(match best {
        Some((seq, raw)) => (seq, ids, Some(raw)),
        None => (0, ids, first_raw),
    })
}

/// Parse a `sui_getCheckpoint` result into its transaction digests
pub fn parse_checkpoint_transactions(result: &Value) -> Result<Vec<String>, RpcError> {
    let txs = result
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::protocol("no transactions in checkpoint"))?;

    let ids: Vec<String> = txs
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(RpcError::protocol("checkpoint has no transactions"));
    }
    Ok(ids)
}
