//! Fan-out probe - every store lookup for an iteration issued at once
//!
//! Each request is timed and bounded on its own. One failure never cancels
//! or delays another; the batch completes when every request has resolved.

pub mod request;
pub mod store;

use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

pub use request::{ProbePlan, ProbeRequest, SkippedKey, SubResource};
pub use store::{HttpStoreClient, ProbeResult, StoreClient};

use crate::error::TransportError;

/// Result of one probe, with its timing
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub request: ProbeRequest,
    pub url: String,
    pub elapsed_secs: f64,
    pub result: ProbeResult,
}

/// Probe a single URL with a hard deadline
async fn probe_one<S: StoreClient + ?Sized>(
    store: &S,
    base_url: &str,
    request: ProbeRequest,
    timeout: Duration,
) -> ProbeOutcome {
    let url = request.url(base_url);
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, store.fetch(&url, timeout)).await {
        Ok(result) => result,
        Err(_) => ProbeResult::Transport(TransportError::timeout(timeout)),
    };
    let elapsed_secs = start.elapsed().as_secs_f64();
    debug!("probe {} -> {:?} in {:.2}s", url, result.status(), elapsed_secs);

    ProbeOutcome {
        request,
        url,
        elapsed_secs,
        result,
    }
}

/// Issue every request concurrently and return one outcome per request,
/// in completion order.
pub async fn probe_all<S: StoreClient + ?Sized>(
    store: &S,
    base_url: &str,
    requests: Vec<ProbeRequest>,
    timeout: Duration,
) -> Vec<ProbeOutcome> {
    let count = requests.len();
    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|request| probe_one(store, base_url, request, timeout))
        .collect();

    let mut outcomes = Vec::with_capacity(count);
    while let Some(outcome) = pending.next().await {
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{IdFormat, encode_record_id};
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// Answers by sub-resource code; `hang` sleeps far past any test timeout
    struct CodeStore {
        hang: &'static str,
    }

    #[async_trait]
    impl StoreClient for CodeStore {
        async fn fetch(&self, url: &str, _timeout: Duration) -> ProbeResult {
            let code = url.rsplit('/').next().unwrap_or_default();
            if code == self.hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            match code {
                "tx" => ProbeResult::Success { status: 200, byte_size: 512 },
                "ev" => ProbeResult::HttpError { status: 404, body: String::new() },
                _ => ProbeResult::Success { status: 200, byte_size: 64 },
            }
        }
    }

    fn requests() -> Vec<ProbeRequest> {
        let key = encode_record_id("ABC123", IdFormat::Base58).unwrap();
        [
            SubResource::Transaction,
            SubResource::Effects,
            SubResource::TxToCheckpoint,
            SubResource::Events,
        ]
        .into_iter()
        .map(|r| ProbeRequest::new(key.clone(), r, "ABC123"))
        .collect()
    }

    #[tokio::test]
    async fn test_one_outcome_per_request() {
        let store = CodeStore { hang: "" };
        let outcomes = probe_all(&store, "http://store", requests(), Duration::from_secs(1)).await;
        assert_eq!(outcomes.len(), 4);

        let codes: HashSet<&str> = outcomes.iter().map(|o| o.request.sub_resource.code()).collect();
        assert_eq!(codes, HashSet::from(["tx", "fx", "tx2c", "ev"]));

        let ev = outcomes.iter().find(|o| o.request.sub_resource == SubResource::Events).unwrap();
        assert_eq!(ev.result.status(), Some(404));
        assert!(ev.url.starts_with("http://store/"));
    }

    #[tokio::test]
    async fn test_hanging_probe_does_not_block_siblings() {
        let store = CodeStore { hang: "fx" };
        let start = Instant::now();
        let outcomes = probe_all(&store, "http://store", requests(), Duration::from_millis(100)).await;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(outcomes.len(), 4);

        let fx = outcomes.iter().find(|o| o.request.sub_resource == SubResource::Effects).unwrap();
        assert!(matches!(&fx.result, ProbeResult::Transport(t) if t.is_timeout()));
        assert!(fx.elapsed_secs >= 0.09);

        let ok = outcomes
            .iter()
            .filter(|o| matches!(o.result, ProbeResult::Success { .. }))
            .count();
        assert_eq!(ok, 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = CodeStore { hang: "" };
        let outcomes = probe_all(&store, "http://store", Vec::new(), Duration::from_secs(1)).await;
        assert!(outcomes.is_empty());
    }
}
