//! Transactions store client

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;

use crate::error::{TransportError, WatchError};

/// Longest response body excerpt kept for diagnostics
pub const BODY_EXCERPT_CHARS: usize = 500;

/// Raw result of one store GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// 2xx response
    Success { status: u16, byte_size: usize },
    /// Non-2xx response with the start of its body
    HttpError { status: u16, body: String },
    /// No HTTP response at all
    Transport(TransportError),
}

impl ProbeResult {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeResult::Success { status, .. } | ProbeResult::HttpError { status, .. } => {
                Some(*status)
            }
            ProbeResult::Transport(_) => None,
        }
    }
}

/// Fetches one store URL - a single attempt, never retried
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> ProbeResult;
}

/// Store client over reqwest
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    client: Client,
}

impl HttpStoreClient {
    pub fn new() -> crate::error::Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| WatchError::Http(format!("Failed to create store client: {}", e)))?;
        Ok(Self { client })
    }
}

/// Bytes kept from a body; always covers BODY_EXCERPT_CHARS of UTF-8
const EXCERPT_BYTES: usize = BODY_EXCERPT_CHARS * 4;

/// Measure a body chunk by chunk, keeping only its first bytes
async fn drain_body<S, B, E>(stream: S) -> Result<(usize, Vec<u8>), E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut total = 0;
    let mut head = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        total += chunk.len();
        if head.len() < EXCERPT_BYTES {
            let take = (EXCERPT_BYTES - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
    }
    Ok((total, head))
}

fn excerpt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_EXCERPT_CHARS)
        .collect()
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn fetch(&self, url: &str, timeout: Duration) -> ProbeResult {
        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => return ProbeResult::Transport(TransportError::from_reqwest(&e)),
        };

        let status = response.status();
        let (byte_size, head) = match drain_body(response.bytes_stream()).await {
            Ok(drained) => drained,
            Err(e) => return ProbeResult::Transport(TransportError::from_reqwest(&e)),
        };

        if status.is_success() {
            ProbeResult::Success {
                status: status.as_u16(),
                byte_size,
            }
        } else {
            ProbeResult::HttpError {
                status: status.as_u16(),
                body: excerpt(&head),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(2000);
        assert_eq!(excerpt(long.as_bytes()).len(), BODY_EXCERPT_CHARS);
        assert_eq!(excerpt(b"Forbidden"), "Forbidden");
    }

    #[test]
    fn test_excerpt_lossy_utf8() {
        assert_eq!(excerpt(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }

    #[tokio::test]
    async fn test_drain_body_counts_all_keeps_head() {
        let chunks = vec![
            Ok::<_, std::io::Error>(vec![b'x'; 1500]),
            Ok(vec![b'y'; 1500]),
            Ok(vec![b'z'; 10]),
        ];
        let (total, head) = drain_body(futures::stream::iter(chunks)).await.unwrap();
        assert_eq!(total, 3010);
        assert_eq!(head.len(), EXCERPT_BYTES);
        assert_eq!(excerpt(&head).chars().count(), BODY_EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_drain_body_propagates_stream_error() {
        let chunks = vec![
            Ok(vec![b'x'; 10]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let err = drain_body(futures::stream::iter(chunks)).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(
            ProbeResult::Success { status: 200, byte_size: 3 }.status(),
            Some(200)
        );
        assert_eq!(
            ProbeResult::HttpError { status: 404, body: String::new() }.status(),
            Some(404)
        );
        let t = ProbeResult::Transport(TransportError::new(TransportErrorKind::Other, "x"));
        assert_eq!(t.status(), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = HttpStoreClient::new().unwrap();
        // Port 9 on localhost is not expected to accept connections
        let result = client
            .fetch("http://127.0.0.1:9/x/tx", Duration::from_secs(2))
            .await;
        assert!(matches!(result, ProbeResult::Transport(_)));
    }
}
