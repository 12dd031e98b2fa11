//! Failure classification
//!
//! Maps a raw probe outcome onto the continue/ignore/abort policy. Rules in
//! priority order:
//!
//! 1. transport timeout -> FatalAbort (the hang this tool exists to catch)
//! 2. HTTP 200 -> Success
//! 3. HTTP 404 -> ExpectedAbsence
//! 4. HTTP 403 -> FatalAbort
//! 5. HTTP 5xx -> FatalAbort
//! 6. anything else -> TransientWarning

use std::fmt;
use std::time::Duration;

use crate::poller::BatchOutcome;
use crate::probe::{ProbeOutcome, ProbeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// Resource legitimately not there (yet)
    ExpectedAbsence,
    /// Logged, iteration continues
    TransientWarning,
    /// Stops the whole run
    FatalAbort,
}

impl Verdict {
    pub fn is_fatal(self) -> bool {
        self == Verdict::FatalAbort
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::ExpectedAbsence => write!(f, "expected absence"),
            Verdict::TransientWarning => write!(f, "warning"),
            Verdict::FatalAbort => write!(f, "fatal"),
        }
    }
}

pub fn classify_result(result: &ProbeResult) -> Verdict {
    match result {
        ProbeResult::Transport(t) if t.is_timeout() => Verdict::FatalAbort,
        ProbeResult::Transport(_) => Verdict::TransientWarning,
        ProbeResult::Success { status, .. } | ProbeResult::HttpError { status, .. } => {
            match *status {
                200 => Verdict::Success,
                404 => Verdict::ExpectedAbsence,
                403 => Verdict::FatalAbort,
                500..=599 => Verdict::FatalAbort,
                _ => Verdict::TransientWarning,
            }
        }
    }
}

pub fn classify(outcome: &ProbeOutcome) -> Verdict {
    classify_result(&outcome.result)
}

/// A successful response that took longer than `threshold`. Does not change
/// the verdict.
pub fn is_slow(outcome: &ProbeOutcome, threshold: Duration) -> bool {
    classify(outcome) == Verdict::Success && outcome.elapsed_secs > threshold.as_secs_f64()
}

/// Node batch lookups: a hang is fatal, any other failure is a warning
pub fn classify_batch(outcome: &BatchOutcome) -> Verdict {
    match &outcome.result {
        Ok(_) => Verdict::Success,
        Err(e) if e.is_timeout() => Verdict::FatalAbort,
        Err(_) => Verdict::TransientWarning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_sequence_number;
    use crate::error::{TransportError, TransportErrorKind};
    use crate::probe::{ProbeRequest, SubResource};
    use crate::rpc::{NodeEndpoint, RpcError};

    fn http(status: u16) -> ProbeResult {
        if (200..300).contains(&status) {
            ProbeResult::Success { status, byte_size: 10 }
        } else {
            ProbeResult::HttpError { status, body: String::new() }
        }
    }

    fn transport(kind: TransportErrorKind) -> ProbeResult {
        ProbeResult::Transport(TransportError::new(kind, "boom"))
    }

    fn outcome(result: ProbeResult, elapsed_secs: f64) -> ProbeOutcome {
        ProbeOutcome {
            request: ProbeRequest::new(encode_sequence_number(7), SubResource::Transaction, "7"),
            url: "http://store/AwAAAAAAAAA/tx".to_string(),
            elapsed_secs,
            result,
        }
    }

    #[test]
    fn test_classification_table() {
        let cases = vec![
            (http(200), Verdict::Success),
            (http(404), Verdict::ExpectedAbsence),
            (http(403), Verdict::FatalAbort),
            (http(500), Verdict::FatalAbort),
            (http(418), Verdict::TransientWarning),
            (transport(TransportErrorKind::Timeout), Verdict::FatalAbort),
            (transport(TransportErrorKind::ConnectionFailure), Verdict::TransientWarning),
        ];
        for (result, expected) in cases {
            assert_eq!(classify_result(&result), expected, "{:?}", result);
            // Deterministic on repeat
            assert_eq!(classify_result(&result), expected);
        }
    }

    #[test]
    fn test_status_edges() {
        assert_eq!(classify_result(&http(204)), Verdict::TransientWarning);
        assert_eq!(classify_result(&http(503)), Verdict::FatalAbort);
        assert_eq!(classify_result(&http(599)), Verdict::FatalAbort);
        assert_eq!(classify_result(&http(429)), Verdict::TransientWarning);
        assert_eq!(classify_result(&transport(TransportErrorKind::Other)), Verdict::TransientWarning);
    }

    #[test]
    fn test_slow_flag() {
        let threshold = Duration::from_secs(5);
        assert!(is_slow(&outcome(http(200), 6.0), threshold));
        assert!(!is_slow(&outcome(http(200), 1.0), threshold));
        assert!(!is_slow(&outcome(http(404), 6.0), threshold));
        assert_eq!(classify(&outcome(http(200), 6.0)), Verdict::Success);
    }

    #[test]
    fn test_classify_batch() {
        let mut batch = BatchOutcome {
            endpoint: NodeEndpoint::new("http://n"),
            requested: 3,
            elapsed_secs: 0.2,
            result: Ok(3),
        };
        assert_eq!(classify_batch(&batch), Verdict::Success);

        batch.result = Err(TransportError::timeout(Duration::from_secs(30)).into());
        assert_eq!(classify_batch(&batch), Verdict::FatalAbort);

        batch.result = Err(RpcError::protocol("no result in response"));
        assert_eq!(classify_batch(&batch), Verdict::TransientWarning);
    }
}
