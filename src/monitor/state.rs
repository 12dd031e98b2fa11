//! Control loop state and run-level bookkeeping

use std::fmt;

use crate::poller::BatchOutcome;
use crate::probe::ProbeOutcome;

/// Where the control loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Encoding,
    Probing,
    Evaluating,
    Sleeping,
    Stopped,
}

/// Process-wide counters, owned by the caller and mutated only by the
/// control loop once an iteration has fully completed or aborted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationStats {
    pub iteration_count: u64,
    pub success_count: u64,
}

impl IterationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an iteration that reached the end of evaluation cleanly
    pub fn succeeded(&mut self) {
        self.iteration_count += 1;
        self.success_count += 1;
    }

    /// Record an iteration that was skipped or aborted
    pub fn ended_without_success(&mut self) {
        self.iteration_count += 1;
    }
}

/// Why the run ended
#[derive(Debug, Clone)]
pub enum StopReason {
    /// Operator interrupt between iterations
    Cancelled,
    /// Configured iteration count reached
    IterationLimit,
    /// No node produced a usable latest state
    NoLatestState,
    /// A store probe was classified fatal
    FatalProbe(Box<ProbeOutcome>),
    /// A node hung on the batch lookup
    FatalNodeBatch(Box<BatchOutcome>),
}

impl StopReason {
    /// 0 for operator-requested stops, 1 for failures
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Cancelled | StopReason::IterationLimit => 0,
            StopReason::NoLatestState
            | StopReason::FatalProbe(_)
            | StopReason::FatalNodeBatch(_) => 1,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.exit_code() != 0
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "stopped by operator"),
            StopReason::IterationLimit => write!(f, "iteration limit reached"),
            StopReason::NoLatestState => write!(f, "no node produced a usable latest state"),
            StopReason::FatalProbe(o) => write!(
                f,
                "fatal store response for {} at {}",
                o.request.sub_resource, o.url
            ),
            StopReason::FatalNodeBatch(o) => {
                write!(f, "node {} hung on batch lookup", o.endpoint)
            }
        }
    }
}
