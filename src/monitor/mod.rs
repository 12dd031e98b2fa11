//! Control loop - Poll → Encode → Probe → Evaluate, repeated until stopped.
//!
//! One iteration at a time:
//! - poll every node and keep the most advanced record
//! - derive lookup keys from it
//! - probe the store (and optionally every node) concurrently
//! - classify every outcome; any fatal verdict ends the run
//!
//! Operator cancellation is honoured only between iterations.

mod state;

pub use state::{IterationStats, MonitorState, StopReason};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;

use crate::classify::{Verdict, classify, classify_batch, is_slow};
use crate::codec::IdFormat;
use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::poller::{BatchOutcome, NodeQuery, SequencedRecord, fetch_batch_all, poll_latest};
use crate::probe::{ProbeOutcome, ProbePlan, StoreClient, SubResource, probe_all};
use crate::report::Reporter;
use crate::rpc::{NodeEndpoint, RpcTransport};

/// Everything the control loop needs, fixed at startup
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub endpoints: Vec<NodeEndpoint>,
    pub query: NodeQuery,
    pub id_format: IdFormat,
    pub store_base_url: String,
    pub rpc_timeout: Duration,
    pub store_timeout: Duration,
    pub slow_threshold: Duration,
    pub loop_delay: Duration,
    pub resources: Vec<SubResource>,
    pub max_records: usize,
    pub batch_probe: bool,
    pub max_iterations: Option<u64>,
}

impl MonitorSettings {
    /// Validate a config and convert it to runtime settings
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.rpc.endpoints.is_empty() {
            return Err(WatchError::Config("at least one node endpoint is required".to_string()));
        }
        if config.store.base_url.trim().is_empty() {
            return Err(WatchError::Config("store base URL is empty".to_string()));
        }
        if config.rpc.timeout_ms == 0 || config.store.timeout_ms == 0 {
            return Err(WatchError::Config("timeouts must be non-zero".to_string()));
        }
        if config.store.resources.is_empty() {
            return Err(WatchError::Config("no store sub-resources configured".to_string()));
        }
        if config.store.max_records == 0 {
            return Err(WatchError::Config("max_records must be at least 1".to_string()));
        }

        Ok(Self {
            endpoints: config.rpc.endpoints.iter().map(|e| NodeEndpoint::new(e.as_str())).collect(),
            query: config.rpc.dialect.query(config.rpc.recent_limit),
            id_format: config.rpc.id_format,
            store_base_url: config.store.base_url.trim_end_matches('/').to_string(),
            rpc_timeout: Duration::from_millis(config.rpc.timeout_ms),
            store_timeout: Duration::from_millis(config.store.timeout_ms),
            slow_threshold: Duration::from_millis(config.store.slow_threshold_ms),
            loop_delay: Duration::from_millis(config.run.loop_delay_ms),
            resources: config.store.resources.clone(),
            max_records: config.store.max_records,
            batch_probe: config.rpc.batch_probe,
            max_iterations: config.run.max_iterations,
        })
    }
}

/// Internal step carrying the data produced by the previous phase
enum Step {
    Polling,
    Encoding(SequencedRecord),
    Probing(SequencedRecord, ProbePlan),
    Evaluating(Vec<ProbeOutcome>, Vec<BatchOutcome>),
    Sleeping,
    Stopped(StopReason),
}

impl Step {
    fn state(&self) -> MonitorState {
        match self {
            Step::Polling => MonitorState::Polling,
            Step::Encoding(_) => MonitorState::Encoding,
            Step::Probing(..) => MonitorState::Probing,
            Step::Evaluating(..) => MonitorState::Evaluating,
            Step::Sleeping => MonitorState::Sleeping,
            Step::Stopped(_) => MonitorState::Stopped,
        }
    }
}

/// The monitoring control loop
pub struct Monitor<R, S>
where
    R: RpcTransport,
    S: StoreClient,
{
    rpc: Arc<R>,
    store: Arc<S>,
    settings: MonitorSettings,
    reporter: Arc<dyn Reporter>,
}

impl<R, S> Monitor<R, S>
where
    R: RpcTransport,
    S: StoreClient,
{
    pub fn new(
        rpc: Arc<R>,
        store: Arc<S>,
        settings: MonitorSettings,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            rpc,
            store,
            settings,
            reporter,
        }
    }

    /// Run until a fatal verdict, a failed poll, the iteration limit, or
    /// cancellation. `stats` is updated after each iteration ends.
    pub async fn run(&self, stats: &mut IterationStats, mut cancel: watch::Receiver<bool>) -> StopReason {
        let mut step = Step::Polling;

        loop {
            debug!("monitor state: {:?}", step.state());
            let iteration = stats.iteration_count + 1;

            step = match step {
                Step::Polling => {
                    if *cancel.borrow() {
                        Step::Stopped(StopReason::Cancelled)
                    } else if self.limit_reached(stats) {
                        Step::Stopped(StopReason::IterationLimit)
                    } else {
                        self.reporter.iteration_started(iteration);
                        match self.poll().await {
                            Some(record) => Step::Encoding(record),
                            None => {
                                stats.ended_without_success();
                                Step::Stopped(StopReason::NoLatestState)
                            }
                        }
                    }
                }

                Step::Encoding(record) => {
                    let plan = ProbePlan::build(
                        &record,
                        self.settings.id_format,
                        &self.settings.resources,
                        self.settings.max_records,
                    );
                    for skipped in &plan.skipped {
                        self.reporter.key_skipped(skipped);
                    }
                    match plan.skip_reason() {
                        None => Step::Probing(record, plan),
                        Some(reason) => {
                            stats.ended_without_success();
                            self.reporter.iteration_skipped(iteration, reason);
                            Step::Sleeping
                        }
                    }
                }

                Step::Probing(record, plan) => {
                    let (probes, batches) = self.probe(&record, plan).await;
                    Step::Evaluating(probes, batches)
                }

                Step::Evaluating(probes, batches) => match self.evaluate(probes, batches) {
                    Some(reason) => {
                        stats.ended_without_success();
                        Step::Stopped(reason)
                    }
                    None => {
                        stats.succeeded();
                        self.reporter.iteration_finished(iteration, stats);
                        Step::Sleeping
                    }
                },

                Step::Sleeping => {
                    if self.limit_reached(stats) {
                        Step::Stopped(StopReason::IterationLimit)
                    } else {
                        self.reporter.sleeping(self.settings.loop_delay);
                        tokio::select! {
                            _ = tokio::time::sleep(self.settings.loop_delay) => Step::Polling,
                            _ = wait_for_cancel(&mut cancel) => Step::Stopped(StopReason::Cancelled),
                        }
                    }
                }

                Step::Stopped(reason) => {
                    info!(
                        "run stopped: {} (iterations {}, successes {})",
                        reason, stats.iteration_count, stats.success_count
                    );
                    self.reporter.stopped(&reason, stats);
                    return reason;
                }
            };
        }
    }

    fn limit_reached(&self, stats: &IterationStats) -> bool {
        self.settings
            .max_iterations
            .is_some_and(|max| stats.iteration_count >= max)
    }

    async fn poll(&self) -> Option<SequencedRecord> {
        let round = poll_latest(
            &*self.rpc,
            &self.settings.endpoints,
            &self.settings.query,
            self.settings.rpc_timeout,
        )
        .await;

        for outcome in &round.outcomes {
            self.reporter.node_outcome(outcome);
        }
        if let Some(record) = &round.latest {
            self.reporter.latest_selected(record);
        }
        round.latest
    }

    async fn probe(&self, record: &SequencedRecord, plan: ProbePlan) -> (Vec<ProbeOutcome>, Vec<BatchOutcome>) {
        info!(
            "probing {} store request(s) for sequence {}",
            plan.requests.len(),
            record.sequence_number
        );

        let store_phase = probe_all(
            &*self.store,
            &self.settings.store_base_url,
            plan.requests,
            self.settings.store_timeout,
        );
        let node_phase = async {
            if self.settings.batch_probe {
                fetch_batch_all(
                    &*self.rpc,
                    &self.settings.endpoints,
                    &record.record_ids,
                    self.settings.rpc_timeout,
                )
                .await
            } else {
                Vec::new()
            }
        };

        tokio::join!(store_phase, node_phase)
    }

    /// Classify everything; returns the first fatal outcome, if any
    fn evaluate(&self, probes: Vec<ProbeOutcome>, batches: Vec<BatchOutcome>) -> Option<StopReason> {
        let mut fatal = None;

        for outcome in probes {
            let verdict = classify(&outcome);
            let slow = is_slow(&outcome, self.settings.slow_threshold);
            self.reporter
                .probe_outcome(&outcome, verdict, slow, self.settings.store_timeout);
            if verdict == Verdict::FatalAbort && fatal.is_none() {
                fatal = Some(StopReason::FatalProbe(Box::new(outcome)));
            }
        }

        for outcome in batches {
            let verdict = classify_batch(&outcome);
            self.reporter
                .batch_outcome(&outcome, verdict, self.settings.rpc_timeout);
            if verdict == Verdict::FatalAbort && fatal.is_none() {
                fatal = Some(StopReason::FatalNodeBatch(Box::new(outcome)));
            }
        }

        fatal
    }
}

/// Resolves once cancellation is requested; never if the sender is gone
async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}
