//! Operator-facing reporting.
//!
//! Every node answer, probe outcome and stop condition is described here
//! with enough context to act on: endpoint, key, sub-resource and timing.
//! Implementations only decide where a line goes.

use std::time::Duration;

use colored::*;

use crate::classify::Verdict;
use crate::monitor::{IterationStats, StopReason};
use crate::poller::{BatchOutcome, NodeOutcome, SequencedRecord};
use crate::probe::{ProbeOutcome, ProbeResult, SkippedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    fn log_level(self) -> log::Level {
        match self {
            Level::Info | Level::Success => log::Level::Info,
            Level::Warning => log::Level::Warn,
            Level::Error | Level::Critical => log::Level::Error,
        }
    }
}

pub trait Reporter: Send + Sync {
    /// Deliver one formatted line
    fn emit(&self, level: Level, message: &str);

    /// Include per-request URLs
    fn verbose(&self) -> bool {
        false
    }

    fn iteration_started(&self, iteration: u64) {
        self.emit(Level::Info, &format!("Iteration #{} started", iteration));
    }

    fn node_outcome(&self, outcome: &NodeOutcome) {
        match &outcome.result {
            Ok(record) => self.emit(
                Level::Success,
                &format!(
                    "  ✓ {}: sequence={}, records={} ({:.2}s)",
                    outcome.endpoint,
                    record.sequence_number,
                    record.record_ids.len(),
                    outcome.elapsed_secs
                ),
            ),
            Err(e) => self.emit(
                Level::Warning,
                &format!("  ✗ {}: {} ({:.2}s)", outcome.endpoint, e, outcome.elapsed_secs),
            ),
        }
    }

    fn latest_selected(&self, record: &SequencedRecord) {
        self.emit(
            Level::Info,
            &format!(
                "Latest: sequence {} from {} - {} record(s), first {}",
                record.sequence_number,
                record.source_endpoint,
                record.record_ids.len(),
                record.record_id()
            ),
        );
    }

    fn key_skipped(&self, skipped: &SkippedKey) {
        let what = if skipped.checkpoint_keyed {
            "checkpoint resources"
        } else {
            "record"
        };
        self.emit(
            Level::Warning,
            &format!("  Skipping {} for '{}': {}", what, skipped.source, skipped.error),
        );
    }

    fn probe_outcome(&self, outcome: &ProbeOutcome, verdict: Verdict, slow: bool, timeout: Duration) {
        let name = &outcome.request.display_name;
        let elapsed = outcome.elapsed_secs;

        if self.verbose() {
            self.emit(
                Level::Info,
                &format!(
                    "  [{}] source {} key {}",
                    name, outcome.request.source, outcome.request.key
                ),
            );
        }

        match (&outcome.result, verdict) {
            (ProbeResult::Transport(t), Verdict::FatalAbort) if t.is_timeout() => {
                self.emit(Level::Critical, "  ✗✗✗ TIMEOUT ✗✗✗");
                self.emit(
                    Level::Critical,
                    &format!("  Configured timeout: {:.2}s", timeout.as_secs_f64()),
                );
                self.emit(Level::Critical, &format!("  Elapsed: {:.2}s", elapsed));
                self.emit(Level::Critical, &format!("  URL: {}", outcome.url));
                self.emit(Level::Critical, &format!("  Source: {}", outcome.request.source));
                self.emit(Level::Critical, &format!("  Lookup key: {}", outcome.request.key));
                self.emit(
                    Level::Critical,
                    &format!("  Sub-resource: {}", outcome.request.sub_resource),
                );
                self.emit(Level::Critical, "  *** Store hang reproduced ***");
            }
            (ProbeResult::Success { status, byte_size }, Verdict::Success) => {
                self.emit(
                    Level::Success,
                    &format!(
                        "  ✓ [{}] {} - {:.2}s - {} bytes - {}",
                        name, status, elapsed, byte_size, outcome.url
                    ),
                );
                if slow {
                    self.emit(
                        Level::Warning,
                        &format!("  ⚠ [{}] slow response: {:.2}s", name, elapsed),
                    );
                }
            }
            (_, Verdict::ExpectedAbsence) => {
                self.emit(
                    Level::Info,
                    &format!("  ○ [{}] not found (404) - {:.2}s - {}", name, elapsed, outcome.url),
                );
            }
            (result, verdict) => {
                let level = if verdict.is_fatal() {
                    Level::Error
                } else {
                    Level::Warning
                };
                let detail = match result {
                    ProbeResult::Success { status, .. } | ProbeResult::HttpError { status, .. } => {
                        format!("HTTP {}", status)
                    }
                    ProbeResult::Transport(t) => t.to_string(),
                };
                self.emit(
                    level,
                    &format!(
                        "  ✗ [{}] {} ({}) - {:.2}s - {}",
                        name, detail, verdict, elapsed, outcome.url
                    ),
                );
                if let ProbeResult::HttpError { body, .. } = result {
                    if !body.is_empty() {
                        self.emit(level, &format!("  Response: {}", body));
                    }
                }
            }
        }
    }

    fn batch_outcome(&self, outcome: &BatchOutcome, verdict: Verdict, timeout: Duration) {
        match (&outcome.result, verdict) {
            (Ok(count), _) => self.emit(
                Level::Success,
                &format!(
                    "  ✓ {}: batch {}/{} ({:.2}s)",
                    outcome.endpoint, count, outcome.requested, outcome.elapsed_secs
                ),
            ),
            (Err(_), Verdict::FatalAbort) => {
                self.emit(Level::Critical, &format!("  ✗✗✗ TIMEOUT on node {} ✗✗✗", outcome.endpoint));
                self.emit(
                    Level::Critical,
                    &format!(
                        "  Elapsed: {:.2}s (timeout {:.2}s), {} record(s) requested",
                        outcome.elapsed_secs,
                        timeout.as_secs_f64(),
                        outcome.requested
                    ),
                );
            }
            (Err(e), _) => self.emit(
                Level::Warning,
                &format!("  ✗ {}: batch failed: {} ({:.2}s)", outcome.endpoint, e, outcome.elapsed_secs),
            ),
        }
    }

    fn iteration_skipped(&self, iteration: u64, reason: &str) {
        self.emit(
            Level::Warning,
            &format!("Iteration #{} skipped: {}", iteration, reason),
        );
    }

    fn iteration_finished(&self, iteration: u64, stats: &IterationStats) {
        self.emit(
            Level::Success,
            &format!(
                "Iteration #{} complete - successful iterations: {}",
                iteration, stats.success_count
            ),
        );
    }

    fn sleeping(&self, delay: Duration) {
        self.emit(Level::Info, &format!("Waiting {:.2}s...", delay.as_secs_f64()));
    }

    fn stopped(&self, reason: &StopReason, stats: &IterationStats) {
        let level = if reason.is_failure() {
            Level::Critical
        } else {
            Level::Warning
        };
        self.emit(level, &format!("Run stopped: {}", reason));
        self.emit(Level::Info, "Final statistics:");
        self.emit(Level::Info, &format!("  - Iterations: {}", stats.iteration_count));
        self.emit(
            Level::Info,
            &format!("  - Successful iterations: {}", stats.success_count),
        );
    }
}

/// Timestamped, colour-coded console output, mirrored to the log file
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

pub fn format_line(level: Level, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{}] {}", timestamp, level.label(), message)
}

impl Reporter for ConsoleReporter {
    fn emit(&self, level: Level, message: &str) {
        let line = format_line(level, message);
        let colored = match level {
            Level::Info => line.cyan(),
            Level::Success => line.green(),
            Level::Warning => line.yellow(),
            Level::Error => line.red(),
            Level::Critical => line.red().bold(),
        };
        println!("{}", colored);
        log::log!(level.log_level(), "{}", message);
    }

    fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Log-file only output
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn emit(&self, level: Level, message: &str) {
        log::log!(level.log_level(), "{}", message);
    }
}
