//! Pipeline runner: one tick = every stage once, in order
//!
//! Failure isolation contract:
//! - a failing, timed-out or panicking stage is recorded and logged with
//!   exactly one `error` event naming it
//! - under `ContinueOnFailure` the remaining stages still run
//! - `run_all_stages` never returns an error and never unwinds

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::environment::{LogFilter, StageEnvironment};
use super::stage::{panic_message, Stage, StageError, StageOutput};
use crate::config::{ConfigError, PulseConfig};
use crate::types::{StageRunResult, StageStatus};

/// What to do with the rest of a tick after a stage fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and run the next stage.
    #[default]
    ContinueOnFailure,
    /// Skip the remaining stages of this tick.
    AbortOnFailure,
}

/// Why a stage did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cancelled,
    EarlierFailure,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Cancelled => write!(f, "shutdown requested"),
            SkipReason::EarlierFailure => write!(f, "earlier stage failed"),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Stages that ran, in execution order.
    pub results: Vec<StageRunResult>,
    /// Stages that did not run, in declared order.
    pub skipped: Vec<(String, SkipReason)>,
}

impl TickReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failed_stages(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.status.is_success())
            .map(|r| r.stage.as_str())
            .collect()
    }

    pub fn was_cancelled(&self) -> bool {
        self.skipped.iter().any(|(_, r)| *r == SkipReason::Cancelled)
    }
}

pub struct PipelineRunner {
    stages: Vec<Arc<dyn Stage>>,
    policy: FailurePolicy,
    environment: StageEnvironment,
    log_filter: LogFilter,
    ticks: AtomicU64,
}

impl PipelineRunner {
    pub fn new(
        stages: Vec<Arc<dyn Stage>>,
        policy: FailurePolicy,
        environment: StageEnvironment,
        log_filter: LogFilter,
    ) -> Self {
        Self {
            stages,
            policy,
            environment,
            log_filter,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &PulseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let log_filter = LogFilter::from_config(&config.environment)
            .map_err(|e| ConfigError::Validation(vec![e.to_string()]))?;
        Ok(Self::new(
            super::build_stages(config),
            config.scheduler.failure_policy,
            StageEnvironment::from_config(&config.environment),
            log_filter,
        ))
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run every stage once, in declared order.
    ///
    /// Cancellation is checked before each stage; a stage that already
    /// started is allowed to finish.
    pub async fn run_all_stages(&self, cancel: &CancellationToken) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let started_at = Utc::now();
        let tick_start = Instant::now();
        let mut results = Vec::with_capacity(self.stages.len());
        let mut skipped = Vec::new();
        let mut aborted = false;

        info!(tick, stages = self.stages.len(), "[Pipeline] Tick started");

        for stage in &self.stages {
            let name = stage.name().to_string();

            if cancel.is_cancelled() {
                skipped.push((name, SkipReason::Cancelled));
                continue;
            }
            if aborted {
                skipped.push((name, SkipReason::EarlierFailure));
                continue;
            }

            let result = self.run_stage(stage.as_ref()).await;
            if !result.status.is_success() && self.policy == FailurePolicy::AbortOnFailure {
                aborted = true;
            }
            results.push(result);
        }

        let report = TickReport {
            tick,
            started_at,
            elapsed: tick_start.elapsed(),
            results,
            skipped,
        };

        if report.failed() > 0 || !report.skipped.is_empty() {
            warn!(
                tick,
                succeeded = report.succeeded(),
                failed = report.failed(),
                skipped = report.skipped.len(),
                failed_stages = ?report.failed_stages(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "[Pipeline] Tick finished with problems"
            );
        } else {
            info!(
                tick,
                succeeded = report.succeeded(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "[Pipeline] Tick finished"
            );
        }
        report
    }

    async fn run_stage(&self, stage: &dyn Stage) -> StageRunResult {
        let name = stage.name();
        let descriptor = stage.descriptor();
        debug!(stage = %name, command = %descriptor.command, duration = %descriptor.duration, "[Pipeline] Stage starting");

        let started = Instant::now();
        let outcome = match AssertUnwindSafe(stage.execute(&self.environment))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(StageError::Panicked(panic_message(payload))),
        };
        let elapsed = started.elapsed();

        let (status, output) = match outcome {
            Ok(output) => {
                self.log_success(name, &output, elapsed);
                (StageStatus::Succeeded, output)
            }
            Err(err) => {
                let output = err.output().cloned().unwrap_or_default();
                self.log_failure(name, &err, &output, elapsed);
                (
                    StageStatus::Failed {
                        reason: err.to_string(),
                    },
                    output,
                )
            }
        };

        StageRunResult {
            stage: name.to_string(),
            status,
            stdout: output.stdout,
            stderr: output.stderr,
            finished_at: Utc::now(),
            elapsed,
        }
    }

    /// Logs stdout and benign stderr; returns the stderr lines worth reporting.
    fn log_output<'a>(&self, name: &str, output: &'a StageOutput) -> Vec<&'a str> {
        let stdout = output.stdout.trim();
        if !stdout.is_empty() {
            info!(stage = %name, "[Pipeline] stdout:\n{}", stdout);
        }
        let (benign, relevant) = self.log_filter.split(&output.stderr);
        if !benign.is_empty() {
            debug!(stage = %name, lines = benign.len(), "[Pipeline] benign stderr:\n{}", benign.join("\n"));
        }
        relevant
    }

    fn log_success(&self, name: &str, output: &StageOutput, elapsed: Duration) {
        let relevant = self.log_output(name, output);
        if !relevant.is_empty() {
            warn!(stage = %name, "[Pipeline] stderr:\n{}", relevant.join("\n"));
        }
        info!(stage = %name, elapsed_ms = elapsed.as_millis() as u64, "[Pipeline] Stage succeeded");
    }

    fn log_failure(&self, name: &str, err: &StageError, output: &StageOutput, elapsed: Duration) {
        let relevant = self.log_output(name, output);
        error!(
            stage = %name,
            error = %err,
            stderr = %relevant.join("\n"),
            elapsed_ms = elapsed.as_millis() as u64,
            "[Pipeline] Stage {} failed",
            name
        );
    }
}
