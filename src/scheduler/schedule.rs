//! Recurring pipeline schedule and the polling loop driving it

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::runner::PipelineRunner;
use crate::config::{ConfigError, SchedulerConfig};

/// Environment override for `scheduler.interval_secs`.
pub const INTERVAL_ENV_VAR: &str = "PULSE_INTERVAL_SECS";

/// Interval in seconds: `PULSE_INTERVAL_SECS` if set and valid, else config.
pub fn get_interval_secs(config: &SchedulerConfig) -> u64 {
    std::env::var(INTERVAL_ENV_VAR)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&secs: &u64| secs > 0)
        .unwrap_or(config.interval_secs)
}

/// Due-time bookkeeping for one recurring job.
///
/// The next run is due one interval after the previous run *finished*, so a
/// slow tick never causes back-to-back catch-up runs.
#[derive(Debug, Clone)]
pub struct Schedule {
    interval: Duration,
    next_due: Instant,
}

impl Schedule {
    pub fn new(interval: Duration, now: Instant, run_on_start: bool) -> Self {
        let next_due = if run_on_start { now } else { now + interval };
        Self { interval, next_due }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    pub fn mark_run(&mut self, finished: Instant) {
        self.next_due = finished + self.interval;
    }
}

/// Long-lived loop: poll, run the pipeline when due, stop on cancellation.
pub struct Scheduler {
    runner: PipelineRunner,
    interval: Duration,
    poll: Duration,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(runner: PipelineRunner, interval: Duration, poll: Duration, run_on_start: bool) -> Self {
        Self {
            runner,
            interval,
            poll,
            run_on_start,
        }
    }

    /// Build from config, honouring `PULSE_INTERVAL_SECS`.
    pub fn from_config(runner: PipelineRunner, config: &SchedulerConfig) -> Result<Self, ConfigError> {
        Self::with_interval(runner, config, get_interval_secs(config))
    }

    /// Build with an explicit interval in place of `config.interval_secs`.
    ///
    /// The poll period must still be at most half of the interval actually
    /// used, or due runs are missed.
    pub fn with_interval(
        runner: PipelineRunner,
        config: &SchedulerConfig,
        interval_secs: u64,
    ) -> Result<Self, ConfigError> {
        if config.poll_secs == 0 || config.poll_secs.saturating_mul(2) > interval_secs {
            return Err(ConfigError::Validation(vec![format!(
                "scheduler.poll_secs ({}) must be > 0 and at most half of the effective interval ({}s, see {})",
                config.poll_secs, interval_secs, INTERVAL_ENV_VAR
            )]));
        }
        Ok(Self::new(
            runner,
            Duration::from_secs(interval_secs),
            Duration::from_secs(config.poll_secs),
            config.run_on_start,
        ))
    }

    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    /// Run until `cancel` fires. Returns the number of ticks executed.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut schedule = Schedule::new(self.interval, Instant::now(), self.run_on_start);
        let mut ticks = 0u64;

        info!(
            interval_secs = self.interval.as_secs(),
            poll_secs = self.poll.as_secs(),
            run_on_start = self.run_on_start,
            stages = ?self.runner.stage_names(),
            "[Scheduler] Started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if schedule.is_due(Instant::now()) {
                self.runner.run_all_stages(&cancel).await;
                ticks += 1;
                schedule.mark_run(Instant::now());
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll) => {}
            }
        }

        info!(ticks, "[Scheduler] Shutdown signal received, scheduler stopped");
        ticks
    }
}
