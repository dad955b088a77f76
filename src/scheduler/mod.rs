//! Stage Pipeline Scheduler
//!
//! Runs the ordered stage list on a fixed cadence until shutdown.
//!
//! ```text
//! Scheduler (poll loop) ──due──▶ PipelineRunner::run_all_stages
//!                                  ├─ data_collection      (command)
//!                                  ├─ preprocessing        (command)
//!                                  ├─ emotion_detection    (command)
//!                                  ├─ sentiment_analysis   (command)
//!                                  ├─ anomaly_detection    (in-process)
//!                                  └─ sentiment_forecasting (command)
//! ```
//!
//! Stages share nothing but artifacts on disk. A failed stage is logged and
//! the tick moves on; only cancellation stops the loop.

mod environment;
mod runner;
mod schedule;
mod shutdown;
mod stage;

pub use environment::{LogFilter, StageEnvironment, BASE_STAGE_ENV};
pub use runner::{FailurePolicy, PipelineRunner, SkipReason, TickReport};
pub use schedule::{get_interval_secs, Schedule, Scheduler, INTERVAL_ENV_VAR};
pub use shutdown::spawn_signal_listener;
pub use stage::{AnomalyStage, CommandStage, Stage, StageError, StageOutput};

use std::sync::Arc;

use crate::anomaly::AnomalyEngine;
use crate::config::PulseConfig;
use crate::types::StageCommand;

/// Instantiate the configured stages in declared order.
pub fn build_stages(config: &PulseConfig) -> Vec<Arc<dyn Stage>> {
    let engine = Arc::new(AnomalyEngine::from_config(&config.anomaly, &config.paths));

    config
        .stage_descriptors()
        .into_iter()
        .map(|descriptor| -> Arc<dyn Stage> {
            match descriptor.command.clone() {
                StageCommand::External {
                    program,
                    args,
                    working_dir,
                } => Arc::new(CommandStage::new(descriptor, program, args, working_dir)),
                StageCommand::AnomalyDetection => Arc::new(AnomalyStage::new(
                    descriptor,
                    Arc::clone(&engine),
                    config.anomaly.force_alert,
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_stages() {
        let stages = build_stages(&PulseConfig::default());
        let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "data_collection",
                "preprocessing",
                "emotion_detection",
                "sentiment_analysis",
                "anomaly_detection",
                "sentiment_forecasting",
            ]
        );
        assert_eq!(stages[4].descriptor().command, StageCommand::AnomalyDetection);
    }

    #[test]
    fn test_runner_from_config_rejects_invalid() {
        let mut config = PulseConfig::default();
        config.scheduler.interval_secs = 0;
        assert!(PipelineRunner::from_config(&config).is_err());
        assert!(PipelineRunner::from_config(&PulseConfig::default()).is_ok());
    }
}
