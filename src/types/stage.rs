//! Stage descriptors and per-tick stage results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::defaults::{
    LONG_STAGE_TIMEOUT_SECS, MEDIUM_STAGE_TIMEOUT_SECS, SHORT_STAGE_TIMEOUT_SECS,
};

/// Expected run time of a stage. Determines its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationClass {
    Short,
    Medium,
    Long,
}

impl DurationClass {
    pub fn timeout(self) -> Duration {
        Duration::from_secs(match self {
            DurationClass::Short => SHORT_STAGE_TIMEOUT_SECS,
            DurationClass::Medium => MEDIUM_STAGE_TIMEOUT_SECS,
            DurationClass::Long => LONG_STAGE_TIMEOUT_SECS,
        })
    }
}

impl std::fmt::Display for DurationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationClass::Short => write!(f, "short"),
            DurationClass::Medium => write!(f, "medium"),
            DurationClass::Long => write!(f, "long"),
        }
    }
}

/// What a stage executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageCommand {
    /// External process with its own stdout/stderr and exit status.
    External {
        program: String,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
    },
    /// The in-process anomaly detection pass.
    AnomalyDetection,
}

impl std::fmt::Display for StageCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageCommand::External { program, args, .. } => {
                write!(f, "{}", program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            StageCommand::AnomalyDetection => write!(f, "<builtin anomaly detection>"),
        }
    }
}

/// Pure configuration: built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    pub name: String,
    pub command: StageCommand,
    pub duration: DurationClass,
}

/// Outcome of one stage in one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Succeeded,
    Failed { reason: String },
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Succeeded)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Succeeded => write!(f, "SUCCEEDED"),
            StageStatus::Failed { reason } => write!(f, "FAILED: {}", reason),
        }
    }
}

/// Created per tick per stage; consumed by the logger and the tick report.
#[derive(Debug, Clone)]
pub struct StageRunResult {
    pub stage: String,
    pub status: StageStatus,
    pub stdout: String,
    pub stderr: String,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}
