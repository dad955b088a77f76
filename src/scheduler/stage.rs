//! Stage abstraction and the two stage kinds
//!
//! - [`CommandStage`]: external process, output captured, bounded by the
//!   duration-class timeout and killed when it expires
//! - [`AnomalyStage`]: the in-process anomaly pass on the blocking pool

use async_trait::async_trait;
use std::any::Any;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use super::environment::StageEnvironment;
use crate::anomaly::{AnomalyEngine, EngineError, IsolationForest, OutlierModel};
use crate::types::StageDescriptor;

/// Captured output of one stage execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process exited with {}", describe_exit(.code))]
    Exit { code: Option<i32>, output: StageOutput },

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("task did not complete: {0}")]
    Join(String),
}

impl StageError {
    /// Output captured before the failure, if any.
    pub fn output(&self) -> Option<&StageOutput> {
        match self {
            StageError::Exit { output, .. } => Some(output),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Best-effort text from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// One unit of pipeline work.
///
/// Stages communicate only through artifacts on disk; the runner sequences
/// them and never passes data between them.
#[async_trait]
pub trait Stage: Send + Sync {
    fn descriptor(&self) -> &StageDescriptor;

    async fn execute(&self, env: &StageEnvironment) -> Result<StageOutput, StageError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

// ============================================================================
// Command Stage
// ============================================================================

pub struct CommandStage {
    descriptor: StageDescriptor,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl CommandStage {
    pub fn new(
        descriptor: StageDescriptor,
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
    ) -> Self {
        let timeout = descriptor.duration.timeout();
        Self {
            descriptor,
            program: program.into(),
            args,
            working_dir,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Stage for CommandStage {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    async fn execute(&self, env: &StageEnvironment) -> Result<StageOutput, StageError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| StageError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| StageError::TimedOut(self.timeout))?
            .map_err(StageError::Wait)?;

        let captured = StageOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            Err(StageError::Exit {
                code: output.status.code(),
                output: captured,
            })
        }
    }
}

// ============================================================================
// Anomaly Stage
// ============================================================================

pub struct AnomalyStage<M: OutlierModel + 'static = IsolationForest> {
    descriptor: StageDescriptor,
    engine: Arc<AnomalyEngine<M>>,
    force: bool,
}

impl<M: OutlierModel + 'static> AnomalyStage<M> {
    pub fn new(descriptor: StageDescriptor, engine: Arc<AnomalyEngine<M>>, force: bool) -> Self {
        Self {
            descriptor,
            engine,
            force,
        }
    }
}

#[async_trait]
impl<M: OutlierModel + 'static> Stage for AnomalyStage<M> {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _env: &StageEnvironment) -> Result<StageOutput, StageError> {
        let engine = Arc::clone(&self.engine);
        let force = self.force;

        let summary = tokio::task::spawn_blocking(move || engine.run_pass(force))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    StageError::Panicked(panic_message(e.into_panic()))
                } else {
                    StageError::Join(e.to_string())
                }
            })??;

        Ok(StageOutput {
            stdout: format!(
                "records={} anomalies={} serious={} alert={}",
                summary.records, summary.anomalies, summary.serious, summary.state
            ),
            stderr: String::new(),
        })
    }
}
