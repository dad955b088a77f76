//! Sentiment Pulse: periodic sentiment pipeline with anomaly alerting
//!
//! Two subsystems composed through artifacts on disk.
//!
//! ## Architecture
//!
//! - **Scheduler**: runs the ordered stage list on a fixed cadence, isolating
//!   each stage's failure from the rest of the tick
//! - **Anomaly Engine**: scores the emotion-labelled record set with a seeded
//!   isolation forest and persists the results
//! - **Alert**: level-triggered `ALERT` / `NO_ALERT` flag derived from each pass

pub mod alert;
pub mod anomaly;
pub mod config;
pub mod scheduler;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, PulseConfig};

// Re-export commonly used types
pub use types::{
    AlertPayload, AlertSeverity, AlertState, AnomalyLabel, DurationClass, Record, RecordBatch,
    RecordSet, StageDescriptor, StageRunResult, StageStatus,
};

// Re-export the anomaly engine
pub use anomaly::{AnomalyDetector, AnomalyEngine, EngineError, IsolationForest, OutlierModel};

// Re-export alerting
pub use alert::{AlertDecision, AlertError, AlertFlag};

// Re-export the scheduler
pub use scheduler::{FailurePolicy, PipelineRunner, Scheduler, Stage, StageError, TickReport};
