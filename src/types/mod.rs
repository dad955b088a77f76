//! Shared domain types
//!
//! - `record`: upstream rows, scored records and record sets
//! - `stage`: stage descriptors and per-tick stage results
//! - `alert`: alert state, severity and persisted payload

pub mod alert;
pub mod record;
pub mod stage;

pub use alert::{AlertPayload, AlertSeverity, AlertState};
pub use record::{AnomalousPost, AnomalyLabel, RawRecord, Record, RecordBatch, RecordSet};
pub use stage::{DurationClass, StageCommand, StageDescriptor, StageRunResult, StageStatus};
