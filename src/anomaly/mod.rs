//! Anomaly Detection
//!
//! Turns the emotion-labelled record set into per-record anomaly scores and
//! labels, persists the results and drives the alert flag.
//!
//! ## Components
//!
//! - [`emotion`]: fixed emotion → sentiment score table
//! - [`isolation_forest`]: seeded outlier model
//! - [`detector`]: variance guard, model run and score normalization
//! - [`artifacts`]: CSV input, scored CSV and anomalous JSON outputs
//! - [`engine`]: one full pass including the alert decision

pub mod artifacts;
pub mod detector;
pub mod emotion;
pub mod engine;
pub mod isolation_forest;

pub use artifacts::ArtifactError;
pub use detector::{AnomalyDetector, OutlierModel, OutlierScore};
pub use emotion::sentiment_score;
pub use engine::{AnomalyEngine, EngineError, PassSummary};
pub use isolation_forest::IsolationForest;
