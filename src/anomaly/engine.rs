//! One anomaly detection pass: load → score → persist → decide → flag.
//!
//! Result artifacts are written before the flag is touched, so a reader that
//! sees a fresh flag also sees the results it was derived from.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use super::artifacts::{self, ArtifactError};
use super::detector::{AnomalyDetector, OutlierModel};
use super::isolation_forest::IsolationForest;
use crate::alert::{AlertDecision, AlertError, AlertFlag, FlagUpdate};
use crate::config::{AnomalyConfig, PathsConfig};
use crate::types::{AlertSeverity, AlertState};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Alert(#[from] AlertError),
}

/// Summary of one pass, for logs and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub records: usize,
    pub anomalies: usize,
    pub serious: usize,
    pub model_applied: bool,
    pub state: AlertState,
    pub severity: Option<AlertSeverity>,
}

pub struct AnomalyEngine<M: OutlierModel = IsolationForest> {
    detector: AnomalyDetector<M>,
    flag: AlertFlag,
    input: PathBuf,
    results: PathBuf,
    anomalous_posts: PathBuf,
    serious_threshold: f64,
}

impl AnomalyEngine<IsolationForest> {
    pub fn from_config(anomaly: &AnomalyConfig, paths: &PathsConfig) -> Self {
        Self::new(AnomalyDetector::from_config(anomaly), paths, anomaly.serious_threshold)
    }
}

impl<M: OutlierModel> AnomalyEngine<M> {
    pub fn new(detector: AnomalyDetector<M>, paths: &PathsConfig, serious_threshold: f64) -> Self {
        Self {
            detector,
            flag: AlertFlag::new(paths.alert_flag.clone()),
            input: paths.emotion_results.clone(),
            results: paths.anomaly_results.clone(),
            anomalous_posts: paths.anomalous_posts.clone(),
            serious_threshold,
        }
    }

    pub fn flag(&self) -> &AlertFlag {
        &self.flag
    }

    pub fn run_pass(&self, force: bool) -> Result<PassSummary, EngineError> {
        let batch = artifacts::load_batch(&self.input)?;
        let set = self.detector.detect(batch);

        artifacts::write_scored_table(&self.results, &set)?;
        artifacts::write_anomalous_posts(&self.anomalous_posts, &set)?;

        let decision = AlertDecision::evaluate(&set, force, self.serious_threshold);
        match decision.apply(&self.flag)? {
            FlagUpdate::Asserted(payload) => {
                warn!(
                    anomalies = decision.anomalous_count,
                    serious = decision.serious_count,
                    force,
                    "{}",
                    payload.message
                );
            }
            FlagUpdate::Cleared { was_present } => {
                info!(was_present, "No anomalies detected, alert state is NO_ALERT");
            }
        }

        let summary = PassSummary {
            records: set.len(),
            anomalies: decision.anomalous_count,
            serious: decision.serious_count,
            model_applied: set.model_applied,
            state: decision.state,
            severity: decision.severity,
        };
        info!(
            records = summary.records,
            anomalies = summary.anomalies,
            model_applied = summary.model_applied,
            state = %summary.state,
            results = %self.results.display(),
            "Anomaly detection pass complete"
        );
        Ok(summary)
    }
}
