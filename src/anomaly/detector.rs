//! Record-set scoring
//!
//! Maps emotions to sentiment scores, guards against zero variance, runs the
//! outlier model and converts its decision scores to the public convention:
//! `anomaly_score` in [0, 1], higher = more unusual.

use statrs::statistics::Statistics;
use tracing::{debug, info};

use super::emotion::sentiment_score;
use super::isolation_forest::IsolationForest;
use crate::config::AnomalyConfig;
use crate::types::{AnomalyLabel, Record, RecordBatch, RecordSet};

/// Model output for one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScore {
    /// Model-native decision score: higher = more normal.
    pub decision: f64,
    /// Model-native outlier prediction.
    pub is_outlier: bool,
}

/// Unsupervised outlier model fitted and evaluated on the same values.
pub trait OutlierModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on `values` and score each of them, in order.
    fn fit_score(&self, values: &[f64]) -> Vec<OutlierScore>;
}

/// Owned scoring handle. Built once, passed to every scoring pass.
pub struct AnomalyDetector<M: OutlierModel = IsolationForest> {
    model: M,
}

impl AnomalyDetector<IsolationForest> {
    pub fn from_config(config: &AnomalyConfig) -> Self {
        Self::new(IsolationForest::from_config(config))
    }
}

impl<M: OutlierModel> AnomalyDetector<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Score a batch from scratch.
    pub fn detect(&self, batch: RecordBatch) -> RecordSet {
        let scores: Vec<f64> = batch
            .records
            .iter()
            .map(|r| sentiment_score(&r.emotion))
            .collect();

        // Fewer than two records has no variance either.
        let variance = scores.iter().variance();
        if !(variance > 0.0) {
            info!(
                records = scores.len(),
                "No variance in sentiment scores, skipping outlier model"
            );
            return Self::assemble(batch, &scores, None);
        }

        let outliers = self.model.fit_score(&scores);
        debug!(model = self.model.name(), records = scores.len(), variance, "Outlier model fitted");
        Self::assemble(batch, &scores, Some(outliers.as_slice()))
    }

    fn assemble(
        batch: RecordBatch,
        sentiment: &[f64],
        outliers: Option<&[OutlierScore]>,
    ) -> RecordSet {
        let normalized = outliers.map(|o| {
            let decisions: Vec<f64> = o.iter().map(|s| s.decision).collect();
            invert_min_max(&decisions)
        });

        let records = batch
            .records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let (anomaly_score, anomaly) = match (outliers, &normalized) {
                    (Some(o), Some(n)) => (
                        n[index],
                        if o[index].is_outlier {
                            AnomalyLabel::Anomalous
                        } else {
                            AnomalyLabel::Normal
                        },
                    ),
                    _ => (0.0, AnomalyLabel::Normal),
                };
                Record {
                    index,
                    text: raw.text,
                    emotion: raw.emotion,
                    sentiment_score: sentiment[index],
                    anomaly_score,
                    anomaly,
                    columns: raw.columns,
                }
            })
            .collect();

        RecordSet {
            headers: batch.headers,
            records,
            model_applied: outliers.is_some(),
        }
    }
}

/// `1 - (x - min) / (max - min)`. A flat input maps to all zeros.
fn invert_min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| (1.0 - (v - min) / range).clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Flags values below zero; decision is the value itself.
    struct SignModel {
        calls: AtomicUsize,
    }

    impl SignModel {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    impl OutlierModel for SignModel {
        fn name(&self) -> &'static str {
            "sign"
        }

        fn fit_score(&self, values: &[f64]) -> Vec<OutlierScore> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            values
                .iter()
                .map(|&v| OutlierScore { decision: v, is_outlier: v < 0.0 })
                .collect()
        }
    }

    #[test]
    fn test_zero_variance_skips_model() {
        let detector = AnomalyDetector::new(SignModel::new());
        let batch = RecordBatch::from_pairs(vec![("a", "anger"), ("b", "disgust"), ("c", "Anger")]);
        let set = detector.detect(batch);

        assert_eq!(detector.model().calls.load(Ordering::SeqCst), 0);
        assert!(!set.model_applied);
        assert!(set.records.iter().all(|r| r.anomaly == AnomalyLabel::Normal));
        assert!(set.records.iter().all(|r| r.anomaly_score == 0.0));
    }

    #[test]
    fn test_single_and_empty_sets_are_degenerate() {
        let detector = AnomalyDetector::new(SignModel::new());
        assert!(detector.detect(RecordBatch::from_pairs(vec![])).is_empty());
        let one = detector.detect(RecordBatch::from_pairs(vec![("x", "fear")]));
        assert_eq!(one.records[0].anomaly_score, 0.0);
        assert_eq!(detector.model().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inversion_and_label_follow_model() {
        let detector = AnomalyDetector::new(SignModel::new());
        let batch = RecordBatch::from_pairs(vec![("a", "joy"), ("b", "neutral"), ("c", "anger")]);
        let set = detector.detect(batch);

        assert!(set.model_applied);
        // Lowest decision (most abnormal in model terms) → highest anomaly score.
        assert_eq!(set.records[2].anomaly_score, 1.0);
        assert_eq!(set.records[0].anomaly_score, 0.0);
        assert!((set.records[1].anomaly_score - 0.5).abs() < 1e-12);
        assert_eq!(set.records[2].anomaly, AnomalyLabel::Anomalous);
        assert_eq!(set.anomaly_count(), 1);
    }

    #[test]
    fn test_invert_min_max_flat() {
        assert_eq!(invert_min_max(&[0.2, 0.2]), vec![0.0, 0.0]);
        assert!(invert_min_max(&[]).is_empty());
    }

    #[test]
    fn test_isolation_forest_spike_scenario() {
        let detector = AnomalyDetector::from_config(&AnomalyConfig::default());
        let mut pairs: Vec<(&str, &str)> = vec![("calm day", "joy"); 19];
        pairs.push(("furious", "anger"));
        let set = detector.detect(RecordBatch::from_pairs(pairs));

        let top = set
            .records
            .iter()
            .max_by(|a, b| a.anomaly_score.total_cmp(&b.anomaly_score))
            .unwrap();
        assert_eq!(top.emotion, "anger");
        assert_eq!(top.anomaly_score, 1.0);
        assert_eq!(top.anomaly, AnomalyLabel::Anomalous);
        assert_eq!(set.anomaly_count(), 1);
        assert!(set.records.iter().all(|r| (0.0..=1.0).contains(&r.anomaly_score)));
    }
}
