//! Record and record-set types for the anomaly engine.

use serde::{Deserialize, Serialize};

/// Outlier classification of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl AnomalyLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyLabel::Normal => "normal",
            AnomalyLabel::Anomalous => "anomalous",
        }
    }

    pub fn is_anomalous(self) -> bool {
        self == AnomalyLabel::Anomalous
    }
}

impl std::fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream row before scoring.
///
/// `columns` holds every original cell in header order so the scored table
/// can reproduce the input columns unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub text: String,
    pub emotion: String,
    pub columns: Vec<String>,
}

impl RawRecord {
    /// Build a record carrying only the two required fields.
    pub fn new(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        let text = text.into();
        let emotion = emotion.into();
        Self {
            columns: vec![text.clone(), emotion.clone()],
            text,
            emotion,
        }
    }
}

/// Rows loaded from one upstream artifact, with their header.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RecordBatch {
    /// Batch built from `(text, emotion)` pairs with a `text,emotion` header.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            headers: vec!["text".to_string(), "emotion".to_string()],
            records: pairs
                .into_iter()
                .map(|(text, emotion)| RawRecord::new(text, emotion))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record after a scoring pass. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Position in the record set (the record's identity).
    pub index: usize,
    pub text: String,
    pub emotion: String,
    /// Deterministic function of `emotion`, in [-1.0, 1.0].
    pub sentiment_score: f64,
    /// Normalized to [0.0, 1.0], higher = more unusual.
    pub anomaly_score: f64,
    pub anomaly: AnomalyLabel,
    /// Original cells in header order.
    pub columns: Vec<String>,
}

/// All records from a single scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// False when the zero-variance guard skipped the outlier model.
    pub model_applied: bool,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records labelled anomalous, in record order.
    pub fn anomalies(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.anomaly.is_anomalous())
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }

    /// Anomalous records whose sentiment is at or below `threshold`.
    pub fn serious_anomalies(&self, threshold: f64) -> impl Iterator<Item = &Record> {
        self.anomalies()
            .filter(move |r| r.sentiment_score <= threshold)
    }

    /// Compact view of the anomalous subset.
    pub fn anomalous_posts(&self) -> Vec<AnomalousPost> {
        self.anomalies()
            .map(|r| AnomalousPost {
                text: r.text.clone(),
                emotion: r.emotion.clone(),
                anomaly_score: r.anomaly_score,
            })
            .collect()
    }
}

/// Entry of the anomalous-posts artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalousPost {
    pub text: String,
    pub emotion: String,
    pub anomaly_score: f64,
}
