//! Anomaly engine input/output artifacts
//!
//! Input: the emotion-labelled CSV written by the upstream classification
//! stage. Outputs: the full scored table and the anomalous subset as JSON.
//! Every output is replaced atomically.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::{write_atomic, Table, TableError};
use crate::types::{RawRecord, RecordBatch, RecordSet};

pub const TEXT_COLUMN: &str = "text";
pub const EMOTION_COLUMN: &str = "emotion";

/// Columns written by the engine, in output order.
pub const SCORE_COLUMNS: [&str; 3] = ["sentiment_score", "anomaly", "anomaly_score"];

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed table {}: {}", .0.display(), .1)]
    Table(PathBuf, #[source] TableError),

    #[error("{} is missing required column '{}'", .0.display(), .1)]
    MissingColumn(PathBuf, &'static str),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load the upstream artifact. `text` and `emotion` are required columns.
pub fn load_batch(path: &Path) -> Result<RecordBatch, ArtifactError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ArtifactError::Io(path.to_path_buf(), e))?;
    parse_batch(path, &contents)
}

fn parse_batch(path: &Path, contents: &str) -> Result<RecordBatch, ArtifactError> {
    let table = Table::parse(contents).map_err(|e| ArtifactError::Table(path.to_path_buf(), e))?;

    let text_idx = table
        .column(TEXT_COLUMN)
        .ok_or_else(|| ArtifactError::MissingColumn(path.to_path_buf(), TEXT_COLUMN))?;
    let emotion_idx = table
        .column(EMOTION_COLUMN)
        .ok_or_else(|| ArtifactError::MissingColumn(path.to_path_buf(), EMOTION_COLUMN))?;

    let records = table
        .rows
        .into_iter()
        .map(|row| RawRecord {
            text: row[text_idx].clone(),
            emotion: row[emotion_idx].clone(),
            columns: row,
        })
        .collect();

    Ok(RecordBatch {
        headers: table.headers,
        records,
    })
}

/// Original columns in order, with the score columns appended or replaced.
pub fn scored_table(set: &RecordSet) -> Table {
    let mut headers = set.headers.clone();
    let positions: Vec<usize> = SCORE_COLUMNS
        .iter()
        .map(|name| match headers.iter().position(|h| h == name) {
            Some(i) => i,
            None => {
                headers.push((*name).to_string());
                headers.len() - 1
            }
        })
        .collect();

    let rows = set
        .records
        .iter()
        .map(|record| {
            let mut row = record.columns.clone();
            row.resize(headers.len(), String::new());
            row[positions[0]] = record.sentiment_score.to_string();
            row[positions[1]] = record.anomaly.to_string();
            row[positions[2]] = record.anomaly_score.to_string();
            row
        })
        .collect();

    Table { headers, rows }
}

pub fn write_scored_table(path: &Path, set: &RecordSet) -> Result<(), ArtifactError> {
    let csv = scored_table(set).to_csv();
    write_atomic(path, csv.as_bytes()).map_err(|e| ArtifactError::Io(path.to_path_buf(), e))
}

pub fn write_anomalous_posts(path: &Path, set: &RecordSet) -> Result<(), ArtifactError> {
    let json = serde_json::to_vec_pretty(&set.anomalous_posts())?;
    write_atomic(path, &json).map_err(|e| ArtifactError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalousPost, AnomalyLabel, Record};

    fn scored(headers: &[&str], records: Vec<Record>) -> RecordSet {
        RecordSet {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records,
            model_applied: true,
        }
    }

    fn record(index: usize, columns: &[&str], emotion: &str, score: f64, anomaly: AnomalyLabel) -> Record {
        Record {
            index,
            text: columns[0].to_string(),
            emotion: emotion.to_string(),
            sentiment_score: crate::anomaly::sentiment_score(emotion),
            anomaly_score: score,
            anomaly,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_load_keeps_extra_columns() {
        let batch = parse_batch(
            Path::new("in.csv"),
            "location,text,emotion\nOhio,\"hi, there\",joy\n,late,anger\n",
        )
        .unwrap();
        assert_eq!(batch.headers, vec!["location", "text", "emotion"]);
        assert_eq!(batch.records[0].text, "hi, there");
        assert_eq!(batch.records[0].emotion, "joy");
        assert_eq!(batch.records[1].columns, vec!["", "late", "anger"]);
    }

    #[test]
    fn test_missing_emotion_column_is_contract_violation() {
        let err = parse_batch(Path::new("in.csv"), "text,label\nhi,joy\n").unwrap_err();
        assert!(matches!(err, ArtifactError::MissingColumn(_, "emotion")));
        assert!(err.to_string().contains("emotion"));
    }

    #[test]
    fn test_header_only_artifact_is_empty_batch() {
        let batch = parse_batch(Path::new("in.csv"), "text,emotion\n").unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_scored_table_appends_columns() {
        let set = scored(
            &["text", "emotion", "source"],
            vec![record(0, &["bad", "anger", "feed"], "anger", 1.0, AnomalyLabel::Anomalous)],
        );
        let table = scored_table(&set);
        assert_eq!(
            table.headers,
            vec!["text", "emotion", "source", "sentiment_score", "anomaly", "anomaly_score"]
        );
        assert_eq!(table.rows[0], vec!["bad", "anger", "feed", "-1", "anomalous", "1"]);
    }

    #[test]
    fn test_scored_table_replaces_stale_columns() {
        let set = scored(
            &["text", "emotion", "anomaly"],
            vec![record(0, &["ok", "joy", "anomalous"], "joy", 0.0, AnomalyLabel::Normal)],
        );
        let table = scored_table(&set);
        assert_eq!(
            table.headers,
            vec!["text", "emotion", "anomaly", "sentiment_score", "anomaly_score"]
        );
        assert_eq!(table.rows[0], vec!["ok", "joy", "normal", "1", "0"]);
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let set = scored(
            &["text", "emotion"],
            vec![
                record(0, &["fine", "joy"], "joy", 0.0, AnomalyLabel::Normal),
                record(1, &["awful", "disgust"], "disgust", 1.0, AnomalyLabel::Anomalous),
            ],
        );

        let table_path = dir.path().join("results.csv");
        let posts_path = dir.path().join("posts.json");
        write_scored_table(&table_path, &set).unwrap();
        write_anomalous_posts(&posts_path, &set).unwrap();

        let reloaded = load_batch(&table_path).unwrap();
        assert_eq!(reloaded.len(), 2);

        let posts: Vec<AnomalousPost> =
            serde_json::from_slice(&std::fs::read(&posts_path).unwrap()).unwrap();
        assert_eq!(
            posts,
            vec![AnomalousPost {
                text: "awful".into(),
                emotion: "disgust".into(),
                anomaly_score: 1.0,
            }]
        );
    }
}
