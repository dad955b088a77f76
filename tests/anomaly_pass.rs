//! Anomaly Pass Integration Tests
//!
//! Runs the anomaly engine end to end on files: emotion CSV in, scored CSV,
//! anomalous JSON and alert flag out.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use sentiment_pulse::anomaly::AnomalyEngine;
use sentiment_pulse::config::{AnomalyConfig, PathsConfig};
use sentiment_pulse::scheduler::{AnomalyStage, Stage, StageEnvironment};
use sentiment_pulse::storage::Table;
use sentiment_pulse::types::{AlertSeverity, AlertState, AnomalousPost, DurationClass, StageCommand, StageDescriptor};
use sentiment_pulse::AlertFlag;

fn paths(dir: &Path) -> PathsConfig {
    PathsConfig {
        emotion_results: dir.join("emotion_analysis_results.csv"),
        anomaly_results: dir.join("anomaly_detection_results.csv"),
        anomalous_posts: dir.join("anomaly_posts.json"),
        alert_flag: dir.join("alert_flag.txt"),
    }
}

/// 19 joyful posts and one angry one, with extra upstream columns.
fn write_spike_input(path: &Path) {
    let mut csv = String::from("text,emotion,location,source\n");
    for i in 0..19 {
        csv.push_str(&format!("\"Lovely day, post {}\",joy,Ohio,reddit\n", i));
    }
    csv.push_str("This is outrageous,anger,Texas,news\n");
    std::fs::write(path, csv).unwrap();
}

fn load_table(path: &Path) -> Table {
    Table::parse(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn spike_scenario_raises_serious_alert() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    write_spike_input(&paths.emotion_results);

    let engine = AnomalyEngine::from_config(&AnomalyConfig::default(), &paths);
    let summary = engine.run_pass(false).unwrap();

    assert_eq!(summary.records, 20);
    assert!(summary.model_applied);
    assert_eq!(summary.state, AlertState::Alert);
    assert_eq!(summary.severity, Some(AlertSeverity::SeriousSpike));

    let table = load_table(&paths.anomaly_results);
    assert_eq!(
        table.headers,
        vec!["text", "emotion", "location", "source", "sentiment_score", "anomaly", "anomaly_score"]
    );

    let score_col = table.column("anomaly_score").unwrap();
    let label_col = table.column("anomaly").unwrap();
    let scores: Vec<f64> = table.rows.iter().map(|r| r[score_col].parse().unwrap()).collect();
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));

    let top = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(table.rows[top][1], "anger");
    assert_eq!(scores[top], 1.0);
    assert_eq!(table.rows[top][label_col], "anomalous");
    assert_eq!(table.rows[0][2], "Ohio", "original columns preserved");

    let flag = AlertFlag::new(paths.alert_flag.clone());
    let payload = flag.load().unwrap().unwrap();
    assert_eq!(payload.message, AlertSeverity::SeriousSpike.message());
    assert!(!payload.raised_at.is_empty());
}

#[test]
fn anomalous_artifact_matches_labels() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let emotions = ["joy", "joy", "love", "neutral", "joy", "sadness", "joy", "love", "surprise",
        "joy", "joy", "fear", "love", "joy", "neutral", "joy", "disgust", "joy", "love", "joy"];
    let mut csv = String::from("text,emotion\n");
    for (i, emotion) in emotions.iter().enumerate() {
        csv.push_str(&format!("post {},{}\n", i, emotion));
    }
    std::fs::write(&paths.emotion_results, csv).unwrap();

    AnomalyEngine::from_config(&AnomalyConfig::default(), &paths)
        .run_pass(false)
        .unwrap();

    let table = load_table(&paths.anomaly_results);
    let label_col = table.column("anomaly").unwrap();
    let labelled: BTreeSet<String> = table
        .rows
        .iter()
        .filter(|r| r[label_col] == "anomalous")
        .map(|r| r[0].clone())
        .collect();

    let posts: Vec<AnomalousPost> =
        serde_json::from_slice(&std::fs::read(&paths.anomalous_posts).unwrap()).unwrap();
    let listed: BTreeSet<String> = posts.into_iter().map(|p| p.text).collect();

    assert_eq!(labelled, listed);
}

#[test]
fn rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    write_spike_input(&paths.emotion_results);
    let engine = AnomalyEngine::from_config(&AnomalyConfig::default(), &paths);

    engine.run_pass(false).unwrap();
    let first = std::fs::read(&paths.anomaly_results).unwrap();
    let first_posts = std::fs::read(&paths.anomalous_posts).unwrap();

    engine.run_pass(false).unwrap();
    assert_eq!(std::fs::read(&paths.anomaly_results).unwrap(), first);
    assert_eq!(std::fs::read(&paths.anomalous_posts).unwrap(), first_posts);
}

#[test]
fn constant_sentiment_is_all_normal_and_clears_flag() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    std::fs::write(&paths.emotion_results, "text,emotion\na,anger\nb,disgust\nc,anger\n").unwrap();
    std::fs::write(&paths.alert_flag, "Alert: Unusual sentiment activity detected.\nTime: x\n").unwrap();

    let summary = AnomalyEngine::from_config(&AnomalyConfig::default(), &paths)
        .run_pass(false)
        .unwrap();

    assert!(!summary.model_applied);
    assert_eq!(summary.state, AlertState::NoAlert);
    assert!(!paths.alert_flag.exists());

    let table = load_table(&paths.anomaly_results);
    let score_col = table.column("anomaly_score").unwrap();
    let label_col = table.column("anomaly").unwrap();
    assert!(table.rows.iter().all(|r| r[score_col] == "0" && r[label_col] == "normal"));
}

#[test]
fn missing_emotion_column_fails_pass() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    std::fs::write(&paths.emotion_results, "text,label\nhello,joy\n").unwrap();

    let err = AnomalyEngine::from_config(&AnomalyConfig::default(), &paths)
        .run_pass(false)
        .unwrap_err();
    assert!(err.to_string().contains("emotion"));
    assert!(!paths.anomaly_results.exists());
}

#[tokio::test]
async fn builtin_stage_runs_forced_pass() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    std::fs::write(&paths.emotion_results, "text,emotion\n").unwrap();

    let engine = Arc::new(AnomalyEngine::from_config(&AnomalyConfig::default(), &paths));
    let stage = AnomalyStage::new(
        StageDescriptor {
            name: "anomaly_detection".into(),
            command: StageCommand::AnomalyDetection,
            duration: DurationClass::Short,
        },
        engine,
        true,
    );

    let output = tokio_test::assert_ok!(stage.execute(&StageEnvironment::default()).await);
    assert!(output.stdout.contains("alert=ALERT"));

    let payload = AlertFlag::new(paths.alert_flag.clone()).load().unwrap().unwrap();
    assert_eq!(payload.severity, Some(AlertSeverity::Forced));
}

#[tokio::test]
async fn builtin_stage_reports_missing_input_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let engine = Arc::new(AnomalyEngine::from_config(&AnomalyConfig::default(), &paths));
    let stage = AnomalyStage::new(
        StageDescriptor {
            name: "anomaly_detection".into(),
            command: StageCommand::AnomalyDetection,
            duration: DurationClass::Short,
        },
        engine,
        false,
    );

    tokio_test::assert_err!(stage.execute(&StageEnvironment::default()).await);
}
