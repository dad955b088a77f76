//! Config Validation Tests
//!
//! Exercises TOML loading and validation independently from the pipeline.

use sentiment_pulse::config::{ConfigError, PulseConfig, StageKind};
use sentiment_pulse::scheduler::{FailurePolicy, PipelineRunner, BASE_STAGE_ENV};
use sentiment_pulse::types::DurationClass;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulse_config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

fn validation_errors(contents: &str) -> Vec<String> {
    let (_dir, path) = write_config(contents);
    match PulseConfig::load_from_file(&path) {
        Err(ConfigError::Validation(errors)) => errors,
        other => panic!("expected validation errors, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn full_config_loads() {
    let (_dir, path) = write_config(
        r#"
[scheduler]
interval_secs = 300
poll_secs = 60
run_on_start = true
failure_policy = "abort_on_failure"

[environment]
benign_stderr_patterns = ["^FutureWarning"]

[environment.vars]
HF_HOME = "/srv/models"

[anomaly]
contamination = 0.1
seed = 7
serious_threshold = -0.8
force_alert = true

[paths]
emotion_results = "/srv/data/emotions.csv"
alert_flag = "/srv/data/alert.txt"

[[stages]]
name = "collect"
program = "python"
args = ["scripts/data_collection.py", "--limit", "500"]
working_dir = "/srv/pipeline"
duration = "long"

[[stages]]
name = "detect"
kind = "anomaly_detection"
duration = "short"
"#,
    );

    let config = PulseConfig::load_from_file(&path).unwrap();
    assert_eq!(config.scheduler.interval_secs, 300);
    assert!(config.scheduler.run_on_start);
    assert_eq!(config.scheduler.failure_policy, FailurePolicy::AbortOnFailure);
    assert_eq!(config.environment.vars["HF_HOME"], "/srv/models");
    assert_eq!(config.anomaly.seed, 7);
    assert!(config.anomaly.force_alert);
    assert_eq!(config.paths.emotion_results.to_str(), Some("/srv/data/emotions.csv"));
    assert_eq!(config.paths.anomaly_results.to_str(), Some("data/anomaly_detection_results.csv"));
    assert_eq!(config.stages[0].duration, DurationClass::Long);
    assert_eq!(config.stages[0].args.len(), 3);
    assert_eq!(config.stages[1].kind, StageKind::AnomalyDetection);

    let runner = PipelineRunner::from_config(&config).unwrap();
    assert_eq!(runner.stage_names(), vec!["collect", "detect"]);
    assert_eq!(runner.policy(), FailurePolicy::AbortOnFailure);
}

#[test]
fn poll_must_be_at_most_half_the_interval() {
    let errors = validation_errors("[scheduler]\ninterval_secs = 120\npoll_secs = 90\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("poll_secs"));
}

#[test]
fn contamination_out_of_range() {
    let errors = validation_errors("[anomaly]\ncontamination = 0.75\n");
    assert!(errors.iter().any(|e| e.contains("contamination")));
}

#[test]
fn command_stage_without_program() {
    let errors = validation_errors("[[stages]]\nname = \"orphan\"\n");
    assert!(errors.iter().any(|e| e.contains("orphan") && e.contains("without a program")));
}

#[test]
fn duplicate_stage_names() {
    let errors = validation_errors(
        r#"
[[stages]]
name = "same"
program = "a"

[[stages]]
name = "same"
program = "b"
"#,
    );
    assert!(errors.iter().any(|e| e.contains("duplicated")));
}

#[test]
fn invalid_benign_pattern() {
    let errors = validation_errors("[environment]\nbenign_stderr_patterns = [\"[unclosed\"]\n");
    assert!(errors.iter().any(|e| e.contains("benign_stderr_patterns")));
}

#[test]
fn unknown_duration_class_is_parse_error() {
    let (_dir, path) = write_config("[[stages]]\nname = \"x\"\nprogram = \"y\"\nduration = \"forever\"\n");
    assert!(matches!(
        PulseConfig::load_from_file(&path),
        Err(ConfigError::Parse(..))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        PulseConfig::load_from_file(&dir.path().join("absent.toml")),
        Err(ConfigError::Io(..))
    ));
}

#[test]
fn base_environment_forces_utf8() {
    assert!(BASE_STAGE_ENV.contains(&("PYTHONIOENCODING", "utf-8")));
    assert!(BASE_STAGE_ENV.contains(&("PYTHONUTF8", "1")));
}
