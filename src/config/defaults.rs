//! System-wide default constants.
//!
//! Centralises the policy numbers used by the scheduler and the anomaly engine.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Scheduler
// ============================================================================

/// Interval between full pipeline runs (seconds). 120 = 2 minutes.
pub const PIPELINE_INTERVAL_SECS: u64 = 120;

/// How often the scheduler loop checks whether a run is due (seconds).
///
/// Must stay at or below half the pipeline interval so no run is missed.
pub const SCHEDULER_POLL_SECS: u64 = 30;

/// Timeout for stages in the `short` duration class (seconds).
pub const SHORT_STAGE_TIMEOUT_SECS: u64 = 60;

/// Timeout for stages in the `medium` duration class (seconds).
pub const MEDIUM_STAGE_TIMEOUT_SECS: u64 = 300;

/// Timeout for stages in the `long` duration class (seconds).
pub const LONG_STAGE_TIMEOUT_SECS: u64 = 900;

/// Interpreter used by the default external stages.
pub const STAGE_PROGRAM: &str = "python";

/// stderr fragments emitted by upstream ML libraries that are not errors.
pub const BENIGN_STDERR_PATTERNS: &[&str] = &["WARNING:tensorflow:", "cmdstanpy - INFO"];

// ============================================================================
// Anomaly Engine
// ============================================================================

/// Expected fraction of outliers in a record set.
pub const CONTAMINATION: f64 = 0.05;

/// Fixed seed for the isolation forest. Never time-based.
pub const MODEL_SEED: u64 = 42;

/// Number of isolation trees.
pub const N_ESTIMATORS: usize = 100;

/// Upper bound on the per-tree sub-sample size.
pub const MAX_SAMPLES: usize = 256;

/// Sentiment score at or below which an anomaly counts as serious.
pub const SERIOUS_SENTIMENT_THRESHOLD: f64 = -0.6;

// ============================================================================
// Artifacts
// ============================================================================

/// Emotion-labelled records written by the emotion detection stage.
pub const EMOTION_RESULTS_PATH: &str = "data/emotion_analysis_results.csv";

/// Full scored record set.
pub const ANOMALY_RESULTS_PATH: &str = "data/anomaly_detection_results.csv";

/// Compact list of anomalous records.
pub const ANOMALOUS_POSTS_PATH: &str = "data/anomaly_posts.json";

/// Alert flag. Existence means an alert is active.
pub const ALERT_FLAG_PATH: &str = "data/alert_flag.txt";
