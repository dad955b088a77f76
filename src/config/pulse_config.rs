//! Pulse Configuration - scheduler cadence, stage list and anomaly policy as TOML
//!
//! Each struct implements `Default` with the values the pipeline has always run
//! with, so behaviour is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::scheduler::FailurePolicy;
use crate::types::{DurationClass, StageCommand, StageDescriptor};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PULSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pulse_config.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a pipeline deployment.
///
/// Load with `PulseConfig::load()` which searches:
/// 1. `$PULSE_CONFIG` env var
/// 2. `./pulse_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Execution environment handed to every stage
    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Artifact locations shared with the upstream stages and readers
    #[serde(default)]
    pub paths: PathsConfig,

    /// Ordered stage list. Order is execution order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            environment: EnvironmentConfig::default(),
            anomaly: AnomalyConfig::default(),
            paths: PathsConfig::default(),
            stages: default_stages(),
        }
    }
}

impl PulseConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), stages = config.stages.len(), "Loaded config from PULSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PULSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PULSE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(stages = config.stages.len(), "Loaded config from ./pulse_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./pulse_config.toml, using defaults");
                }
            }
        }

        info!("No pulse_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Stage descriptors in execution order.
    pub fn stage_descriptors(&self) -> Vec<StageDescriptor> {
        self.stages.iter().map(StageConfig::descriptor).collect()
    }

    /// Validate the whole config, collecting every violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.scheduler;
        if s.interval_secs == 0 {
            errors.push("scheduler.interval_secs must be > 0".to_string());
        }
        if s.poll_secs == 0 {
            errors.push("scheduler.poll_secs must be > 0".to_string());
        } else if s.poll_secs.saturating_mul(2) > s.interval_secs {
            errors.push(format!(
                "scheduler.poll_secs ({}) must be at most half of interval_secs ({})",
                s.poll_secs, s.interval_secs
            ));
        }

        let a = &self.anomaly;
        if !(a.contamination > 0.0 && a.contamination <= 0.5) {
            errors.push(format!(
                "anomaly.contamination must be in (0, 0.5], got {}",
                a.contamination
            ));
        }
        if a.n_estimators == 0 {
            errors.push("anomaly.n_estimators must be > 0".to_string());
        }
        if a.max_samples < 2 {
            errors.push(format!("anomaly.max_samples must be >= 2, got {}", a.max_samples));
        }
        if !(-1.0..=1.0).contains(&a.serious_threshold) {
            errors.push(format!(
                "anomaly.serious_threshold must be within [-1, 1], got {}",
                a.serious_threshold
            ));
        }

        for pattern in &self.environment.benign_stderr_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(format!("environment.benign_stderr_patterns: invalid pattern {:?}: {}", pattern, e));
            }
        }

        let mut seen = HashSet::new();
        let mut builtin_count = 0;
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                errors.push(format!("stages[{}].name must not be empty", i));
            } else if !seen.insert(stage.name.as_str()) {
                errors.push(format!("stages[{}].name {:?} is duplicated", i, stage.name));
            }
            match stage.kind {
                StageKind::Command => {
                    if stage.program.as_deref().map_or(true, |p| p.trim().is_empty()) {
                        errors.push(format!("stages[{}] ({}) is a command stage without a program", i, stage.name));
                    }
                }
                StageKind::AnomalyDetection => builtin_count += 1,
            }
        }
        if builtin_count > 1 {
            errors.push(format!(
                "at most one anomaly_detection stage is allowed, found {}",
                builtin_count
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Scheduler Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between full pipeline runs.
    ///
    /// Can be overridden by the `PULSE_INTERVAL_SECS` env var.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds between due-checks of the scheduler loop.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Run the pipeline immediately at startup instead of one interval later.
    #[serde(default)]
    pub run_on_start: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_interval_secs() -> u64 { defaults::PIPELINE_INTERVAL_SECS }
fn default_poll_secs() -> u64 { defaults::SCHEDULER_POLL_SECS }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            poll_secs: default_poll_secs(),
            run_on_start: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

// ============================================================================
// Environment Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Extra variables set on every stage. Override the built-in ones.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Regexes for stderr lines that are noise, not errors.
    #[serde(default = "default_benign_patterns")]
    pub benign_stderr_patterns: Vec<String>,
}

fn default_benign_patterns() -> Vec<String> {
    defaults::BENIGN_STDERR_PATTERNS
        .iter()
        .map(|p| regex::escape(p))
        .collect()
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            vars: BTreeMap::new(),
            benign_stderr_patterns: default_benign_patterns(),
        }
    }
}

// ============================================================================
// Anomaly Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Expected outlier fraction.
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Sentiment score at or below which an anomaly is serious.
    #[serde(default = "default_serious_threshold")]
    pub serious_threshold: f64,

    /// Assert the alert on every pass regardless of the data.
    #[serde(default)]
    pub force_alert: bool,
}

fn default_contamination() -> f64 { defaults::CONTAMINATION }
fn default_seed() -> u64 { defaults::MODEL_SEED }
fn default_n_estimators() -> usize { defaults::N_ESTIMATORS }
fn default_max_samples() -> usize { defaults::MAX_SAMPLES }
fn default_serious_threshold() -> f64 { defaults::SERIOUS_SENTIMENT_THRESHOLD }

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            seed: default_seed(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            serious_threshold: default_serious_threshold(),
            force_alert: false,
        }
    }
}

// ============================================================================
// Paths Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Input of the anomaly engine.
    #[serde(default = "default_emotion_results")]
    pub emotion_results: PathBuf,

    #[serde(default = "default_anomaly_results")]
    pub anomaly_results: PathBuf,

    #[serde(default = "default_anomalous_posts")]
    pub anomalous_posts: PathBuf,

    #[serde(default = "default_alert_flag")]
    pub alert_flag: PathBuf,
}

fn default_emotion_results() -> PathBuf { PathBuf::from(defaults::EMOTION_RESULTS_PATH) }
fn default_anomaly_results() -> PathBuf { PathBuf::from(defaults::ANOMALY_RESULTS_PATH) }
fn default_anomalous_posts() -> PathBuf { PathBuf::from(defaults::ANOMALOUS_POSTS_PATH) }
fn default_alert_flag() -> PathBuf { PathBuf::from(defaults::ALERT_FLAG_PATH) }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            emotion_results: default_emotion_results(),
            anomaly_results: default_anomaly_results(),
            anomalous_posts: default_anomalous_posts(),
            alert_flag: default_alert_flag(),
        }
    }
}

// ============================================================================
// Stage Config
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    #[default]
    Command,
    AnomalyDetection,
}

/// One `[[stages]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,

    #[serde(default)]
    pub kind: StageKind,

    #[serde(default = "default_duration")]
    pub duration: DurationClass,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn default_duration() -> DurationClass { DurationClass::Medium }

impl StageConfig {
    /// A `python scripts/<name>.py` stage.
    pub fn script(name: &str, duration: DurationClass) -> Self {
        Self {
            name: name.to_string(),
            kind: StageKind::Command,
            duration,
            program: Some(defaults::STAGE_PROGRAM.to_string()),
            args: vec![format!("scripts/{}.py", name)],
            working_dir: None,
        }
    }

    pub fn anomaly_detection() -> Self {
        Self {
            name: "anomaly_detection".to_string(),
            kind: StageKind::AnomalyDetection,
            duration: DurationClass::Short,
            program: None,
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn descriptor(&self) -> StageDescriptor {
        let command = match self.kind {
            StageKind::Command => StageCommand::External {
                program: self.program.clone().unwrap_or_default(),
                args: self.args.clone(),
                working_dir: self.working_dir.clone(),
            },
            StageKind::AnomalyDetection => StageCommand::AnomalyDetection,
        };
        StageDescriptor {
            name: self.name.clone(),
            command,
            duration: self.duration,
        }
    }
}

/// Collection → preprocessing/translation → emotion → sentiment → anomaly → forecast.
fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::script("data_collection", DurationClass::Long),
        StageConfig::script("preprocessing", DurationClass::Long),
        StageConfig::script("emotion_detection", DurationClass::Medium),
        StageConfig::script("sentiment_analysis", DurationClass::Medium),
        StageConfig::anomaly_detection(),
        StageConfig::script("sentiment_forecasting", DurationClass::Medium),
    ]
}

// ============================================================================
// Tests
// ============================================================================
