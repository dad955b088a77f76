//! Stage execution environment and stderr filtering

use regex::RegexSet;
use std::collections::BTreeMap;

use crate::config::EnvironmentConfig;

/// Variables every stage gets: UTF-8 text I/O and quiet ML libraries.
pub const BASE_STAGE_ENV: &[(&str, &str)] = &[
    ("PYTHONIOENCODING", "utf-8"),
    ("PYTHONUTF8", "1"),
    ("TF_CPP_MIN_LOG_LEVEL", "3"),
    ("TF_ENABLE_ONEDNN_OPTS", "0"),
];

/// Variables layered over the inherited process environment.
///
/// Built once at startup; identical for every stage and every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageEnvironment {
    vars: BTreeMap<String, String>,
}

impl StageEnvironment {
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let mut vars: BTreeMap<String, String> = BASE_STAGE_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // Configured values win over the built-in ones.
        vars.extend(config.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { vars }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Splits stage stderr into known-benign noise and lines worth reporting.
#[derive(Debug, Clone)]
pub struct LogFilter {
    benign: RegexSet,
}

impl LogFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            benign: RegexSet::new(patterns)?,
        })
    }

    pub fn from_config(config: &EnvironmentConfig) -> Result<Self, regex::Error> {
        Self::new(&config.benign_stderr_patterns)
    }

    pub fn is_benign(&self, line: &str) -> bool {
        self.benign.is_match(line)
    }

    /// `(benign, relevant)` non-blank lines, in order.
    pub fn split<'a>(&self, stderr: &'a str) -> (Vec<&'a str>, Vec<&'a str>) {
        stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .partition(|l| self.is_benign(l))
    }
}
