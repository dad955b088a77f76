//! Persisted alert flag
//!
//! Existence of the file is the alert. Its body is the rendered
//! [`AlertPayload`]. Readers poll without locking, so both `assert` and
//! `clear` are single atomic filesystem operations.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::AlertError;
use crate::storage::{remove_if_exists, write_atomic};
use crate::types::{AlertPayload, AlertSeverity, AlertState};

/// Timestamp format of the `Time:` line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct AlertFlag {
    path: PathBuf,
}

impl AlertFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write (or overwrite) the flag, timestamped now.
    pub fn assert(&self, severity: AlertSeverity) -> Result<AlertPayload, AlertError> {
        let payload = AlertPayload {
            severity: Some(severity),
            message: severity.message().to_string(),
            raised_at: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        };
        write_atomic(&self.path, payload.render().as_bytes())
            .map_err(|e| AlertError::Write(self.path.clone(), e))?;
        info!(severity = %severity, path = %self.path.display(), "Alert flag asserted");
        Ok(payload)
    }

    /// Remove the flag. Returns whether one was present.
    pub fn clear(&self) -> Result<bool, AlertError> {
        let removed =
            remove_if_exists(&self.path).map_err(|e| AlertError::Clear(self.path.clone(), e))?;
        if removed {
            info!(path = %self.path.display(), "Alert flag cleared");
        } else {
            debug!(path = %self.path.display(), "No alert flag to clear");
        }
        Ok(removed)
    }

    pub fn state(&self) -> AlertState {
        if self.path.is_file() {
            AlertState::Alert
        } else {
            AlertState::NoAlert
        }
    }

    /// Current payload, or `None` when no alert is active.
    pub fn load(&self) -> Result<Option<AlertPayload>, AlertError> {
        match std::fs::read_to_string(&self.path) {
            Ok(body) => Ok(Some(AlertPayload::parse(&body))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AlertError::Read(self.path.clone(), e)),
        }
    }
}
