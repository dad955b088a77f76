//! Level-triggered alert decision
//!
//! Every pass re-derives the state from the current record set alone:
//! - `force` or any anomalous record → `ALERT`
//! - otherwise → `NO_ALERT`
//!
//! Severity only selects the message. Data-driven alerts take precedence over
//! the forced message so a forced pass still reports a real spike.

use super::{AlertError, AlertFlag};
use crate::types::{AlertPayload, AlertSeverity, AlertState, RecordSet};

#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub state: AlertState,
    /// `Some` iff `state == Alert`.
    pub severity: Option<AlertSeverity>,
    pub anomalous_count: usize,
    pub serious_count: usize,
}

/// What applying a decision did to the flag.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagUpdate {
    Asserted(AlertPayload),
    Cleared { was_present: bool },
}

impl AlertDecision {
    pub fn evaluate(set: &RecordSet, force: bool, serious_threshold: f64) -> Self {
        let anomalous_count = set.anomaly_count();
        let serious_count = set.serious_anomalies(serious_threshold).count();

        let severity = if serious_count > 0 {
            Some(AlertSeverity::SeriousSpike)
        } else if anomalous_count > 0 {
            Some(AlertSeverity::Unusual)
        } else if force {
            Some(AlertSeverity::Forced)
        } else {
            None
        };

        Self {
            state: if severity.is_some() {
                AlertState::Alert
            } else {
                AlertState::NoAlert
            },
            severity,
            anomalous_count,
            serious_count,
        }
    }

    pub fn apply(&self, flag: &AlertFlag) -> Result<FlagUpdate, AlertError> {
        match self.severity {
            Some(severity) => flag.assert(severity).map(FlagUpdate::Asserted),
            None => flag
                .clear()
                .map(|was_present| FlagUpdate::Cleared { was_present }),
        }
    }
}
