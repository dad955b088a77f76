//! Alert state and payload types.

use serde::{Deserialize, Serialize};

/// Two-state alert condition. Level-triggered: re-derived every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    NoAlert,
    Alert,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertState::NoAlert => write!(f, "NO_ALERT"),
            AlertState::Alert => write!(f, "ALERT"),
        }
    }
}

/// Why an alert was raised. Determines the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// At least one anomaly with strongly negative sentiment.
    SeriousSpike,
    /// Anomalies present, none strongly negative.
    Unusual,
    /// Raised only by the manual override.
    Forced,
}

impl AlertSeverity {
    pub fn message(self) -> &'static str {
        match self {
            AlertSeverity::SeriousSpike => {
                "Alert: Sudden spike in public anger, fear, or disgust detected."
            }
            AlertSeverity::Unusual => "Alert: Unusual sentiment activity detected.",
            AlertSeverity::Forced => "Alert: Forced test alert (manual override).",
        }
    }

    /// Recover the severity from a persisted message line.
    pub fn from_message(line: &str) -> Option<Self> {
        let line = line.trim();
        [
            AlertSeverity::SeriousSpike,
            AlertSeverity::Unusual,
            AlertSeverity::Forced,
        ]
        .into_iter()
        .find(|s| s.message() == line)
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::SeriousSpike => write!(f, "SERIOUS_SPIKE"),
            AlertSeverity::Unusual => write!(f, "UNUSUAL"),
            AlertSeverity::Forced => write!(f, "FORCED"),
        }
    }
}

/// Content of the persisted alert flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// `None` when the flag was written by something other than this engine.
    pub severity: Option<AlertSeverity>,
    pub message: String,
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub raised_at: String,
}

impl AlertPayload {
    /// Human-readable file body: message line, then a `Time:` line.
    pub fn render(&self) -> String {
        format!("{}\nTime: {}", self.message, self.raised_at)
    }

    /// Parse a rendered body. Unknown message text is kept verbatim.
    pub fn parse(body: &str) -> Self {
        let mut lines = body.lines();
        let message = lines.next().unwrap_or_default().trim().to_string();
        let raised_at = lines
            .find_map(|l| l.trim().strip_prefix("Time:").map(|t| t.trim().to_string()))
            .unwrap_or_default();
        Self {
            severity: AlertSeverity::from_message(&message),
            message,
            raised_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_parse_recovers_severity() {
        let payload = AlertPayload {
            severity: Some(AlertSeverity::SeriousSpike),
            message: AlertSeverity::SeriousSpike.message().to_string(),
            raised_at: "2026-01-02 03:04:05".to_string(),
        };
        let parsed = AlertPayload::parse(&payload.render());
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_parse_foreign_message() {
        let parsed = AlertPayload::parse("something else\n");
        assert_eq!(parsed.severity, None);
        assert_eq!(parsed.message, "something else");
        assert!(parsed.raised_at.is_empty());
    }
}
