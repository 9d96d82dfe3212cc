//! ActionRecord - one entry per agent invocation

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What an agent invocation was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Analyze,
    Generate,
    Review,
    Improve,
    ReReview,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyze => write!(f, "analyze"),
            Self::Generate => write!(f, "generate"),
            Self::Review => write!(f, "review"),
            Self::Improve => write!(f, "improve"),
            Self::ReReview => write!(f, "re_review"),
        }
    }
}

/// Record of a single agent invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub agent_name: String,
    pub action_kind: ActionKind,
    pub success: bool,
    pub quality_before: Option<f64>,
    pub quality_after: Option<f64>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    /// Create a successful record with no quality or timing data
    pub fn new(agent_name: impl Into<String>, action_kind: ActionKind) -> Self {
        let agent_name = agent_name.into();
        debug!(%agent_name, %action_kind, "ActionRecord::new: called");
        Self {
            agent_name,
            action_kind,
            success: true,
            quality_before: None,
            quality_after: None,
            duration_ms: 0,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Builder: set quality before and after the action
    pub fn with_quality(mut self, before: Option<f64>, after: Option<f64>) -> Self {
        self.quality_before = before;
        self.quality_after = after;
        self
    }

    /// Builder: set duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Builder: mark failed with an error message
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }

    /// Short label used in iteration snapshots
    pub fn label(&self) -> String {
        format!("{}:{}", self.agent_name, self.action_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let record = ActionRecord::new("html-reviewer", ActionKind::Review)
            .with_quality(Some(0.5), Some(0.62))
            .with_duration(Duration::from_millis(1500));

        assert!(record.success);
        assert_eq!(record.quality_before, Some(0.5));
        assert_eq!(record.quality_after, Some(0.62));
        assert_eq!(record.duration_ms, 1500);
        assert_eq!(record.label(), "html-reviewer:review");
    }

    #[test]
    fn test_failed() {
        let record = ActionRecord::new("fixer", ActionKind::Improve).failed("no changes applied");
        assert!(!record.success);
        assert_eq!(record.error_message.as_deref(), Some("no changes applied"));
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&ActionKind::ReReview).unwrap();
        assert_eq!(json, "\"re_review\"");
        assert_eq!(ActionKind::ReReview.to_string(), "re_review");
    }
}
