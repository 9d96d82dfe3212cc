//! Agent result and quality issue types

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::AgentError;

/// Severity of a quality issue found by a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// A single quality problem reported by a reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Quality dimension (e.g. "structure", "completeness")
    pub dimension: String,
    pub severity: Severity,
    pub description: String,
    /// Suggested fix for the improver
    #[serde(default)]
    pub fix_hint: String,
}

impl QualityIssue {
    /// Create a new quality issue
    pub fn new(dimension: impl Into<String>, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            severity,
            description: description.into(),
            fix_hint: String::new(),
        }
    }

    /// Builder: set fix hint
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = hint.into();
        self
    }
}

/// Uniform value returned by every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,

    /// Quality score in [0, 1]
    pub quality_score: f64,

    #[serde(default)]
    pub issues: Vec<QualityIssue>,

    /// Reviewer signal that the artifact should go through the improver
    #[serde(default)]
    pub needs_improvement: bool,

    /// Files produced or modified by the agent
    #[serde(default)]
    pub artifacts: Vec<String>,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub error_message: Option<String>,
}

impl AgentResult {
    /// Create a successful result with no score
    pub fn success() -> Self {
        debug!("AgentResult::success: called");
        Self {
            success: true,
            quality_score: 0.0,
            issues: Vec::new(),
            needs_improvement: false,
            artifacts: Vec::new(),
            notes: String::new(),
            error_message: None,
        }
    }

    /// Create a failed result carrying an error message
    pub fn failure(message: impl Into<String>) -> Self {
        debug!("AgentResult::failure: called");
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::success()
        }
    }

    /// Create a successful review result
    pub fn reviewed(quality_score: f64, issues: Vec<QualityIssue>) -> Self {
        debug!(%quality_score, issues = issues.len(), "AgentResult::reviewed: called");
        Self {
            quality_score,
            issues,
            ..Self::success()
        }
    }

    /// Builder: set needs_improvement
    pub fn with_needs_improvement(mut self, needs_improvement: bool) -> Self {
        self.needs_improvement = needs_improvement;
        self
    }

    /// Builder: set artifacts
    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Builder: set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Number of critical issues in this result
    pub fn critical_issues(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Critical).count()
    }

    /// Validate the result once at the agent boundary
    ///
    /// Non-finite scores are rejected. Finite scores outside [0, 1] are
    /// clamped. A failed result without an error message gets a generic one.
    pub fn validated(mut self) -> Result<Self, AgentError> {
        debug!(success = self.success, quality_score = %self.quality_score, "AgentResult::validated: called");
        if !self.quality_score.is_finite() {
            return Err(AgentError::InvalidResult(format!(
                "quality score {} is not a finite number",
                self.quality_score
            )));
        }
        if !(0.0..=1.0).contains(&self.quality_score) {
            warn!(quality_score = %self.quality_score, "Agent returned out-of-range quality score, clamping");
            self.quality_score = self.quality_score.clamp(0.0, 1.0);
        }
        if !self.success && self.error_message.is_none() {
            self.error_message = Some("agent reported failure".to_string());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_error_message() {
        let result = AgentResult::failure("backend unavailable");
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("backend unavailable"));
        assert_eq!(result.quality_score, 0.0);
    }

    #[test]
    fn test_validated_clamps_out_of_range() {
        let result = AgentResult::reviewed(1.4, vec![]).validated().unwrap();
        assert_eq!(result.quality_score, 1.0);

        let result = AgentResult::reviewed(-0.2, vec![]).validated().unwrap();
        assert_eq!(result.quality_score, 0.0);
    }

    #[test]
    fn test_validated_rejects_nan() {
        let err = AgentResult::reviewed(f64::NAN, vec![]).validated().unwrap_err();
        assert!(matches!(err, AgentError::InvalidResult(_)));
    }

    #[test]
    fn test_validated_fills_missing_error_message() {
        let mut result = AgentResult::success();
        result.success = false;
        let result = result.validated().unwrap();
        assert_eq!(result.error_message.as_deref(), Some("agent reported failure"));
    }

    #[test]
    fn test_critical_issues() {
        let result = AgentResult::reviewed(
            0.4,
            vec![
                QualityIssue::new("structure", Severity::Critical, "missing sections"),
                QualityIssue::new("style", Severity::Minor, "inconsistent headings").with_fix_hint("use h2"),
                QualityIssue::new("content", Severity::Critical, "empty page"),
            ],
        );
        assert_eq!(result.critical_issues(), 2);
        assert_eq!(result.issues[1].fix_hint, "use h2");
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{"success": true, "quality_score": 0.7}"#;
        let result: AgentResult = serde_json::from_str(json).unwrap();
        assert!(result.success);
        assert!(result.issues.is_empty());
        assert!(!result.needs_improvement);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_severity_serde() {
        let issue = QualityIssue::new("layout", Severity::Major, "overlapping widgets");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""severity":"major""#));
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
