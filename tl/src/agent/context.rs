//! AgentContext - per-run context handed to every agent

use std::path::{Path, PathBuf};

use tracing::debug;

use super::result::{QualityIssue, Severity};

/// Context passed to every agent invocation
///
/// Owned by the orchestrator and refreshed in place before each agent call.
/// Agents only ever see `&AgentContext`.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub project_id: String,
    pub project_name: String,

    /// Zero-based iteration index
    pub iteration: u32,

    /// TaskLedger digest (facts, decisions, failed approaches)
    pub task_summary: String,

    /// ProgressLedger digest (counters, quality trail)
    pub progress_summary: String,

    /// Issues from the most recent successful review
    pub issues: Vec<QualityIssue>,

    /// Quality score the run is trying to reach
    pub quality_threshold: f64,

    /// Last known quality score for this run
    pub current_quality: f64,

    /// Active strategy identifier, if the pipeline declares strategies
    pub strategy: Option<String>,

    /// Files generated so far in this run
    pub artifacts: Vec<String>,

    /// Where agents place their output
    pub output_dir: PathBuf,
}

impl AgentContext {
    /// Create a new context for a run
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        quality_threshold: f64,
    ) -> Self {
        let project_id = project_id.into();
        debug!(%project_id, %quality_threshold, "AgentContext::new: called");
        Self {
            project_id,
            project_name: project_name.into(),
            iteration: 0,
            task_summary: String::new(),
            progress_summary: String::new(),
            issues: Vec::new(),
            quality_threshold,
            current_quality: 0.0,
            strategy: None,
            artifacts: Vec::new(),
            output_dir: output_dir.into(),
        }
    }

    /// Output directory for this run
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Both ledger digests joined for prompt injection
    pub fn combined_summary(&self) -> String {
        match (self.task_summary.is_empty(), self.progress_summary.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.task_summary.clone(),
            (true, false) => self.progress_summary.clone(),
            (false, false) => format!("{}\n{}", self.task_summary, self.progress_summary),
        }
    }

    /// Issues at or above the given severity, most severe first
    pub fn issues_at_least(&self, severity: Severity) -> Vec<&QualityIssue> {
        let mut issues: Vec<&QualityIssue> = self.issues.iter().filter(|i| i.severity <= severity).collect();
        issues.sort_by_key(|i| i.severity);
        issues
    }

    /// Whether the current quality already meets the threshold
    pub fn meets_threshold(&self) -> bool {
        self.current_quality >= self.quality_threshold
    }
}
