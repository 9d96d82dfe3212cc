//! Scripted agents that replay fixed outcomes
//!
//! Used by `tl simulate` to exercise the loop without a content backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::context::AgentContext;
use super::result::{AgentResult, QualityIssue, Severity};
use super::traits::{Agent, AgentError};

/// Generator that reports a fixed list of files, or fails
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    name: String,
    files: Vec<String>,
    failure: Option<String>,
}

impl ScriptedGenerator {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            name: "scripted-generator".to_string(),
            files,
            failure: None,
        }
    }

    /// Builder: rename the agent
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: make every call fail with the given message
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[async_trait]
impl Agent for ScriptedGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, AgentError> {
        debug!(agent = %self.name, iteration = ctx.iteration, "ScriptedGenerator::execute: called");
        if let Some(message) = &self.failure {
            return Ok(AgentResult::failure(message.clone()));
        }
        let files = self
            .files
            .iter()
            .map(|f| ctx.output_dir.join(f).display().to_string())
            .collect();
        Ok(AgentResult::success()
            .with_artifacts(files)
            .with_notes(format!("generated {} file(s)", self.files.len())))
    }
}

/// Reviewer that replays a list of quality scores
///
/// Each call consumes the next score; once the list is exhausted the last
/// score repeats. An empty list makes every review fail.
#[derive(Debug)]
pub struct ScriptedReviewer {
    name: String,
    scores: Vec<f64>,
    cursor: AtomicUsize,
    request_improvements: bool,
}

impl ScriptedReviewer {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            name: "scripted-reviewer".to_string(),
            scores,
            cursor: AtomicUsize::new(0),
            request_improvements: false,
        }
    }

    /// Builder: rename the agent
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: flag `needs_improvement` whenever the score is below threshold
    pub fn requesting_improvements(mut self) -> Self {
        self.request_improvements = true;
        self
    }

    /// Number of reviews performed so far
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedReviewer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, AgentError> {
        let call = self.cursor.fetch_add(1, Ordering::SeqCst);
        debug!(agent = %self.name, call, iteration = ctx.iteration, "ScriptedReviewer::execute: called");
        let Some(last) = self.scores.last() else {
            return Ok(AgentResult::failure("no scores scripted"));
        };
        let score = self.scores.get(call).copied().unwrap_or(*last);
        let below = score < ctx.quality_threshold;
        let issues = if below {
            vec![
                QualityIssue::new("overall", Severity::Major, format!("score {score:.2} below target"))
                    .with_fix_hint("address reviewer findings"),
            ]
        } else {
            Vec::new()
        };
        Ok(AgentResult::reviewed(score, issues).with_needs_improvement(self.request_improvements && below))
    }
}

/// Improver that reports every generated file as changed
#[derive(Debug, Clone)]
pub struct ScriptedImprover {
    name: String,
}

impl ScriptedImprover {
    pub fn new() -> Self {
        Self {
            name: "scripted-improver".to_string(),
        }
    }
}

impl Default for ScriptedImprover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ScriptedImprover {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, AgentError> {
        debug!(agent = %self.name, issues = ctx.issues.len(), "ScriptedImprover::execute: called");
        Ok(AgentResult::success()
            .with_artifacts(ctx.artifacts.clone())
            .with_notes(format!("addressed {} issue(s)", ctx.issues.len())))
    }
}
