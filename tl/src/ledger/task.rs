//! TaskLedger - qualitative knowledge accumulated during a run
//!
//! Facts, design decisions and failed approaches are append-only. The
//! digest returned by `get_context_summary` is injected verbatim into agent
//! prompts, so it keeps only the most recent entries of each kind and is
//! truncated to a character budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// A timestamped fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// A timestamped strategic choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDecision {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// An abandoned approach and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedApproach {
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// Bounds on the TaskLedger digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryLimits {
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,

    #[serde(default = "default_max_decisions")]
    pub max_decisions: usize,

    #[serde(default = "default_max_failed_approaches")]
    pub max_failed_approaches: usize,

    /// Character budget for the whole digest
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_facts() -> usize {
    10
}

fn default_max_decisions() -> usize {
    5
}

fn default_max_failed_approaches() -> usize {
    5
}

fn default_max_chars() -> usize {
    2000
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_facts: default_max_facts(),
            max_decisions: default_max_decisions(),
            max_failed_approaches: default_max_failed_approaches(),
            max_chars: default_max_chars(),
        }
    }
}

/// Append-only record of facts, decisions and failed approaches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLedger {
    #[serde(default)]
    facts: Vec<Fact>,

    #[serde(default)]
    design_decisions: Vec<DesignDecision>,

    #[serde(default)]
    failed_approaches: Vec<FailedApproach>,

    #[serde(skip)]
    limits: SummaryLimits,
}

impl TaskLedger {
    /// Create an empty ledger with default digest limits
    pub fn new() -> Self {
        debug!("TaskLedger::new: called");
        Self::default()
    }

    /// Create an empty ledger with custom digest limits
    pub fn with_limits(limits: SummaryLimits) -> Self {
        debug!(?limits, "TaskLedger::with_limits: called");
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Replace the digest limits (contents are untouched)
    pub fn set_limits(&mut self, limits: SummaryLimits) {
        self.limits = limits;
    }

    pub fn limits(&self) -> &SummaryLimits {
        &self.limits
    }

    pub fn add_fact(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(%text, "TaskLedger::add_fact: called");
        self.facts.push(Fact {
            text,
            recorded_at: Utc::now(),
        });
    }

    pub fn add_design_decision(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(%text, "TaskLedger::add_design_decision: called");
        self.design_decisions.push(DesignDecision {
            text,
            recorded_at: Utc::now(),
        });
    }

    pub fn mark_approach_failed(&mut self, description: impl Into<String>) {
        let description = description.into();
        debug!(%description, "TaskLedger::mark_approach_failed: called");
        self.failed_approaches.push(FailedApproach {
            description,
            recorded_at: Utc::now(),
        });
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn design_decisions(&self) -> &[DesignDecision] {
        &self.design_decisions
    }

    pub fn failed_approaches(&self) -> &[FailedApproach] {
        &self.failed_approaches
    }

    /// Whether anything has been recorded
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.design_decisions.is_empty() && self.failed_approaches.is_empty()
    }

    /// Bounded digest of the most recent entries
    ///
    /// Contains no timestamps, so equal contents give equal digests.
    pub fn get_context_summary(&self) -> String {
        debug!(
            facts = self.facts.len(),
            decisions = self.design_decisions.len(),
            failed = self.failed_approaches.len(),
            "TaskLedger::get_context_summary: called"
        );
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("## Task Knowledge\n");
        push_section(
            &mut out,
            "Facts",
            self.facts.iter().map(|f| f.text.as_str()),
            self.facts.len(),
            self.limits.max_facts,
        );
        push_section(
            &mut out,
            "Design Decisions",
            self.design_decisions.iter().map(|d| d.text.as_str()),
            self.design_decisions.len(),
            self.limits.max_decisions,
        );
        push_section(
            &mut out,
            "Failed Approaches",
            self.failed_approaches.iter().map(|f| f.description.as_str()),
            self.failed_approaches.len(),
            self.limits.max_failed_approaches,
        );

        truncate_chars(out, self.limits.max_chars)
    }
}

fn push_section<'a>(out: &mut String, title: &str, items: impl Iterator<Item = &'a str>, len: usize, keep: usize) {
    if len == 0 || keep == 0 {
        return;
    }
    out.push_str(&format!("### {}\n", title));
    let skipped = len.saturating_sub(keep);
    if skipped > 0 {
        out.push_str(&format!("- ({} earlier omitted)\n", skipped));
    }
    for item in items.skip(skipped) {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

/// Truncate to at most `max_chars` characters, marking the cut
pub(crate) fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - marker_len).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}
