//! ProgressLedger - numeric counters that drive loop control
//!
//! Tracks iterations, the running best quality, consecutive iterations
//! without meaningful improvement, and replans. The decision functions
//! (`should_continue`, `should_trigger_replan`) are pure reads of these
//! counters against the configured limits.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Number of recent iterations shown in the quality trail
const TRAIL_LEN: usize = 5;

/// Bring a reported quality into [0, 1]; non-finite values count as 0
pub fn sanitize_quality(quality: f64) -> f64 {
    if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 0.0 }
}

/// Limits a ProgressLedger decides against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLimits {
    pub max_iterations: u32,
    pub target_quality: f64,
    pub stagnation_threshold: u32,
    pub max_replans: u32,
    /// Improvements at or below this are treated as no improvement
    pub epsilon: f64,
    /// Maximum iteration snapshots kept in history
    pub history_limit: usize,
}

impl Default for ProgressLimits {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            target_quality: 0.8,
            stagnation_threshold: 2,
            max_replans: 1,
            epsilon: 0.02,
            history_limit: 100,
        }
    }
}

/// Record of one completed iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    /// Zero-based iteration index
    pub iteration_index: u32,
    /// Final quality of this iteration
    pub quality_achieved: f64,
    /// Running best after this iteration
    pub best_quality_score: f64,
    /// Actions recorded during this iteration, as "agent:kind"
    pub actions_taken: Vec<String>,
    pub replans_so_far: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Numeric progress state for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLedger {
    current_iteration: u32,
    best_quality_score: f64,
    stagnation_counter: u32,
    replan_count: u32,
    #[serde(default)]
    history: VecDeque<IterationSnapshot>,
    limits: ProgressLimits,
}

impl Default for ProgressLedger {
    fn default() -> Self {
        Self::new(ProgressLimits::default())
    }
}

impl ProgressLedger {
    /// Create a fresh ledger
    pub fn new(limits: ProgressLimits) -> Self {
        debug!(?limits, "ProgressLedger::new: called");
        Self {
            current_iteration: 0,
            best_quality_score: 0.0,
            stagnation_counter: 0,
            replan_count: 0,
            history: VecDeque::new(),
            limits,
        }
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    pub fn best_quality_score(&self) -> f64 {
        self.best_quality_score
    }

    pub fn stagnation_counter(&self) -> u32 {
        self.stagnation_counter
    }

    pub fn replan_count(&self) -> u32 {
        self.replan_count
    }

    pub fn limits(&self) -> &ProgressLimits {
        &self.limits
    }

    /// Iteration snapshots, oldest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = &IterationSnapshot> {
        self.history.iter()
    }

    /// Record the final quality of an iteration
    ///
    /// Returns true if the quality beat the previous best by more than
    /// epsilon. The best score is raised whenever the quality is strictly
    /// greater, even when the gain is too small to reset stagnation.
    pub fn record_iteration_complete(&mut self, quality: f64) -> bool {
        let quality = sanitize_quality(quality);
        debug!(
            %quality,
            best = %self.best_quality_score,
            stagnation = self.stagnation_counter,
            "ProgressLedger::record_iteration_complete: called"
        );

        let improved = quality - self.best_quality_score > self.limits.epsilon;
        if improved {
            debug!("ProgressLedger::record_iteration_complete: improvement, resetting stagnation");
            self.stagnation_counter = 0;
        } else {
            self.stagnation_counter += 1;
            debug!(
                stagnation = self.stagnation_counter,
                "ProgressLedger::record_iteration_complete: no meaningful improvement"
            );
        }
        if quality > self.best_quality_score {
            self.best_quality_score = quality;
        }
        improved
    }

    /// Append an iteration snapshot, evicting the oldest beyond the limit
    pub fn push_history(&mut self, snapshot: IterationSnapshot) {
        debug!(
            iteration_index = snapshot.iteration_index,
            "ProgressLedger::push_history: called"
        );
        if self.limits.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.limits.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(snapshot);
    }

    /// Stagnating long enough and replan budget remains
    pub fn should_trigger_replan(&self) -> bool {
        let result = self.is_stagnating() && self.replan_count < self.limits.max_replans;
        debug!(
            stagnation = self.stagnation_counter,
            replans = self.replan_count,
            result,
            "ProgressLedger::should_trigger_replan: called"
        );
        result
    }

    /// Stagnating long enough and no replans left
    pub fn replan_budget_exhausted(&self) -> bool {
        self.is_stagnating() && self.replan_count >= self.limits.max_replans
    }

    /// Stagnation counter has reached the threshold
    pub fn is_stagnating(&self) -> bool {
        self.stagnation_counter >= self.limits.stagnation_threshold
    }

    /// Record a replan: uses one unit of replan budget and resets stagnation
    pub fn mark_replan(&mut self) {
        debug!(replans = self.replan_count, "ProgressLedger::mark_replan: called");
        if self.replan_count < self.limits.max_replans {
            self.replan_count += 1;
        }
        self.stagnation_counter = 0;
        info!(
            replans = self.replan_count,
            max_replans = self.limits.max_replans,
            "Replan recorded"
        );
    }

    /// Move to the next iteration
    ///
    /// Returns false once the iteration budget is spent; the counter never
    /// moves past `max_iterations`.
    pub fn advance_iteration(&mut self) -> bool {
        debug!(
            current = self.current_iteration,
            max = self.limits.max_iterations,
            "ProgressLedger::advance_iteration: called"
        );
        if self.current_iteration >= self.limits.max_iterations {
            return false;
        }
        self.current_iteration += 1;
        self.current_iteration < self.limits.max_iterations
    }

    /// Iteration budget remains and target not reached
    pub fn should_continue(&self) -> bool {
        self.current_iteration < self.limits.max_iterations && !self.is_converged()
    }

    /// Best quality has reached the target
    pub fn is_converged(&self) -> bool {
        self.best_quality_score >= self.limits.target_quality
    }

    /// Short textual digest for prompt injection
    pub fn get_context_summary(&self) -> String {
        debug!("ProgressLedger::get_context_summary: called");
        let mut out = format!(
            "## Progress\n\
             - Iteration: {}/{}\n\
             - Best quality: {:.2} (target {:.2})\n\
             - Stagnation: {}/{}\n\
             - Replans: {}/{}\n",
            self.current_iteration,
            self.limits.max_iterations,
            self.best_quality_score,
            self.limits.target_quality,
            self.stagnation_counter,
            self.limits.stagnation_threshold,
            self.replan_count,
            self.limits.max_replans,
        );
        if !self.history.is_empty() {
            let skip = self.history.len().saturating_sub(TRAIL_LEN);
            let trail: Vec<String> = self
                .history
                .iter()
                .skip(skip)
                .map(|s| format!("{:.2}", s.quality_achieved))
                .collect();
            out.push_str(&format!("- Quality trail: {}\n", trail.join(", ")));
        }
        out
    }
}
