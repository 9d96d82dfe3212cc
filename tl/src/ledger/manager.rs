//! LedgerManager - owns both ledgers for one run
//!
//! Every agent outcome flows through here into the TaskLedger and the
//! action log; iteration results flow into the ProgressLedger. The whole
//! state is persisted as one JSON snapshot, written atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::orchestrator::{OrchestratorConfig, TerminationReason};

use super::action::ActionRecord;
use super::error::LedgerError;
use super::progress::{IterationSnapshot, ProgressLedger, sanitize_quality};
use super::task::TaskLedger;

/// Snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Input artifact counts by kind (e.g. "requirements" -> 12)
pub type ArtifactStats = BTreeMap<String, usize>;

/// On-disk form of a LedgerManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub project_id: String,
    pub project_name: String,
    pub saved_at: DateTime<Utc>,
    pub task_ledger: TaskLedger,
    pub progress_ledger: ProgressLedger,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    /// Why the run stopped; absent while a run is in flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
}

impl LedgerSnapshot {
    /// Read and version-check a snapshot file
    pub fn read(path: &Path) -> Result<Self, LedgerError> {
        debug!(?path, "LedgerSnapshot::read: called");
        let content = fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;
        let snapshot: Self = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

/// Composition root for the task and progress ledgers
#[derive(Debug, Clone, Default)]
pub struct LedgerManager {
    project_id: String,
    project_name: String,
    task: TaskLedger,
    progress: ProgressLedger,
    actions: Vec<ActionRecord>,
    /// Index of the first action of the current iteration
    iteration_start: usize,
    termination: Option<TerminationReason>,
}

impl LedgerManager {
    /// Create an empty manager with default limits
    pub fn new() -> Self {
        debug!("LedgerManager::new: called");
        Self::default()
    }

    /// Reset both ledgers and seed them for a project
    pub fn initialize_from_project(
        &mut self,
        project_id: &str,
        project_name: &str,
        artifact_stats: &ArtifactStats,
        config: &OrchestratorConfig,
    ) {
        debug!(%project_id, %project_name, kinds = artifact_stats.len(), "LedgerManager::initialize_from_project: called");
        self.project_id = project_id.to_string();
        self.project_name = project_name.to_string();
        self.task = TaskLedger::with_limits(config.summary.clone());
        self.progress = ProgressLedger::new(config.progress_limits());
        self.actions.clear();
        self.iteration_start = 0;
        self.termination = None;

        self.task.add_fact(format!("Project '{}' ({})", project_name, project_id));
        let total: usize = artifact_stats.values().sum();
        for (kind, count) in artifact_stats {
            self.task.add_fact(format!("{}: {}", kind, count));
        }
        if total == 0 {
            self.task.add_fact("No input artifacts found");
        } else {
            self.task.add_fact(format!("Total input artifacts: {}", total));
        }

        self.task.add_fact(format!(
            "Config: max_iterations={}, stagnation_threshold={}, max_replans={}, target_quality={:.2}, epsilon={}",
            config.max_iterations, config.stagnation_threshold, config.max_replans, config.target_quality, config.epsilon
        ));
        if !config.strategies.is_empty() {
            self.task
                .add_fact(format!("Strategies (in order): {}", config.strategies.join(", ")));
        }
        info!(%project_id, total_artifacts = total, "Ledgers initialized");
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn task(&self) -> &TaskLedger {
        &self.task
    }

    pub fn progress(&self) -> &ProgressLedger {
        &self.progress
    }

    /// Every action recorded so far, in execution order
    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    /// Why the run stopped, once it has
    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn set_termination(&mut self, reason: TerminationReason) {
        debug!(%reason, "LedgerManager::set_termination: called");
        self.termination = Some(reason);
    }

    pub fn add_fact(&mut self, text: impl Into<String>) {
        self.task.add_fact(text);
    }

    pub fn add_design_decision(&mut self, text: impl Into<String>) {
        self.task.add_design_decision(text);
    }

    /// Append an action; a failed action also becomes a failed approach
    pub fn record_agent_action(&mut self, record: ActionRecord) {
        debug!(
            agent = %record.agent_name,
            kind = %record.action_kind,
            success = record.success,
            "LedgerManager::record_agent_action: called"
        );
        if !record.success {
            let reason = record.error_message.as_deref().unwrap_or("unknown error");
            warn!(agent = %record.agent_name, kind = %record.action_kind, %reason, "Agent action failed");
            self.task.mark_approach_failed(format!(
                "{} ({}) failed at iteration {}: {}",
                record.agent_name,
                record.action_kind,
                self.progress.current_iteration(),
                reason
            ));
        }
        self.actions.push(record);
    }

    /// Close the current iteration with its final quality
    ///
    /// Returns the snapshot appended to the progress history.
    pub fn record_iteration_complete(&mut self, quality: f64) -> IterationSnapshot {
        debug!(%quality, iteration = self.progress.current_iteration(), "LedgerManager::record_iteration_complete: called");
        let quality = sanitize_quality(quality);
        self.progress.record_iteration_complete(quality);

        let actions_taken = self.actions[self.iteration_start..]
            .iter()
            .map(ActionRecord::label)
            .collect();
        self.iteration_start = self.actions.len();

        let snapshot = IterationSnapshot {
            iteration_index: self.progress.current_iteration(),
            quality_achieved: quality,
            best_quality_score: self.progress.best_quality_score(),
            actions_taken,
            replans_so_far: self.progress.replan_count(),
            recorded_at: Utc::now(),
        };
        self.progress.push_history(snapshot.clone());
        info!(
            iteration = snapshot.iteration_index,
            quality = %snapshot.quality_achieved,
            best = %snapshot.best_quality_score,
            stagnation = self.progress.stagnation_counter(),
            "Iteration complete"
        );
        snapshot
    }

    /// Record a strategy change and spend one replan
    pub fn record_replan(&mut self, decision: impl Into<String>, failed_approach: impl Into<String>) {
        debug!("LedgerManager::record_replan: called");
        self.task.add_design_decision(decision);
        self.task.mark_approach_failed(failed_approach);
        self.progress.mark_replan();
    }

    pub fn should_continue(&self) -> bool {
        self.progress.should_continue()
    }

    pub fn should_trigger_replan(&self) -> bool {
        self.progress.should_trigger_replan()
    }

    pub fn advance_iteration(&mut self) -> bool {
        self.progress.advance_iteration()
    }

    /// Both ledger digests for prompt injection
    pub fn get_combined_context(&self) -> String {
        debug!("LedgerManager::get_combined_context: called");
        let task = self.task.get_context_summary();
        let progress = self.progress.get_context_summary();
        if task.is_empty() {
            progress
        } else {
            format!("{}\n{}", task, progress)
        }
    }

    /// Full state as a snapshot value
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            saved_at: Utc::now(),
            task_ledger: self.task.clone(),
            progress_ledger: self.progress.clone(),
            actions: self.actions.clone(),
            termination: self.termination,
        }
    }

    /// Write the snapshot atomically (temp file in the same directory, then rename)
    pub fn save_to_file(&self, path: &Path) -> Result<(), LedgerError> {
        debug!(?path, "LedgerManager::save_to_file: called");
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;

        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LedgerError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| LedgerError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| LedgerError::io(path, e.error))?;

        info!(path = %path.display(), actions = self.actions.len(), "Ledger snapshot saved");
        Ok(())
    }

    /// Replace the whole state with a snapshot from disk
    ///
    /// Digest limits configured on this manager are kept.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), LedgerError> {
        debug!(?path, "LedgerManager::load_from_file: called");
        let snapshot = LedgerSnapshot::read(path)?;
        let limits = self.task.limits().clone();

        self.project_id = snapshot.project_id;
        self.project_name = snapshot.project_name;
        self.task = snapshot.task_ledger;
        self.task.set_limits(limits);
        self.progress = snapshot.progress_ledger;
        self.actions = snapshot.actions;
        self.iteration_start = self.actions.len();
        self.termination = snapshot.termination;

        info!(path = %path.display(), "Ledger snapshot loaded");
        Ok(())
    }

    /// Build a manager from a snapshot file
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }
}
