//! Run state and status polling

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::ledger::ProgressLedger;

/// Where a run is in the Two-Loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run started yet
    #[default]
    Idle,
    Running,
    /// Stagnation counter reached the threshold
    Stagnating,
    Replanning,
    /// Target quality reached
    Converged,
    /// Iteration or replan budget spent
    Exhausted,
    Cancelled,
    /// Generator failed at iteration 0
    Failed,
}

impl RunState {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stagnating => write!(f, "stagnating"),
            Self::Replanning => write!(f, "replanning"),
            Self::Converged => write!(f, "converged"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Read-only view of a run for external pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: RunState,
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub best_quality_score: f64,
    pub target_quality: f64,
    pub stagnation_counter: u32,
    pub replan_count: u32,
}

impl RunStatus {
    /// Build a status from a progress ledger
    pub fn from_progress(state: RunState, progress: &ProgressLedger) -> Self {
        Self {
            state,
            current_iteration: progress.current_iteration(),
            max_iterations: progress.limits().max_iterations,
            best_quality_score: progress.best_quality_score(),
            target_quality: progress.limits().target_quality,
            stagnation_counter: progress.stagnation_counter(),
            replan_count: progress.replan_count(),
        }
    }
}

/// Cloneable, non-blocking handle onto a run's latest status
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<RunStatus>,
}

impl StatusHandle {
    pub(crate) fn new(rx: watch::Receiver<RunStatus>) -> Self {
        Self { rx }
    }

    /// Latest published status
    pub fn get_status(&self) -> RunStatus {
        debug!("StatusHandle::get_status: called");
        self.rx.borrow().clone()
    }

    /// Wait until the status changes
    ///
    /// Returns false once the orchestrator has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
