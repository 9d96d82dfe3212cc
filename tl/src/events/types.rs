//! Iteration event type

use serde::{Deserialize, Serialize};

use crate::ledger::IterationSnapshot;
use crate::orchestrator::RunState;

/// Published once per completed iteration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterationEvent {
    pub run_id: String,
    /// Orchestrator name (e.g. "presentation")
    pub pipeline: String,
    pub project_id: String,
    pub snapshot: IterationSnapshot,
    /// Run state right after the iteration was recorded
    pub state: RunState,
    pub stagnation_counter: u32,
}

impl IterationEvent {
    pub fn iteration_index(&self) -> u32 {
        self.snapshot.iteration_index
    }
}
