//! RunResult - what a finished run reports

use serde::{Deserialize, Serialize};

use super::status::RunState;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Best quality reached the target
    Converged,
    /// All iterations used without reaching the target
    IterationBudgetExhausted,
    /// Stagnating with no replans left
    ReplanBudgetExhausted,
    /// Caller cancelled the run
    Cancelled,
    /// Generator failed at iteration 0
    GeneratorFailed,
}

impl TerminationReason {
    /// Terminal state this reason maps to
    pub fn state(&self) -> RunState {
        match self {
            Self::Converged => RunState::Converged,
            Self::IterationBudgetExhausted | Self::ReplanBudgetExhausted => RunState::Exhausted,
            Self::Cancelled => RunState::Cancelled,
            Self::GeneratorFailed => RunState::Failed,
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::IterationBudgetExhausted => write!(f, "iteration budget exhausted"),
            Self::ReplanBudgetExhausted => write!(f, "replan budget exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::GeneratorFailed => write!(f, "generator failed"),
        }
    }
}

/// Outcome of `Orchestrator::run`
///
/// `success` is false only when the generator failed at iteration 0.
/// Exhausting a budget or being cancelled still reports success; check
/// `quality_achieved` and `termination` for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub success: bool,
    pub final_quality_score: f64,
    pub target_quality: f64,
    pub quality_achieved: bool,
    pub iterations_completed: u32,
    pub replans: u32,
    pub generated_files: Vec<String>,
    pub termination: TerminationReason,
    /// Generator error on the fatal path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
