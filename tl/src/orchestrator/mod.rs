//! Orchestrator module - the Two-Loop driver
//!
//! The outer loop consults the ledgers to continue, replan or stop; the
//! inner loop dispatches the agent pipeline for one iteration.

mod config;
mod engine;
mod result;
mod status;
mod strategy;

pub use config::{ConfigError, OrchestratorConfig, PipelineKind, ReplanPolicy};
pub use engine::{CANCELLED_MESSAGE, Orchestrator};
pub use result::{RunResult, TerminationReason};
pub use status::{RunState, RunStatus, StatusHandle};
pub use strategy::{StrategyPlanner, StrategySwitch};
