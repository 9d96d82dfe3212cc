//! twoloop - quality-driven Two-Loop orchestration
//!
//! An outer loop consults a TaskLedger (facts, design decisions, failed
//! approaches) and a ProgressLedger (iteration counters, best quality,
//! stagnation) to decide whether to continue, replan or stop. An inner loop
//! dispatches a pipeline of agents for each iteration: generate once,
//! review every iteration, improve and re-review on request.
//!
//! ```rust,ignore
//! let pipeline = AgentPipeline::new(generator, reviewer).with_improver(improver);
//! let mut orchestrator = Orchestrator::for_pipeline(PipelineKind::Presentation, pipeline)?;
//! let result = orchestrator.run("p-1", "Quarterly review", "out/", &stats).await?;
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod events;
pub mod ledger;
pub mod orchestrator;

pub use agent::{Agent, AgentContext, AgentError, AgentPipeline, AgentResult, AgentRole, QualityIssue, Severity};
pub use config::Config;
pub use events::{IterationBus, IterationEvent};
pub use ledger::{ActionKind, ActionRecord, ArtifactStats, LedgerError, LedgerManager, ProgressLedger, TaskLedger};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, PipelineKind, ReplanPolicy, RunResult, RunState, RunStatus, StatusHandle,
    TerminationReason,
};
