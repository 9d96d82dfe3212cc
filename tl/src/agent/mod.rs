//! Agent contract
//!
//! Every pluggable unit of work (analyze, generate, review, improve) is an
//! [`Agent`]: it reads an [`AgentContext`] and returns an [`AgentResult`].
//! The orchestrator dispatches by pipeline position only.

mod context;
mod pipeline;
mod result;
pub mod scripted;
mod traits;

pub use context::AgentContext;
pub use pipeline::{AgentPipeline, AgentRole};
pub use result::{AgentResult, QualityIssue, Severity};
pub use traits::{Agent, AgentError};
