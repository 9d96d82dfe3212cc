//! Agent trait definition

use async_trait::async_trait;
use thiserror::Error;

use super::context::AgentContext;
use super::result::AgentResult;

/// Errors an agent may return instead of a result
///
/// The orchestrator never propagates these: every variant except
/// `Cancelled` is converted into a failed `AgentResult` and recorded.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Agent call cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] eyre::Report),
}

impl AgentError {
    /// Check if this error means the call was interrupted
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

/// A pluggable unit of work invoked by the orchestrator
///
/// Agents read the context and return a result. Any side effects (writing
/// files, calling a content backend) stay inside the agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name as recorded in the ledger
    fn name(&self) -> &str;

    /// Execute the agent against the current iteration context
    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, AgentError>;
}
