//! Task and progress ledgers
//!
//! The TaskLedger holds qualitative knowledge (facts, design decisions,
//! failed approaches); the ProgressLedger holds the numeric counters that
//! drive convergence and replanning. Both are owned by a `LedgerManager`,
//! one per run, which is the only writer.

mod action;
mod error;
mod manager;
mod progress;
mod task;

pub use action::{ActionKind, ActionRecord};
pub use error::LedgerError;
pub use manager::{ArtifactStats, LedgerManager, LedgerSnapshot, SNAPSHOT_VERSION};
pub use progress::{IterationSnapshot, ProgressLedger, ProgressLimits, sanitize_quality};
pub use task::{DesignDecision, Fact, FailedApproach, SummaryLimits, TaskLedger};
