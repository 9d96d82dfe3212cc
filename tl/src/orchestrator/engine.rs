//! Orchestrator - drives the Two-Loop
//!
//! Outer loop: consult the ledgers, decide whether to continue or replan.
//! Inner loop: run the agent pipeline for one iteration (generate once,
//! review every iteration, improve and re-review when asked).

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentContext, AgentPipeline, AgentResult};
use crate::events::{IterationBus, IterationEvent};
use crate::ledger::{ActionKind, ActionRecord, ArtifactStats, IterationSnapshot, LedgerError, LedgerManager, ProgressLedger};

use super::config::{ConfigError, OrchestratorConfig, PipelineKind, ReplanPolicy};
use super::result::{RunResult, TerminationReason};
use super::status::{RunState, RunStatus, StatusHandle};
use super::strategy::StrategyPlanner;

/// Error message recorded for an interrupted agent call
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Outcome of one guarded agent call
enum Invocation {
    Finished(AgentResult),
    Cancelled,
}

/// How an iteration's inner loop ended
enum IterationOutcome {
    Completed,
    GeneratorFailed,
    Cancelled,
}

/// Per-run values that live outside the ledgers
#[derive(Debug, Default)]
struct RunProgress {
    /// Last known quality score
    quality: f64,
    /// A review has succeeded at least once
    reviewed: bool,
    generated_files: Vec<String>,
    /// Generator should run at the start of the next iteration
    regenerate: bool,
    error_message: Option<String>,
}

impl RunProgress {
    fn add_files(&mut self, files: &[String]) {
        for file in files {
            if !self.generated_files.contains(file) {
                self.generated_files.push(file.clone());
            }
        }
    }

    fn quality_before(&self) -> Option<f64> {
        self.reviewed.then_some(self.quality)
    }
}

/// Quality-driven Two-Loop orchestrator
///
/// One instance drives one pipeline. Each call to `run` builds a fresh
/// `LedgerManager`; nothing is shared between instances.
pub struct Orchestrator {
    name: String,
    config: OrchestratorConfig,
    pipeline: AgentPipeline,
    ledger: LedgerManager,
    planner: StrategyPlanner,
    state: RunState,
    cancel: CancellationToken,
    status_tx: watch::Sender<RunStatus>,
    events: Option<Arc<IterationBus>>,
}

impl Orchestrator {
    /// Create an orchestrator for a pipeline
    pub fn new(
        name: impl Into<String>,
        config: OrchestratorConfig,
        pipeline: AgentPipeline,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        debug!(%name, ?pipeline, "Orchestrator::new: called");
        config.validate()?;

        let progress = ProgressLedger::new(config.progress_limits());
        let (status_tx, _) = watch::channel(RunStatus::from_progress(RunState::Idle, &progress));
        Ok(Self {
            name,
            planner: StrategyPlanner::new(config.strategies.clone()),
            config,
            pipeline,
            ledger: LedgerManager::new(),
            state: RunState::Idle,
            cancel: CancellationToken::new(),
            status_tx,
            events: None,
        })
    }

    /// Create an orchestrator with a pipeline kind's preset configuration
    pub fn for_pipeline(kind: PipelineKind, pipeline: AgentPipeline) -> Result<Self, ConfigError> {
        Self::new(kind.to_string(), OrchestratorConfig::for_pipeline(kind), pipeline)
    }

    /// Publish iteration events to a bus
    pub fn with_event_bus(mut self, bus: Arc<IterationBus>) -> Self {
        debug!(name = %self.name, "Orchestrator::with_event_bus: called");
        self.events = Some(bus);
        self
    }

    /// Use an externally owned cancellation token (e.g. a child of a host token)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this orchestrator's runs
    ///
    /// Once cancelled it stays cancelled: later runs end immediately.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Handle for polling status from another task
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle::new(self.status_tx.subscribe())
    }

    /// Latest status snapshot; never mutates the ledgers
    pub fn get_status(&self) -> RunStatus {
        self.status_tx.borrow().clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Ledgers of the most recent run
    pub fn ledger(&self) -> &LedgerManager {
        &self.ledger
    }

    /// Where `run` writes the ledger snapshot for an output directory
    pub fn snapshot_path(&self, output_dir: &Path) -> std::path::PathBuf {
        output_dir.join(&self.config.snapshot_file)
    }

    /// Run the Two-Loop until convergence, budget exhaustion, cancellation or
    /// a fatal generator failure
    ///
    /// Only snapshot persistence errors are returned as `Err`.
    pub async fn run(
        &mut self,
        project_id: &str,
        project_name: &str,
        output_dir: impl AsRef<Path>,
        artifact_stats: &ArtifactStats,
    ) -> Result<RunResult, LedgerError> {
        let output_dir = output_dir.as_ref();
        let run_id = uuid::Uuid::now_v7().to_string();
        debug!(%run_id, name = %self.name, %project_id, ?output_dir, "Orchestrator::run: called");
        info!(
            "Starting {} run {} for '{}' (target {:.2}, max_iterations {})",
            self.name, run_id, project_name, self.config.target_quality, self.config.max_iterations
        );

        self.ledger = LedgerManager::new();
        self.ledger
            .initialize_from_project(project_id, project_name, artifact_stats, &self.config);
        self.planner = StrategyPlanner::new(self.config.strategies.clone());
        if let Some(strategy) = self.planner.current() {
            self.ledger.add_design_decision(format!("Adopt strategy '{}'", strategy));
        }

        let mut ctx = AgentContext::new(project_id, project_name, output_dir, self.config.target_quality);
        let mut run = RunProgress::default();
        self.set_state(RunState::Running);

        let termination = loop {
            if self.cancel.is_cancelled() {
                info!(%run_id, "Run cancelled at iteration boundary");
                break TerminationReason::Cancelled;
            }
            if !self.ledger.should_continue() {
                debug!(%run_id, "run: should_continue is false");
                break self.budget_reason();
            }

            let iteration = self.ledger.progress().current_iteration();
            info!(
                "{} iteration {}/{} (best {:.2})",
                self.name,
                iteration + 1,
                self.config.max_iterations,
                self.ledger.progress().best_quality_score()
            );

            match self.run_iteration(iteration, &mut ctx, &mut run).await {
                IterationOutcome::Completed => {}
                IterationOutcome::GeneratorFailed => break TerminationReason::GeneratorFailed,
                IterationOutcome::Cancelled => break TerminationReason::Cancelled,
            }

            let snapshot = self.ledger.record_iteration_complete(run.quality);
            let mut exhausted = false;
            if self.ledger.progress().is_converged() {
                debug!(%run_id, "run: target reached");
            } else if self.ledger.should_trigger_replan() {
                self.replan(&mut ctx, &mut run);
            } else if self.ledger.progress().replan_budget_exhausted() {
                info!(%run_id, "Stagnating with no replans left");
                exhausted = true;
            }

            let state = self.post_iteration_state(exhausted);
            self.set_state(state);
            self.emit_iteration(&run_id, project_id, snapshot);

            let more = self.ledger.advance_iteration();
            self.publish_status();
            if exhausted {
                break TerminationReason::ReplanBudgetExhausted;
            }
            if !more {
                break self.budget_reason();
            }
        };

        self.set_state(termination.state());
        self.ledger.set_termination(termination);
        self.ledger.save_to_file(&self.snapshot_path(output_dir))?;

        let progress = self.ledger.progress();
        let result = RunResult {
            run_id,
            success: termination != TerminationReason::GeneratorFailed,
            final_quality_score: progress.best_quality_score(),
            target_quality: self.config.target_quality,
            quality_achieved: progress.is_converged(),
            iterations_completed: progress.current_iteration(),
            replans: progress.replan_count(),
            generated_files: run.generated_files,
            termination,
            error_message: run.error_message,
        };
        info!(
            "{} run {} finished: {} after {} iteration(s), quality {:.2}/{:.2}, {} replan(s)",
            self.name,
            result.run_id,
            termination,
            result.iterations_completed,
            result.final_quality_score,
            result.target_quality,
            result.replans
        );
        Ok(result)
    }

    /// Inner loop for a single iteration
    async fn run_iteration(&mut self, iteration: u32, ctx: &mut AgentContext, run: &mut RunProgress) -> IterationOutcome {
        debug!(iteration, regenerate = run.regenerate, "run_iteration: called");
        ctx.iteration = iteration;

        if iteration == 0
            && let Some(analyzer) = self.pipeline.analyzer()
        {
            let Some(analysis) = self.execute_step(&analyzer, ActionKind::Analyze, ctx, None).await else {
                return IterationOutcome::Cancelled;
            };
            if analysis.success && !analysis.notes.is_empty() {
                self.ledger.add_fact(format!("Analysis: {}", analysis.notes));
            }
        }

        if iteration == 0 || run.regenerate {
            run.regenerate = false;
            let generator = self.pipeline.generator();
            let Some(generated) = self.execute_step(&generator, ActionKind::Generate, ctx, None).await else {
                return IterationOutcome::Cancelled;
            };
            if generated.success {
                run.add_files(&generated.artifacts);
                ctx.artifacts = run.generated_files.clone();
            } else if iteration == 0 {
                warn!(error = ?generated.error_message, "Generator failed at iteration 0, aborting run");
                run.error_message = generated.error_message;
                return IterationOutcome::GeneratorFailed;
            } else {
                warn!(iteration, error = ?generated.error_message, "Regeneration failed, keeping previous artifacts");
            }
        }

        let reviewer = self.pipeline.reviewer();
        let Some(review) = self
            .execute_step(&reviewer, ActionKind::Review, ctx, run.quality_before())
            .await
        else {
            return IterationOutcome::Cancelled;
        };
        if !review.success {
            warn!(iteration, quality = %run.quality, "Review failed, keeping last known quality");
            return IterationOutcome::Completed;
        }
        apply_review(&review, ctx, run);

        if !review.needs_improvement || review.quality_score >= self.config.target_quality {
            return IterationOutcome::Completed;
        }
        let Some(improver) = self.pipeline.improver() else {
            debug!("run_iteration: improvement requested but no improver configured");
            return IterationOutcome::Completed;
        };

        let Some(improved) = self
            .execute_step(&improver, ActionKind::Improve, ctx, run.quality_before())
            .await
        else {
            return IterationOutcome::Cancelled;
        };
        if !improved.success || improved.artifacts.is_empty() {
            debug!(success = improved.success, "run_iteration: improver applied no changes, skipping re-review");
            return IterationOutcome::Completed;
        }
        run.add_files(&improved.artifacts);
        ctx.artifacts = run.generated_files.clone();

        let Some(rereview) = self
            .execute_step(&reviewer, ActionKind::ReReview, ctx, run.quality_before())
            .await
        else {
            return IterationOutcome::Cancelled;
        };
        if rereview.success {
            apply_review(&rereview, ctx, run);
        } else {
            warn!(iteration, "Re-review failed, keeping first review score");
        }
        IterationOutcome::Completed
    }

    /// Invoke one agent and record the action
    ///
    /// Returns None when the call was cancelled.
    async fn execute_step(
        &mut self,
        agent: &Arc<dyn Agent>,
        kind: ActionKind,
        ctx: &mut AgentContext,
        quality_before: Option<f64>,
    ) -> Option<AgentResult> {
        self.sync_context(ctx);
        let name = agent.name().to_string();
        debug!(agent = %name, %kind, iteration = ctx.iteration, "execute_step: called");

        let started = Instant::now();
        let invocation = invoke(agent.as_ref(), ctx, &self.cancel).await;
        let record = ActionRecord::new(&name, kind).with_duration(started.elapsed());

        match invocation {
            Invocation::Cancelled => {
                info!(agent = %name, %kind, "Agent call cancelled");
                self.ledger
                    .record_agent_action(record.with_quality(quality_before, None).failed(CANCELLED_MESSAGE));
                None
            }
            Invocation::Finished(result) => {
                let is_review = matches!(kind, ActionKind::Review | ActionKind::ReReview);
                let quality_after = (result.success && is_review).then_some(result.quality_score);
                let mut record = record.with_quality(quality_before, quality_after);
                if !result.success {
                    let message = result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "agent reported failure".to_string());
                    record = record.failed(message);
                }
                self.ledger.record_agent_action(record);
                Some(result)
            }
        }
    }

    /// Switch strategy and spend one replan
    fn replan(&mut self, ctx: &mut AgentContext, run: &mut RunProgress) {
        self.set_state(RunState::Replanning);
        let progress = self.ledger.progress();
        let stagnant = progress.stagnation_counter();
        let best = progress.best_quality_score();

        let switch = self.planner.switch();
        info!(from = ?switch.from, to = ?switch.to, best = %best, "Replanning after {} stagnant iteration(s)", stagnant);
        self.ledger
            .record_replan(switch.decision(), switch.failed_approach(best, stagnant));

        if self.config.replan_policy == ReplanPolicy::Regenerate {
            run.regenerate = true;
        }
        ctx.strategy = self.planner.current().map(String::from);
    }

    /// Refresh the ledger-derived parts of the context
    fn sync_context(&self, ctx: &mut AgentContext) {
        ctx.task_summary = self.ledger.task().get_context_summary();
        ctx.progress_summary = self.ledger.progress().get_context_summary();
        ctx.strategy = self.planner.current().map(String::from);
    }

    fn post_iteration_state(&self, exhausted: bool) -> RunState {
        let progress = self.ledger.progress();
        if progress.is_converged() {
            RunState::Converged
        } else if exhausted {
            RunState::Exhausted
        } else if progress.is_stagnating() {
            RunState::Stagnating
        } else {
            RunState::Running
        }
    }

    fn budget_reason(&self) -> TerminationReason {
        if self.ledger.progress().is_converged() {
            TerminationReason::Converged
        } else {
            TerminationReason::IterationBudgetExhausted
        }
    }

    fn set_state(&mut self, state: RunState) {
        debug!(from = %self.state, to = %state, "set_state: called");
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx
            .send_replace(RunStatus::from_progress(self.state, self.ledger.progress()));
    }

    fn emit_iteration(&self, run_id: &str, project_id: &str, snapshot: IterationSnapshot) {
        let Some(bus) = &self.events else {
            return;
        };
        bus.emit(IterationEvent {
            run_id: run_id.to_string(),
            pipeline: self.name.clone(),
            project_id: project_id.to_string(),
            snapshot,
            state: self.state,
            stagnation_counter: self.ledger.progress().stagnation_counter(),
        });
    }
}

/// Take a successful review's score and issues
fn apply_review(review: &AgentResult, ctx: &mut AgentContext, run: &mut RunProgress) {
    run.quality = review.quality_score;
    run.reviewed = true;
    ctx.current_quality = review.quality_score;
    ctx.issues = review.issues.clone();
}

/// Run an agent, racing it against cancellation
///
/// Errors and panics become failed results; invalid results are rejected
/// here so nothing downstream sees an out-of-range score.
async fn invoke(agent: &dyn Agent, ctx: &AgentContext, cancel: &CancellationToken) -> Invocation {
    let call = AssertUnwindSafe(agent.execute(ctx)).catch_unwind();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Invocation::Cancelled,
        outcome = call => match outcome {
            Ok(Ok(result)) => match result.validated() {
                Ok(result) => Invocation::Finished(result),
                Err(e) => {
                    warn!(agent = agent.name(), error = %e, "Agent returned an invalid result");
                    Invocation::Finished(AgentResult::failure(e.to_string()))
                }
            },
            Ok(Err(e)) if e.is_cancelled() => Invocation::Cancelled,
            Ok(Err(e)) => {
                warn!(agent = agent.name(), error = %e, "Agent returned an error");
                Invocation::Finished(AgentResult::failure(e.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(agent = agent.name(), %message, "Agent panicked");
                Invocation::Finished(AgentResult::failure(format!("agent panicked: {}", message)))
            }
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::{ScriptedGenerator, ScriptedImprover, ScriptedReviewer};
    use tempfile::TempDir;

    fn pipeline(scores: Vec<f64>) -> AgentPipeline {
        AgentPipeline::new(
            Arc::new(ScriptedGenerator::new(vec!["index.html".to_string()])),
            Arc::new(ScriptedReviewer::new(scores)),
        )
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = OrchestratorConfig {
            max_iterations: 0,
            ..OrchestratorConfig::default()
        };
        assert!(matches!(
            Orchestrator::new("x", config, pipeline(vec![0.5])),
            Err(ConfigError::NoIterations)
        ));
    }

    #[test]
    fn test_initial_status_is_idle() {
        let orchestrator = Orchestrator::for_pipeline(PipelineKind::Scaffold, pipeline(vec![0.5])).unwrap();
        let status = orchestrator.get_status();
        assert_eq!(status.state, RunState::Idle);
        assert_eq!(status.max_iterations, 3);
        assert_eq!(orchestrator.name(), "scaffold");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_converges_on_first_iteration() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = Orchestrator::new("test", OrchestratorConfig::default(), pipeline(vec![0.9])).unwrap();

        let result = orchestrator
            .run("p", "n", temp_dir.path(), &ArtifactStats::new())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.quality_achieved);
        assert_eq!(result.iterations_completed, 1);
        assert_eq!(result.termination, TerminationReason::Converged);
        assert_eq!(orchestrator.get_status().state, RunState::Converged);
        assert!(temp_dir.path().join("ledger.json").exists());
    }

    #[tokio::test]
    async fn test_improver_triggers_rereview() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = AgentPipeline::new(
            Arc::new(ScriptedGenerator::new(vec!["a.html".to_string()])),
            Arc::new(ScriptedReviewer::new(vec![0.5, 0.9]).requesting_improvements()),
        )
        .with_improver(Arc::new(ScriptedImprover::new()));
        let mut orchestrator = Orchestrator::new("test", OrchestratorConfig::default(), pipeline).unwrap();

        let result = orchestrator
            .run("p", "n", temp_dir.path(), &ArtifactStats::new())
            .await
            .unwrap();

        let kinds: Vec<ActionKind> = orchestrator.ledger().actions().iter().map(|a| a.action_kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Generate,
                ActionKind::Review,
                ActionKind::Improve,
                ActionKind::ReReview
            ]
        );
        assert_eq!(result.final_quality_score, 0.9);
        assert_eq!(result.iterations_completed, 1);
    }

    #[test]
    fn test_run_progress_dedups_files() {
        let mut run = RunProgress::default();
        run.add_files(&["a".to_string(), "b".to_string()]);
        run.add_files(&["b".to_string(), "c".to_string()]);
        assert_eq!(run.generated_files, vec!["a", "b", "c"]);
        assert_eq!(run.quality_before(), None);
        run.reviewed = true;
        run.quality = 0.4;
        assert_eq!(run.quality_before(), Some(0.4));
    }
}
