//! tl - quality-driven Two-Loop orchestrator
//!
//! CLI entry point for simulating runs and inspecting ledger snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use twoloop::agent::AgentPipeline;
use twoloop::agent::scripted::{ScriptedGenerator, ScriptedImprover, ScriptedReviewer};
use twoloop::cli::{Cli, Command, LedgerCommand, OutputFormat};
use twoloop::config::{Config, load_log_level};
use twoloop::ledger::{ArtifactStats, LedgerManager};
use twoloop::orchestrator::{Orchestrator, PipelineKind, RunResult, RunState, RunStatus};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("twoloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("twoloop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Ledger { command } => match command {
            LedgerCommand::Show { path } => {
                debug!(?path, "main: matched LedgerCommand::Show");
                cmd_ledger_show(&path)
            }
            LedgerCommand::Status { path, format } => {
                debug!(?path, %format, "main: matched LedgerCommand::Status");
                cmd_ledger_status(&path, format)
            }
        },
        Command::Simulate {
            pipeline,
            scores,
            fail_generator,
            request_improvements,
            output,
            project_name,
            format,
        } => {
            debug!(%pipeline, ?scores, fail_generator, request_improvements, ?output, "main: matched Simulate command");
            let options = SimulateOptions {
                pipeline,
                scores,
                fail_generator,
                request_improvements,
                output,
                project_name,
                format,
            };
            cmd_simulate(&config, options).await
        }
        Command::Config { pipeline } => {
            debug!(?pipeline, "main: matched Config command");
            cmd_config(&config, pipeline)
        }
    }
}

/// Print the combined task and progress context of a snapshot
fn cmd_ledger_show(path: &Path) -> Result<()> {
    debug!(?path, "cmd_ledger_show: called");
    let manager = LedgerManager::from_file(path).context(format!("Failed to load ledger {}", path.display()))?;

    println!(
        "{} {} ({})",
        "Project:".bold(),
        manager.project_name(),
        manager.project_id()
    );
    println!();
    println!("{}", manager.get_combined_context());

    if !manager.actions().is_empty() {
        println!();
        println!("{}", "## Actions".bold());
        for action in manager.actions() {
            let marker = if action.success { "ok".green() } else { "failed".red() };
            let quality = action
                .quality_after
                .map(|q| format!(" quality={:.2}", q))
                .unwrap_or_default();
            let error = action
                .error_message
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default();
            println!(
                "- {} [{}]{} {}ms{}",
                action.label(),
                marker,
                quality,
                action.duration_ms,
                error
            );
        }
    }
    Ok(())
}

/// Print the status view of a snapshot
fn cmd_ledger_status(path: &Path, format: OutputFormat) -> Result<()> {
    debug!(?path, %format, "cmd_ledger_status: called");
    let manager = LedgerManager::from_file(path).context(format!("Failed to load ledger {}", path.display()))?;
    let status = RunStatus::from_progress(snapshot_state(&manager), manager.progress());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            println!("{:20} {}", "State:".bold(), status.state);
            println!(
                "{:20} {}/{}",
                "Iteration:".bold(),
                status.current_iteration,
                status.max_iterations
            );
            println!(
                "{:20} {:.2} (target {:.2})",
                "Best quality:".bold(),
                status.best_quality_score,
                status.target_quality
            );
            println!("{:20} {}", "Stagnation:".bold(), status.stagnation_counter);
            println!("{:20} {}", "Replans:".bold(), status.replan_count);
        }
    }
    Ok(())
}

/// State a saved run ended in
///
/// Snapshots written mid-run carry no termination reason.
fn snapshot_state(manager: &LedgerManager) -> RunState {
    match manager.termination() {
        Some(reason) => reason.state(),
        None if manager.progress().is_converged() => RunState::Converged,
        None if manager.progress().history().next().is_none() => RunState::Idle,
        None => RunState::Running,
    }
}

struct SimulateOptions {
    pipeline: PipelineKind,
    scores: Vec<f64>,
    fail_generator: bool,
    request_improvements: bool,
    output: PathBuf,
    project_name: String,
    format: OutputFormat,
}

/// Run the orchestrator with scripted agents
async fn cmd_simulate(config: &Config, options: SimulateOptions) -> Result<()> {
    debug!(pipeline = %options.pipeline, "cmd_simulate: called");
    fs::create_dir_all(&options.output)
        .context(format!("Failed to create output directory {}", options.output.display()))?;

    let mut generator = ScriptedGenerator::new(simulated_files(options.pipeline));
    if options.fail_generator {
        generator = generator.failing("simulated generator failure");
    }
    let mut reviewer = ScriptedReviewer::new(options.scores.clone());
    if options.request_improvements {
        reviewer = reviewer.requesting_improvements();
    }
    let pipeline = AgentPipeline::new(Arc::new(generator), Arc::new(reviewer))
        .with_improver(Arc::new(ScriptedImprover::new()));

    let orchestrator_config = config.orchestrator_config(options.pipeline);
    let mut orchestrator = Orchestrator::new(options.pipeline.to_string(), orchestrator_config, pipeline)
        .context("Invalid orchestrator configuration")?;

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cmd_simulate: ctrl_c received, cancelling run");
            cancel.cancel();
        }
    });

    let mut stats = ArtifactStats::new();
    stats.insert("scores".to_string(), options.scores.len());

    let project_id = format!("sim-{}", uuid::Uuid::now_v7());
    let result = orchestrator
        .run(&project_id, &options.project_name, &options.output, &stats)
        .await
        .context("Run failed")?;

    let snapshot = orchestrator.snapshot_path(&options.output);
    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_result(&result, &snapshot),
    }
    Ok(())
}

fn simulated_files(kind: PipelineKind) -> Vec<String> {
    let files: &[&str] = match kind {
        PipelineKind::Presentation => &["index.html", "slides.css"],
        PipelineKind::Scaffold => &["Cargo.toml", "src/main.rs"],
        PipelineKind::ScreenDesign => &["screens.json", "flow.md"],
    };
    files.iter().map(|f| f.to_string()).collect()
}

fn print_result(result: &RunResult, snapshot: &Path) {
    let outcome = if !result.success {
        "FAILED".red().bold()
    } else if result.quality_achieved {
        "CONVERGED".green().bold()
    } else {
        "NOT CONVERGED".yellow().bold()
    };
    println!("{} {}", outcome, result.termination);
    println!("{:20} {}", "Run:".bold(), result.run_id);
    println!(
        "{:20} {:.2} (target {:.2})",
        "Quality:".bold(),
        result.final_quality_score,
        result.target_quality
    );
    println!("{:20} {}", "Iterations:".bold(), result.iterations_completed);
    println!("{:20} {}", "Replans:".bold(), result.replans);
    println!("{:20} {}", "Files:".bold(), result.generated_files.len());
    if let Some(error) = &result.error_message {
        println!("{:20} {}", "Error:".bold(), error);
    }
    println!("{:20} {}", "Ledger:".bold(), snapshot.display());
}

/// Print resolved configuration as YAML
fn cmd_config(config: &Config, pipeline: Option<PipelineKind>) -> Result<()> {
    debug!(?pipeline, "cmd_config: called");
    let kinds: Vec<PipelineKind> = match pipeline {
        Some(kind) => vec![kind],
        None => PipelineKind::ALL.to_vec(),
    };

    let resolved: std::collections::BTreeMap<PipelineKind, _> = kinds
        .into_iter()
        .map(|kind| (kind, config.orchestrator_config(kind)))
        .collect();
    let yaml = serde_yaml::to_string(&resolved).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}
