//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::orchestrator::PipelineKind;

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("twoloop")
        .join("logs")
        .join("twoloop.log")
}

/// tl - quality-driven Two-Loop orchestrator
#[derive(Debug, Parser)]
#[command(
    name = "tl",
    about = "Quality-driven Two-Loop orchestrator with task and progress ledgers",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/twoloop/logs/twoloop.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect a saved ledger snapshot
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },

    /// Run the orchestrator with scripted agents replaying quality scores
    Simulate {
        /// Pipeline preset to use
        #[arg(short, long, default_value = "presentation")]
        pipeline: PipelineKind,

        /// Comma-separated review scores, replayed in order
        #[arg(short, long, value_delimiter = ',', required = true)]
        scores: Vec<f64>,

        /// Make the generator fail at iteration 0
        #[arg(long)]
        fail_generator: bool,

        /// Have the reviewer ask for improvements on scores below target
        #[arg(long)]
        request_improvements: bool,

        /// Output directory for generated files and the ledger snapshot
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Project name recorded in the ledger
        #[arg(long, default_value = "simulation")]
        project_name: String,

        /// Output format for the run result
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the resolved orchestrator configuration
    Config {
        /// Only show this pipeline
        #[arg(short, long)]
        pipeline: Option<PipelineKind>,
    },
}

/// Ledger snapshot subcommands
#[derive(Debug, Subcommand)]
pub enum LedgerCommand {
    /// Print the combined task and progress context
    Show {
        /// Path to the snapshot file
        path: PathBuf,
    },

    /// Print the status view of a snapshot
    Status {
        /// Path to the snapshot file
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for status and result output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_ledger_show() {
        let cli = Cli::parse_from(["tl", "ledger", "show", "out/ledger.json"]);
        match cli.command {
            Command::Ledger {
                command: LedgerCommand::Show { path },
            } => assert_eq!(path, PathBuf::from("out/ledger.json")),
            other => panic!("Expected ledger show, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_ledger_status_json() {
        let cli = Cli::parse_from(["tl", "ledger", "status", "ledger.json", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Ledger {
                command: LedgerCommand::Status {
                    format: OutputFormat::Json,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_cli_parse_simulate() {
        let cli = Cli::parse_from([
            "tl",
            "simulate",
            "--pipeline",
            "scaffold",
            "--scores",
            "0.5,0.6,0.9",
            "--request-improvements",
            "--output",
            "/tmp/out",
        ]);
        match cli.command {
            Command::Simulate {
                pipeline,
                scores,
                fail_generator,
                request_improvements,
                output,
                project_name,
                format,
            } => {
                assert_eq!(pipeline, PipelineKind::Scaffold);
                assert_eq!(scores, vec![0.5, 0.6, 0.9]);
                assert!(!fail_generator);
                assert!(request_improvements);
                assert_eq!(output, PathBuf::from("/tmp/out"));
                assert_eq!(project_name, "simulation");
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("Expected simulate, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_simulate_requires_scores() {
        assert!(Cli::try_parse_from(["tl", "simulate"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_pipeline() {
        let cli = Cli::parse_from(["tl", "config", "--pipeline", "screen-design"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                pipeline: Some(PipelineKind::ScreenDesign)
            }
        ));
    }

    #[test]
    fn test_cli_with_global_flags() {
        let cli = Cli::parse_from(["tl", "config", "-c", "/path/to/config.yml", "--log-level", "debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("twoloop/logs/twoloop.log"));
    }
}
