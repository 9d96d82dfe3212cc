//! Orchestrator configuration types

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ledger::{ProgressLimits, SummaryLimits};

/// Configuration errors caught by `OrchestratorConfig::validate`
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1")]
    NoIterations,

    #[error("target_quality {0} is outside (0, 1]")]
    TargetOutOfRange(f64),

    #[error("epsilon {0} must be a non-negative number")]
    InvalidEpsilon(f64),

    #[error("stagnation_threshold must be at least 1")]
    NoStagnationThreshold,

    #[error("snapshot_file must not be empty")]
    EmptySnapshotFile,
}

/// Whether a replan re-runs the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplanPolicy {
    /// Generator runs only at iteration 0; replans change what the
    /// reviewer and improver see through the strategy
    #[default]
    Revise,
    /// Generator runs again on the iteration after each replan
    Regenerate,
}

/// The three content pipelines sharing the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    Presentation,
    Scaffold,
    ScreenDesign,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [Self::Presentation, Self::Scaffold, Self::ScreenDesign];
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Presentation => write!(f, "presentation"),
            Self::Scaffold => write!(f, "scaffold"),
            Self::ScreenDesign => write!(f, "screen-design"),
        }
    }
}

impl std::str::FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "presentation" | "html" => Ok(Self::Presentation),
            "scaffold" => Ok(Self::Scaffold),
            "screen-design" | "screen_design" | "screen" => Ok(Self::ScreenDesign),
            _ => Err(format!(
                "Unknown pipeline: {}. Use: presentation, scaffold, or screen-design",
                s
            )),
        }
    }
}

/// Thresholds and policies for one orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_target_quality")]
    pub target_quality: f64,

    /// Consecutive non-improving iterations before a replan
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,

    #[serde(default = "default_max_replans")]
    pub max_replans: u32,

    /// Minimum gain over the best score that counts as improvement
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Ordered strategy identifiers; the first is active at start
    #[serde(default)]
    pub strategies: Vec<String>,

    #[serde(default)]
    pub replan_policy: ReplanPolicy,

    #[serde(default)]
    pub summary: SummaryLimits,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Snapshot file name, relative to the run's output directory
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

fn default_max_iterations() -> u32 {
    5
}

fn default_target_quality() -> f64 {
    0.8
}

fn default_stagnation_threshold() -> u32 {
    2
}

fn default_max_replans() -> u32 {
    2
}

fn default_epsilon() -> f64 {
    0.02
}

fn default_history_limit() -> usize {
    100
}

fn default_snapshot_file() -> String {
    "ledger.json".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            target_quality: default_target_quality(),
            stagnation_threshold: default_stagnation_threshold(),
            max_replans: default_max_replans(),
            epsilon: default_epsilon(),
            strategies: Vec::new(),
            replan_policy: ReplanPolicy::default(),
            summary: SummaryLimits::default(),
            history_limit: default_history_limit(),
            snapshot_file: default_snapshot_file(),
        }
    }
}

impl OrchestratorConfig {
    /// Preset for one of the content pipelines
    pub fn for_pipeline(kind: PipelineKind) -> Self {
        debug!(%kind, "OrchestratorConfig::for_pipeline: called");
        let strategies = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect();
        match kind {
            PipelineKind::Presentation => Self {
                max_iterations: 5,
                target_quality: 0.85,
                strategies: strategies(&["narrative", "data-driven", "visual-first"]),
                ..Self::default()
            },
            PipelineKind::Scaffold => Self {
                max_iterations: 3,
                target_quality: 0.8,
                max_replans: 1,
                strategies: strategies(&["layered", "feature-sliced"]),
                ..Self::default()
            },
            PipelineKind::ScreenDesign => Self {
                max_iterations: 4,
                target_quality: 0.8,
                strategies: strategies(&["wireframe-first", "component-first", "flow-first"]),
                ..Self::default()
            },
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("OrchestratorConfig::validate: called");
        if self.max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.target_quality.is_nan() || self.target_quality <= 0.0 || self.target_quality > 1.0 {
            return Err(ConfigError::TargetOutOfRange(self.target_quality));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if self.stagnation_threshold == 0 {
            return Err(ConfigError::NoStagnationThreshold);
        }
        if self.snapshot_file.trim().is_empty() {
            return Err(ConfigError::EmptySnapshotFile);
        }
        Ok(())
    }

    /// Limits for the run's ProgressLedger
    pub fn progress_limits(&self) -> ProgressLimits {
        ProgressLimits {
            max_iterations: self.max_iterations,
            target_quality: self.target_quality,
            stagnation_threshold: self.stagnation_threshold,
            max_replans: self.max_replans,
            epsilon: self.epsilon,
            history_limit: self.history_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.target_quality, 0.8);
        assert_eq!(config.stagnation_threshold, 2);
        assert_eq!(config.replan_policy, ReplanPolicy::Revise);
        assert_eq!(config.snapshot_file, "ledger.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid_and_distinct() {
        for kind in PipelineKind::ALL {
            let config = OrchestratorConfig::for_pipeline(kind);
            assert!(config.validate().is_ok(), "{kind} preset invalid");
            assert!(!config.strategies.is_empty());
        }
        assert_eq!(OrchestratorConfig::for_pipeline(PipelineKind::Presentation).target_quality, 0.85);
        assert_eq!(OrchestratorConfig::for_pipeline(PipelineKind::Scaffold).max_iterations, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = OrchestratorConfig {
            max_iterations: 0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoIterations));

        let config = OrchestratorConfig {
            target_quality: 1.5,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TargetOutOfRange(1.5)));

        // A zero target would converge before any review
        let config = OrchestratorConfig {
            target_quality: 0.0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TargetOutOfRange(0.0)));

        let config = OrchestratorConfig {
            target_quality: 1.0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));

        let config = OrchestratorConfig {
            epsilon: -0.1,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEpsilon(-0.1)));

        let config = OrchestratorConfig {
            stagnation_threshold: 0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoStagnationThreshold));
    }

    #[test]
    fn test_deserialize_minimal() {
        let yaml = r#"
target_quality: 0.9
replan_policy: regenerate
"#;
        let config: OrchestratorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.target_quality, 0.9);
        assert_eq!(config.replan_policy, ReplanPolicy::Regenerate);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.summary.max_chars, 2000);
    }

    #[test]
    fn test_progress_limits() {
        let config = OrchestratorConfig {
            max_iterations: 7,
            epsilon: 0.05,
            ..OrchestratorConfig::default()
        };
        let limits = config.progress_limits();
        assert_eq!(limits.max_iterations, 7);
        assert_eq!(limits.epsilon, 0.05);
        assert_eq!(limits.history_limit, 100);
    }

    #[test]
    fn test_pipeline_kind_parse() {
        assert_eq!("presentation".parse::<PipelineKind>(), Ok(PipelineKind::Presentation));
        assert_eq!("Screen-Design".parse::<PipelineKind>(), Ok(PipelineKind::ScreenDesign));
        assert!("unknown".parse::<PipelineKind>().is_err());
        assert_eq!(PipelineKind::ScreenDesign.to_string(), "screen-design");
    }
}
