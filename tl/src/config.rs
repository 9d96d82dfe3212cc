//! Application configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::orchestrator::{OrchestratorConfig, PipelineKind};

/// Main twoloop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Per-pipeline overrides; pipelines not listed use their preset
    pub pipelines: BTreeMap<PipelineKind, OrchestratorConfig>,
}

impl Config {
    /// Resolve configuration: explicit path, then the working directory, then the user config dir
    ///
    /// Only an explicit path is fatal when unreadable; the other locations are skipped with a warning.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Checked-in overrides next to the run
        let local_config = PathBuf::from(".twoloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Per-user overrides shared by every project
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("twoloop").join("twoloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        for (kind, pipeline) in &config.pipelines {
            pipeline
                .validate()
                .context(format!("Invalid configuration for pipeline '{}'", kind))?;
        }

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Configuration for a pipeline: the override if present, else the preset
    pub fn orchestrator_config(&self, kind: PipelineKind) -> OrchestratorConfig {
        debug!(%kind, overridden = self.pipelines.contains_key(&kind), "Config::orchestrator_config: called");
        self.pipelines
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| OrchestratorConfig::for_pipeline(kind))
    }
}

/// Read just the log level, before logging is initialised
///
/// Errors are swallowed; the full load reports them once logging is up.
pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
    let candidates: Vec<PathBuf> = match config_path {
        Some(path) => vec![path.clone()],
        None => {
            let mut paths = vec![PathBuf::from(".twoloop.yml")];
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("twoloop").join("twoloop.yml"));
            }
            paths
        }
    };

    candidates
        .iter()
        .filter(|path| path.exists())
        .find_map(|path| fs::read_to_string(path).ok())
        .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
        .and_then(|config| config.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ReplanPolicy;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("twoloop.yml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_uses_presets() {
        let config = Config::default();
        assert!(config.log_level.is_none());
        for kind in PipelineKind::ALL {
            assert_eq!(config.orchestrator_config(kind), OrchestratorConfig::for_pipeline(kind));
        }
    }

    #[test]
    fn test_load_explicit_file_with_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
log-level: debug
pipelines:
  scaffold:
    max_iterations: 6
    target_quality: 0.9
    replan_policy: regenerate
    strategies: [monolith, hexagonal]
"#,
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let scaffold = config.orchestrator_config(PipelineKind::Scaffold);
        assert_eq!(scaffold.max_iterations, 6);
        assert_eq!(scaffold.target_quality, 0.9);
        assert_eq!(scaffold.replan_policy, ReplanPolicy::Regenerate);
        assert_eq!(scaffold.strategies, vec!["monolith", "hexagonal"]);
        // Unlisted fields fall back to field defaults
        assert_eq!(scaffold.stagnation_threshold, 2);

        let presentation = config.orchestrator_config(PipelineKind::Presentation);
        assert_eq!(presentation.target_quality, 0.85);
    }

    #[test]
    fn test_load_rejects_invalid_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
pipelines:
  presentation:
    max_iterations: 0
"#,
        );
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(
            err.chain()
                .any(|cause| cause.to_string().contains("max_iterations must be at least 1"))
        );
    }

    #[test]
    fn test_load_missing_explicit_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "log-level: WARN\n");
        assert_eq!(load_log_level(Some(&path)).as_deref(), Some("WARN"));

        let bad = write_config(&temp_dir, "log-level: [not, a, string]\n");
        assert_eq!(load_log_level(Some(&bad)), None);
    }
}
