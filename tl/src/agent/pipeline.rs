//! AgentPipeline - the agents a run dispatches by position

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::Agent;

/// Position of an agent in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Analyzer,
    Generator,
    Reviewer,
    Improver,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyzer => write!(f, "analyzer"),
            Self::Generator => write!(f, "generator"),
            Self::Reviewer => write!(f, "reviewer"),
            Self::Improver => write!(f, "improver"),
        }
    }
}

/// Agents for one run: optional analyzer, mandatory generator and
/// reviewer, optional improver
#[derive(Clone)]
pub struct AgentPipeline {
    analyzer: Option<Arc<dyn Agent>>,
    generator: Arc<dyn Agent>,
    reviewer: Arc<dyn Agent>,
    improver: Option<Arc<dyn Agent>>,
}

impl AgentPipeline {
    /// Create a pipeline with the two mandatory roles
    pub fn new(generator: Arc<dyn Agent>, reviewer: Arc<dyn Agent>) -> Self {
        debug!(generator = generator.name(), reviewer = reviewer.name(), "AgentPipeline::new: called");
        Self {
            analyzer: None,
            generator,
            reviewer,
            improver: None,
        }
    }

    /// Builder: set the analyzer
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Agent>) -> Self {
        debug!(analyzer = analyzer.name(), "AgentPipeline::with_analyzer: called");
        self.analyzer = Some(analyzer);
        self
    }

    /// Builder: set the improver
    pub fn with_improver(mut self, improver: Arc<dyn Agent>) -> Self {
        debug!(improver = improver.name(), "AgentPipeline::with_improver: called");
        self.improver = Some(improver);
        self
    }

    pub fn analyzer(&self) -> Option<Arc<dyn Agent>> {
        self.analyzer.clone()
    }

    pub fn generator(&self) -> Arc<dyn Agent> {
        Arc::clone(&self.generator)
    }

    pub fn reviewer(&self) -> Arc<dyn Agent> {
        Arc::clone(&self.reviewer)
    }

    pub fn improver(&self) -> Option<Arc<dyn Agent>> {
        self.improver.clone()
    }

    /// Roles present in this pipeline, in execution order
    pub fn roles(&self) -> Vec<AgentRole> {
        let mut roles = Vec::with_capacity(4);
        if self.analyzer.is_some() {
            roles.push(AgentRole::Analyzer);
        }
        roles.push(AgentRole::Generator);
        roles.push(AgentRole::Reviewer);
        if self.improver.is_some() {
            roles.push(AgentRole::Improver);
        }
        roles
    }
}

impl std::fmt::Debug for AgentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentPipeline")
            .field("analyzer", &self.analyzer.as_ref().map(|a| a.name().to_string()))
            .field("generator", &self.generator.name())
            .field("reviewer", &self.reviewer.name())
            .field("improver", &self.improver.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}
