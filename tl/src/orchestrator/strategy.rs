//! StrategyPlanner - deterministic strategy switching on replan

use std::collections::HashSet;

use tracing::debug;

/// Ordered strategy identifiers plus the set already tried
///
/// The first identifier is active at start. Each replan moves to the next
/// identifier, in declaration order, that has not been tried yet.
#[derive(Debug, Clone, Default)]
pub struct StrategyPlanner {
    strategies: Vec<String>,
    tried: HashSet<String>,
    current: Option<String>,
}

/// A strategy change chosen by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySwitch {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl StrategySwitch {
    /// Design decision text for the TaskLedger
    pub fn decision(&self) -> String {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => format!("Switch strategy from '{}' to '{}'", from, to),
            (None, Some(to)) => format!("Adopt strategy '{}'", to),
            (Some(from), None) => format!("No untried strategy remains; continue with '{}'", from),
            (None, None) => "No strategies declared; continue with current approach".to_string(),
        }
    }

    /// Failed-approach text for the TaskLedger
    pub fn failed_approach(&self, best_quality: f64, stagnant_iterations: u32) -> String {
        let name = self.from.as_deref().unwrap_or("current approach");
        format!(
            "Strategy '{}' stagnated at quality {:.2} for {} iteration(s)",
            name, best_quality, stagnant_iterations
        )
    }
}

impl StrategyPlanner {
    pub fn new(strategies: Vec<String>) -> Self {
        debug!(?strategies, "StrategyPlanner::new: called");
        let mut planner = Self {
            strategies,
            tried: HashSet::new(),
            current: None,
        };
        if let Some(first) = planner.strategies.first().cloned() {
            planner.tried.insert(first.clone());
            planner.current = Some(first);
        }
        planner
    }

    /// Active strategy
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Pick the next untried strategy, keeping the current one if none remain
    pub fn switch(&mut self) -> StrategySwitch {
        let from = self.current.clone();
        let next = self.strategies.iter().find(|s| !self.tried.contains(*s)).cloned();
        debug!(?from, ?next, "StrategyPlanner::switch: called");
        match next {
            Some(next) => {
                self.tried.insert(next.clone());
                self.current = Some(next.clone());
                StrategySwitch { from, to: Some(next) }
            }
            None => StrategySwitch { from, to: None },
        }
    }

    /// Whether any declared strategy is still untried
    pub fn has_untried(&self) -> bool {
        self.strategies.iter().any(|s| !self.tried.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> StrategyPlanner {
        StrategyPlanner::new(vec!["narrative".to_string(), "data-driven".to_string(), "visual".to_string()])
    }

    #[test]
    fn test_first_strategy_active() {
        let planner = planner();
        assert_eq!(planner.current(), Some("narrative"));
        assert!(planner.has_untried());
    }

    #[test]
    fn test_switch_in_declaration_order() {
        let mut planner = planner();
        let first = planner.switch();
        assert_eq!(first.from.as_deref(), Some("narrative"));
        assert_eq!(first.to.as_deref(), Some("data-driven"));
        assert_eq!(first.decision(), "Switch strategy from 'narrative' to 'data-driven'");

        let second = planner.switch();
        assert_eq!(second.to.as_deref(), Some("visual"));
        assert!(!planner.has_untried());

        let third = planner.switch();
        assert_eq!(third.to, None);
        assert_eq!(planner.current(), Some("visual"));
        assert!(third.decision().contains("No untried strategy remains"));
    }

    #[test]
    fn test_duplicates_are_tried_once() {
        let mut planner = StrategyPlanner::new(vec!["a".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(planner.switch().to.as_deref(), Some("b"));
        assert_eq!(planner.switch().to, None);
    }

    #[test]
    fn test_no_strategies() {
        let mut planner = StrategyPlanner::new(vec![]);
        assert_eq!(planner.current(), None);
        let switch = planner.switch();
        assert_eq!(switch, StrategySwitch { from: None, to: None });
        assert_eq!(switch.failed_approach(0.55, 2), "Strategy 'current approach' stagnated at quality 0.55 for 2 iteration(s)");
    }
}
