//! Configuration for the planning loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits and toggles for one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Maximum planning iterations (model requests) before forcing stop.
    /// Entries of a seeded history count toward this limit.
    /// Default: 50
    pub max_depth: u32,

    /// `goBack`/`skipSection` steps that abandon the run; the run ends on the
    /// step that brings the count to this value.
    /// Default: 3
    pub max_backtracks: u32,

    /// Consecutive dropped (ungrounded or malformed) steps before the run
    /// fails.
    /// Default: 3
    pub max_ungrounded_retries: u32,

    /// History entries sent with each planning request.
    /// Default: 20
    pub history_window: usize,

    /// Wall-clock budget for the whole run, checked between iterations.
    /// Default: none
    pub wall_clock_timeout_ms: Option<u64>,

    /// Memoize model tool calls in the result cache.
    /// Default: true
    pub cache_model_steps: bool,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_backtracks: 3,
            max_ungrounded_retries: 3,
            history_window: 20,
            wall_clock_timeout_ms: None,
            cache_model_steps: true,
        }
    }
}

impl PlanningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal config for testing.
    pub fn minimal() -> Self {
        Self {
            max_depth: 10,
            max_backtracks: 2,
            max_ungrounded_retries: 2,
            history_window: 5,
            wall_clock_timeout_ms: Some(30_000),
            cache_model_steps: false,
        }
    }

    /// Builder: set max depth.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder: set max backtracks.
    pub fn max_backtracks(mut self, backtracks: u32) -> Self {
        self.max_backtracks = backtracks;
        self
    }

    pub fn max_ungrounded_retries(mut self, retries: u32) -> Self {
        self.max_ungrounded_retries = retries;
        self
    }

    pub fn history_window(mut self, entries: usize) -> Self {
        self.history_window = entries;
        self
    }

    pub fn wall_clock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wall_clock_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn cache_model_steps(mut self, enabled: bool) -> Self {
        self.cache_model_steps = enabled;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.wall_clock_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlanningConfig::default();
        assert_eq!(config.max_depth, 50);
        assert_eq!(config.max_backtracks, 3);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_builder() {
        let config = PlanningConfig::new()
            .max_depth(7)
            .max_backtracks(1)
            .wall_clock_timeout(Some(Duration::from_secs(2)));
        assert_eq!(config.max_depth, 7);
        assert_eq!(config.max_backtracks, 1);
        assert_eq!(config.wall_clock_timeout_ms, Some(2_000));
    }

    #[test]
    fn partial_yaml_like_input_keeps_defaults() {
        let config: PlanningConfig = serde_json::from_str(r#"{"max_depth": 12}"#).unwrap();
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.history_window, 20);
        assert!(config.cache_model_steps);
    }
}
