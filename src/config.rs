//! Application configuration.
//!
//! Loaded from YAML, then adjusted by `TESTPILOT_*` environment variables.
//! Every section is optional in the file; missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionExecutor, PageDriver, DEFAULT_ACTION_TIMEOUT};
use agent_core::{
    ModelClient, PlanningConfig, PlanningLoop, SnapshotProvider, StepServices, StepTimings,
};
use result_cache::config::{
    DEFAULT_LOCK_TIMEOUT, DEFAULT_MAX_AGE, DEFAULT_POLL_INTERVAL, DEFAULT_SWEEP_PROBABILITY,
};
use result_cache::{CacheConfig, ResultCache};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::{ConfigError, ConfigResult};

pub const ENV_CACHE_PATH: &str = "TESTPILOT_CACHE_PATH";
pub const ENV_MAX_DEPTH: &str = "TESTPILOT_MAX_DEPTH";
pub const ENV_MAX_BACKTRACKS: &str = "TESTPILOT_MAX_BACKTRACKS";
pub const ENV_LOCK_TIMEOUT_MS: &str = "TESTPILOT_LOCK_TIMEOUT_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheSection,
    pub planning: PlanningConfig,
    pub actions: ActionsSection,
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Backing JSON file shared by every process.
    /// Default: `<cache dir>/testpilot/result-cache.json`
    pub path: PathBuf,

    /// Default: 5000
    pub lock_timeout_ms: u64,

    /// Default: 50
    pub poll_interval_ms: u64,

    /// Entries older than this are swept.
    /// Default: one week
    pub max_age_secs: u64,

    /// Chance of a passive sweep after each write.
    /// Default: 0.01
    pub sweep_probability: f64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_age_secs: DEFAULT_MAX_AGE.as_secs(),
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
        }
    }
}

/// Time budgets for page actions and assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsSection {
    /// Bound on a single primitive operation.
    /// Default: 10000
    pub action_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub assertion_timeout_ms: u64,
    pub default_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for ActionsSection {
    fn default() -> Self {
        let timings = StepTimings::default();
        Self {
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT.as_millis() as u64,
            settle_timeout_ms: timings.settle_timeout_ms,
            assertion_timeout_ms: timings.assertion_timeout_ms,
            default_wait_ms: timings.default_wait_ms,
            max_wait_ms: timings.max_wait_ms,
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("testpilot")
        .join("result-cache.json")
}

/// `<config dir>/testpilot/config.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("testpilot").join("config.yaml"))
}

impl AppConfig {
    pub fn from_yaml(raw: &str, path: &Path) -> ConfigResult<Self> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn read_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&raw, path)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|err| ConfigError::invalid(err.to_string()))
    }

    /// Apply `TESTPILOT_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<Vec<&'static str>> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, returning the names that were set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(path) = lookup(ENV_CACHE_PATH).filter(|value| !value.trim().is_empty()) {
            self.cache.path = PathBuf::from(path.trim());
            applied.push(ENV_CACHE_PATH);
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            self.planning.max_depth = parse_override(ENV_MAX_DEPTH, &raw)?;
            applied.push(ENV_MAX_DEPTH);
        }
        if let Some(raw) = lookup(ENV_MAX_BACKTRACKS) {
            self.planning.max_backtracks = parse_override(ENV_MAX_BACKTRACKS, &raw)?;
            applied.push(ENV_MAX_BACKTRACKS);
        }
        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.cache.lock_timeout_ms = parse_override(ENV_LOCK_TIMEOUT_MS, &raw)?;
            applied.push(ENV_LOCK_TIMEOUT_MS);
        }

        Ok(applied)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("cache.path must not be empty"));
        }
        if self.cache.lock_timeout_ms == 0 {
            return Err(ConfigError::invalid("cache.lock_timeout_ms must be positive"));
        }
        if self.cache.poll_interval_ms == 0
            || self.cache.poll_interval_ms > self.cache.lock_timeout_ms
        {
            return Err(ConfigError::invalid(
                "cache.poll_interval_ms must be positive and at most cache.lock_timeout_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.cache.sweep_probability) {
            return Err(ConfigError::invalid(
                "cache.sweep_probability must be between 0 and 1",
            ));
        }
        if self.planning.max_depth == 0 {
            return Err(ConfigError::invalid("planning.max_depth must be positive"));
        }
        if self.planning.max_ungrounded_retries == 0 {
            return Err(ConfigError::invalid(
                "planning.max_ungrounded_retries must be positive",
            ));
        }
        if self.planning.history_window == 0 {
            return Err(ConfigError::invalid("planning.history_window must be positive"));
        }
        if self.actions.action_timeout_ms == 0 {
            return Err(ConfigError::invalid("actions.action_timeout_ms must be positive"));
        }
        if self.actions.default_wait_ms > self.actions.max_wait_ms {
            return Err(ConfigError::invalid(
                "actions.default_wait_ms must not exceed actions.max_wait_ms",
            ));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        let lock_timeout = Duration::from_millis(self.cache.lock_timeout_ms);
        CacheConfig::new(&self.cache.path)
            .lock_timeout(lock_timeout)
            .stale_lock_age(lock_timeout)
            .poll_interval(Duration::from_millis(self.cache.poll_interval_ms))
            .max_age(Duration::from_secs(self.cache.max_age_secs))
            .sweep_probability(self.cache.sweep_probability)
    }

    pub fn open_cache(&self) -> ResultCache {
        ResultCache::new(self.cache_config())
    }

    pub fn step_timings(&self) -> StepTimings {
        StepTimings {
            settle_timeout_ms: self.actions.settle_timeout_ms,
            assertion_timeout_ms: self.actions.assertion_timeout_ms,
            default_wait_ms: self.actions.default_wait_ms,
            max_wait_ms: self.actions.max_wait_ms,
        }
    }

    /// Step services for `page` with this configuration's time budgets.
    pub fn step_services(
        &self,
        page: Arc<dyn PageDriver>,
        cache: Option<Arc<ResultCache>>,
    ) -> StepServices {
        let executor = ActionExecutor::new(page.clone())
            .with_action_timeout(Duration::from_millis(self.actions.action_timeout_ms));
        let services = StepServices::new(page)
            .with_executor(executor)
            .with_timings(self.step_timings());
        match cache {
            Some(cache) => services.with_cache(cache),
            None => services,
        }
    }

    pub fn planning_loop(
        &self,
        model: Arc<dyn ModelClient>,
        snapshots: Arc<dyn SnapshotProvider>,
        page: Arc<dyn PageDriver>,
        cache: Option<Arc<ResultCache>>,
    ) -> PlanningLoop {
        PlanningLoop::new(
            self.planning.clone(),
            model,
            snapshots,
            self.step_services(page, cache),
        )
    }
}

fn parse_override<T: std::str::FromStr>(name: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            name,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "planning:\n  max_depth: 12\ncache:\n  path: /tmp/tp.json\n";
        let config = AppConfig::from_yaml(yaml, Path::new("config.yaml")).unwrap();
        assert_eq!(config.planning.max_depth, 12);
        assert_eq!(config.planning.max_backtracks, 3);
        assert_eq!(config.cache.path, PathBuf::from("/tmp/tp.json"));
        assert_eq!(config.cache.lock_timeout_ms, 5_000);
        assert_eq!(config.actions.max_wait_ms, 30_000);
        config.validate().unwrap();
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let err = AppConfig::from_yaml("planning: [", Path::new("broken.yaml")).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
        assert!(err.is_user_error());
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_CACHE_PATH, "/var/tmp/cache.json"),
            (ENV_MAX_DEPTH, "7"),
            (ENV_LOCK_TIMEOUT_MS, " 250 "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        let applied = config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(applied, vec![ENV_CACHE_PATH, ENV_MAX_DEPTH, ENV_LOCK_TIMEOUT_MS]);
        assert_eq!(config.cache.path, PathBuf::from("/var/tmp/cache.json"));
        assert_eq!(config.planning.max_depth, 7);
        assert_eq!(config.planning.max_backtracks, 3);
        assert_eq!(config.cache.lock_timeout_ms, 250);
    }

    #[test]
    fn unparsable_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|name| (name == ENV_MAX_BACKTRACKS).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                name: ENV_MAX_BACKTRACKS,
                ..
            }
        ));
    }

    #[test]
    fn validation_catches_inconsistent_values() {
        let mut config = AppConfig::default();
        config.actions.default_wait_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.sweep_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.planning.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cache_config_follows_section() {
        let mut config = AppConfig::default();
        config.cache.path = PathBuf::from("/tmp/x.json");
        config.cache.lock_timeout_ms = 800;
        config.cache.poll_interval_ms = 20;

        let cache = config.cache_config();
        assert_eq!(cache.lock_timeout, Duration::from_millis(800));
        assert_eq!(cache.poll_interval, Duration::from_millis(20));
        assert_eq!(cache.lock_path(), PathBuf::from("/tmp/x.json.lock"));
    }

    #[tokio::test]
    async fn read_file_round_trips_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = AppConfig::default();
        config.planning.history_window = 4;
        fs::write(&path, config.to_yaml().unwrap()).await.unwrap();

        let loaded = AppConfig::read_file(&path).await.unwrap();
        assert_eq!(loaded.planning.history_window, 4);
    }
}
