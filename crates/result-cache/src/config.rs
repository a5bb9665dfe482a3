use std::path::{Path, PathBuf};
use std::time::Duration;

/// One week.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;
pub const DEFAULT_MAX_LOCK_FAILURES: u32 = 3;

/// Configuration for a [`crate::ResultCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Backing JSON file shared by every process.
    pub path: PathBuf,
    /// Polling budget for lock acquisition.
    pub lock_timeout: Duration,
    /// Age after which a lock record is considered abandoned.
    pub stale_lock_age: Duration,
    pub poll_interval: Duration,
    /// Entries older than this are removed by sweeps.
    pub max_age: Duration,
    /// Probability of a passive sweep after each `set`.
    pub sweep_probability: f64,
    /// Consecutive acquisition timeouts against the same holder before that
    /// holder is treated as wedged and its lock reclaimed.
    pub max_lock_failures: u32,
}

impl CacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock_age: DEFAULT_LOCK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_age: DEFAULT_MAX_AGE,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
            max_lock_failures: DEFAULT_MAX_LOCK_FAILURES,
        }
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn stale_lock_age(mut self, age: Duration) -> Self {
        self.stale_lock_age = age;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = age;
        self
    }

    pub fn sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = normalize_probability(probability);
        self
    }

    /// Sibling lock file: `<path>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.path)
    }
}

pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".lock");
    PathBuf::from(raw)
}

/// Clamp to `[0, 1]`; NaN and infinities disable sweeping.
pub fn normalize_probability(probability: f64) -> f64 {
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
