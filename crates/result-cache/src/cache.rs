use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use testpilot_core_types::RequestId;
use tracing::{debug, info, warn};

use crate::config::{normalize_probability, CacheConfig};
use crate::errors::CacheError;
use crate::lock::{FileLock, LockGuard};
use crate::store::{self, CacheEntry, CacheMap};

/// Summary of the backing file, used by maintenance tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub path: PathBuf,
    pub entries: usize,
    pub request_ids: usize,
    pub oldest_timestamp: Option<i64>,
    pub newest_timestamp: Option<i64>,
}

#[derive(Debug, Default)]
struct LockFailures {
    consecutive: u32,
    blocking: Option<String>,
}

/// Lock-protected key/value store shared by every process pointed at the
/// same backing file.
///
/// No operation surfaces an error. Lock timeouts, I/O faults and corrupt
/// files are logged and the cache behaves as if it were cold.
#[derive(Debug)]
pub struct ResultCache {
    config: CacheConfig,
    lock: FileLock,
    failures: Mutex<LockFailures>,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        let lock = FileLock::new(config.lock_path(), config.lock_timeout, config.poll_interval)
            .stale_after(config.stale_lock_age);
        Self {
            config,
            lock,
            failures: Mutex::new(LockFailures::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Acquire the cache lock, or `None` when it cannot be had in time.
    ///
    /// Consecutive timeouts against the same lock record are counted; once the
    /// count reaches `max_lock_failures` that holder is treated as wedged, its
    /// record is reclaimed and the current operation is abandoned.
    pub async fn acquire_lock(&self) -> Option<LockGuard> {
        match self.lock.acquire().await {
            Ok(guard) => {
                *self.failures.lock() = LockFailures::default();
                Some(guard)
            }
            Err(CacheError::LockTimeout {
                path,
                waited,
                blocking,
            }) => {
                let wedged = {
                    let mut failures = self.failures.lock();
                    if blocking.is_some() && failures.blocking == blocking {
                        failures.consecutive += 1;
                    } else {
                        failures.consecutive = 1;
                        failures.blocking = blocking;
                    }
                    if failures.consecutive >= self.config.max_lock_failures {
                        let record = failures.blocking.take();
                        failures.consecutive = 0;
                        record
                    } else {
                        None
                    }
                };

                warn!(path = %path, waited_ms = waited.as_millis() as u64, "cache lock busy");
                if let Some(record) = wedged {
                    if self.lock.force_reclaim(&record) {
                        warn!(path = %path, "cache lock holder wedged; lock reclaimed");
                    }
                }
                None
            }
            Err(err) => {
                warn!(path = %self.lock.path().display(), "cache lock failed: {}", err);
                None
            }
        }
    }

    pub async fn get(&self, key: &str, request_id: &RequestId) -> Option<Value> {
        let hit = self
            .with_locked("get", |entries| {
                (entries.get(key).map(|entry| entry.data.clone()), false)
            })
            .await
            .flatten();
        debug!(key, request_id = %request_id, hit = hit.is_some(), "cache lookup");
        hit
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, request_id: &RequestId) -> Option<T> {
        let value = self.get(key, request_id).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!(key, "cached payload has unexpected shape: {}", err);
                None
            }
        }
    }

    /// Store `data` under `key`, tagged with `request_id` for later rollback.
    pub async fn set(&self, key: &str, data: Value, request_id: &RequestId) {
        let probability = normalize_probability(self.config.sweep_probability);
        let sweep = rand::thread_rng().gen_bool(probability);
        let cutoff = self.cutoff_ms();

        let stored = self
            .with_locked("set", |entries| {
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        data,
                        timestamp: Utc::now().timestamp_millis(),
                        request_id: request_id.to_string(),
                    },
                );
                let swept = if sweep {
                    store::retain_newer(entries, cutoff)
                } else {
                    0
                };
                (swept, true)
            })
            .await;

        match stored {
            Some(swept) if swept > 0 => {
                info!(key, request_id = %request_id, swept, "cache entry stored; stale entries swept")
            }
            Some(_) => debug!(key, request_id = %request_id, "cache entry stored"),
            None => warn!(key, request_id = %request_id, "cache write skipped"),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, data: &T, request_id: &RequestId) {
        match serde_json::to_value(data) {
            Ok(value) => self.set(key, value, request_id).await,
            Err(err) => warn!(key, "cache payload not serializable: {}", err),
        }
    }

    /// Remove one entry; `true` when it existed.
    pub async fn delete(&self, key: &str) -> bool {
        self.with_locked("delete", |entries| {
            let removed = entries.remove(key).is_some();
            (removed, removed)
        })
        .await
        .unwrap_or(false)
    }

    /// Roll back every entry written on behalf of `request_id`.
    pub async fn delete_all_for_request_id(&self, request_id: &RequestId) -> usize {
        let removed = self
            .with_locked("delete_all_for_request_id", |entries| {
                let before = entries.len();
                entries.retain(|_, entry| entry.request_id != request_id.as_str());
                let removed = before - entries.len();
                (removed, removed > 0)
            })
            .await
            .unwrap_or(0);
        if removed > 0 {
            info!(request_id = %request_id, removed, "rolled back cache entries");
        }
        removed
    }

    /// Remove entries older than the configured maximum age.
    pub async fn sweep_stale(&self) -> usize {
        let cutoff = self.cutoff_ms();
        let removed = self
            .with_locked("sweep_stale", |entries| {
                let removed = store::retain_newer(entries, cutoff);
                (removed, removed > 0)
            })
            .await
            .unwrap_or(0);
        debug!(removed, "cache sweep finished");
        removed
    }

    /// Empty the cache. Returns `false` when the lock could not be acquired.
    pub async fn reset(&self) -> bool {
        self.with_locked("reset", |entries| {
            entries.clear();
            (true, true)
        })
        .await
        .unwrap_or(false)
    }

    pub async fn stats(&self) -> Option<CacheStats> {
        let path = self.config.path.clone();
        self.with_locked("stats", |entries| {
            let request_ids: BTreeSet<&str> =
                entries.values().map(|entry| entry.request_id.as_str()).collect();
            let stats = CacheStats {
                path,
                entries: entries.len(),
                request_ids: request_ids.len(),
                oldest_timestamp: entries.values().map(|entry| entry.timestamp).min(),
                newest_timestamp: entries.values().map(|entry| entry.timestamp).max(),
            };
            (stats, false)
        })
        .await
    }

    fn cutoff_ms(&self) -> i64 {
        let max_age = i64::try_from(self.config.max_age.as_millis()).unwrap_or(i64::MAX);
        Utc::now().timestamp_millis().saturating_sub(max_age)
    }

    /// Run `op` against the loaded map while holding the lock. The closure
    /// returns its result and whether the map must be written back.
    async fn with_locked<R, F>(&self, op: &'static str, f: F) -> Option<R>
    where
        F: FnOnce(&mut CacheMap) -> (R, bool),
    {
        let guard = self.acquire_lock().await?;

        let loaded = match store::load(&self.config.path) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(op, path = %self.config.path.display(), "cache read failed: {}", err);
                return None;
            }
        };

        let mut entries = loaded.entries;
        let (result, dirty) = f(&mut entries);

        if dirty || loaded.corrupt {
            if loaded.corrupt {
                warn!(op, path = %self.config.path.display(), "cache file corrupt; resetting");
            }
            if let Err(err) = store::save(&self.config.path, &entries) {
                warn!(op, path = %self.config.path.display(), "cache write failed: {}", err);
                if dirty {
                    return None;
                }
            }
        }

        guard.release();
        Some(result)
    }
}
