//! Advisory file lock shared between processes
//!
//! The lock file is created with `create_new`, so at most one process can
//! create it. Its first line is the holder's pid; the second line carries the
//! held-since timestamp and a per-acquisition nonce:
//!
//! ```text
//! 48211
//! 1760520000000 5f0c3c4e-7d0a-4f4b-9f0e-1a8c2c3d9e11
//! ```
//!
//! Reclaiming an abandoned lock never deletes the path blindly. The reclaimer
//! renames the lock file to a private tombstone (only one rename can win), then
//! compares the tombstone against the record it judged stale. On a mismatch it
//! grabbed a fresh holder's lock and links it back without clobbering.
//!
//! One window remains: between that rename and the link back the lock path is
//! empty, and a third process may create it. The displaced holder and the new
//! one then both hold the lock; the tombstone is kept and a warning logged.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::CacheError;

/// Parsed contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub held_since_ms: i64,
    pub nonce: String,
}

impl LockRecord {
    pub fn fresh() -> Self {
        Self {
            pid: std::process::id(),
            held_since_ms: Utc::now().timestamp_millis(),
            nonce: Uuid::new_v4().to_string(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}\n{} {}\n", self.pid, self.held_since_ms, self.nonce)
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let mut lines = raw.lines();
        let pid = lines.next()?.trim().parse().ok()?;
        let mut meta = lines.next()?.split_whitespace();
        let held_since_ms = meta.next()?.parse().ok()?;
        let nonce = meta.next()?.to_string();
        Some(Self {
            pid,
            held_since_ms,
            nonce,
        })
    }

    fn age(&self) -> Duration {
        let age_ms = Utc::now().timestamp_millis() - self.held_since_ms;
        Duration::from_millis(age_ms.max(0) as u64)
    }
}

/// RAII guard for a held lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    nonce: String,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Only remove the file while it still carries our nonce; a reclaimer
        // may already have replaced it.
        match fs::read_to_string(&self.path) {
            Ok(raw) => match LockRecord::decode(&raw) {
                Some(record) if record.nonce == self.nonce => {
                    if let Err(err) = fs::remove_file(&self.path) {
                        warn!(path = %self.path.display(), "failed to release lock: {}", err);
                    }
                }
                _ => warn!(
                    path = %self.path.display(),
                    "lock was reclaimed by another process before release"
                ),
            },
            Err(err) => debug!(path = %self.path.display(), "lock already gone: {}", err),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// File-based mutex with bounded polling and atomic stale reclamation.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
    stale_after: Duration,
}

impl FileLock {
    /// Lock records older than `timeout` are treated as abandoned unless
    /// [`FileLock::stale_after`] says otherwise.
    pub fn new(path: impl Into<PathBuf>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            stale_after: timeout,
        }
    }

    pub fn stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll until the lock is created or the timeout elapses.
    ///
    /// Lock records older than the staleness age belong to crashed or hung
    /// holders and are reclaimed along the way.
    pub async fn acquire(&self) -> Result<LockGuard, CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let start = Instant::now();
        let mut blocking = None;

        loop {
            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    let record = LockRecord::fresh();
                    let written = file
                        .write_all(record.encode().as_bytes())
                        .and_then(|_| file.sync_all());
                    if let Err(err) = written {
                        let _ = fs::remove_file(&self.path);
                        return Err(err.into());
                    }
                    debug!(path = %self.path.display(), pid = record.pid, "lock acquired");
                    return Ok(LockGuard {
                        path: self.path.clone(),
                        nonce: record.nonce,
                        released: false,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if let Some(raw) = read_raw(&self.path) {
                        if self.is_stale(&raw) && reclaim(&self.path, &raw) {
                            continue;
                        }
                        blocking = Some(raw);
                    }

                    if start.elapsed() >= self.timeout {
                        return Err(CacheError::LockTimeout {
                            path: self.path.display().to_string(),
                            waited: start.elapsed(),
                            blocking,
                        });
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reclaim the lock if, and only if, it still holds `expected`.
    pub fn force_reclaim(&self, expected: &str) -> bool {
        match read_raw(&self.path) {
            Some(current) if current == expected => reclaim(&self.path, expected),
            _ => false,
        }
    }

    fn is_stale(&self, raw: &str) -> bool {
        match LockRecord::decode(raw) {
            Some(record) => record.age() > self.stale_after,
            // Half-written or foreign content: fall back to the file's mtime.
            None => fs::metadata(&self.path)
                .and_then(|meta| meta.modified())
                .map(|modified| {
                    SystemTime::now()
                        .duration_since(modified)
                        .unwrap_or_default()
                        > self.stale_after
                })
                .unwrap_or(false),
        }
    }
}

fn read_raw(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Compare-and-swap removal of the lock file holding `expected`.
fn reclaim(path: &Path, expected: &str) -> bool {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache.lock".to_string());
    let tombstone = path.with_file_name(format!("{}.{}.reclaim", file_name, Uuid::new_v4()));

    if fs::rename(path, &tombstone).is_err() {
        // Someone else moved or released it first.
        return false;
    }

    let taken = fs::read_to_string(&tombstone).unwrap_or_default();
    if taken == expected {
        let _ = fs::remove_file(&tombstone);
        let holder = LockRecord::decode(expected).map(|record| record.pid);
        info!(path = %path.display(), holder = ?holder, "reclaimed abandoned cache lock");
        return true;
    }

    // We grabbed a live holder's lock; put it back unless a new one appeared.
    restore(path, &tombstone);
    false
}

/// Link a displaced live record back to `path` without clobbering. Returns
/// `false` when another process created the lock in between; the tombstone
/// is then left on disk as a record of the double-held lock.
fn restore(path: &Path, tombstone: &Path) -> bool {
    match fs::hard_link(tombstone, path) {
        Ok(()) => {
            let _ = fs::remove_file(tombstone);
            true
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                tombstone = %tombstone.display(),
                "live lock displaced during reclaim; two holders may overlap: {}",
                err
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_record(path: &Path, record: &LockRecord) {
        fs::write(path, record.encode()).unwrap();
    }

    #[test]
    fn record_round_trips() {
        let record = LockRecord::fresh();
        let decoded = LockRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.pid, std::process::id());
    }

    #[test]
    fn pid_only_content_does_not_decode() {
        assert!(LockRecord::decode("1234\n").is_none());
        assert!(LockRecord::decode("").is_none());
    }

    #[tokio::test]
    async fn acquire_creates_and_release_removes_lock_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let lock = FileLock::new(&path, Duration::from_millis(200), Duration::from_millis(10));

        let guard = lock.acquire().await.unwrap();
        assert!(path.exists());
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw.lines().next().unwrap(),
            std::process::id().to_string()
        );

        guard.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn live_lock_blocks_until_timeout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let holder = FileLock::new(&path, Duration::from_secs(30), Duration::from_millis(10));
        let _held = holder.acquire().await.unwrap();

        let contender = FileLock::new(&path, Duration::from_millis(80), Duration::from_millis(10))
            .stale_after(Duration::from_secs(30));
        let err = contender.acquire().await.unwrap_err();
        assert!(err.is_lock_timeout());
        match err {
            CacheError::LockTimeout { blocking, .. } => assert!(blocking.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn stale_record_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let stale = LockRecord {
            pid: 1,
            held_since_ms: Utc::now().timestamp_millis() - 60_000,
            nonce: "crashed-holder".to_string(),
        };
        write_record(&path, &stale);

        let lock = FileLock::new(&path, Duration::from_millis(500), Duration::from_millis(10));
        let guard = lock.acquire().await.unwrap();
        let current = LockRecord::decode(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_ne!(current.nonce, stale.nonce);
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn restore_links_back_displaced_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let tombstone = dir.path().join("cache.json.lock.t.reclaim");
        let live = LockRecord::fresh();
        write_record(&tombstone, &live);

        assert!(restore(&path, &tombstone));
        assert_eq!(fs::read_to_string(&path).unwrap(), live.encode());
        assert!(!tombstone.exists());
    }

    #[test]
    fn restore_keeps_tombstone_when_lock_was_recreated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let tombstone = dir.path().join("cache.json.lock.t.reclaim");
        let displaced = LockRecord::fresh();
        let newcomer = LockRecord::fresh();
        write_record(&tombstone, &displaced);
        write_record(&path, &newcomer);

        assert!(!restore(&path, &tombstone));
        assert_eq!(fs::read_to_string(&path).unwrap(), newcomer.encode());
        assert_eq!(fs::read_to_string(&tombstone).unwrap(), displaced.encode());
    }

    #[test]
    fn force_reclaim_only_matches_expected_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let record = LockRecord::fresh();
        write_record(&path, &record);
        let lock = FileLock::new(&path, Duration::from_secs(5), Duration::from_millis(10));

        assert!(!lock.force_reclaim("someone else"));
        assert!(path.exists());

        assert!(lock.force_reclaim(&record.encode()));
        assert!(!path.exists());
    }

    #[test]
    fn release_leaves_foreign_lock_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json.lock");
        let guard = LockGuard {
            path: path.clone(),
            nonce: "ours".to_string(),
            released: false,
        };
        let foreign = LockRecord::fresh();
        write_record(&path, &foreign);

        drop(guard);
        assert!(path.exists());
    }
}
