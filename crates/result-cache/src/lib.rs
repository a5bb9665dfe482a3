//! Process-shared result cache
//!
//! A single JSON file maps hex content hashes to `{data, timestamp, requestId}`.
//! Every process pointed at the same file coordinates through an advisory lock
//! file next to it:
//! - exclusive-create acquisition with bounded polling
//! - atomic reclamation of stale or wedged lock records
//! - per-request rollback and age-based sweeping
//! - corrupt files degrade to a cold cache instead of failing callers

pub mod cache;
pub mod config;
pub mod errors;
pub mod hash;
pub mod lock;
pub mod store;

pub use cache::{CacheStats, ResultCache};
pub use config::CacheConfig;
pub use errors::CacheError;
pub use hash::{content_hash, hash_bytes};
pub use lock::{FileLock, LockGuard, LockRecord};
pub use store::{CacheEntry, CacheMap};
