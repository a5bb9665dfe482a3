//! Error types for the result cache

use std::time::Duration;

use thiserror::Error;

/// Cache error enumeration
///
/// None of these reach cache callers: the public cache API logs them and
/// degrades to a cold cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Lock could not be acquired within the polling budget
    #[error("timed out after {waited:?} acquiring lock {path}")]
    LockTimeout {
        path: String,
        waited: Duration,
        /// Raw lock record that blocked acquisition, if it could be read
        blocking: Option<String>,
    },

    /// Filesystem failure on the backing or lock file
    #[error("cache io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Payload or key descriptor could not be serialized
    #[error("cache serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CacheError {
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, CacheError::LockTimeout { .. })
    }
}
