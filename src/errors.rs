//! Error types for the CLI configuration layer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidOverride { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }

    /// Faults the user fixes by editing the file or environment, as opposed
    /// to I/O faults.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
