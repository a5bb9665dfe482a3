//! TestPilot CLI library
//!
//! Configuration loading and the `testpilot` command surface, exposed for
//! integration testing.

pub mod cli;
pub mod config;
pub mod errors;

pub use config::{ActionsSection, AppConfig, CacheSection};
pub use errors::{ConfigError, ConfigResult};
