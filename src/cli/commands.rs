use clap::Subcommand;

use super::cache::CacheArgs;
use super::config::ConfigArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Inspect and maintain the shared result cache
    Cache(CacheArgs),

    /// Show or validate the configuration
    Config(ConfigArgs),

    /// Show version and build information
    Info,
}
