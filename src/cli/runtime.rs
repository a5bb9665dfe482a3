use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::env::LogFormat;
use crate::config::{default_config_path, AppConfig};

/// Install the global subscriber. `RUST_LOG` wins over `level`; logs go to
/// stderr so command output stays machine-readable.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())),
    );
    match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
}

/// Resolve the config path, read it when present and apply environment
/// overrides.
pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/config.yaml > ~/.config/testpilot/config.yaml
            let local_config = PathBuf::from("config/config.yaml");
            if local_config.exists() {
                local_config
            } else {
                default_config_path().unwrap_or(local_config)
            }
        }
    };

    let mut config = if config_path.exists() {
        let config = AppConfig::read_file(&config_path).await?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        AppConfig::default()
    };

    let applied = config
        .apply_env_overrides()
        .context("Failed to apply environment overrides")?;
    if !applied.is_empty() {
        info!(overrides = ?applied, "Applied environment overrides");
    }

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}
