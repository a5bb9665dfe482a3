use std::path::{Path, PathBuf};

use result_cache::ResultCache;

use crate::config::AppConfig;

pub struct CliContext {
    config: AppConfig,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn cache(&self) -> ResultCache {
        self.config.open_cache()
    }
}
