use std::path::{Path, PathBuf};

use crate::config::CliConfig;

pub struct CliContext {
    config: CliConfig,
    config_path: Option<PathBuf>,
}

impl CliContext {
    pub fn new(config: CliConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
