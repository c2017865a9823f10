use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use ttlgate_common::AppConfig;

/// Validated configuration together with the file it came from.
pub struct LoadedConfig {
    pub config: AppConfig,
    pub config_path: PathBuf,
}

impl LoadedConfig {
    pub fn load(path: &str) -> Result<Self> {
        info!(path = path, "loading configuration");
        let config = AppConfig::load(path)?;
        Ok(Self {
            config,
            config_path: PathBuf::from(path),
        })
    }
}
