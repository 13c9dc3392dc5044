use crate::constants;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per bucket
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub destination_bucket: String,
    pub destination_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::DEFAULT_STORE_ROOT),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            destination_bucket: constants::DEFAULT_DESTINATION_BUCKET.to_string(),
            destination_prefix: constants::DEFAULT_DESTINATION_PREFIX.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ETL_STORE_ROOT` / `ETL_DESTINATION_BUCKET` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(root) = std::env::var("ETL_STORE_ROOT") {
            if !root.trim().is_empty() {
                self.store.root = PathBuf::from(root);
            }
        }
        if let Ok(bucket) = std::env::var("ETL_DESTINATION_BUCKET") {
            if !bucket.trim().is_empty() {
                self.pipeline.destination_bucket = bucket;
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.destination_bucket.trim().is_empty() {
            return Err(EtlError::Config(
                "pipeline.destination_bucket must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
