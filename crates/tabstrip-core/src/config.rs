//! Application configuration
//!
//! Stored as JSON under the platform data directory. A missing file means
//! defaults; unknown or missing keys fall back field by field.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabstrip_model::TabStripConfig;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where this configuration was loaded from and is saved to
    #[serde(skip)]
    pub config_path: PathBuf,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Closed tabs remembered per window for reopening
    pub max_recently_closed: usize,
    pub tab_strip: TabStripConfig,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            config_path: data_dir.join("config.json"),
            log_filter: "info".to_string(),
            max_recently_closed: 20,
            tab_strip: TabStripConfig::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("tabstrip"))
            .unwrap_or_else(|| PathBuf::from(".tabstrip"))
    }

    /// Load the configuration at `path`, or defaults bound to `path` if
    /// the file does not exist yet
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            });
        }

        tracing::info!(path = %path.display(), "Loading config");
        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&self.config_path, json)?;

        tracing::debug!(path = %self.config_path.display(), "Saved config");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.tab_strip.activation_ladder.is_empty() {
            return Err(CoreError::Config(
                "tab_strip.activation_ladder must name at least one rule".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}
