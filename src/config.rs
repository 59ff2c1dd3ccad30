use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_ENV: &str = "PAMIETACZ_CONFIG";
const DEFAULT_CONFIG_NAME: &str = "config.toml";

/// Scheduling constants shared by the tracker, the session sampler and the
/// coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of cards drawn into a session unless all cards are requested.
    pub session_size: usize,
    /// Lowest quality counted as a successful recall.
    pub success_threshold: u8,
    /// Lowest quality that moves the card's due time forward.
    pub good_threshold: u8,
    /// Length in seconds of one interval "day".
    pub interval_unit_seconds: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            session_size: 10,
            success_threshold: 3,
            good_threshold: 4,
            interval_unit_seconds: 24 * 60,
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: SchedulerConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config file if it exists, defaults otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_size == 0 {
            return Err(Error::Config("session_size must be at least 1".into()));
        }
        if self.success_threshold > 5 || self.good_threshold > 5 {
            return Err(Error::Config("quality thresholds must be within 0..=5".into()));
        }
        if self.success_threshold > self.good_threshold {
            return Err(Error::Config(
                "success_threshold cannot exceed good_threshold".into(),
            ));
        }
        if self.interval_unit_seconds == 0 {
            return Err(Error::Config("interval_unit_seconds must be positive".into()));
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pamietacz")
        .join(DEFAULT_CONFIG_NAME)
}
