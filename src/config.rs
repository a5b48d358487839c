//! Runtime configuration
//!
//! Defaults match the game's stock setup. A YAML file can override any
//! subset of fields:
//!
//! ```yaml
//! output_dir: D:/racing/results
//! processing_interval_ms: 250
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::region::{MAP_OBJECT_NAME, SHARED_MEMORY_VERSION};
use crate::{Result, TelemetryError};

/// Result logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the game's file mapping
    pub mapping_name: String,
    /// Layout version the region must report
    pub expected_version: u32,
    /// Minimum time between processing passes after a result was saved
    pub processing_interval_ms: u64,
    /// Sleep after an attempt that produced nothing to process; 0 spins
    pub idle_backoff_us: u64,
    /// Delay between attempts to open the mapping
    pub connect_retry_ms: u64,
    /// Directory receiving result files
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapping_name: MAP_OBJECT_NAME.to_string(),
            expected_version: SHARED_MEMORY_VERSION,
            processing_interval_ms: 300,
            idle_backoff_us: 500,
            connect_retry_ms: 500,
            output_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Parse a YAML document; missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TelemetryError::parse_error("configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml =
            std::fs::read_to_string(path).map_err(|e| TelemetryError::file_error(path, e))?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mapping_name.trim().is_empty() {
            return Err(TelemetryError::config_error("mapping_name must not be empty"));
        }
        if self.processing_interval_ms == 0 {
            return Err(TelemetryError::config_error("processing_interval_ms must be positive"));
        }
        if self.connect_retry_ms == 0 {
            return Err(TelemetryError::config_error("connect_retry_ms must be positive"));
        }
        Ok(())
    }

    pub fn processing_interval(&self) -> Duration {
        Duration::from_millis(self.processing_interval_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_micros(self.idle_backoff_us)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}
