// SPDX-License-Identifier: MPL-2.0

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, timing};
use crate::errors::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Runtime policy for the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a waiting stop polls before giving up
    pub stop_timeout_ms: u64,
    /// Sleep between activity polls while stopping
    pub stop_poll_interval_ms: u64,
    /// Dispose outputs (and detach their encoders) once they are stopped
    pub auto_dispose_outputs: bool,
    /// Filter used by [`crate::logging::init`] when `RUST_LOG` is unset
    pub log_filter: String,
    /// Where recording outputs write by default
    pub recording_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: timing::STOP_TIMEOUT.as_millis() as u64,
            stop_poll_interval_ms: timing::STOP_POLL_INTERVAL.as_millis() as u64,
            auto_dispose_outputs: true,
            log_filter: "warn".to_string(),
            recording_dir: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> BridgeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), "Loaded bridge config");
        Ok(config)
    }

    /// `<config dir>/obs-bridge/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from [`Self::default_path`], falling back to defaults when the file
    /// is missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid bridge config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> BridgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    /// Configured recording directory, or `<videos>/obs-bridge`
    pub fn recording_dir(&self) -> PathBuf {
        self.recording_dir
            .clone()
            .unwrap_or_else(crate::outputs::default_recording_dir)
    }

    fn validate(&self) -> BridgeResult<()> {
        if self.stop_poll_interval_ms == 0 {
            return Err(BridgeError::Config(
                "stop_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
