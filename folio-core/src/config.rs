use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::state::FitMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub default_fit_mode: FitMode,
    /// Delay before the second highlight refresh that follows a render.
    pub overlay_settle_delay_ms: u64,
    pub zoom_step: f32,
    pub device_pixel_ratio: f32,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Drop pages whose text cannot be extracted instead of failing the
    /// whole search.
    pub skip_failed_pages: bool,
    pub case_sensitive: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_fit_mode: FitMode::Page,
            overlay_settle_delay_ms: 50,
            zoom_step: 1.1,
            device_pixel_ratio: 1.0,
            search: SearchConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Reads a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|err| {
            ViewerError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|err| ViewerError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: ViewerConfig =
            toml::from_str(raw).map_err(|err| ViewerError::Config(err.to_string()))?;
        config.validate()
    }

    pub fn overlay_settle_delay(&self) -> Duration {
        Duration::from_millis(self.overlay_settle_delay_ms)
    }

    fn validate(self) -> Result<Self> {
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(ViewerError::Config(format!(
                "zoom_step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(ViewerError::Config(format!(
                "device_pixel_ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        Ok(self)
    }
}
