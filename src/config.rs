use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::overlay::MarkerStyle;
use crate::view::{is_valid_fov, DEFAULT_FOV};

/// Label visibility toggles owned by the UI layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Label every marker, not just the selected one
    pub always_show_labels: bool,
    /// Draw a line to every marker, not just the selected one
    pub always_show_lines: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Overlay configuration, loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Field of view in radians when the host exposes none
    pub default_fov: f32,
    /// TTL applied by callers that do not pass their own
    pub default_ttl_millis: u32,
    pub ui: UiSettings,
    pub style: MarkerStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            default_fov: DEFAULT_FOV,
            default_ttl_millis: 1000,
            ui: UiSettings::default(),
            style: MarkerStyle::default(),
        }
    }
}

impl OverlayConfig {
    /// Parse and validate; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: OverlayConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_fov(self.default_fov) {
            return Err(ConfigError::Invalid(format!(
                "default_fov must be in (0, pi), got {}",
                self.default_fov
            )));
        }
        if self.style.radius <= 0.0 || self.style.selected_radius <= 0.0 {
            return Err(ConfigError::Invalid("marker radii must be positive".into()));
        }
        Ok(())
    }
}
