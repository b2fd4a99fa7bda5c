#![forbid(unsafe_code)]

//! Drag thresholds and timings.
//!
//! Loaded from TOML or JSON; every field has a default so partial files are
//! accepted.
//!
//! ```toml
//! top_zone_px = 40.0
//! panel_margin_px = 32.0
//! preview_debounce_ms = 50
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for the drag engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pointer within this distance of the panel top resolves to index 0.
    pub top_zone_px: f32,
    /// Outward tolerance around the panel before the pointer counts as outside.
    pub panel_margin_px: f32,
    /// Fraction of a row's height that must be crossed when moving down.
    pub approach_down_fraction: f32,
    /// Fraction of a row's height that must be crossed when moving up.
    pub approach_up_fraction: f32,
    /// Vertical travel needed before the drag direction is updated.
    pub direction_dead_zone_px: f32,
    /// Delay before a changed candidate index is previewed.
    pub preview_debounce_ms: u64,
    /// Period of the idle artifact sweep.
    pub sweep_interval_ms: u64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            top_zone_px: 40.0,
            panel_margin_px: 32.0,
            approach_down_fraction: 0.1,
            approach_up_fraction: 0.9,
            direction_dead_zone_px: 2.0,
            preview_debounce_ms: 50,
            sweep_interval_ms: 2000,
        }
    }
}

impl DragConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)?.validated()
    }

    /// Load and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)?.validated()
    }

    #[must_use]
    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Check every parameter is within range.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("top_zone_px", self.top_zone_px),
            ("panel_margin_px", self.panel_margin_px),
            ("direction_dead_zone_px", self.direction_dead_zone_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be finite and >= 0, got {value}"));
            }
        }
        for (name, value) in [
            ("approach_down_fraction", self.approach_down_fraction),
            ("approach_up_fraction", self.approach_up_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if self.sweep_interval_ms == 0 {
            errors.push("sweep_interval_ms must be > 0".into());
        }
        errors
    }

    /// `self` if valid, otherwise every validation error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}
