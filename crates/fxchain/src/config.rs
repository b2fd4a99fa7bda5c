#![forbid(unsafe_code)]

//! Session configuration.
//!
//! ```toml
//! [drag]
//! preview_debounce_ms = 40
//!
//! [notices]
//! ttl_ms = 2500
//! ```

use std::path::Path;

use fxchain_drag::{ConfigError, DragConfig};
use serde::{Deserialize, Serialize};

use crate::notice::NoticeConfig;

/// Everything a [`crate::PipelineSession`] can be tuned with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub drag: DragConfig,
    pub notices: NoticeConfig,
}

impl SessionConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load and validate a config file, picking the format by extension.
    ///
    /// `.json` is parsed as JSON; anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        config.validated()
    }

    /// Returns a list of validation errors, prefixed by section.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let drag = self.drag.validate().into_iter().map(|e| format!("drag: {e}"));
        let notices = self
            .notices
            .validate()
            .into_iter()
            .map(|e| format!("notices: {e}"));
        drag.chain(notices).collect()
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
