//! Dock engine tunables.
//!
//! Every field has a default matching the stock workspace look (16rem minimum
//! panel edge and a 0.2rem handle at 16px per rem), so `DockConfig::default()`
//! is usable as-is. With the `config-files` feature the config can also be
//! loaded from TOML or JSON:
//!
//! ```toml
//! panel_min_width = 320.0
//! handle_size = 4.0
//! id_seed = 7
//! ```

#[cfg(feature = "config-files")]
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Axis;

/// Pixels per rem used to derive the defaults.
pub const PX_PER_REM: f64 = 16.0;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockConfig {
    /// Minimum leaf width in pixels.
    pub panel_min_width: f64,
    /// Minimum leaf height in pixels.
    pub panel_min_height: f64,
    /// Thickness of the resize handle between siblings.
    pub handle_size: f64,
    /// Random id draws before giving up.
    pub id_max_attempts: u32,
    /// Length of the base-36 id suffix.
    pub id_suffix_len: usize,
    /// Fixed RNG seed for reproducible ids.
    pub id_seed: Option<u64>,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            panel_min_width: 16.0 * PX_PER_REM,
            panel_min_height: 16.0 * PX_PER_REM,
            handle_size: 0.2 * PX_PER_REM,
            id_max_attempts: 64,
            id_suffix_len: 8,
            id_seed: None,
        }
    }
}

impl DockConfig {
    /// Minimum leaf extent along `axis`.
    #[must_use]
    pub const fn min_extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.panel_min_width,
            Axis::Vertical => self.panel_min_height,
        }
    }

    /// Builder-style seed override, handy for deterministic hosts and tests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.panel_min_width.is_finite() && self.panel_min_width > 0.0) {
            errors.push(format!(
                "panel_min_width must be > 0, got {}",
                self.panel_min_width
            ));
        }
        if !(self.panel_min_height.is_finite() && self.panel_min_height > 0.0) {
            errors.push(format!(
                "panel_min_height must be > 0, got {}",
                self.panel_min_height
            ));
        }
        if !(self.handle_size.is_finite() && self.handle_size >= 0.0) {
            errors.push(format!(
                "handle_size must be >= 0, got {}",
                self.handle_size
            ));
        }
        if self.id_max_attempts == 0 {
            errors.push("id_max_attempts must be > 0".into());
        }
        if self.id_suffix_len == 0 {
            errors.push("id_suffix_len must be > 0".into());
        }

        errors
    }

    /// [`validate`](Self::validate) folded into a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a dock configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-files")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
