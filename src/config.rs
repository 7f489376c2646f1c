//! Pipeline configuration
//!
//! Only delivery behaviour is configurable. Chain coefficients are fixed per
//! tier and deliberately absent here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MasterError, Result};
use crate::mastering::preview::DEFAULT_PREVIEW_SECONDS;

/// Settings for a mastering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteringConfig {
    /// Maximum preview duration in seconds
    pub preview_seconds: f64,
    /// Run the loudness analysis and optional second render pass
    pub gain_correction: bool,
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self {
            preview_seconds: DEFAULT_PREVIEW_SECONDS,
            gain_correction: true,
        }
    }
}

impl MasteringConfig {
    /// Load and validate a JSON config file
    ///
    /// Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: MasteringConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if !self.preview_seconds.is_finite() || self.preview_seconds <= 0.0 {
            return Err(MasterError::InvalidConfig {
                reason: format!(
                    "preview_seconds must be a positive number, got {}",
                    self.preview_seconds
                ),
            });
        }
        Ok(())
    }
}
