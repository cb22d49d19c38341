// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{FacingMode, Resolution};
use crate::constants::{ResolutionPreset, timing};
use crate::errors::ConfigResult;
use crate::pipelines::photo::EncodingQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR: &str = "profile-camera";
const CONFIG_FILE: &str = "config.json";

/// Capture settings
///
/// Missing keys in the config file fall back to their defaults.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred camera facing for the first two acquisition attempts
    pub facing: FacingMode,
    /// Ideal resolution for the first acquisition attempt
    pub target_resolution: Resolution,
    /// Fallback delay before the preview is declared live without a frame signal
    pub readiness_timeout_ms: u64,
    /// JPEG quality of captured stills
    pub jpeg_quality: EncodingQuality,
    /// Mirror captured stills horizontally (selfie mode)
    pub mirror_capture: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            target_resolution: ResolutionPreset::default().resolution(),
            readiness_timeout_ms: timing::READINESS_FALLBACK_MS,
            jpeg_quality: EncodingQuality::default(),
            mirror_capture: false,
        }
    }
}

impl Config {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Default location: `<config dir>/profile-camera/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, or defaults when there is no file
    pub fn load() -> ConfigResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from an explicit JSON file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
