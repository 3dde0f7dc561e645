// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph settings persisted as RON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "nodeforge.ron";

/// Error reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for these settings
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// World values read by the builtin nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Gravity vector
    pub gravity: [f32; 3],
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            delta_time: 0.0,
            gravity: [0.0, -9.81, 0.0],
        }
    }
}

/// Settings shared by a graph and its host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Settings format version
    pub version: u32,
    /// Header written by `Graph::save`
    pub save_format_version: i32,
    /// Deepest pull chain evaluation follows before failing
    pub max_evaluation_depth: usize,
    /// Size of newly added nodes
    pub default_node_size: [f32; 2],
    /// World values
    pub environment: Environment,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            save_format_version: crate::persist::FORMAT_VERSION,
            max_evaluation_depth: 512,
            default_node_size: [200.0, 50.0],
            environment: Environment::default(),
        }
    }
}

impl GraphSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: GraphSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings file path inside a directory
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }
}
