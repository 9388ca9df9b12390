//! Configuration system
//!
//! Every engine setting lives in [`EngineConfig`]. Configs can be loaded from
//! or saved to TOML and RON files; the format is picked from the extension.

use std::collections::BTreeMap;
use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::events::ErrorPolicy;
use crate::resources::{Resource, ResourceGroup};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial presentation surface
    pub surface: SurfaceConfig,

    /// Asset system configuration
    pub assets: AssetConfig,

    /// Event queue configuration
    pub events: EventConfig,

    /// Stop after this many frames; `None` runs until the application quits
    pub max_frames: Option<u64>,

    /// Default log filter, overridable through `RUST_LOG`
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            assets: AssetConfig::default(),
            events: EventConfig::default(),
            max_frames: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config for EngineConfig {}

/// Registered by the engine so subsystems can read their settings while
/// they are constructed
impl Resource for EngineConfig {
    const GROUP: ResourceGroup = ResourceGroup::Engine;
}

/// Presentation surface size used until the backend reports its own extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Surface width in pixels
    pub width: u32,

    /// Surface height in pixels
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Asset system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory the dictionary paths are relative to
    pub root: String,

    /// Asset name to relative file path
    pub dictionary: BTreeMap<String, String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "resources".to_string(),
            dictionary: BTreeMap::new(),
        }
    }
}

/// Event queue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// What a failing handler does to the rest of a flush
    pub error_policy: ErrorPolicy,
}
