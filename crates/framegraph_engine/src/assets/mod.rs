//! Asynchronous asset loading
//!
//! Assets are addressed by name. The [`AssetDictionary`] maps names to files
//! below the configured asset root, and the [`AssetManager`] loads them on a
//! worker thread through the registered [`AssetLoader`]s. A failed load is a
//! terminal state of that one entry; it never takes the engine down.

mod dictionary;
mod loader;
mod manager;

pub use dictionary::AssetDictionary;
pub use loader::{AssetLoader, BytesLoader, RawBytes};
pub use manager::AssetManager;

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A loaded asset, downcast to its concrete type on access
pub type SharedAsset = Arc<dyn Any + Send + Sync>;

/// Name of an asset in the dictionary
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(Arc<str>);

impl AssetId {
    /// Create an id from an asset name
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The asset name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AssetId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load state of a tracked asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    /// Queued or being loaded
    Pending,
    /// Loaded and available
    Loaded,
    /// Load failed; the entry stays failed until unloaded
    Failed,
}

/// Asset loading errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// The name has no dictionary entry
    #[error("Asset `{0}` is not in the asset dictionary")]
    NotInDictionary(String),

    /// No registered loader accepts the file
    #[error("No loader accepts `{name}` at {path:?}")]
    NoLoader {
        /// Asset name
        name: String,
        /// Resolved file path
        path: PathBuf,
    },

    /// The file could not be read
    #[error("Failed to read asset file {path:?}")]
    Io {
        /// Resolved file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The loader rejected the file contents
    #[error("Failed to decode asset `{name}`: {message}")]
    Decode {
        /// Asset name
        name: String,
        /// Loader diagnostic
        message: String,
    },

    /// The loader panicked
    #[error("Loader panicked while loading `{0}`")]
    LoaderPanicked(String),

    /// The worker thread could not be started
    #[error("Failed to spawn the asset worker thread")]
    WorkerSpawn(#[source] std::io::Error),
}
