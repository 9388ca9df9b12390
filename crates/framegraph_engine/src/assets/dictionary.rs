//! Asset name to file mapping

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::AssetConfig;

/// Maps asset names to files below a root directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDictionary {
    root: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl AssetDictionary {
    /// Create an empty dictionary rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build the dictionary described by the engine configuration
    pub fn from_config(config: &AssetConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            entries: config
                .dictionary
                .iter()
                .map(|(name, path)| (name.clone(), PathBuf::from(path)))
                .collect(),
        }
    }

    /// Add or replace an entry; relative paths are resolved against the root
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), path.into());
    }

    /// Whether `name` has an entry
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `name`
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).map(|path| self.root.join(path))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
