//! Asset loaders

use std::path::Path;
use std::sync::Arc;

use super::{AssetError, SharedAsset};
use crate::resources::{Capabilities, Resource, ResourceGroup};

/// Turns a file into an asset.
///
/// Loaders run on the asset worker thread. When several loaders accept a
/// file, the one registered last wins, so applications can override the
/// built-in [`BytesLoader`].
pub trait AssetLoader: Send + Sync {
    /// Whether this loader handles `path`
    fn can_load(&self, path: &Path) -> bool;

    /// Load the asset `name` from `path`
    fn load(&self, name: &str, path: &Path) -> Result<SharedAsset, AssetError>;
}

/// Unparsed file contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

/// Fallback loader producing [`RawBytes`] for any file
#[derive(Debug, Default)]
pub struct BytesLoader;

impl Resource for BytesLoader {
    const GROUP: ResourceGroup = ResourceGroup::Assets;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn AssetLoader>(|this| this);
    }
}

impl AssetLoader for BytesLoader {
    fn can_load(&self, _path: &Path) -> bool {
        true
    }

    fn load(&self, _name: &str, path: &Path) -> Result<SharedAsset, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Arc::new(RawBytes(bytes)))
    }
}
