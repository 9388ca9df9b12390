//! Asset manager resource

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use super::{AssetDictionary, AssetError, AssetId, AssetLoader, AssetState, SharedAsset};
use crate::config::EngineConfig;
use crate::resources::{
    Capabilities, FromResources, InitError, Initializable, LazyCollection, Resource,
    ResourceGroup, ResourceSet,
};

enum Entry {
    Pending,
    Loaded(SharedAsset),
    Failed,
}

impl Entry {
    const fn state(&self) -> AssetState {
        match self {
            Self::Pending => AssetState::Pending,
            Self::Loaded(_) => AssetState::Loaded,
            Self::Failed => AssetState::Failed,
        }
    }
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<AssetId>,
    entries: HashMap<AssetId, Entry>,
    running: bool,
}

/// State shared with the worker thread; every change is signalled on `changed`
#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
}

/// Name-keyed asynchronous asset cache.
///
/// [`enqueue`](Self::enqueue) only records the request; a worker thread
/// started in `init` resolves the name through the dictionary, picks a
/// loader, and records the terminal state. Shutdown lets the in-flight load
/// finish, starts no new one, and joins the thread.
pub struct AssetManager {
    shared: Arc<Shared>,
    dictionary: AssetDictionary,
    loaders: LazyCollection<dyn AssetLoader>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Resource for AssetManager {
    const GROUP: ResourceGroup = ResourceGroup::Assets;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn Initializable>(|this| this);
    }
}

impl FromResources for AssetManager {
    fn from_resources(resources: &ResourceSet) -> Self {
        let dictionary = resources
            .try_get::<EngineConfig>()
            .map(|config| AssetDictionary::from_config(&config.assets))
            .unwrap_or_default();
        Self::new(dictionary, resources)
    }
}

impl Initializable for AssetManager {
    fn init(&self) -> Result<(), InitError> {
        let loaders: Vec<Arc<dyn AssetLoader>> = self.loaders.try_resolve()?.to_vec();
        if loaders.is_empty() {
            log::warn!("No asset loaders registered; every load will fail");
        }

        let shared = Arc::clone(&self.shared);
        let dictionary = self.dictionary.clone();
        shared.inner.lock().running = true;
        let handle = std::thread::Builder::new()
            .name("asset-worker".to_string())
            .spawn(move || run_worker(&shared, &dictionary, &loaders))
            .map_err(|error| {
                self.shared.inner.lock().running = false;
                AssetError::WorkerSpawn(error)
            })?;
        *self.worker.lock() = Some(handle);

        log::info!("Asset manager started with {} dictionary entries", self.dictionary.len());
        Ok(())
    }

    fn destroy(&self) {
        self.shared.inner.lock().running = false;
        self.shared.changed.notify_all();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                log::error!("Asset worker thread panicked");
            }
        }
        log::info!("Asset manager stopped");
    }
}

impl AssetManager {
    /// Create a manager using `dictionary` and the loaders registered in `resources`
    pub fn new(dictionary: AssetDictionary, resources: &ResourceSet) -> Self {
        Self {
            shared: Arc::default(),
            dictionary,
            loaders: resources.get_lazy_all(),
            worker: Mutex::new(None),
        }
    }

    /// The name to file mapping in use
    pub fn dictionary(&self) -> &AssetDictionary {
        &self.dictionary
    }

    /// Request a load; returns `false` if the asset is already tracked
    pub fn enqueue(&self, name: impl Into<AssetId>) -> bool {
        let name = name.into();
        let mut inner = self.shared.inner.lock();
        if inner.entries.contains_key(&name) {
            return false;
        }
        log::debug!("Queued asset `{name}`");
        inner.entries.insert(name.clone(), Entry::Pending);
        inner.queue.push_back(name);
        drop(inner);
        self.shared.changed.notify_all();
        true
    }

    /// Current state of `name`, `None` when it is not tracked
    pub fn state(&self, name: &str) -> Option<AssetState> {
        self.shared.inner.lock().entries.get(name).map(Entry::state)
    }

    /// Whether `name` is tracked and failed to load
    pub fn is_failed(&self, name: &str) -> bool {
        self.state(name) == Some(AssetState::Failed)
    }

    /// Fetch a loaded asset as a `T`.
    ///
    /// With `wait`, blocks while the asset is pending and the worker is
    /// running. Returns `None` for untracked, pending, failed or
    /// mistyped assets.
    pub fn try_get_asset<T>(&self, name: &str, wait: bool) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut inner = self.shared.inner.lock();
        while wait
            && inner.running
            && matches!(inner.entries.get(name), Some(Entry::Pending))
        {
            self.shared.changed.wait(&mut inner);
        }

        let Entry::Loaded(asset) = inner.entries.get(name)? else {
            return None;
        };
        let asset = Arc::clone(asset);
        drop(inner);

        match asset.downcast::<T>() {
            Ok(asset) => Some(asset),
            Err(_) => {
                log::error!(
                    "Asset `{name}` is not a `{}`",
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Forget `name`, cancelling it if still queued
    pub fn unload(&self, name: &str) -> bool {
        let mut inner = self.shared.inner.lock();
        inner.queue.retain(|queued| queued.as_str() != name);
        let removed = inner.entries.remove(name).is_some();
        drop(inner);
        if removed {
            log::debug!("Unloaded asset `{name}`");
            self.shared.changed.notify_all();
        }
        removed
    }
}

fn run_worker(shared: &Shared, dictionary: &AssetDictionary, loaders: &[Arc<dyn AssetLoader>]) {
    log::debug!("Asset worker running");
    loop {
        let name = {
            let mut inner = shared.inner.lock();
            loop {
                if !inner.running {
                    log::debug!("Asset worker exiting");
                    return;
                }
                if let Some(name) = inner.queue.pop_front() {
                    break name;
                }
                shared.changed.wait(&mut inner);
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| load(dictionary, loaders, name.as_str())))
            .unwrap_or_else(|_| Err(AssetError::LoaderPanicked(name.to_string())));
        let entry = match outcome {
            Ok(asset) => {
                log::debug!("Loaded asset `{name}`");
                Entry::Loaded(asset)
            }
            Err(error) => {
                log::warn!("Asset `{name}` failed to load: {error}");
                Entry::Failed
            }
        };

        let mut inner = shared.inner.lock();
        // Unloaded while in flight: drop the result
        if let Some(slot @ Entry::Pending) = inner.entries.get_mut(&name) {
            *slot = entry;
        }
        drop(inner);
        shared.changed.notify_all();
    }
}

fn load(
    dictionary: &AssetDictionary,
    loaders: &[Arc<dyn AssetLoader>],
    name: &str,
) -> Result<SharedAsset, AssetError> {
    let path = dictionary
        .resolve(name)
        .ok_or_else(|| AssetError::NotInDictionary(name.to_string()))?;
    let loader = loaders
        .iter()
        .rev()
        .find(|loader| loader.can_load(&path))
        .ok_or_else(|| AssetError::NoLoader {
            name: name.to_string(),
            path: path.clone(),
        })?;
    loader.load(name, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{BytesLoader, RawBytes};
    use std::path::{Path, PathBuf};

    struct Exploding;

    impl Resource for Exploding {
        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn AssetLoader>(|this| this);
        }
    }

    impl AssetLoader for Exploding {
        fn can_load(&self, path: &Path) -> bool {
            path.extension().is_some_and(|ext| ext == "boom")
        }

        fn load(&self, _name: &str, _path: &Path) -> Result<SharedAsset, AssetError> {
            panic!("loader bug");
        }
    }

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framegraph-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn setup(dictionary: AssetDictionary) -> (ResourceSet, Arc<AssetManager>) {
        let resources = ResourceSet::new();
        resources.add::<BytesLoader>().unwrap();
        resources.insert(Exploding).unwrap();
        let assets = resources
            .insert(AssetManager::new(dictionary, &resources))
            .unwrap();
        resources.init_all().unwrap();
        (resources, assets)
    }

    #[test]
    fn test_loads_file_through_dictionary() {
        let path = scratch_file("hello.txt", b"hello");
        let mut dictionary = AssetDictionary::new(path.parent().unwrap());
        dictionary.insert("hello", "hello.txt");
        let (resources, assets) = setup(dictionary);

        assert!(assets.enqueue("hello"));
        assert!(!assets.enqueue("hello"));
        let bytes = assets.try_get_asset::<RawBytes>("hello", true).unwrap();
        assert_eq!(bytes.0, b"hello");
        assert_eq!(assets.state("hello"), Some(AssetState::Loaded));
        assert!(assets.try_get_asset::<String>("hello", true).is_none());

        assert!(assets.unload("hello"));
        assert_eq!(assets.state("hello"), None);
        resources.destroy_all();
    }

    #[test]
    fn test_missing_asset_fails_in_isolation() {
        let (resources, assets) = setup(AssetDictionary::new("."));

        assets.enqueue("missing.asset");
        assert!(assets.try_get_asset::<RawBytes>("missing.asset", true).is_none());
        assert!(assets.is_failed("missing.asset"));
        assert!(assets.try_get_asset::<RawBytes>("never-queued", true).is_none());
        resources.destroy_all();
    }

    #[test]
    fn test_loader_panic_is_contained() {
        let path = scratch_file("bad.boom", b"");
        let mut dictionary = AssetDictionary::new(path.parent().unwrap());
        dictionary.insert("bad", "bad.boom");
        dictionary.insert("good", "bad.boom.txt");
        scratch_file("bad.boom.txt", b"ok");
        let (resources, assets) = setup(dictionary);

        assets.enqueue("bad");
        assets.enqueue("good");
        assert!(assets.try_get_asset::<RawBytes>("bad", true).is_none());
        assert_eq!(assets.state("bad"), Some(AssetState::Failed));
        assert!(assets.try_get_asset::<RawBytes>("good", true).is_some());
        resources.destroy_all();
    }

    #[test]
    fn test_wait_does_not_block_after_shutdown() {
        let (resources, assets) = setup(AssetDictionary::new("."));
        resources.destroy_all();

        assets.enqueue("late");
        assert!(assets.try_get_asset::<RawBytes>("late", true).is_none());
        assert_eq!(assets.state("late"), Some(AssetState::Pending));
    }
}
