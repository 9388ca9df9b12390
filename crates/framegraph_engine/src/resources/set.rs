//! The resource registry itself

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{Initializable, Lazy, LazyCollection, Resource, ResourceError, ResourceGroup};

/// Construction hook for [`ResourceSet::add`].
///
/// Every `Default` type gets this for free. Implement it by hand to pull
/// dependencies out of the registry while the resource is being built.
pub trait FromResources {
    /// Build the resource
    fn from_resources(resources: &ResourceSet) -> Self;
}

impl<T: Default> FromResources for T {
    fn from_resources(_resources: &ResourceSet) -> Self {
        Self::default()
    }
}

/// One type-erased view of a resource: an `Arc<C>` stored as `dyn Any`
struct CapabilityView {
    type_id: TypeId,
    view: Box<dyn Any + Send + Sync>,
}

struct ResourceEntry {
    type_id: TypeId,
    type_name: &'static str,
    group: ResourceGroup,
    views: Vec<CapabilityView>,
}

impl ResourceEntry {
    fn view<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        let type_id = TypeId::of::<C>();
        self.views
            .iter()
            .find(|view| view.type_id == type_id)
            .and_then(|view| view.view.downcast_ref::<Arc<C>>())
            .cloned()
    }
}

/// Registration-time capability declaration for a resource of type `T`
pub struct Capabilities<'a, T> {
    instance: &'a Arc<T>,
    views: &'a mut Vec<CapabilityView>,
}

impl<T> Capabilities<'_, T> {
    /// Expose the resource as capability `C`.
    ///
    /// The cast is usually the identity closure, relying on unsized coercion:
    /// `capabilities.provide::<dyn Initializable>(|this| this)`.
    pub fn provide<C>(&mut self, cast: fn(Arc<T>) -> Arc<C>) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<C>();
        if self.views.iter().any(|view| view.type_id == type_id) {
            log::warn!("Capability `{}` declared twice, keeping the first", type_name::<C>());
            return self;
        }
        self.views.push(CapabilityView {
            type_id,
            view: Box::new(cast(Arc::clone(self.instance))),
        });
        self
    }
}

#[derive(Default)]
pub(super) struct Registry {
    entries: Vec<ResourceEntry>,
    by_type: HashMap<TypeId, usize>,
    tiers: BTreeMap<ResourceGroup, Vec<usize>>,
}

impl Registry {
    /// Entries in tier order, registration order within a tier
    fn ordered(&self) -> impl Iterator<Item = &ResourceEntry> + '_ {
        self.tiers
            .values()
            .flat_map(|indices| indices.iter().map(|&index| &self.entries[index]))
    }
}

/// Shared handle to the resource registry.
///
/// Cloning is cheap and every clone refers to the same registry. Instances are
/// held behind `Arc` and never moved once registered.
#[derive(Clone, Default)]
pub struct ResourceSet {
    inner: Arc<RwLock<Registry>>,
    initialized: Arc<Mutex<Vec<Initialized>>>,
}

/// A resource whose `init` succeeded and that still awaits `destroy`
struct Initialized {
    type_id: TypeId,
    name: &'static str,
    instance: Arc<dyn Initializable>,
}

impl ResourceSet {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_inner(inner: Arc<RwLock<Registry>>) -> Self {
        Self {
            inner,
            initialized: Arc::default(),
        }
    }

    pub(super) fn downgrade(&self) -> std::sync::Weak<RwLock<Registry>> {
        Arc::downgrade(&self.inner)
    }

    /// Construct `T` and register it.
    ///
    /// Construction happens before the registry is locked, so
    /// [`FromResources`] implementations may look up other resources.
    pub fn add<T: Resource + FromResources>(&self) -> Result<Arc<T>, ResourceError> {
        if self.contains::<T>() {
            return Err(ResourceError::AlreadyRegistered(type_name::<T>()));
        }
        let value = T::from_resources(self);
        self.insert(value)
    }

    /// Register an already constructed instance
    pub fn insert<T: Resource>(&self, value: T) -> Result<Arc<T>, ResourceError> {
        let instance = Arc::new(value);

        let mut views = vec![CapabilityView {
            type_id: TypeId::of::<T>(),
            view: Box::new(Arc::clone(&instance)),
        }];
        T::register_capabilities(&mut Capabilities {
            instance: &instance,
            views: &mut views,
        });

        let mut registry = self.inner.write();
        if registry.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(ResourceError::AlreadyRegistered(type_name::<T>()));
        }

        let index = registry.entries.len();
        registry.entries.push(ResourceEntry {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            group: T::GROUP,
            views,
        });
        registry.by_type.insert(TypeId::of::<T>(), index);
        registry.tiers.entry(T::GROUP).or_default().push(index);

        log::debug!("Registered resource `{}` in group {}", type_name::<T>(), T::GROUP);
        Ok(instance)
    }

    /// Whether a concrete type or capability is provided by any resource
    pub fn contains<C: ?Sized + Send + Sync + 'static>(&self) -> bool {
        let registry = self.inner.read();
        registry.by_type.contains_key(&TypeId::of::<C>())
            || registry.ordered().any(|entry| entry.view::<C>().is_some())
    }

    /// The unique resource providing concrete type or capability `C`
    pub fn try_get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>, ResourceError> {
        let registry = self.inner.read();

        if let Some(&index) = registry.by_type.get(&TypeId::of::<C>()) {
            if let Some(instance) = registry.entries[index].view::<C>() {
                return Ok(instance);
            }
        }

        let mut providers = registry.ordered().filter_map(ResourceEntry::view::<C>);
        let first = providers
            .next()
            .ok_or(ResourceError::NotRegistered(type_name::<C>()))?;
        let extra = providers.count();
        if extra > 0 {
            return Err(ResourceError::Ambiguous {
                type_name: type_name::<C>(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// The unique resource providing concrete type or capability `C`.
    ///
    /// # Panics
    ///
    /// Panics when nothing or more than one resource provides `C`. A missing
    /// registration is a wiring mistake, not a runtime condition.
    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Arc<C> {
        match self.try_get::<C>() {
            Ok(instance) => instance,
            Err(error) => panic!("{error}"),
        }
    }

    /// Every resource providing capability `C`, tier order then registration order
    pub fn get_all<C: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<C>> {
        self.inner
            .read()
            .ordered()
            .filter_map(ResourceEntry::view::<C>)
            .collect()
    }

    /// Deferred handle resolving `C` on first use
    pub fn get_lazy<C: ?Sized + Send + Sync + 'static>(&self) -> Lazy<C> {
        Lazy::new(self.downgrade())
    }

    /// Deferred handle resolving every provider of `C` on first use
    pub fn get_lazy_all<C: ?Sized + Send + Sync + 'static>(&self) -> LazyCollection<C> {
        LazyCollection::new(self.downgrade())
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(group, type name)` of every resource in initialization order
    pub fn describe(&self) -> Vec<(ResourceGroup, &'static str)> {
        self.inner
            .read()
            .ordered()
            .map(|entry| (entry.group, entry.type_name))
            .collect()
    }

    /// Initialize every [`Initializable`] resource in tier order.
    ///
    /// Stops at the first failure. Resources initialized before the failure
    /// are still torn down by [`ResourceSet::destroy_all`].
    pub fn init_all(&self) -> Result<(), ResourceError> {
        let pending: Vec<Initialized> = {
            let registry = self.inner.read();
            let initialized = self.initialized.lock();
            registry
                .ordered()
                .filter(|entry| !initialized.iter().any(|done| done.type_id == entry.type_id))
                .filter_map(|entry| {
                    entry.view::<dyn Initializable>().map(|instance| Initialized {
                        type_id: entry.type_id,
                        name: entry.type_name,
                        instance,
                    })
                })
                .collect()
        };

        for resource in pending {
            log::debug!("Initializing `{}`", resource.name);
            resource
                .instance
                .init()
                .map_err(|source| ResourceError::InitFailed {
                    resource: resource.name,
                    source,
                })?;
            self.initialized.lock().push(resource);
        }

        log::info!("Initialized {} resources", self.initialized.lock().len());
        Ok(())
    }

    /// Destroy every initialized resource in reverse initialization order.
    ///
    /// Calling it again is a no-op.
    pub fn destroy_all(&self) {
        let initialized = std::mem::take(&mut *self.initialized.lock());
        for resource in initialized.into_iter().rev() {
            log::debug!("Destroying `{}`", resource.name);
            resource.instance.destroy();
        }
    }
}
