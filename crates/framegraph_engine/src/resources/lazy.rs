//! Deferred resource handles
//!
//! A resource that needs another one "later, not now" keeps a [`Lazy`] or
//! [`LazyCollection`] instead of an `Arc`. The handle holds a weak reference
//! to the registry and resolves on first dereference, which lets two
//! resources refer to each other regardless of registration order.

use std::any::type_name;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use super::set::Registry;
use super::{ResourceError, ResourceSet};

fn upgrade<C: ?Sized>(registry: &Weak<RwLock<Registry>>) -> Result<ResourceSet, ResourceError> {
    registry
        .upgrade()
        .map(ResourceSet::from_inner)
        .ok_or(ResourceError::RegistryDropped(type_name::<C>()))
}

/// Deferred handle to the unique provider of `C`
pub struct Lazy<C: ?Sized + Send + Sync + 'static> {
    registry: Weak<RwLock<Registry>>,
    resolved: OnceLock<Arc<C>>,
}

impl<C: ?Sized + Send + Sync + 'static> Lazy<C> {
    pub(super) fn new(registry: Weak<RwLock<Registry>>) -> Self {
        Self {
            registry,
            resolved: OnceLock::new(),
        }
    }

    /// Resolve now, returning the error instead of panicking
    pub fn try_resolve(&self) -> Result<&Arc<C>, ResourceError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let instance = upgrade::<C>(&self.registry)?.try_get::<C>()?;
        Ok(self.resolved.get_or_init(|| instance))
    }

    /// Whether the handle has already been resolved
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolved instance, cloned out of the handle.
    ///
    /// # Panics
    ///
    /// Panics when `C` cannot be resolved; see [`ResourceSet::get`].
    pub fn instance(&self) -> Arc<C> {
        Arc::clone(self)
    }
}

impl<C: ?Sized + Send + Sync + 'static> Deref for Lazy<C> {
    type Target = Arc<C>;

    fn deref(&self) -> &Arc<C> {
        match self.try_resolve() {
            Ok(instance) => instance,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<C: ?Sized + Send + Sync + 'static> fmt::Debug for Lazy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("type", &type_name::<C>())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Deferred handle to every provider of capability `C`.
///
/// The set of providers is captured on first dereference; resources
/// registered afterwards are not seen.
pub struct LazyCollection<C: ?Sized + Send + Sync + 'static> {
    registry: Weak<RwLock<Registry>>,
    resolved: OnceLock<Vec<Arc<C>>>,
}

impl<C: ?Sized + Send + Sync + 'static> LazyCollection<C> {
    pub(super) fn new(registry: Weak<RwLock<Registry>>) -> Self {
        Self {
            registry,
            resolved: OnceLock::new(),
        }
    }

    /// Resolve now, returning the error instead of panicking
    pub fn try_resolve(&self) -> Result<&[Arc<C>], ResourceError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let providers = upgrade::<C>(&self.registry)?.get_all::<C>();
        Ok(self.resolved.get_or_init(|| providers))
    }
}

impl<C: ?Sized + Send + Sync + 'static> Deref for LazyCollection<C> {
    type Target = [Arc<C>];

    fn deref(&self) -> &[Arc<C>] {
        match self.try_resolve() {
            Ok(providers) => providers,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<C: ?Sized + Send + Sync + 'static> fmt::Debug for LazyCollection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection")
            .field("type", &type_name::<C>())
            .field("resolved", &self.resolved.get().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Capabilities, FromResources, Resource};

    trait Named: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct Ping {
        pong: Lazy<Pong>,
    }

    struct Pong {
        ping: Lazy<Ping>,
        named: LazyCollection<dyn Named>,
    }

    impl Resource for Ping {
        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn Named>(|this| this);
        }
    }

    impl Resource for Pong {
        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn Named>(|this| this);
        }
    }

    impl Named for Ping {
        fn name(&self) -> &'static str {
            "ping"
        }
    }

    impl Named for Pong {
        fn name(&self) -> &'static str {
            "pong"
        }
    }

    impl FromResources for Ping {
        fn from_resources(resources: &ResourceSet) -> Self {
            Self {
                pong: resources.get_lazy(),
            }
        }
    }

    impl FromResources for Pong {
        fn from_resources(resources: &ResourceSet) -> Self {
            Self {
                ping: resources.get_lazy(),
                named: resources.get_lazy_all(),
            }
        }
    }

    #[test]
    fn test_lazy_breaks_construction_cycles() {
        let resources = ResourceSet::new();
        let ping = resources.add::<Ping>().unwrap();
        let pong = resources.add::<Pong>().unwrap();

        assert!(!ping.pong.is_resolved());
        assert_eq!(ping.pong.name(), "pong");
        assert_eq!(pong.ping.name(), "ping");
        assert!(Arc::ptr_eq(&pong.ping, &ping));

        let names: Vec<_> = pong.named.iter().map(|named| named.name()).collect();
        assert_eq!(names, vec!["ping", "pong"]);
    }

    #[test]
    fn test_lazy_reports_dropped_registry() {
        let lazy = {
            let resources = ResourceSet::new();
            resources.get_lazy::<Ping>()
        };
        assert!(matches!(
            lazy.try_resolve(),
            Err(ResourceError::RegistryDropped(_))
        ));
    }
}
