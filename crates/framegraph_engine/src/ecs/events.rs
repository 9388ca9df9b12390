//! Entity and component lifecycle events
//!
//! Pushed into the [`EventQueue`](crate::events::EventQueue) by the
//! [`EntityManager`](super::EntityManager). Destroying an entity emits one
//! [`ComponentDestroyed`] per attached component, in attachment order, and
//! then a single [`EntityDestroyed`].

use std::sync::Arc;

use super::{Component, ComponentType, Entity};

/// An entity slot was allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCreated {
    /// The new entity
    pub entity: Entity,
}

/// An entity slot was freed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDestroyed {
    /// The destroyed entity; its id may already be reused
    pub entity: Entity,
}

/// A component was attached to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentCreated {
    /// Owning entity
    pub entity: Entity,
    /// Kind of the new component
    pub component_type: ComponentType,
}

/// A component was detached from an entity
#[derive(Clone)]
pub struct ComponentDestroyed {
    /// Former owning entity
    pub entity: Entity,
    /// Kind of the removed component
    pub component_type: ComponentType,
    /// Final state of the removed component
    pub component: Arc<dyn Component>,
}

impl ComponentDestroyed {
    /// Final state of the removed component, if it is a `T`
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.component.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for ComponentDestroyed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDestroyed")
            .field("entity", &self.entity)
            .field("component_type", &self.component_type)
            .finish_non_exhaustive()
    }
}
