//! Entity Component System
//!
//! Entities are dense ids into an [`EntityStore`]; components are arbitrary
//! `Send + Sync` values, at most one per kind per entity. All structural
//! changes go through the [`EntityManager`], which reports them on the
//! [`EventQueue`](crate::events::EventQueue) so that other subsystems (scene
//! graph, render lists) can keep derived state in sync.

pub mod components;
mod component;
mod entity;
pub mod events;
mod manager;
mod store;
mod system;

pub use component::{AsAny, Component, ComponentType};
pub use entity::Entity;
pub use manager::EntityManager;
pub use store::{EntityStore, Query};
pub use system::{System, SystemError, SystemRunner};

use thiserror::Error;

/// ECS errors
#[derive(Debug, Error)]
pub enum EcsError {
    /// The entity id does not refer to a live entity
    #[error("{0} is not allocated")]
    EntityNotAllocated(Entity),

    /// The entity already has a component of this kind
    #[error("{entity} already has a `{component}` component")]
    DuplicateComponent {
        /// Target entity
        entity: Entity,
        /// Component type name
        component: &'static str,
    },

    /// The entity table could not grow
    #[error("Failed to grow the entity table to {0} slots")]
    AllocationFailed(usize),

    /// A system returned an error from its update
    #[error("System `{system}` failed")]
    SystemFailed {
        /// System name
        system: String,
        /// Underlying error
        #[source]
        source: SystemError,
    },
}
