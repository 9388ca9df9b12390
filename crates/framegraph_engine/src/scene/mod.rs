//! Scene graph
//!
//! A forest of named roots whose nodes bind entities into hierarchies. The
//! render list builder uses it to scope a view to the tree that contains it.

mod graph;
mod manager;

pub use graph::{Descendants, NodeId, SceneGraph, SceneNode};
pub use manager::SceneManager;

use thiserror::Error;

use crate::ecs::Entity;

/// Scene graph errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// A root with this name already exists
    #[error("Scene root `{0}` already exists")]
    DuplicateRoot(String),

    /// The node id is stale or was never issued
    #[error("Unknown scene node {0:?}")]
    UnknownNode(NodeId),

    /// Roots cannot be re-parented
    #[error("Scene root {0:?} cannot be moved")]
    CannotMoveRoot(NodeId),

    /// Roots are removed by name through `remove_root`
    #[error("Scene root {0:?} cannot be removed as a node")]
    CannotRemoveRoot(NodeId),

    /// The move would place a node under itself
    #[error("Moving {node:?} under {new_parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        new_parent: NodeId,
    },

    /// The entity is already bound to another node
    #[error("{0} is already bound to a scene node")]
    EntityAlreadyBound(Entity),

    /// No node under the root is bound to the entity
    #[error("{entity} not found under scene node {root:?}")]
    EntityNotFound {
        /// Searched entity
        entity: Entity,
        /// Search root
        root: NodeId,
    },
}
