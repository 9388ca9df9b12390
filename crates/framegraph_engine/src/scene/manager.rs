//! Scene manager resource

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::SceneGraph;
use crate::ecs::events::EntityDestroyed;
use crate::events::{EventQueue, HandlerId};
use crate::resources::{
    Capabilities, FromResources, InitError, Initializable, Lazy, Resource, ResourceGroup,
    ResourceSet,
};

/// Owns the scene forest and keeps it consistent with the ECS.
///
/// When an entity is destroyed, the node bound to it is removed and its
/// children are spliced onto the node's parent.
pub struct SceneManager {
    graph: Arc<RwLock<SceneGraph>>,
    events: Lazy<EventQueue>,
    handler: Mutex<Option<HandlerId>>,
}

impl Resource for SceneManager {
    const GROUP: ResourceGroup = ResourceGroup::Scene;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn Initializable>(|this| this);
    }
}

impl FromResources for SceneManager {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            graph: Arc::default(),
            events: resources.get_lazy(),
            handler: Mutex::new(None),
        }
    }
}

impl Initializable for SceneManager {
    fn init(&self) -> Result<(), InitError> {
        let graph = Arc::clone(&self.graph);
        let id = self.events.add_listener(move |event: &EntityDestroyed| {
            let mut graph = graph.write();
            if let Some(node) = graph.entity_node(event.entity) {
                if let Err(error) = graph.remove_node(node, true) {
                    log::error!("Failed to unlink {} from the scene: {error}", event.entity);
                }
            }
        });
        *self.handler.lock() = Some(id);
        Ok(())
    }

    fn destroy(&self) {
        if let Some(id) = self.handler.lock().take() {
            self.events.remove_handler(id);
        }
    }
}

impl SceneManager {
    /// Shared access to the scene forest
    pub fn read(&self) -> RwLockReadGuard<'_, SceneGraph> {
        self.graph.read()
    }

    /// Exclusive access to the scene forest
    pub fn write(&self) -> RwLockWriteGuard<'_, SceneGraph> {
        self.graph.write()
    }
}
