//! Scenario tests exercising several subsystems together

mod render_lists;

use std::ops::Deref;

use crate::config::EngineConfig;
use crate::ecs::components::{Camera, MeshRenderer, RenderSource, TransformComponent};
use crate::ecs::Entity;
use crate::foundation::math::Vec3;
use crate::scene::NodeId;
use crate::Engine;

/// Engine with every resource initialized, torn down on drop
struct Harness(Engine);

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let engine = Engine::new(config).unwrap();
        engine.resources().init_all().unwrap();
        Self(engine)
    }

    fn flush(&self) {
        self.events().process().unwrap();
    }

    fn camera(&self, source: &str, parent: NodeId) -> Entity {
        let entities = self.entities();
        let camera = entities.create_entity().unwrap();
        entities.add_component(camera, RenderSource::new(source)).unwrap();
        entities
            .add_component(camera, Camera::perspective(60.0, 16.0 / 9.0, 0.1, 100.0))
            .unwrap();
        entities
            .add_component(camera, TransformComponent::from_position(Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        self.scenes().write().insert_entity_node(parent, camera).unwrap();
        camera
    }

    fn mesh(&self, mesh: &str, x: f32, parent: NodeId) -> (Entity, NodeId) {
        let entities = self.entities();
        let entity = entities.create_entity().unwrap();
        entities
            .add_component(entity, TransformComponent::from_position(Vec3::new(x, 0.0, 0.0)))
            .unwrap();
        entities.add_component(entity, MeshRenderer::new(mesh, "white")).unwrap();
        let node = self.scenes().write().insert_entity_node(parent, entity).unwrap();
        (entity, node)
    }
}

impl Deref for Harness {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        &self.0
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.0.resources().destroy_all();
    }
}
