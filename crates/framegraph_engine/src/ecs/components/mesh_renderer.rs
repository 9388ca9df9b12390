//! Mesh renderer component and its drawable provider

use super::TransformComponent;
use crate::assets::{AssetId, AssetManager};
use crate::ecs::{Component, ComponentType, Entity, EntityManager};
use crate::foundation::math::{Transform, Vec4};
use crate::render::{Drawable, DrawableProvider};
use crate::resources::{Capabilities, FromResources, Lazy, Resource, ResourceGroup, ResourceSet};

/// Draws a mesh at the entity's transform
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRenderer {
    /// Mesh asset
    pub mesh: AssetId,
    /// Albedo texture asset
    pub albedo: AssetId,
    /// Tint color
    pub color: Vec4,
    /// Hidden renderers stay in render lists as members but produce no drawable
    pub visible: bool,
}

impl Component for MeshRenderer {}

impl MeshRenderer {
    /// White, visible renderer
    pub fn new(mesh: impl Into<AssetId>, albedo: impl Into<AssetId>) -> Self {
        Self {
            mesh: mesh.into(),
            albedo: albedo.into(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            visible: true,
        }
    }

    /// Builder-style tint
    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}

/// Turns [`MeshRenderer`] entities into drawables.
///
/// Renderers whose mesh or albedo failed to load are left out; an absent
/// asset manager means no asset state is checked.
pub struct MeshRendererProvider {
    entities: Lazy<EntityManager>,
    assets: Lazy<AssetManager>,
}

impl Resource for MeshRendererProvider {
    const GROUP: ResourceGroup = ResourceGroup::ECSComponent;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn DrawableProvider>(|this| this);
    }
}

impl FromResources for MeshRendererProvider {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            entities: resources.get_lazy(),
            assets: resources.get_lazy(),
        }
    }
}

impl DrawableProvider for MeshRendererProvider {
    fn marker(&self) -> ComponentType {
        ComponentType::of::<MeshRenderer>()
    }

    fn drawable(&self, entity: Entity) -> Option<Drawable> {
        let (renderer, transform) = {
            let store = self.entities.read();
            if !store.is_alive(entity) {
                return None;
            }
            let renderer = store.get::<MeshRenderer>(entity)?.clone();
            let transform = store
                .get::<TransformComponent>(entity)
                .map_or_else(Transform::identity, TransformComponent::to_math_transform);
            (renderer, transform)
        };

        if !renderer.visible {
            return None;
        }
        if let Ok(assets) = self.assets.try_resolve() {
            if assets.is_failed(renderer.mesh.as_str()) || assets.is_failed(renderer.albedo.as_str()) {
                log::debug!("Skipping {entity}: assets of its mesh renderer failed to load");
                return None;
            }
        }

        Some(Drawable {
            mesh: renderer.mesh,
            albedo: renderer.albedo,
            model: transform.to_matrix(),
            model_rotation: transform.rotation_matrix(),
            color: renderer.color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_hidden_renderer_has_no_drawable() {
        let resources = ResourceSet::new();
        resources.add::<EventQueue>().unwrap();
        let entities = resources.add::<EntityManager>().unwrap();
        let provider = resources.add::<MeshRendererProvider>().unwrap();

        let shown = entities.create_entity().unwrap();
        entities
            .add_component(shown, TransformComponent::from_position(Vec3::new(4.0, 0.0, 0.0)))
            .unwrap();
        entities.add_component(shown, MeshRenderer::new("cube", "white")).unwrap();

        let hidden = entities.create_entity().unwrap();
        let mut renderer = MeshRenderer::new("cube", "white");
        renderer.visible = false;
        entities.add_component(hidden, renderer).unwrap();

        let drawable = provider.drawable(shown).unwrap();
        assert_eq!(drawable.mesh.as_str(), "cube");
        assert_eq!(drawable.model[(0, 3)], 4.0);
        assert!(provider.drawable(hidden).is_none());
        assert_eq!(provider.marker(), ComponentType::of::<MeshRenderer>());
    }
}
