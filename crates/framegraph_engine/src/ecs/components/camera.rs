//! Camera component and its view provider

use super::TransformComponent;
use crate::ecs::{Component, Entity, EntityManager};
use crate::foundation::math::{utils, Mat4};
use crate::render::{Projection, View, ViewProvider};
use crate::resources::{Capabilities, FromResources, Lazy, Resource, ResourceGroup, ResourceSet};

/// Projection settings of a camera entity; the view comes from its transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Projection
    pub projection: Projection,
}

impl Component for Camera {}

impl Camera {
    /// Perspective camera; `fov_y_degrees` is the vertical field of view
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: utils::deg_to_rad(fov_y_degrees),
                aspect,
                near,
                far,
            },
        }
    }

    /// Orthographic camera centred on its view axis
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                left: -width * 0.5,
                right: width * 0.5,
                bottom: -height * 0.5,
                top: height * 0.5,
                near,
                far,
            },
        }
    }
}

/// Answers views for entities with a [`Camera`]
pub struct CameraProvider {
    entities: Lazy<EntityManager>,
}

impl Resource for CameraProvider {
    const GROUP: ResourceGroup = ResourceGroup::ECSComponent;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn ViewProvider>(|this| this);
    }
}

impl FromResources for CameraProvider {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            entities: resources.get_lazy(),
        }
    }
}

impl ViewProvider for CameraProvider {
    fn view(&self, entity: Entity) -> Option<View> {
        let store = self.entities.read();
        if !store.is_alive(entity) {
            return None;
        }
        let camera = store.get::<Camera>(entity)?;
        let view = store
            .get::<TransformComponent>(entity)
            .map_or_else(Mat4::identity, |transform| {
                transform.to_math_transform().inverse_matrix()
            });
        Some(View {
            view,
            projection: camera.projection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;
    use crate::foundation::math::{Vec3, Vec4};
    use approx::assert_relative_eq;

    #[test]
    fn test_view_is_inverse_of_camera_transform() {
        let resources = ResourceSet::new();
        resources.add::<EventQueue>().unwrap();
        let entities = resources.add::<EntityManager>().unwrap();
        let provider = resources.add::<CameraProvider>().unwrap();

        let camera = entities.create_entity().unwrap();
        entities
            .add_component(camera, Camera::orthographic(4.0, 2.0, 0.1, 10.0))
            .unwrap();
        entities
            .add_component(camera, TransformComponent::from_position(Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        let plain = entities.create_entity().unwrap();

        let view = provider.view(camera).unwrap();
        let eye = view.view * Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert_relative_eq!(eye, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!(provider.view(plain).is_none());
    }
}
