//! Render lists
//!
//! A [`RenderList`] is the flat set of things one view sees: the view and
//! projection of a camera plus a drawable per visible entity of the camera's
//! scene tree. Component kinds plug in through [`ViewProvider`] and
//! [`DrawableProvider`] resources.

mod builder;

pub use builder::RenderListBuilder;

use std::collections::{BTreeMap, BTreeSet};

use crate::assets::AssetId;
use crate::ecs::{ComponentType, Entity};
use crate::foundation::math::{utils, Mat4, Vec4};

/// Camera projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
    /// Orthographic projection of a view volume
    Orthographic {
        /// Left plane
        left: f32,
        /// Right plane
        right: f32,
        /// Bottom plane
        bottom: f32,
        /// Top plane
        top: f32,
        /// Near plane
        near: f32,
        /// Far plane
        far: f32,
    },
}

impl Projection {
    /// Projection matrix with depth mapped to `[0, 1]`
    pub fn to_matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => utils::perspective(fov_y, aspect, near, far),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => utils::orthographic(left, right, bottom, top, near, far),
        }
    }
}

/// Where a camera looks from, and how it projects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// World-to-view matrix
    pub view: Mat4,
    /// Projection
    pub projection: Projection,
}

/// Everything needed to draw one entity
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    /// Mesh asset
    pub mesh: AssetId,
    /// Albedo texture asset
    pub albedo: AssetId,
    /// Model matrix
    pub model: Mat4,
    /// Rotation-only part of the model matrix, for normals
    pub model_rotation: Mat4,
    /// Tint color
    pub color: Vec4,
}

/// Produces views for camera entities
pub trait ViewProvider: Send + Sync {
    /// View of `entity`, if it carries the component this provider handles
    fn view(&self, entity: Entity) -> Option<View>;
}

/// Produces drawables for renderable entities
pub trait DrawableProvider: Send + Sync {
    /// Component kind that marks an entity as drawable by this provider
    fn marker(&self) -> ComponentType;

    /// Drawable for `entity`, or `None` if it should not be drawn right now
    fn drawable(&self, entity: Entity) -> Option<Drawable>;
}

/// What one view sees
#[derive(Debug, Clone, PartialEq)]
pub struct RenderList {
    view: View,
    members: BTreeSet<Entity>,
    drawables: BTreeMap<Entity, Drawable>,
}

impl RenderList {
    fn new(view: View) -> Self {
        Self {
            view,
            members: BTreeSet::new(),
            drawables: BTreeMap::new(),
        }
    }

    /// Camera view and projection
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// World-to-view matrix
    pub const fn view_matrix(&self) -> &Mat4 {
        &self.view.view
    }

    /// Camera projection
    pub const fn projection(&self) -> &Projection {
        &self.view.projection
    }

    /// Entities marked drawable in the view's scene tree, drawn or not
    pub const fn members(&self) -> &BTreeSet<Entity> {
        &self.members
    }

    /// Whether `entity` is a member
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Drawable of `entity`
    pub fn drawable(&self, entity: Entity) -> Option<&Drawable> {
        self.drawables.get(&entity)
    }

    /// Drawables in entity order
    pub fn drawables(&self) -> impl Iterator<Item = (Entity, &Drawable)> + '_ {
        self.drawables.iter().map(|(&entity, drawable)| (entity, drawable))
    }

    /// Number of drawables
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    fn remove(&mut self, entity: Entity) {
        self.members.remove(&entity);
        self.drawables.remove(&entity);
    }
}
