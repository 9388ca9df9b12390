//! Render source component

use crate::ecs::Component;

/// Marks an entity as a named point of view.
///
/// Render operators ask the [`RenderListBuilder`](crate::render::RenderListBuilder)
/// for the list of a source by this name. The entity also needs a
/// view-capable component such as [`Camera`](super::Camera).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSource {
    /// Name render operators refer to
    pub name: String,
}

impl Component for RenderSource {}

impl RenderSource {
    /// Source called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
