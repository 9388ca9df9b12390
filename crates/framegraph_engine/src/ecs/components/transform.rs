//! Transform component

use crate::ecs::Component;
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};

/// World-space placement of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// World space position
    pub position: Vec3,

    /// World space rotation
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::from_math_transform(&Transform::identity())
    }
}

impl TransformComponent {
    /// Identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transform with only a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder-style scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to the math type
    pub fn to_math_transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Convert from the math type
    pub fn from_math_transform(transform: &Transform) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }

    /// Model matrix
    pub fn matrix(&self) -> Mat4 {
        self.to_math_transform().to_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::Vec4;

    #[test]
    fn test_matrix_applies_scale_then_translation() {
        let transform = TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let moved = transform.matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(moved, Vec4::new(3.0, 2.0, 3.0, 1.0));
    }
}
