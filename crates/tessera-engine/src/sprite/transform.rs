use crate::coords::Vec2;

use super::InstanceTransform;

/// Per-frame placement of a sprite, produced by whatever moves it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    #[inline]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// GPU record for this transform with an already-mapped depth.
    pub fn to_instance(self, depth: f32) -> InstanceTransform {
        InstanceTransform {
            position: self.position.to_array(),
            scale: self.scale.to_array(),
            rotation: self.rotation,
            depth,
            _pad: [0.0; 2],
        }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
