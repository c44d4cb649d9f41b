use bytemuck::{Pod, Zeroable};

use crate::coords::{Vec2, Viewport};

/// View into the world: what is centered on screen, how it is turned and zoomed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub zoom: f32,
}

impl Camera2D {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        zoom: 1.0,
    };

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            position: self.position.to_array(),
            rotation: self.rotation,
            zoom: self.zoom,
        }
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Where world origin lands on the target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
}

/// Orthographic mapping from camera space (y down) to clip space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub size: Vec2,
    pub anchor: Anchor,
}

impl Projection {
    pub fn new(size: Vec2, anchor: Anchor) -> Self {
        Self { size, anchor }
    }

    pub fn from_viewport(viewport: Viewport, anchor: Anchor) -> Self {
        Self::new(Vec2::new(viewport.width, viewport.height), anchor)
    }

    pub fn uniform(&self) -> ProjectionUniform {
        let sx = if self.size.x > 0.0 { 2.0 / self.size.x } else { 0.0 };
        let sy = if self.size.y > 0.0 { -2.0 / self.size.y } else { 0.0 };
        let offset = match self.anchor {
            Anchor::Center => [0.0, 0.0],
            Anchor::TopLeft => [-1.0, 1.0],
        };
        ProjectionUniform {
            scale: [sx, sy],
            offset,
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(Vec2::new(2.0, 2.0), Anchor::Center)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub position: [f32; 2],
    pub rotation: f32,
    pub zoom: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ProjectionUniform {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}
