//! Geometry types shared by sprites, canvases and renderers.
//!
//! Canonical CPU space:
//! - World units for sprite placement, texels for texture sub-areas
//! - Origin top-left
//! - +X right, +Y down
//!
//! Projections convert world units to clip space in the sprite shader.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
