//! Canvases, their cameras, and the layout that orders them in depth.
//!
//! Each canvas occupies a fixed depth band derived from its slot index. The
//! [`Layout`] holds the union of those bands and maps a sprite's local depth
//! into the output clip-depth range.

mod camera;
mod slot;
mod layout;
mod tables;

pub use camera::{Anchor, Camera2D, CameraUniform, Projection, ProjectionUniform};
pub use slot::{Canvas, DEPTH_BAND};
pub use layout::Layout;
pub use tables::ViewTables;

/// Upper bound on canvas slots. Sizes the camera and projection tables every
/// draw binds.
pub const MAX_CANVAS_SLOTS: u32 = 16;
