//! Sprite tinting.
//!
//! Scope:
//! - color representation (linear premultiplied alpha)
//! - per-corner color masks multiplied with sampled texels

pub mod color;
pub mod mask;

pub use color::Color;
pub use mask::ColorMask;
