//! GPU rendering of sprite submissions.
//!
//! Conventions:
//! - Every sprite attribute is a per-instance vertex buffer; the vertex index
//!   selects the quad corner.
//! - Depth is `Depth32Float`, cleared to 0, compared with `GreaterEqual`.
//! - Colors are premultiplied and blended with `One, OneMinusSrcAlpha`.

mod common;
mod ctx;
mod sprites;

pub use ctx::{RenderCtx, RenderTarget};
pub use sprites::{SpriteBackend, SpriteRenderer};
