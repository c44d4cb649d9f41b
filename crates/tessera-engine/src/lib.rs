//! Tessera engine crate.
//!
//! Depth-sorted 2D sprites drawn in instanced batches on wgpu.
//!
//! Sprites live in a [`Stage`]. Each one either owns one-row attribute
//! buffers or is attached to a [`Batch`] sharing its texture, whose columns
//! stay sorted by depth. Canvases own disjoint depth bands and the camera and
//! projection their sprites are viewed through.

pub mod batch;
pub mod buffer;
pub mod canvas;
pub mod coords;
pub mod core;
pub mod device;
pub mod draw;
pub mod error;
pub mod logging;
pub mod order;
pub mod paint;
pub mod pool;
pub mod render;
pub mod sprite;
pub mod stage;
pub mod time;
pub mod window;

pub use batch::Batch;
pub use canvas::{Canvas, Layout};
pub use draw::{DrawBackend, DrawSubmission};
pub use error::SpriteError;
pub use pool::{BatchId, SpriteId};
pub use sprite::{Sprite, SpriteDesc, Transform2D};
pub use stage::{Stage, StageConfig};
