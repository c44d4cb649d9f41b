//! Seam between sprite storage and whatever records the GPU commands.

use crate::canvas::ViewTables;
use crate::sprite::{Shader, SpriteColumns, Texture};

/// One instanced draw: `instances` quads read from `columns`, viewed through
/// the camera and projection tables in `views`.
///
/// Columns and tables are lent mutably so the backend can upload pending
/// edits before recording the draw.
pub struct DrawSubmission<'a> {
    pub texture: &'a Texture,
    pub shader: &'a Shader,
    pub columns: &'a mut SpriteColumns,
    pub views: &'a mut ViewTables,
    pub instances: u32,
}

/// Receives draw submissions from batches and standalone sprites.
pub trait DrawBackend {
    fn submit(&mut self, submission: DrawSubmission<'_>);
}
