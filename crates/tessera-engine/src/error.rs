use crate::buffer::BufferError;
use crate::coords::Rect;
use crate::sprite::TextureId;

/// Errors returned by sprite, batch and layout operations.
///
/// Every variant is detected before any state changes, so a failed call
/// leaves buffers, indices and depth orders exactly as they were.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpriteError {
    #[error("sprite handle is stale or was never issued")]
    UnknownSprite,

    #[error("batch handle is stale or was never issued")]
    UnknownBatch,

    #[error("no canvas occupies slot {0}")]
    UnknownCanvas(u32),

    #[error("sprite samples texture {sprite:?} but the batch draws {batch:?}")]
    TextureMismatch { sprite: TextureId, batch: TextureId },

    #[error("sprite is already attached to a batch")]
    AlreadyAttached,

    #[error("sprite is not attached to this batch")]
    NotInBatch,

    #[error("target area {area:?} is not inside the {}x{} texture", texture.0, texture.1)]
    InvalidSubArea { area: Rect, texture: (u32, u32) },

    #[error("sprite has no canvas to draw into")]
    NoCanvas,

    #[error("a canvas already occupies slot {0}")]
    DuplicateSlot(u32),

    #[error("canvas slot {slot} exceeds the {max} available slots")]
    SlotOutOfRange { slot: u32, max: u32 },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
