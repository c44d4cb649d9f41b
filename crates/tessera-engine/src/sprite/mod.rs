//! Sprites and the per-sprite attribute records they are drawn from.

mod columns;
mod state;
mod texture;
mod transform;

pub use columns::{
    InstanceTransform, QuadColors, QuadGeometry, QuadTexCoords, SlotIndices, SpriteColumns,
    SpriteRecord, Visibility,
};
pub use state::{Residence, Sprite, SpriteDesc, StandaloneBuffers};
pub use texture::{Shader, ShaderId, ShaderRef, Texture, TextureId, TextureRef};
pub use transform::Transform2D;
