//! Depth-sorted groups of sprites drawn with one submission.

use std::cmp::Ordering;
use std::ops::Range;

use crate::buffer::BufferError;
use crate::canvas::{Layout, ViewTables};
use crate::draw::{DrawBackend, DrawSubmission};
use crate::error::SpriteError;
use crate::pool::{BatchId, Pool, SpriteId};
use crate::sprite::{ShaderRef, Sprite, SpriteColumns, TextureRef};

/// One attached sprite, in draw order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BatchEntry {
    pub sprite: SpriteId,
    pub depth: f32,
}

/// Sprites sharing a texture and shader, stored in parallel attribute columns.
///
/// Invariants, holding after every call returns:
/// - every column holds `entries.len()` records
/// - `entries` is non-decreasing by depth; equal depths keep attach order
/// - the sprite at `entries[i]` records `Batched { batch: id, index: i }`
#[derive(Debug)]
pub struct Batch {
    id: BatchId,
    texture: TextureRef,
    shader: ShaderRef,
    entries: Vec<BatchEntry>,
    columns: SpriteColumns,
    views: ViewTables,
}

impl Batch {
    pub fn new(
        id: BatchId,
        texture: TextureRef,
        shader: ShaderRef,
        capacity: usize,
    ) -> Result<Self, SpriteError> {
        Ok(Self {
            id,
            texture,
            shader,
            entries: Vec::new(),
            columns: SpriteColumns::with_capacity(capacity)?,
            views: ViewTables::new()?,
        })
    }

    #[inline]
    pub fn id(&self) -> BatchId {
        self.id
    }

    #[inline]
    pub fn texture(&self) -> &TextureRef {
        &self.texture
    }

    #[inline]
    pub fn shader(&self) -> &ShaderRef {
        &self.shader
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attached sprites in draw order.
    #[inline]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    #[inline]
    pub fn columns(&self) -> &SpriteColumns {
        &self.columns
    }

    #[inline]
    pub(crate) fn columns_mut(&mut self) -> &mut SpriteColumns {
        &mut self.columns
    }

    #[inline]
    pub fn views(&self) -> &ViewTables {
        &self.views
    }

    /// Columns and entry list agree in length.
    pub fn is_consistent(&self) -> bool {
        self.columns.is_consistent() && self.columns.len() == self.entries.len()
    }

    // ── structure ─────────────────────────────────────────────────────────

    /// Inserts `id` at its depth position and moves its attributes into the
    /// batch columns. Returns the index it landed at.
    pub fn attach(&mut self, sprites: &mut Pool<Sprite>, id: SpriteId) -> Result<usize, SpriteError> {
        let sprite = sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
        if sprite.is_attached() {
            return Err(SpriteError::AlreadyAttached);
        }
        if sprite.texture().id() != self.texture.id() {
            return Err(SpriteError::TextureMismatch {
                sprite: sprite.texture().id(),
                batch: self.texture.id(),
            });
        }

        let depth = sprite.depth();
        let at = self.insertion_point(depth);
        self.entries
            .try_reserve(1)
            .map_err(|_| BufferError::OutOfMemory {
                label: "batch entries",
                requested_bytes: (self.entries.len() + 1) * size_of::<BatchEntry>(),
            })?;
        self.columns.insert(at, &sprite.record())?;
        self.entries.insert(at, BatchEntry { sprite: id, depth });

        // Standalone buffers are released here.
        sprite.set_batched(self.id, at);
        self.reindex(sprites, at + 1..self.entries.len());

        log::trace!("batch {:?}: attached {:?} at {} of {}", self.id, id, at, self.entries.len());
        Ok(at)
    }

    /// Removes `id` from the batch and gives it fresh standalone buffers
    /// built from its current target area and color mask.
    pub fn detach(&mut self, sprites: &mut Pool<Sprite>, id: SpriteId) -> Result<(), SpriteError> {
        let index = self.index_of(sprites, id)?;
        let buffers = sprites
            .get(id)
            .ok_or(SpriteError::UnknownSprite)?
            .standalone_buffers()?;

        self.columns.remove(index)?;
        self.entries.remove(index);
        if let Some(sprite) = sprites.get_mut(id) {
            sprite.set_standalone(buffers);
        }
        self.reindex(sprites, index..self.entries.len());

        log::trace!("batch {:?}: detached {:?} from {}", self.id, id, index);
        Ok(())
    }

    /// Moves `id` to the position for `depth`, carrying its record along.
    /// Returns the new index.
    pub fn set_depth(
        &mut self,
        sprites: &mut Pool<Sprite>,
        id: SpriteId,
        depth: f32,
    ) -> Result<usize, SpriteError> {
        let from = self.index_of(sprites, id)?;

        let record = self.columns.remove(from)?;
        self.entries.remove(from);
        let to = self.insertion_point(depth);
        // The row freed by the removal covers this insert; no reallocation.
        self.columns.insert(to, &record)?;
        self.entries.insert(to, BatchEntry { sprite: id, depth });

        if let Some(sprite) = sprites.get_mut(id) {
            sprite.set_depth_value(depth);
        }
        self.reindex(sprites, from.min(to)..from.max(to) + 1);

        log::trace!("batch {:?}: {:?} moved {} -> {}", self.id, id, from, to);
        Ok(to)
    }

    /// Gives every member standalone buffers and empties the batch.
    ///
    /// All buffers are built before any sprite changes, so a failure leaves
    /// the batch as it was.
    pub(crate) fn release_all(&mut self, sprites: &mut Pool<Sprite>) -> Result<(), SpriteError> {
        let mut rebuilt = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let sprite = sprites.get(entry.sprite).ok_or(SpriteError::UnknownSprite)?;
            rebuilt.push((entry.sprite, sprite.standalone_buffers()?));
        }
        for (id, buffers) in rebuilt {
            if let Some(sprite) = sprites.get_mut(id) {
                sprite.set_standalone(buffers);
            }
        }
        while !self.entries.is_empty() {
            let last = self.entries.len() - 1;
            self.columns.remove(last)?;
            self.entries.pop();
        }
        Ok(())
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Refreshes the camera tables from `layout`, submits every attached
    /// sprite as one draw, then clears all visibility flags.
    pub fn draw(&mut self, layout: &Layout, backend: &mut dyn DrawBackend) {
        for canvas in layout.canvases() {
            if let Err(err) = self.views.refresh(canvas) {
                log::warn!("batch {:?}: canvas {} not refreshed: {err}", self.id, canvas.slot());
            }
        }

        if self.entries.is_empty() {
            log::trace!("batch {:?}: nothing attached", self.id);
        } else {
            backend.submit(DrawSubmission {
                texture: &self.texture,
                shader: &self.shader,
                columns: &mut self.columns,
                views: &mut self.views,
                instances: self.entries.len() as u32,
            });
        }

        self.columns.clear_visibility();
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Index of `id` if it is attached here and its back-reference agrees.
    fn index_of(&self, sprites: &Pool<Sprite>, id: SpriteId) -> Result<usize, SpriteError> {
        let sprite = sprites.get(id).ok_or(SpriteError::UnknownSprite)?;
        match sprite.batch() {
            Some((batch, index))
                if batch == self.id
                    && index < self.entries.len()
                    && self.entries[index].sprite == id =>
            {
                Ok(index)
            }
            _ => Err(SpriteError::NotInBatch),
        }
    }

    /// After every entry with depth `<= depth`.
    fn insertion_point(&self, depth: f32) -> usize {
        self.entries
            .partition_point(|e| e.depth.total_cmp(&depth) != Ordering::Greater)
    }

    fn reindex(&self, sprites: &mut Pool<Sprite>, range: Range<usize>) {
        for i in range {
            if let Some(sprite) = sprites.get_mut(self.entries[i].sprite) {
                sprite.set_batch_index(i);
            }
        }
    }
}
