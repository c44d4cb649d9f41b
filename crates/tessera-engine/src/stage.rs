//! Owner of every sprite, batch and canvas.
//!
//! Sprite operations need the sprite, the batch holding it and its canvas at
//! once; [`Stage`] owns all three so each call can validate against the whole
//! picture before it changes anything.

use std::collections::HashSet;

use crate::batch::Batch;
use crate::canvas::{Canvas, Layout};
use crate::coords::Rect;
use crate::draw::{DrawBackend, DrawSubmission};
use crate::error::SpriteError;
use crate::paint::ColorMask;
use crate::pool::{BatchId, Pool, SpriteId};
use crate::sprite::{
    Residence, Shader, ShaderRef, SlotIndices, Sprite, SpriteDesc, TextureRef, Transform2D,
};

/// Stage tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Output depth range mapped depths land in.
    pub clip_depth: (f32, f32),
    /// Rows each new batch reserves up front.
    pub initial_batch_capacity: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            clip_depth: (0.0, 1.0),
            initial_batch_capacity: 64,
        }
    }
}

/// Sprites, batches and the layout they are drawn through.
#[derive(Debug)]
pub struct Stage {
    layout: Layout,
    sprites: Pool<Sprite>,
    batches: Pool<Batch>,
    shader: ShaderRef,
    config: StageConfig,
    /// Standalone sprites submitted by `draw_sprite` since the last `draw_all`.
    submitted: HashSet<SpriteId>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

impl Stage {
    /// Stage drawing standalone sprites with the built-in sprite shader.
    pub fn new(config: StageConfig) -> Self {
        Self::with_shader(Shader::sprite(), config)
    }

    /// Stage drawing standalone sprites with `shader`.
    pub fn with_shader(shader: ShaderRef, config: StageConfig) -> Self {
        let (c0, c1) = config.clip_depth;
        Self {
            layout: Layout::new().with_clip_range(c0, c1),
            sprites: Pool::new(),
            batches: Pool::new(),
            shader,
            config,
            submitted: HashSet::new(),
        }
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[inline]
    pub fn shader(&self) -> &ShaderRef {
        &self.shader
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprites(&self) -> impl Iterator<Item = (SpriteId, &Sprite)> + '_ {
        self.sprites.iter()
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(id)
    }

    pub fn batches(&self) -> impl Iterator<Item = (BatchId, &Batch)> + '_ {
        self.batches.iter()
    }

    // ── canvases ──────────────────────────────────────────────────────────

    /// Adds a canvas during setup.
    pub fn add_canvas(&mut self, canvas: Canvas) -> Result<(), SpriteError> {
        self.layout.add_canvas(canvas)
    }

    /// For camera and projection updates.
    pub fn canvas_mut(&mut self, slot: u32) -> Result<&mut Canvas, SpriteError> {
        self.layout
            .canvas_mut(slot)
            .ok_or(SpriteError::UnknownCanvas(slot))
    }

    /// Standalone sprites of canvas `slot` in draw order.
    pub fn standalone_in_canvas(
        &self,
        slot: u32,
    ) -> Result<impl Iterator<Item = SpriteId> + '_, SpriteError> {
        let canvas = self
            .layout
            .canvas(slot)
            .ok_or(SpriteError::UnknownCanvas(slot))?;
        Ok(canvas.standalone())
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Creates a standalone sprite. Its depth is clamped to the layout range.
    pub fn create_sprite(&mut self, mut desc: SpriteDesc) -> Result<SpriteId, SpriteError> {
        if let Some(slot) = desc.canvas {
            self.require_canvas(slot)?;
        }
        desc.depth = self.layout.clamp_depth(desc.depth);
        let depth = desc.depth;
        let canvas = desc.canvas;

        let sprite = Sprite::new(desc)?;
        let id = self.sprites.insert(sprite);
        if let Some(canvas) = canvas.and_then(|slot| self.layout.canvas_mut(slot)) {
            canvas.insert_standalone(id, depth);
        }
        log::trace!("stage: created {id:?}");
        Ok(id)
    }

    /// Destroys a sprite, detaching it from its batch first.
    pub fn destroy_sprite(&mut self, id: SpriteId) -> Result<(), SpriteError> {
        let sprite = self.sprites.get(id).ok_or(SpriteError::UnknownSprite)?;
        let canvas = sprite.canvas();
        if let Some((batch_id, _)) = sprite.batch() {
            let batch = self
                .batches
                .get_mut(batch_id)
                .ok_or(SpriteError::UnknownBatch)?;
            batch.detach(&mut self.sprites, id)?;
        }
        if let Some(canvas) = canvas.and_then(|slot| self.layout.canvas_mut(slot)) {
            canvas.remove_standalone(id);
        }
        self.sprites.remove(id);
        self.submitted.remove(&id);
        log::trace!("stage: destroyed {id:?}");
        Ok(())
    }

    /// Creates an empty batch drawing `texture` with `shader`.
    pub fn create_batch(
        &mut self,
        texture: TextureRef,
        shader: ShaderRef,
    ) -> Result<BatchId, SpriteError> {
        let capacity = self.config.initial_batch_capacity;
        let id = self
            .batches
            .insert_with(|id| Batch::new(id, texture, shader, capacity))?;
        log::debug!("stage: created batch {id:?}");
        Ok(id)
    }

    /// Destroys a batch. Its sprites become standalone.
    pub fn destroy_batch(&mut self, id: BatchId) -> Result<(), SpriteError> {
        let batch = self.batches.get_mut(id).ok_or(SpriteError::UnknownBatch)?;
        let members: Vec<SpriteId> = batch.entries().iter().map(|e| e.sprite).collect();
        batch.release_all(&mut self.sprites)?;
        self.batches.remove(id);

        for sprite_id in members {
            self.index_standalone(sprite_id);
        }
        log::debug!("stage: destroyed batch {id:?}");
        Ok(())
    }

    // ── batch membership ──────────────────────────────────────────────────

    pub fn attach(&mut self, batch: BatchId, sprite: SpriteId) -> Result<usize, SpriteError> {
        let target = self.batches.get_mut(batch).ok_or(SpriteError::UnknownBatch)?;
        let index = target.attach(&mut self.sprites, sprite)?;
        self.unindex_standalone(sprite);
        Ok(index)
    }

    pub fn detach(&mut self, batch: BatchId, sprite: SpriteId) -> Result<(), SpriteError> {
        let target = self.batches.get_mut(batch).ok_or(SpriteError::UnknownBatch)?;
        target.detach(&mut self.sprites, sprite)?;
        self.index_standalone(sprite);
        Ok(())
    }

    // ── sprite mutators ───────────────────────────────────────────────────

    /// Clamps `z` to the layout range and reorders the sprite wherever it lives.
    pub fn set_depth(&mut self, id: SpriteId, z: f32) -> Result<(), SpriteError> {
        let z = self.layout.clamp_depth(z);
        let sprite = self.sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
        match sprite.batch() {
            Some((batch_id, _)) => {
                let batch = self
                    .batches
                    .get_mut(batch_id)
                    .ok_or(SpriteError::UnknownBatch)?;
                batch.set_depth(&mut self.sprites, id, z)?;
            }
            None => {
                sprite.set_depth_value(z);
                if let Some(canvas) = sprite.canvas().and_then(|slot| self.layout.canvas_mut(slot)) {
                    canvas.reposition(id, z);
                }
            }
        }
        Ok(())
    }

    pub fn set_color_mask(&mut self, id: SpriteId, mask: ColorMask) -> Result<(), SpriteError> {
        let colors = Sprite::encoded_colors(mask);
        let sprite = self.sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
        match &mut sprite.residence {
            Residence::Standalone(buffers) => buffers.columns.write_colors(0, colors)?,
            Residence::Batched { batch, index } => self
                .batches
                .get_mut(*batch)
                .ok_or(SpriteError::UnknownBatch)?
                .columns_mut()
                .write_colors(*index, colors)?,
        }
        sprite.set_color_mask_value(mask);
        Ok(())
    }

    /// Shows `area` (texels) of the sprite's texture. The area must lie inside it.
    pub fn set_target_area(&mut self, id: SpriteId, area: Rect) -> Result<(), SpriteError> {
        let sprite = self.sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
        sprite.check_area(area)?;
        let (geometry, uv) = sprite.encoded_appearance(area);
        match &mut sprite.residence {
            Residence::Standalone(buffers) => buffers.columns.write_appearance(0, geometry, uv)?,
            Residence::Batched { batch, index } => self
                .batches
                .get_mut(*batch)
                .ok_or(SpriteError::UnknownBatch)?
                .columns_mut()
                .write_appearance(*index, geometry, uv)?,
        }
        sprite.set_target_area_value(area);
        Ok(())
    }

    /// Moves the sprite to canvas `slot`, or out of every canvas.
    pub fn set_canvas(&mut self, id: SpriteId, slot: Option<u32>) -> Result<(), SpriteError> {
        if let Some(slot) = slot {
            self.require_canvas(slot)?;
        }
        let sprite = self.sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
        let slots = SlotIndices::canvas(slot.unwrap_or(0));
        match &mut sprite.residence {
            Residence::Standalone(buffers) => buffers.columns.write_slots(0, slots)?,
            Residence::Batched { batch, index } => self
                .batches
                .get_mut(*batch)
                .ok_or(SpriteError::UnknownBatch)?
                .columns_mut()
                .write_slots(*index, slots)?,
        }

        self.unindex_standalone(id);
        if let Some(sprite) = self.sprites.get_mut(id) {
            sprite.set_canvas_value(slot);
        }
        self.index_standalone(id);
        Ok(())
    }

    /// Records the transform [`draw_all`](Self::draw_all) draws a standalone
    /// sprite with, without drawing it.
    pub fn set_transform(&mut self, id: SpriteId, transform: Transform2D) -> Result<(), SpriteError> {
        self.sprites
            .get_mut(id)
            .ok_or(SpriteError::UnknownSprite)?
            .set_last_transform(transform);
        Ok(())
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Places the sprite for this frame.
    ///
    /// Batched sprites get their transform and visibility written into the
    /// batch; the batch draw submits them. Standalone sprites are submitted
    /// to `backend` immediately, and the next [`draw_all`](Self::draw_all)
    /// leaves them out so they are not drawn twice in one frame.
    pub fn draw_sprite(
        &mut self,
        id: SpriteId,
        transform: Transform2D,
        backend: &mut dyn DrawBackend,
    ) -> Result<(), SpriteError> {
        let sprite = self.sprites.get(id).ok_or(SpriteError::UnknownSprite)?;
        let slot = sprite.canvas().ok_or(SpriteError::NoCanvas)?;
        let depth = self.layout.map_depth(slot, sprite.depth())?;
        let instance = transform.to_instance(depth);

        match sprite.batch() {
            Some((batch_id, index)) => {
                let columns = self
                    .batches
                    .get_mut(batch_id)
                    .ok_or(SpriteError::UnknownBatch)?
                    .columns_mut();
                columns.write_transform(index, instance)?;
                columns.set_visible(index)?;
                if let Some(sprite) = self.sprites.get_mut(id) {
                    sprite.set_last_transform(transform);
                }
            }
            None => {
                draw_standalone(
                    &self.layout,
                    &mut self.sprites,
                    &self.shader,
                    id,
                    transform,
                    backend,
                )?;
                self.submitted.insert(id);
            }
        }
        Ok(())
    }

    pub fn draw_batch(&mut self, id: BatchId, backend: &mut dyn DrawBackend) -> Result<(), SpriteError> {
        let batch = self.batches.get_mut(id).ok_or(SpriteError::UnknownBatch)?;
        batch.draw(&self.layout, backend);
        Ok(())
    }

    /// Draws every batch, then each canvas's standalone sprites back to front
    /// with their last transforms. Standalone sprites never placed are skipped,
    /// as are those already submitted through [`draw_sprite`](Self::draw_sprite)
    /// since the previous call. Ends the frame.
    pub fn draw_all(&mut self, backend: &mut dyn DrawBackend) {
        for id in self.batches.handles() {
            if let Some(batch) = self.batches.get_mut(id) {
                batch.draw(&self.layout, backend);
            }
        }

        for canvas in self.layout.canvases() {
            for id in canvas.standalone() {
                if self.submitted.contains(&id) {
                    continue;
                }
                let Some(transform) = self.sprites.get(id).and_then(Sprite::last_transform) else {
                    continue;
                };
                if let Err(err) = draw_standalone(
                    &self.layout,
                    &mut self.sprites,
                    &self.shader,
                    id,
                    transform,
                    backend,
                ) {
                    log::warn!("stage: standalone {id:?} not drawn: {err}");
                }
            }
        }
        self.submitted.clear();
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn require_canvas(&self, slot: u32) -> Result<(), SpriteError> {
        match self.layout.canvas(slot) {
            Some(_) => Ok(()),
            None => Err(SpriteError::UnknownCanvas(slot)),
        }
    }

    /// Adds a standalone sprite to its canvas's depth index.
    fn index_standalone(&mut self, id: SpriteId) {
        let Some(sprite) = self.sprites.get(id) else {
            return;
        };
        if sprite.is_attached() {
            return;
        }
        let depth = sprite.depth();
        if let Some(canvas) = sprite.canvas().and_then(|slot| self.layout.canvas_mut(slot)) {
            canvas.insert_standalone(id, depth);
        }
    }

    fn unindex_standalone(&mut self, id: SpriteId) {
        let Some(slot) = self.sprites.get(id).and_then(Sprite::canvas) else {
            return;
        };
        if let Some(canvas) = self.layout.canvas_mut(slot) {
            canvas.remove_standalone(id);
        }
    }
}

/// Immediate one-instance draw of a standalone sprite.
fn draw_standalone(
    layout: &Layout,
    sprites: &mut Pool<Sprite>,
    shader: &ShaderRef,
    id: SpriteId,
    transform: Transform2D,
    backend: &mut dyn DrawBackend,
) -> Result<(), SpriteError> {
    let sprite = sprites.get_mut(id).ok_or(SpriteError::UnknownSprite)?;
    let slot = sprite.canvas().ok_or(SpriteError::NoCanvas)?;
    let canvas = layout.canvas(slot).ok_or(SpriteError::UnknownCanvas(slot))?;
    let depth = layout.map_depth(slot, sprite.depth())?;
    let texture = sprite.texture().clone();

    let Some(buffers) = sprite.standalone_mut() else {
        return Err(SpriteError::AlreadyAttached);
    };
    buffers.views.refresh(canvas)?;
    buffers.columns.write_transform(0, transform.to_instance(depth))?;
    buffers.columns.set_visible(0)?;
    backend.submit(DrawSubmission {
        texture: &texture,
        shader,
        columns: &mut buffers.columns,
        views: &mut buffers.views,
        instances: 1,
    });
    buffers.columns.clear_visibility();

    sprite.set_last_transform(transform);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Camera2D, Layout};
    use crate::coords::Vec2;
    use crate::draw::recording::RecordingBackend;
    use crate::paint::Color;
    use crate::sprite::{InstanceTransform, QuadColors, Texture};

    /// Deterministic pseudo-random sequence for property-style tests.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn depth(&mut self) -> f32 {
            (self.next() % 200) as f32 / 100.0
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next() % n as u64) as usize
        }
    }

    fn stage_with_canvases(slots: &[u32]) -> Stage {
        let mut stage = Stage::default();
        for &slot in slots {
            stage.add_canvas(Canvas::new(slot)).unwrap();
        }
        stage
    }

    fn tint(v: f32) -> ColorMask {
        ColorMask::uniform(Color::from_premul(v, v, v, 1.0))
    }

    fn assert_batch_coherent(stage: &Stage, batch: BatchId) {
        let b = stage.batch(batch).unwrap();
        assert!(b.is_consistent());
        assert_eq!(b.columns().lens(), [b.len(); 6]);
        for (i, entry) in b.entries().iter().enumerate() {
            let sprite = stage.sprite(entry.sprite).unwrap();
            assert_eq!(sprite.batch(), Some((batch, i)));
            assert_eq!(sprite.depth(), entry.depth);
            let stored = b.columns().record(i).unwrap();
            let expected = sprite.record();
            assert_eq!(stored.geometry, expected.geometry);
            assert_eq!(stored.uv, expected.uv);
            assert_eq!(stored.colors, expected.colors);
            assert_eq!(stored.slots, expected.slots);
        }
        for w in b.entries().windows(2) {
            assert!(w[0].depth <= w[1].depth);
        }
    }

    // ── batch invariants ──────────────────────────────────────────────────

    #[test]
    fn attach_keeps_batch_sorted_after_every_call() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let texture = Texture::new(64, 64);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let mut rng = Lcg(7);
        for _ in 0..100 {
            let desc = SpriteDesc::new(texture.clone()).with_depth(rng.depth()).in_canvas(0);
            let id = stage.create_sprite(desc).unwrap();
            stage.attach(batch, id).unwrap();
            let b = stage.batch(batch).unwrap();
            assert!(b.entries().windows(2).all(|w| w[0].depth <= w[1].depth));
        }
        assert_batch_coherent(&stage, batch);
    }

    #[test]
    fn random_mutations_keep_columns_parallel_and_indices_valid() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let texture = Texture::new(64, 64);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let mut rng = Lcg(42);

        let ids: Vec<SpriteId> = (0..24)
            .map(|i| {
                let desc = SpriteDesc::new(texture.clone())
                    .with_depth(rng.depth())
                    .with_color_mask(tint(i as f32 / 24.0))
                    .with_target_area(Rect::new(0.0, 0.0, 1.0 + i as f32, 2.0))
                    .in_canvas((i % 2) as u32);
                stage.create_sprite(desc).unwrap()
            })
            .collect();

        for step in 0..400 {
            let id = ids[rng.below(ids.len())];
            let attached = stage.sprite(id).unwrap().is_attached();
            match rng.below(5) {
                0 | 1 if !attached => {
                    stage.attach(batch, id).unwrap();
                }
                0 | 1 => {
                    stage.detach(batch, id).unwrap();
                }
                2 => stage.set_depth(id, rng.depth()).unwrap(),
                3 => stage.set_color_mask(id, tint(step as f32 / 400.0)).unwrap(),
                _ => {
                    let w = 1.0 + rng.below(60) as f32;
                    stage.set_target_area(id, Rect::new(0.0, 0.0, w, w)).unwrap();
                }
            }
            assert_batch_coherent(&stage, batch);
        }

        let attached = ids
            .iter()
            .filter(|&&id| stage.sprite(id).unwrap().is_attached())
            .count();
        assert_eq!(stage.batch(batch).unwrap().len(), attached);
    }

    #[test]
    fn written_transforms_stay_with_their_sprite() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(16, 16);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let mut backend = RecordingBackend::default();

        let ids: Vec<SpriteId> = (0..6)
            .map(|i| {
                let desc = SpriteDesc::new(texture.clone()).with_depth(0.1 * i as f32).in_canvas(0);
                let id = stage.create_sprite(desc).unwrap();
                stage.attach(batch, id).unwrap();
                id
            })
            .collect();
        for (i, &id) in ids.iter().enumerate() {
            let t = Transform2D::at(Vec2::new(i as f32, 0.0));
            stage.draw_sprite(id, t, &mut backend).unwrap();
        }

        // Reorder: later inserts and removals must not bleed into neighbours.
        stage.set_depth(ids[0], 0.95).unwrap();
        stage.detach(batch, ids[3]).unwrap();
        let extra = stage
            .create_sprite(SpriteDesc::new(texture.clone()).with_depth(0.25).in_canvas(0))
            .unwrap();
        stage.attach(batch, extra).unwrap();

        let b = stage.batch(batch).unwrap();
        for (i, &id) in ids.iter().enumerate() {
            if let Some((_, index)) = stage.sprite(id).unwrap().batch() {
                let stored = b.columns().record(index).unwrap();
                assert_eq!(stored.transform.position, [i as f32, 0.0]);
                assert_eq!(stored.visibility.drawn, 1);
            }
        }
        let (_, extra_index) = stage.sprite(extra).unwrap().batch().unwrap();
        let stored = b.columns().record(extra_index).unwrap();
        assert_eq!(stored.transform, InstanceTransform::IDENTITY);
        assert_eq!(stored.visibility.drawn, 0);
    }

    // ── round trips and failures ──────────────────────────────────────────

    #[test]
    fn detach_restores_standalone_appearance() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(64, 32);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let area = Rect::new(8.0, 4.0, 16.0, 8.0);
        let mask = ColorMask::vertical(Color::WHITE, Color::from_premul(0.0, 0.0, 0.5, 0.5));
        let id = stage
            .create_sprite(
                SpriteDesc::new(texture)
                    .with_target_area(area)
                    .with_color_mask(mask)
                    .in_canvas(0),
            )
            .unwrap();
        let before = stage.sprite(id).unwrap().standalone().unwrap().columns.record(0);

        stage.attach(batch, id).unwrap();
        stage.detach(batch, id).unwrap();

        let sprite = stage.sprite(id).unwrap();
        assert_eq!(sprite.target_area(), area);
        assert_eq!(sprite.color_mask(), mask);
        assert_eq!(sprite.standalone().unwrap().columns.record(0), before);
    }

    #[test]
    fn mask_set_while_batched_survives_detach() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let id = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.attach(batch, id).unwrap();
        stage.set_color_mask(id, tint(0.25)).unwrap();
        stage.detach(batch, id).unwrap();
        let record = stage.sprite(id).unwrap().standalone().unwrap().columns.record(0).unwrap();
        assert_eq!(record.colors, QuadColors::from(tint(0.25)));
    }

    #[test]
    fn detach_of_unattached_sprite_changes_nothing() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let attached = stage.create_sprite(SpriteDesc::new(texture.clone()).in_canvas(0)).unwrap();
        let loose = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.attach(batch, attached).unwrap();

        let b = stage.batch(batch).unwrap();
        let entries = b.entries().to_vec();
        let lens = b.columns().lens();
        let bytes = b.columns().record(0);

        assert_eq!(stage.detach(batch, loose), Err(SpriteError::NotInBatch));
        let b = stage.batch(batch).unwrap();
        assert_eq!(b.entries(), &entries[..]);
        assert_eq!(b.columns().lens(), lens);
        assert_eq!(b.columns().record(0), bytes);
        assert_eq!(stage.standalone_in_canvas(0).unwrap().collect::<Vec<_>>(), vec![loose]);
    }

    #[test]
    fn invalid_target_area_leaves_sprite_untouched() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(16, 16);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let id = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.attach(batch, id).unwrap();
        let before = stage.batch(batch).unwrap().columns().record(0);

        let err = stage.set_target_area(id, Rect::new(8.0, 8.0, 16.0, 16.0)).unwrap_err();
        assert!(matches!(err, SpriteError::InvalidSubArea { .. }));
        assert_eq!(stage.sprite(id).unwrap().target_area(), Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(stage.batch(batch).unwrap().columns().record(0), before);
    }

    #[test]
    fn attach_with_other_texture_is_mismatch() {
        let mut stage = stage_with_canvases(&[0]);
        let batch = stage.create_batch(Texture::new(8, 8), Shader::sprite()).unwrap();
        let id = stage.create_sprite(SpriteDesc::new(Texture::new(8, 8)).in_canvas(0)).unwrap();
        assert!(matches!(stage.attach(batch, id), Err(SpriteError::TextureMismatch { .. })));
        assert_eq!(stage.standalone_in_canvas(0).unwrap().count(), 1);
    }

    #[test]
    fn stale_handles_are_reported() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let id = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.destroy_sprite(id).unwrap();
        assert_eq!(stage.set_depth(id, 0.5), Err(SpriteError::UnknownSprite));
        stage.destroy_batch(batch).unwrap();
        assert_eq!(stage.attach(batch, id), Err(SpriteError::UnknownBatch));
        assert!(matches!(
            stage.create_sprite(SpriteDesc::new(Texture::new(1, 1)).in_canvas(5)),
            Err(SpriteError::UnknownCanvas(5))
        ));
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn destroying_attached_sprite_detaches_it() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let a = stage.create_sprite(SpriteDesc::new(texture.clone()).with_depth(0.1).in_canvas(0)).unwrap();
        let b = stage.create_sprite(SpriteDesc::new(texture).with_depth(0.2).in_canvas(0)).unwrap();
        stage.attach(batch, a).unwrap();
        stage.attach(batch, b).unwrap();

        stage.destroy_sprite(a).unwrap();
        assert!(stage.sprite(a).is_none());
        assert_eq!(stage.batch(batch).unwrap().len(), 1);
        assert_batch_coherent(&stage, batch);
        assert_eq!(stage.standalone_in_canvas(0).unwrap().count(), 0);
    }

    #[test]
    fn destroying_batch_returns_sprites_to_their_canvas() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let ids: Vec<SpriteId> = (0..3)
            .map(|i| {
                let desc = SpriteDesc::new(texture.clone()).with_depth(0.3 - 0.1 * i as f32).in_canvas(0);
                let id = stage.create_sprite(desc).unwrap();
                stage.attach(batch, id).unwrap();
                id
            })
            .collect();

        stage.destroy_batch(batch).unwrap();
        assert!(stage.batch(batch).is_none());
        let order: Vec<SpriteId> = stage.standalone_in_canvas(0).unwrap().collect();
        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
        assert!(ids.iter().all(|&id| stage.sprite(id).unwrap().standalone().is_some()));
    }

    #[test]
    fn set_canvas_moves_sprite_between_indices() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let id = stage.create_sprite(SpriteDesc::new(Texture::new(8, 8)).in_canvas(0)).unwrap();
        stage.set_canvas(id, Some(1)).unwrap();
        assert_eq!(stage.standalone_in_canvas(0).unwrap().count(), 0);
        assert_eq!(stage.standalone_in_canvas(1).unwrap().collect::<Vec<_>>(), vec![id]);
        let record = stage.sprite(id).unwrap().standalone().unwrap().columns.record(0).unwrap();
        assert_eq!(record.slots, SlotIndices::canvas(1));

        assert_eq!(stage.set_canvas(id, Some(9)), Err(SpriteError::UnknownCanvas(9)));
        assert_eq!(stage.sprite(id).unwrap().canvas(), Some(1));
    }

    // ── depth ─────────────────────────────────────────────────────────────

    #[test]
    fn set_depth_clamps_to_layout_range() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let id = stage.create_sprite(SpriteDesc::new(Texture::new(8, 8)).in_canvas(0)).unwrap();
        stage.set_depth(id, 42.0).unwrap();
        assert_eq!(stage.sprite(id).unwrap().depth(), 2.0);
        stage.set_depth(id, -3.0).unwrap();
        assert_eq!(stage.sprite(id).unwrap().depth(), 0.0);
    }

    #[test]
    fn standalone_index_follows_depth() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let a = stage.create_sprite(SpriteDesc::new(texture.clone()).with_depth(0.1).in_canvas(0)).unwrap();
        let b = stage.create_sprite(SpriteDesc::new(texture).with_depth(0.2).in_canvas(0)).unwrap();
        stage.set_depth(a, 0.9).unwrap();
        assert_eq!(stage.standalone_in_canvas(0).unwrap().collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn later_canvas_draws_in_front() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let back = stage
            .create_sprite(SpriteDesc::new(texture.clone()).with_depth(1.0).in_canvas(0))
            .unwrap();
        let front: Vec<SpriteId> = [0.5, 0.6, 0.9]
            .iter()
            .map(|&d| {
                stage
                    .create_sprite(SpriteDesc::new(texture.clone()).with_depth(d).in_canvas(1))
                    .unwrap()
            })
            .collect();
        let mut backend = RecordingBackend::default();
        for &id in std::iter::once(&back).chain(&front) {
            stage.attach(batch, id).unwrap();
            stage.draw_sprite(id, Transform2D::IDENTITY, &mut backend).unwrap();
        }

        let b = stage.batch(batch).unwrap();
        let depth_of = |id: SpriteId| {
            let (_, index) = stage.sprite(id).unwrap().batch().unwrap();
            b.columns().record(index).unwrap().transform.depth
        };
        let back_z = depth_of(back);
        let front_z: Vec<f32> = front.iter().map(|&id| depth_of(id)).collect();
        assert!(front_z.iter().all(|&z| z > back_z));
        assert!(front_z.windows(2).all(|w| w[0] < w[1]));
    }

    // ── drawing ───────────────────────────────────────────────────────────

    #[test]
    fn draw_without_canvas_fails() {
        let mut stage = stage_with_canvases(&[0]);
        let id = stage.create_sprite(SpriteDesc::new(Texture::new(8, 8))).unwrap();
        let mut backend = RecordingBackend::default();
        assert_eq!(
            stage.draw_sprite(id, Transform2D::IDENTITY, &mut backend),
            Err(SpriteError::NoCanvas)
        );
        assert!(backend.submissions.is_empty());
    }

    #[test]
    fn standalone_draw_submits_immediately() {
        let mut stage = stage_with_canvases(&[0]);
        stage
            .canvas_mut(0)
            .unwrap()
            .set_camera(Camera2D { position: Vec2::new(3.0, 4.0), ..Camera2D::IDENTITY });
        let texture = Texture::new(8, 8);
        let id = stage
            .create_sprite(SpriteDesc::new(texture.clone()).with_depth(0.5).in_canvas(0))
            .unwrap();
        let mut backend = RecordingBackend::default();
        stage
            .draw_sprite(id, Transform2D::at(Vec2::new(10.0, 0.0)), &mut backend)
            .unwrap();

        assert_eq!(backend.submissions.len(), 1);
        let sub = &backend.submissions[0];
        assert_eq!(sub.instances, 1);
        assert_eq!(sub.texture, texture.id());
        assert_eq!(sub.shader, stage.shader().id());
        assert_eq!(sub.visible(), 1);
        assert_eq!(sub.records[0].transform.position, [10.0, 0.0]);
        assert_eq!(sub.records[0].transform.depth, 0.5);
        assert_eq!(sub.cameras[0].map(|c| c.position), Some([3.0, 4.0]));
        assert_eq!(
            stage.sprite(id).unwrap().standalone().unwrap().columns.visible_count(),
            0
        );
    }

    #[test]
    fn draw_all_submits_batches_then_placed_standalones() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let batch = stage.create_batch(texture.clone(), Shader::sprite()).unwrap();
        let batched = stage.create_sprite(SpriteDesc::new(texture.clone()).in_canvas(0)).unwrap();
        let placed = stage.create_sprite(SpriteDesc::new(texture.clone()).in_canvas(0)).unwrap();
        let _unplaced = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.attach(batch, batched).unwrap();
        stage.set_transform(placed, Transform2D::IDENTITY).unwrap();

        let mut backend = RecordingBackend::default();
        stage.draw_sprite(batched, Transform2D::IDENTITY, &mut backend).unwrap();
        assert!(backend.submissions.is_empty());

        stage.draw_all(&mut backend);
        let instances: Vec<u32> = backend.submissions.iter().map(|s| s.instances).collect();
        assert_eq!(instances, vec![1, 1]);
        assert_eq!(backend.submissions[0].visible(), 1);
        assert_eq!(stage.batch(batch).unwrap().columns().visible_count(), 0);
    }

    #[test]
    fn draw_all_skips_standalones_already_drawn_this_frame() {
        let mut stage = stage_with_canvases(&[0]);
        let texture = Texture::new(8, 8);
        let early = stage.create_sprite(SpriteDesc::new(texture.clone()).in_canvas(0)).unwrap();
        let late = stage.create_sprite(SpriteDesc::new(texture).in_canvas(0)).unwrap();
        stage.set_transform(late, Transform2D::at(Vec2::new(5.0, 0.0))).unwrap();

        let mut backend = RecordingBackend::default();
        stage
            .draw_sprite(early, Transform2D::at(Vec2::new(1.0, 0.0)), &mut backend)
            .unwrap();
        stage
            .draw_sprite(early, Transform2D::at(Vec2::new(2.0, 0.0)), &mut backend)
            .unwrap();
        stage.draw_all(&mut backend);

        let positions: Vec<[f32; 2]> = backend
            .submissions
            .iter()
            .map(|s| s.records[0].transform.position)
            .collect();
        assert_eq!(positions, vec![[1.0, 0.0], [2.0, 0.0], [5.0, 0.0]]);

        // Next frame: nothing was placed, so both replay their last transform.
        backend.submissions.clear();
        stage.draw_all(&mut backend);
        let mut positions: Vec<[f32; 2]> = backend
            .submissions
            .iter()
            .map(|s| s.records[0].transform.position)
            .collect();
        positions.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert_eq!(positions, vec![[2.0, 0.0], [5.0, 0.0]]);
    }

    #[test]
    fn standalone_mutators_rewrite_own_row() {
        let mut stage = stage_with_canvases(&[0]);
        let id = stage
            .create_sprite(SpriteDesc::new(Texture::new(64, 64)).in_canvas(0))
            .unwrap();

        stage.set_color_mask(id, tint(0.4)).unwrap();
        stage
            .set_target_area(id, Rect::new(16.0, 8.0, 32.0, 24.0))
            .unwrap();

        let sprite = stage.sprite(id).unwrap();
        assert_eq!(sprite.color_mask(), tint(0.4));
        assert_eq!(sprite.target_area(), Rect::new(16.0, 8.0, 32.0, 24.0));
        let stored = sprite.standalone().unwrap().columns.record(0).unwrap();
        let expected = sprite.record();
        assert_eq!(stored.colors, expected.colors);
        assert_eq!(stored.geometry, expected.geometry);
        assert_eq!(stored.uv, expected.uv);
        assert_eq!(stored.colors, QuadColors::from(tint(0.4)));
    }

    #[test]
    fn back_canvas_sprite_past_its_band_stays_behind_front_canvas() {
        let mut stage = stage_with_canvases(&[0, 1]);
        let texture = Texture::new(8, 8);
        let back = stage
            .create_sprite(SpriteDesc::new(texture.clone()).with_depth(1.8).in_canvas(0))
            .unwrap();
        let front = stage
            .create_sprite(SpriteDesc::new(texture).with_depth(0.5).in_canvas(1))
            .unwrap();
        assert_eq!(stage.sprite(back).unwrap().depth(), 1.8);

        let mut backend = RecordingBackend::default();
        stage.draw_sprite(back, Transform2D::IDENTITY, &mut backend).unwrap();
        stage.draw_sprite(front, Transform2D::IDENTITY, &mut backend).unwrap();

        let back_z = backend.submissions[0].records[0].transform.depth;
        let front_z = backend.submissions[1].records[0].transform.depth;
        assert!(back_z < front_z);
    }

    #[test]
    fn clip_range_is_configurable() {
        let config = StageConfig {
            clip_depth: (0.5, 1.0),
            ..StageConfig::default()
        };
        let stage = Stage::new(config);
        assert_eq!(stage.layout().clip_range(), (0.5, 1.0));
        assert!(Layout::new().is_empty());
    }
}
