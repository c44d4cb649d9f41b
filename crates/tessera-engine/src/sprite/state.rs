use crate::canvas::ViewTables;
use crate::coords::Rect;
use crate::error::SpriteError;
use crate::paint::ColorMask;
use crate::pool::BatchId;

use super::{QuadColors, QuadGeometry, QuadTexCoords, SpriteColumns, SpriteRecord, TextureRef, Transform2D};

/// Buffers a standalone sprite draws from: one row of attribute columns and
/// its own camera/projection tables.
#[derive(Debug)]
pub struct StandaloneBuffers {
    pub columns: SpriteColumns,
    pub views: ViewTables,
}

/// Where a sprite's attribute data currently lives.
#[derive(Debug)]
pub enum Residence {
    Standalone(Box<StandaloneBuffers>),
    Batched { batch: BatchId, index: usize },
}

/// Parameters for a new sprite.
#[derive(Debug, Clone)]
pub struct SpriteDesc {
    pub texture: TextureRef,
    /// Texel sub-area to show; `None` shows the whole texture.
    pub target_area: Option<Rect>,
    pub color_mask: ColorMask,
    pub depth: f32,
    pub canvas: Option<u32>,
}

impl SpriteDesc {
    pub fn new(texture: TextureRef) -> Self {
        Self {
            texture,
            target_area: None,
            color_mask: ColorMask::IDENTITY,
            depth: 0.0,
            canvas: None,
        }
    }

    pub fn with_target_area(mut self, area: Rect) -> Self {
        self.target_area = Some(area);
        self
    }

    pub fn with_color_mask(mut self, mask: ColorMask) -> Self {
        self.color_mask = mask;
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn in_canvas(mut self, slot: u32) -> Self {
        self.canvas = Some(slot);
        self
    }
}

/// A textured, tinted quad.
///
/// The sprite keeps the authoritative copy of its appearance. Its encoded
/// attributes live either in its own [`StandaloneBuffers`] or in a batch's
/// columns at `index`.
#[derive(Debug)]
pub struct Sprite {
    texture: TextureRef,
    target_area: Rect,
    color_mask: ColorMask,
    depth: f32,
    canvas: Option<u32>,
    last_transform: Option<Transform2D>,
    pub(crate) residence: Residence,
}

impl Sprite {
    /// Builds a standalone sprite. `desc.depth` is taken as given.
    pub fn new(desc: SpriteDesc) -> Result<Self, SpriteError> {
        let area = desc.target_area.unwrap_or_else(|| desc.texture.bounds());
        check_area(&desc.texture, area)?;

        let record = SpriteRecord::new(
            area,
            desc.texture.size(),
            desc.color_mask,
            desc.canvas.unwrap_or(0),
        );
        let buffers = StandaloneBuffers {
            columns: SpriteColumns::single(&record)?,
            views: ViewTables::new()?,
        };

        Ok(Self {
            texture: desc.texture,
            target_area: area,
            color_mask: desc.color_mask,
            depth: desc.depth,
            canvas: desc.canvas,
            last_transform: None,
            residence: Residence::Standalone(Box::new(buffers)),
        })
    }

    #[inline]
    pub fn texture(&self) -> &TextureRef {
        &self.texture
    }

    #[inline]
    pub fn target_area(&self) -> Rect {
        self.target_area
    }

    #[inline]
    pub fn color_mask(&self) -> ColorMask {
        self.color_mask
    }

    #[inline]
    pub fn depth(&self) -> f32 {
        self.depth
    }

    #[inline]
    pub fn canvas(&self) -> Option<u32> {
        self.canvas
    }

    /// Transform from the most recent draw.
    #[inline]
    pub fn last_transform(&self) -> Option<Transform2D> {
        self.last_transform
    }

    #[inline]
    pub fn residence(&self) -> &Residence {
        &self.residence
    }

    /// Batch and index, if attached.
    pub fn batch(&self) -> Option<(BatchId, usize)> {
        match self.residence {
            Residence::Batched { batch, index } => Some((batch, index)),
            Residence::Standalone(_) => None,
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.batch().is_some()
    }

    pub fn standalone(&self) -> Option<&StandaloneBuffers> {
        match &self.residence {
            Residence::Standalone(buffers) => Some(buffers),
            Residence::Batched { .. } => None,
        }
    }

    pub(crate) fn standalone_mut(&mut self) -> Option<&mut StandaloneBuffers> {
        match &mut self.residence {
            Residence::Standalone(buffers) => Some(buffers),
            Residence::Batched { .. } => None,
        }
    }

    /// Current appearance encoded as a fresh, not-yet-drawn record.
    pub fn record(&self) -> SpriteRecord {
        SpriteRecord::new(
            self.target_area,
            self.texture.size(),
            self.color_mask,
            self.canvas.unwrap_or(0),
        )
    }

    // ── field updates (callers keep the encoded copy in step) ─────────────

    pub(crate) fn set_depth_value(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub(crate) fn set_canvas_value(&mut self, canvas: Option<u32>) {
        self.canvas = canvas;
    }

    pub(crate) fn set_color_mask_value(&mut self, mask: ColorMask) {
        self.color_mask = mask;
    }

    pub(crate) fn set_target_area_value(&mut self, area: Rect) {
        self.target_area = area;
    }

    pub(crate) fn set_last_transform(&mut self, transform: Transform2D) {
        self.last_transform = Some(transform);
    }

    pub(crate) fn set_batched(&mut self, batch: BatchId, index: usize) {
        self.residence = Residence::Batched { batch, index };
    }

    pub(crate) fn set_batch_index(&mut self, index: usize) {
        if let Residence::Batched { index: i, .. } = &mut self.residence {
            *i = index;
        }
    }

    pub(crate) fn set_standalone(&mut self, buffers: StandaloneBuffers) {
        self.residence = Residence::Standalone(Box::new(buffers));
    }

    /// Fresh one-row buffers encoding the current appearance.
    pub(crate) fn standalone_buffers(&self) -> Result<StandaloneBuffers, SpriteError> {
        Ok(StandaloneBuffers {
            columns: SpriteColumns::single(&self.record())?,
            views: ViewTables::new()?,
        })
    }

    pub(crate) fn encoded_colors(mask: ColorMask) -> QuadColors {
        mask.into()
    }

    pub(crate) fn encoded_appearance(&self, area: Rect) -> (QuadGeometry, QuadTexCoords) {
        (
            QuadGeometry::centered(area.size),
            QuadTexCoords::for_area(area, self.texture.size()),
        )
    }

    pub(crate) fn check_area(&self, area: Rect) -> Result<(), SpriteError> {
        check_area(&self.texture, area)
    }
}

fn check_area(texture: &TextureRef, area: Rect) -> Result<(), SpriteError> {
    if texture.bounds().contains_rect(area) {
        Ok(())
    } else {
        Err(SpriteError::InvalidSubArea {
            area,
            texture: (texture.width(), texture.height()),
        })
    }
}
