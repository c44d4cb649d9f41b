use crate::error::SpriteError;
use crate::order::{CompareMode, ZKey, ZOrdered};

use super::{Canvas, MAX_CANVAS_SLOTS};

/// Ordered canvases and the global depth range they span.
///
/// Depths live in "layout space": a sprite's local depth plus its canvas's
/// offset. [`map_depth`](Self::map_depth) rescales layout space linearly into
/// the output clip range, so every canvas lands above the ones in lower slots.
#[derive(Debug)]
pub struct Layout {
    canvases: Vec<Canvas>,
    bands: ZOrdered<ZKey, u32>,
    range: Option<(f32, f32)>,
    clip: (f32, f32),
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    pub fn new() -> Self {
        Self {
            canvases: Vec::new(),
            bands: ZOrdered::new(),
            range: None,
            clip: (0.0, 1.0),
        }
    }

    /// Output depth range that [`map_depth`](Self::map_depth) targets.
    pub fn with_clip_range(mut self, min: f32, max: f32) -> Self {
        self.clip = (min, max);
        self
    }

    #[inline]
    pub fn clip_range(&self) -> (f32, f32) {
        self.clip
    }

    /// Inserts `canvas` in slot order and widens the global range to cover it.
    pub fn add_canvas(&mut self, canvas: Canvas) -> Result<(), SpriteError> {
        let slot = canvas.slot();
        if slot >= MAX_CANVAS_SLOTS {
            return Err(SpriteError::SlotOutOfRange {
                slot,
                max: MAX_CANVAS_SLOTS,
            });
        }
        let at = match self.canvases.binary_search_by_key(&slot, Canvas::slot) {
            Ok(_) => return Err(SpriteError::DuplicateSlot(slot)),
            Err(at) => at,
        };

        let (min, max) = canvas.depth_range();
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.min(min), hi.max(max)),
            None => (min, max),
        });
        self.bands.insert(canvas.band(), slot);
        self.canvases.insert(at, canvas);

        log::debug!("layout: canvas {slot} added, range now {:?}", self.range());
        Ok(())
    }

    /// Union of every canvas band; `(0, 0)` while no canvas exists.
    #[inline]
    pub fn range(&self) -> (f32, f32) {
        self.range.unwrap_or((0.0, 0.0))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.canvases.is_empty()
    }

    pub fn canvases(&self) -> &[Canvas] {
        &self.canvases
    }

    pub fn canvas(&self, slot: u32) -> Option<&Canvas> {
        let at = self.canvases.binary_search_by_key(&slot, Canvas::slot).ok()?;
        Some(&self.canvases[at])
    }

    pub fn canvas_mut(&mut self, slot: u32) -> Option<&mut Canvas> {
        let at = self.canvases.binary_search_by_key(&slot, Canvas::slot).ok()?;
        Some(&mut self.canvases[at])
    }

    /// Canvas whose band holds layout-space depth `z`.
    pub fn canvas_at_depth(&self, z: f32) -> Option<&Canvas> {
        let node = self.bands.find(&ZKey::Point(z), CompareMode::Containing)?;
        let (_, &slot) = self.bands.get(node)?;
        self.canvas(slot)
    }

    /// Clamps `z` into the global range. NaN becomes the minimum. No-op while
    /// the layout is empty.
    pub fn clamp_depth(&self, z: f32) -> f32 {
        match self.range {
            Some((min, _)) if z.is_nan() => min,
            Some((min, max)) => z.clamp(min, max),
            None => z,
        }
    }

    /// Maps `local` depth of a sprite in canvas `slot` into the clip range:
    ///
    /// `clip_min + (clip_max - clip_min) * (local + offset - min) / (max - min)`
    ///
    /// `local + offset` is first clamped into the canvas's own band, so a
    /// sprite never maps onto a depth owned by another canvas. The band top is
    /// exclusive whenever a canvas sits above it. NaN maps to the band bottom.
    pub fn map_depth(&self, slot: u32, local: f32) -> Result<f32, SpriteError> {
        let canvas = self.canvas(slot).ok_or(SpriteError::UnknownCanvas(slot))?;
        let (min, max) = self.range();
        let (c0, c1) = self.clip;
        let span = max - min;
        if span <= 0.0 {
            return Ok(c0);
        }
        let (lo, hi) = canvas.depth_range();
        let z = local + canvas.offset();
        let layout_z = if z.is_nan() { lo } else { z.clamp(lo, hi) };
        let mapped = c0 + (c1 - c0) * ((layout_z - min) / span).clamp(0.0, 1.0);
        if hi < max && c1 > c0 {
            let top = c0 + (c1 - c0) * ((hi - min) / span);
            return Ok(mapped.min(step_below(top)));
        }
        Ok(mapped)
    }
}

/// Largest `f32` strictly below finite `x`.
fn step_below(x: f32) -> f32 {
    let bits = x.to_bits();
    if x == 0.0 {
        -f32::from_bits(1)
    } else if x > 0.0 {
        f32::from_bits(bits - 1)
    } else {
        f32::from_bits(bits + 1)
    }
}
