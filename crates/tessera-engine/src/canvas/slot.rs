use std::collections::HashMap;

use crate::order::{NodeId, ZKey, ZOrdered};
use crate::pool::SpriteId;

use super::{Camera2D, Projection};

/// Width of the depth band every canvas slot occupies.
pub const DEPTH_BAND: f32 = 1.0;

/// A depth band with its own camera and projection.
///
/// Canvases also index the standalone sprites assigned to them by depth, so
/// unbatched sprites can be drawn back to front.
#[derive(Debug)]
pub struct Canvas {
    slot: u32,
    camera: Camera2D,
    projection: Projection,
    standalone: ZOrdered<ZKey, SpriteId>,
    members: HashMap<SpriteId, NodeId>,
}

impl Canvas {
    pub fn new(slot: u32) -> Self {
        Self {
            slot,
            camera: Camera2D::IDENTITY,
            projection: Projection::default(),
            standalone: ZOrdered::new(),
            members: HashMap::new(),
        }
    }

    pub fn with_camera(mut self, camera: Camera2D) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// `[slot * DEPTH_BAND, (slot + 1) * DEPTH_BAND)`.
    #[inline]
    pub fn depth_range(&self) -> (f32, f32) {
        let min = self.slot as f32 * DEPTH_BAND;
        (min, min + DEPTH_BAND)
    }

    /// Added to a sprite's local depth before it is mapped to clip depth.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.depth_range().0
    }

    #[inline]
    pub fn band(&self) -> ZKey {
        let (min, max) = self.depth_range();
        ZKey::band(min, max)
    }

    #[inline]
    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    #[inline]
    pub fn set_camera(&mut self, camera: Camera2D) {
        self.camera = camera;
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[inline]
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// Standalone sprites in ascending depth; equal depths in arrival order.
    pub fn standalone(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.standalone.values().copied()
    }

    // ── standalone index ──────────────────────────────────────────────────

    pub(crate) fn insert_standalone(&mut self, id: SpriteId, depth: f32) {
        if self.members.contains_key(&id) {
            self.reposition(id, depth);
            return;
        }
        let node = self.standalone.insert(ZKey::Point(depth), id);
        self.members.insert(id, node);
    }

    pub(crate) fn remove_standalone(&mut self, id: SpriteId) -> bool {
        match self.members.remove(&id) {
            Some(node) => self.standalone.remove(node).is_some(),
            None => false,
        }
    }

    pub(crate) fn reposition(&mut self, id: SpriteId, depth: f32) -> bool {
        match self.members.get(&id) {
            Some(&node) => self.standalone.rekey(node, ZKey::Point(depth)),
            None => false,
        }
    }
}
