use bytemuck::{Pod, Zeroable};

use crate::buffer::{BufferError, BufferUsage, DeviceBuffer};
use crate::coords::{Rect, Vec2};
use crate::paint::ColorMask;

/// Quad corners relative to the sprite origin, in TL, TR, BR, BL order.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadGeometry {
    pub corners: [[f32; 2]; 4],
}

impl QuadGeometry {
    /// A quad of `size` centered on the origin (y down).
    pub fn centered(size: Vec2) -> Self {
        let (hw, hh) = (size.x * 0.5, size.y * 0.5);
        Self {
            corners: [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]],
        }
    }
}

/// Normalized texture coordinates for each corner.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadTexCoords {
    pub corners: [[f32; 2]; 4],
}

impl QuadTexCoords {
    /// Coordinates selecting `area` (in texels) of a texture of `extent` texels.
    pub fn for_area(area: Rect, extent: Vec2) -> Self {
        let n = area.normalized_in(extent);
        let (u0, v0) = (n.min().x, n.min().y);
        let (u1, v1) = (n.max().x, n.max().y);
        Self {
            corners: [[u0, v0], [u1, v0], [u1, v1], [u0, v1]],
        }
    }
}

/// Premultiplied tint per corner.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadColors {
    pub corners: [[f32; 4]; 4],
}

impl From<ColorMask> for QuadColors {
    fn from(mask: ColorMask) -> Self {
        Self {
            corners: mask.corners().map(|c| c.to_array()),
        }
    }
}

/// Per-instance placement. `depth` is already mapped into clip depth.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub position: [f32; 2],
    pub scale: [f32; 2],
    pub rotation: f32,
    pub depth: f32,
    pub _pad: [f32; 2],
}

impl InstanceTransform {
    pub const IDENTITY: Self = Self {
        position: [0.0, 0.0],
        scale: [1.0, 1.0],
        rotation: 0.0,
        depth: 0.0,
        _pad: [0.0; 2],
    };
}

/// Which camera and projection table entries a sprite is drawn with.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct SlotIndices {
    pub camera: u32,
    pub projection: u32,
}

impl SlotIndices {
    #[inline]
    pub const fn canvas(slot: u32) -> Self {
        Self {
            camera: slot,
            projection: slot,
        }
    }
}

/// Set when the sprite was drawn this frame; cleared after every batch draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct Visibility {
    pub drawn: u32,
}

impl Visibility {
    pub const HIDDEN: Self = Self { drawn: 0 };
    pub const DRAWN: Self = Self { drawn: 1 };
}

/// One row across every attribute column.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteRecord {
    pub geometry: QuadGeometry,
    pub uv: QuadTexCoords,
    pub colors: QuadColors,
    pub transform: InstanceTransform,
    pub slots: SlotIndices,
    pub visibility: Visibility,
}

impl SpriteRecord {
    /// Record for a sprite showing `area` of a texture of `extent` texels,
    /// with an identity transform and not yet drawn.
    pub fn new(area: Rect, extent: Vec2, mask: ColorMask, slot: u32) -> Self {
        Self {
            geometry: QuadGeometry::centered(area.size),
            uv: QuadTexCoords::for_area(area, extent),
            colors: mask.into(),
            transform: InstanceTransform::IDENTITY,
            slots: SlotIndices::canvas(slot),
            visibility: Visibility::HIDDEN,
        }
    }
}

/// The parallel attribute columns a sprite quad is drawn from.
///
/// Invariant: every column holds the same number of records. Structural
/// edits validate and reserve across all columns before the first write, so
/// an error leaves every column untouched.
#[derive(Debug)]
pub struct SpriteColumns {
    geometry: DeviceBuffer<QuadGeometry>,
    uv: DeviceBuffer<QuadTexCoords>,
    colors: DeviceBuffer<QuadColors>,
    transforms: DeviceBuffer<InstanceTransform>,
    slots: DeviceBuffer<SlotIndices>,
    visibility: DeviceBuffer<Visibility>,
}

impl SpriteColumns {
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        let v = BufferUsage::Vertex;
        Ok(Self {
            geometry: DeviceBuffer::with_capacity("sprite geometry", v, capacity)?,
            uv: DeviceBuffer::with_capacity("sprite uv", v, capacity)?,
            colors: DeviceBuffer::with_capacity("sprite colors", v, capacity)?,
            transforms: DeviceBuffer::with_capacity("sprite transforms", v, capacity)?,
            slots: DeviceBuffer::with_capacity("sprite slots", v, capacity)?,
            visibility: DeviceBuffer::with_capacity("sprite visibility", v, capacity)?,
        })
    }

    /// Columns holding exactly one record.
    pub fn single(record: &SpriteRecord) -> Result<Self, BufferError> {
        let mut columns = Self::with_capacity(1)?;
        columns.insert(0, record)?;
        Ok(columns)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record counts per column, in binding order.
    pub fn lens(&self) -> [usize; 6] {
        [
            self.geometry.len(),
            self.uv.len(),
            self.colors.len(),
            self.transforms.len(),
            self.slots.len(),
            self.visibility.len(),
        ]
    }

    pub fn is_consistent(&self) -> bool {
        let lens = self.lens();
        lens.iter().all(|&l| l == lens[0])
    }

    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        self.geometry.reserve(additional)?;
        self.uv.reserve(additional)?;
        self.colors.reserve(additional)?;
        self.transforms.reserve(additional)?;
        self.slots.reserve(additional)?;
        self.visibility.reserve(additional)?;
        Ok(())
    }

    /// Reads every column at `index`.
    pub fn record(&self, index: usize) -> Option<SpriteRecord> {
        Some(SpriteRecord {
            geometry: self.geometry.get(index)?,
            uv: self.uv.get(index)?,
            colors: self.colors.get(index)?,
            transform: self.transforms.get(index)?,
            slots: self.slots.get(index)?,
            visibility: self.visibility.get(index)?,
        })
    }

    /// Inserts `record` at `index` in every column, shifting later rows up.
    pub fn insert(&mut self, index: usize, record: &SpriteRecord) -> Result<(), BufferError> {
        let len = self.len();
        if index > len {
            return Err(BufferError::OutOfRange {
                offset: index,
                count: 1,
                len,
            });
        }
        self.reserve(1)?;
        self.geometry.insert_range(index, &[record.geometry])?;
        self.uv.insert_range(index, &[record.uv])?;
        self.colors.insert_range(index, &[record.colors])?;
        self.transforms.insert_range(index, &[record.transform])?;
        self.slots.insert_range(index, &[record.slots])?;
        self.visibility.insert_range(index, &[record.visibility])?;
        Ok(())
    }

    /// Removes the row at `index` from every column and returns it.
    pub fn remove(&mut self, index: usize) -> Result<SpriteRecord, BufferError> {
        let record = self.record(index).ok_or(BufferError::OutOfRange {
            offset: index,
            count: 1,
            len: self.len(),
        })?;
        self.geometry.remove_range(index, 1)?;
        self.uv.remove_range(index, 1)?;
        self.colors.remove_range(index, 1)?;
        self.transforms.remove_range(index, 1)?;
        self.slots.remove_range(index, 1)?;
        self.visibility.remove_range(index, 1)?;
        Ok(record)
    }

    // ── in-place writes ───────────────────────────────────────────────────

    pub fn write_colors(&mut self, index: usize, colors: QuadColors) -> Result<(), BufferError> {
        self.colors.replace_range(index, &[colors])
    }

    /// Rewrites geometry and texture coordinates together.
    pub fn write_appearance(
        &mut self,
        index: usize,
        geometry: QuadGeometry,
        uv: QuadTexCoords,
    ) -> Result<(), BufferError> {
        if index >= self.len() {
            return Err(BufferError::OutOfRange {
                offset: index,
                count: 1,
                len: self.len(),
            });
        }
        self.geometry.replace_range(index, &[geometry])?;
        self.uv.replace_range(index, &[uv])
    }

    pub fn write_transform(
        &mut self,
        index: usize,
        transform: InstanceTransform,
    ) -> Result<(), BufferError> {
        self.transforms.replace_range(index, &[transform])
    }

    pub fn write_slots(&mut self, index: usize, slots: SlotIndices) -> Result<(), BufferError> {
        self.slots.replace_range(index, &[slots])
    }

    pub fn set_visible(&mut self, index: usize) -> Result<(), BufferError> {
        self.visibility.replace_range(index, &[Visibility::DRAWN])
    }

    pub fn clear_visibility(&mut self) {
        self.visibility.fill(Visibility::HIDDEN);
    }

    pub fn visible_count(&self) -> usize {
        self.visibility.iter().filter(|v| v.drawn != 0).count()
    }

    // ── GPU ───────────────────────────────────────────────────────────────

    /// Uploads pending edits of every column.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.geometry.sync(device, queue);
        self.uv.sync(device, queue);
        self.colors.sync(device, queue);
        self.transforms.sync(device, queue);
        self.slots.sync(device, queue);
        self.visibility.sync(device, queue);
    }

    /// Vertex buffer slices in binding order, once every column is uploaded.
    pub fn vertex_slices(&self) -> Option<[wgpu::BufferSlice<'_>; 6]> {
        Some([
            self.geometry.gpu_slice()?,
            self.uv.gpu_slice()?,
            self.colors.gpu_slice()?,
            self.transforms.gpu_slice()?,
            self.slots.gpu_slice()?,
            self.visibility.gpu_slice()?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;

    fn record(tag: f32) -> SpriteRecord {
        let mask = ColorMask::uniform(Color::from_premul(tag, 0.0, 0.0, 1.0));
        SpriteRecord::new(Rect::new(0.0, 0.0, tag, tag), Vec2::new(64.0, 64.0), mask, 0)
    }

    #[test]
    fn record_sizes_match_vertex_layout() {
        assert_eq!(size_of::<QuadGeometry>(), 32);
        assert_eq!(size_of::<QuadTexCoords>(), 32);
        assert_eq!(size_of::<QuadColors>(), 64);
        assert_eq!(size_of::<InstanceTransform>(), 32);
        assert_eq!(size_of::<SlotIndices>(), 8);
        assert_eq!(size_of::<Visibility>(), 4);
    }

    #[test]
    fn texcoords_select_sub_area() {
        let uv = QuadTexCoords::for_area(Rect::new(32.0, 0.0, 32.0, 16.0), Vec2::new(64.0, 32.0));
        assert_eq!(uv.corners, [[0.5, 0.0], [1.0, 0.0], [1.0, 0.5], [0.5, 0.5]]);
    }

    #[test]
    fn geometry_is_centered() {
        let g = QuadGeometry::centered(Vec2::new(4.0, 2.0));
        assert_eq!(g.corners, [[-2.0, -1.0], [2.0, -1.0], [2.0, 1.0], [-2.0, 1.0]]);
    }

    #[test]
    fn insert_and_remove_keep_columns_parallel() {
        let mut c = SpriteColumns::with_capacity(1).unwrap();
        c.insert(0, &record(1.0)).unwrap();
        c.insert(0, &record(2.0)).unwrap();
        c.insert(1, &record(3.0)).unwrap();
        assert!(c.is_consistent());
        assert_eq!(c.len(), 3);
        assert_eq!(c.record(0), Some(record(2.0)));
        assert_eq!(c.record(1), Some(record(3.0)));
        assert_eq!(c.record(2), Some(record(1.0)));

        assert_eq!(c.remove(1).unwrap(), record(3.0));
        assert!(c.is_consistent());
        assert_eq!(c.record(1), Some(record(1.0)));
    }

    #[test]
    fn failed_insert_leaves_every_column() {
        let mut c = SpriteColumns::single(&record(1.0)).unwrap();
        assert!(c.insert(5, &record(2.0)).is_err());
        assert_eq!(c.lens(), [1; 6]);
        assert!(c.remove(3).is_err());
        assert_eq!(c.lens(), [1; 6]);
    }

    #[test]
    fn visibility_is_one_shot() {
        let mut c = SpriteColumns::with_capacity(2).unwrap();
        c.insert(0, &record(1.0)).unwrap();
        c.insert(1, &record(2.0)).unwrap();
        c.set_visible(1).unwrap();
        assert_eq!(c.visible_count(), 1);
        c.clear_visibility();
        assert_eq!(c.visible_count(), 0);
    }

    #[test]
    fn appearance_write_out_of_range_touches_nothing() {
        let mut c = SpriteColumns::single(&record(1.0)).unwrap();
        let before = c.record(0);
        let g = QuadGeometry::centered(Vec2::ONE);
        let uv = QuadTexCoords::for_area(Rect::new(0.0, 0.0, 1.0, 1.0), Vec2::ONE);
        assert!(c.write_appearance(1, g, uv).is_err());
        assert_eq!(c.record(0), before);
    }
}
