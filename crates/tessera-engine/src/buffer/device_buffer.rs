use core::fmt;
use core::marker::PhantomData;
use core::mem::size_of;
use core::ops::Range;

use bytemuck::Pod;

use super::gpu::GpuAllocation;
use super::{BufferError, BufferUsage};

/// Growable, strided store of `T` records.
///
/// Layout:
/// - `bytes.len()` is the capacity in bytes, always a multiple of the stride
/// - the first `len * STRIDE` bytes are live; everything past them is zero
///
/// Edits record the byte span they touched. The GPU copy is refreshed from that
/// span by [`sync`](Self::sync), or rewritten whole after the host storage was
/// reallocated.
pub struct DeviceBuffer<T> {
    label: &'static str,
    usage: BufferUsage,
    bytes: Vec<u8>,
    len: usize,
    dirty: Option<Range<usize>>,
    pub(super) gpu: Option<GpuAllocation>,
    _marker: PhantomData<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Size of one record in bytes.
    pub const STRIDE: usize = {
        assert!(size_of::<T>() > 0, "zero-sized records cannot be strided");
        assert!(
            size_of::<T>() % 4 == 0,
            "record stride must be a multiple of 4 bytes for GPU copies"
        );
        size_of::<T>()
    };

    /// Creates an empty buffer. Nothing is allocated until the first write.
    pub fn new(label: &'static str, usage: BufferUsage) -> Self {
        Self {
            label,
            usage,
            bytes: Vec::new(),
            len: 0,
            dirty: None,
            gpu: None,
            _marker: PhantomData,
        }
    }

    /// Creates an empty buffer with room for `capacity` records.
    pub fn with_capacity(
        label: &'static str,
        usage: BufferUsage,
        capacity: usize,
    ) -> Result<Self, BufferError> {
        let mut buffer = Self::new(label, usage);
        if capacity > 0 {
            buffer.grow(capacity)?;
        }
        Ok(buffer)
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    pub fn stride(&self) -> usize {
        Self::STRIDE
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of records the current allocation can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len() / Self::STRIDE
    }

    /// Live length in bytes (`len * stride`).
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len * Self::STRIDE
    }

    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Live bytes, exactly as they are uploaded.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.byte_len()]
    }

    /// Byte span edited since the last upload, if any.
    #[inline]
    pub fn dirty_bytes(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Reads the record at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let start = index * Self::STRIDE;
        Some(bytemuck::pod_read_unaligned(
            &self.bytes[start..start + Self::STRIDE],
        ))
    }

    /// Iterates live records in order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_bytes()
            .chunks_exact(Self::STRIDE)
            .map(bytemuck::pod_read_unaligned)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    // ── edits ─────────────────────────────────────────────────────────────

    /// Replaces the whole contents with `data`.
    pub fn set_all(&mut self, data: &[T]) -> Result<(), BufferError> {
        if data.len() > self.capacity() {
            self.grow(data.len())?;
        }
        let old_bytes = self.byte_len();
        self.write_at(0, data);
        self.len = data.len();
        let new_bytes = self.byte_len();
        if old_bytes > new_bytes {
            self.bytes[new_bytes..old_bytes].fill(0);
        }
        self.mark_dirty(0..new_bytes);
        Ok(())
    }

    /// Appends `data` after the last live record.
    pub fn append(&mut self, data: &[T]) -> Result<(), BufferError> {
        self.reserve(data.len())?;
        let at = self.len;
        self.write_at(at, data);
        self.len += data.len();
        self.mark_dirty(at * Self::STRIDE..self.byte_len());
        Ok(())
    }

    /// Overwrites `data.len()` records starting at `offset`. The length does not change.
    pub fn replace_range(&mut self, offset: usize, data: &[T]) -> Result<(), BufferError> {
        self.check_span(offset, data.len())?;
        self.write_at(offset, data);
        self.mark_dirty(offset * Self::STRIDE..(offset + data.len()) * Self::STRIDE);
        Ok(())
    }

    /// Removes `count` records at `offset`, shifting later records down.
    pub fn remove_range(&mut self, offset: usize, count: usize) -> Result<(), BufferError> {
        self.check_span(offset, count)?;
        if count == 0 {
            return Ok(());
        }
        let old_end = self.byte_len();
        let gap = offset * Self::STRIDE;
        let tail = (offset + count) * Self::STRIDE;
        self.bytes.copy_within(tail..old_end, gap);
        self.len -= count;
        let new_end = self.byte_len();
        self.bytes[new_end..old_end].fill(0);
        self.mark_dirty(gap..new_end);
        Ok(())
    }

    /// Opens a gap at `offset` and writes `data` into it.
    ///
    /// `offset == len` appends.
    pub fn insert_range(&mut self, offset: usize, data: &[T]) -> Result<(), BufferError> {
        if offset > self.len {
            return Err(BufferError::OutOfRange {
                offset,
                count: data.len(),
                len: self.len,
            });
        }
        if data.is_empty() {
            return Ok(());
        }
        self.reserve(data.len())?;
        let old_end = self.byte_len();
        let at = offset * Self::STRIDE;
        self.bytes
            .copy_within(at..old_end, at + data.len() * Self::STRIDE);
        self.write_at(offset, data);
        self.len += data.len();
        self.mark_dirty(at..self.byte_len());
        Ok(())
    }

    /// Writes `value` into every live record.
    pub fn fill(&mut self, value: T) {
        if self.len == 0 {
            return;
        }
        let end = self.byte_len();
        let pattern = bytemuck::bytes_of(&value);
        for chunk in self.bytes[..end].chunks_exact_mut(Self::STRIDE) {
            chunk.copy_from_slice(pattern);
        }
        self.mark_dirty(0..end);
    }

    /// Ensures room for `additional` more records without another reallocation.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(BufferError::OutOfMemory {
                label: self.label,
                requested_bytes: usize::MAX,
            })?;
        if required > self.capacity() {
            self.grow(required)?;
        }
        Ok(())
    }

    /// Reallocates to hold at least `max(target, 2 * capacity)` records.
    ///
    /// Live bytes are copied into the new allocation before the old one is
    /// released. Requests at or below the current capacity are no-ops.
    pub fn grow(&mut self, target: usize) -> Result<(), BufferError> {
        let capacity = self.capacity();
        if target <= capacity {
            return Ok(());
        }
        let records = target.max(capacity.saturating_mul(2));

        let requested_bytes = records
            .checked_mul(Self::STRIDE)
            .ok_or(BufferError::OutOfMemory {
                label: self.label,
                requested_bytes: usize::MAX,
            })?;

        let mut next = Vec::new();
        next.try_reserve_exact(requested_bytes)
            .map_err(|_| BufferError::OutOfMemory {
                label: self.label,
                requested_bytes,
            })?;
        next.extend_from_slice(self.as_bytes());
        next.resize(requested_bytes, 0);

        log::debug!(
            "{}: grew {} -> {} records ({} bytes)",
            self.label,
            capacity,
            records,
            requested_bytes
        );

        // The previous allocation is dropped here, after the copy.
        self.bytes = next;
        Ok(())
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn check_span(&self, offset: usize, count: usize) -> Result<(), BufferError> {
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(BufferError::OutOfRange {
                offset,
                count,
                len: self.len,
            }),
        }
    }

    fn write_at(&mut self, offset: usize, data: &[T]) {
        let start = offset * Self::STRIDE;
        let src: &[u8] = bytemuck::cast_slice(data);
        self.bytes[start..start + src.len()].copy_from_slice(src);
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(range.start)..d.end.max(range.end),
            None => range,
        });
    }

    pub(super) fn take_dirty(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }
}

impl<T> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("label", &self.label)
            .field("usage", &self.usage)
            .field("len", &self.len)
            .field("capacity_bytes", &self.bytes.len())
            .field("dirty", &self.dirty)
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf() -> DeviceBuffer<u32> {
        DeviceBuffer::new("test", BufferUsage::Vertex)
    }

    fn buf_with(values: &[u32]) -> DeviceBuffer<u32> {
        let mut b = buf();
        b.set_all(values).unwrap();
        b
    }

    // ── set_all / append ──────────────────────────────────────────────────

    #[test]
    fn new_buffer_allocates_nothing() {
        let b = buf();
        assert_eq!(b.len(), 0);
        assert_eq!(b.capacity(), 0);
        assert!(b.dirty_bytes().is_none());
    }

    #[test]
    fn set_all_sets_logical_length() {
        let b = buf_with(&[1, 2, 3]);
        assert_eq!(b.len(), 3);
        assert_eq!(b.byte_len(), 3 * 4);
        assert_eq!(b.to_vec(), vec![1, 2, 3]);
        assert_eq!(b.dirty_bytes(), Some(0..12));
    }

    #[test]
    fn set_all_shorter_zeroes_the_tail() {
        let mut b = buf_with(&[7, 7, 7, 7]);
        b.set_all(&[1]).unwrap();
        assert_eq!(b.to_vec(), vec![1]);
        b.append(&[]).unwrap();
        // Bytes past the live length must read back as zero once exposed again.
        b.insert_range(1, &[9]).unwrap();
        assert_eq!(b.to_vec(), vec![1, 9]);
        assert!(b.bytes[b.byte_len()..].iter().all(|&x| x == 0));
    }

    #[test]
    fn append_extends_and_grows() {
        let mut b = buf();
        b.append(&[1, 2]).unwrap();
        b.append(&[3]).unwrap();
        assert_eq!(b.to_vec(), vec![1, 2, 3]);
        assert!(b.capacity() >= 3);
    }

    // ── replace_range ─────────────────────────────────────────────────────

    #[test]
    fn replace_range_overwrites_in_place() {
        let mut b = buf_with(&[1, 2, 3, 4]);
        b.take_dirty();
        b.replace_range(1, &[20, 30]).unwrap();
        assert_eq!(b.to_vec(), vec![1, 20, 30, 4]);
        assert_eq!(b.len(), 4);
        assert_eq!(b.dirty_bytes(), Some(4..12));
    }

    #[test]
    fn replace_range_past_end_is_out_of_range() {
        let mut b = buf_with(&[1, 2, 3]);
        let err = b.replace_range(2, &[8, 9]).unwrap_err();
        assert_eq!(
            err,
            BufferError::OutOfRange {
                offset: 2,
                count: 2,
                len: 3
            }
        );
        assert_eq!(b.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn replace_range_overflowing_offset_is_out_of_range() {
        let mut b = buf_with(&[1]);
        assert!(matches!(
            b.replace_range(usize::MAX, &[1]),
            Err(BufferError::OutOfRange { .. })
        ));
    }

    // ── remove_range ──────────────────────────────────────────────────────

    #[test]
    fn remove_range_shifts_tail_down() {
        let mut b = buf_with(&[1, 2, 3, 4, 5]);
        b.take_dirty();
        b.remove_range(1, 2).unwrap();
        assert_eq!(b.to_vec(), vec![1, 4, 5]);
        assert_eq!(b.dirty_bytes(), Some(4..12));
    }

    #[test]
    fn remove_range_at_tail_leaves_nothing_to_upload() {
        let mut b = buf_with(&[1, 2, 3]);
        b.take_dirty();
        b.remove_range(2, 1).unwrap();
        assert_eq!(b.to_vec(), vec![1, 2]);
        assert!(b.dirty_bytes().is_none());
    }

    #[test]
    fn remove_range_out_of_range_leaves_contents() {
        let mut b = buf_with(&[1, 2, 3]);
        assert!(b.remove_range(2, 2).is_err());
        assert_eq!(b.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_range_keeps_capacity() {
        let mut b = buf_with(&[1, 2, 3, 4]);
        let cap = b.capacity();
        b.remove_range(0, 4).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.capacity(), cap);
    }

    // ── insert_range ──────────────────────────────────────────────────────

    #[test]
    fn insert_range_opens_gap() {
        let mut b = buf_with(&[1, 4]);
        b.insert_range(1, &[2, 3]).unwrap();
        assert_eq!(b.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn insert_range_at_len_appends() {
        let mut b = buf_with(&[1]);
        b.insert_range(1, &[2]).unwrap();
        assert_eq!(b.to_vec(), vec![1, 2]);
    }

    #[test]
    fn insert_range_past_len_is_out_of_range() {
        let mut b = buf_with(&[1]);
        assert!(matches!(
            b.insert_range(2, &[2]),
            Err(BufferError::OutOfRange { offset: 2, count: 1, len: 1 })
        ));
        assert_eq!(b.to_vec(), vec![1]);
    }

    #[test]
    fn insert_then_remove_restores_bytes() {
        let mut b = buf_with(&[10, 20, 30]);
        let before = b.as_bytes().to_vec();
        b.insert_range(1, &[99, 98]).unwrap();
        b.remove_range(1, 2).unwrap();
        assert_eq!(b.as_bytes(), &before[..]);
    }

    // ── grow ──────────────────────────────────────────────────────────────

    #[test]
    fn grow_at_least_doubles() {
        let mut b = DeviceBuffer::<u32>::with_capacity("test", BufferUsage::Vertex, 4).unwrap();
        assert_eq!(b.capacity(), 4);
        b.grow(5).unwrap();
        assert_eq!(b.capacity(), 8);
        b.grow(20).unwrap();
        assert_eq!(b.capacity(), 20);
        assert_eq!(b.capacity_bytes() % b.stride(), 0);
    }

    #[test]
    fn grow_below_capacity_is_noop() {
        let mut b = DeviceBuffer::<u32>::with_capacity("test", BufferUsage::Vertex, 8).unwrap();
        b.grow(2).unwrap();
        b.grow(8).unwrap();
        assert_eq!(b.capacity(), 8);
    }

    #[test]
    fn growth_preserves_existing_records() {
        let k = 6;
        let mut b = DeviceBuffer::<[u32; 2]>::with_capacity("test", BufferUsage::Vertex, k).unwrap();
        let first: Vec<[u32; 2]> = (0..k as u32).map(|i| [i, i * 100]).collect();
        b.append(&first).unwrap();
        assert_eq!(b.capacity(), k);

        let more: Vec<[u32; 2]> = (0..50u32).map(|i| [1000 + i, 7]).collect();
        b.append(&more).unwrap();

        assert!(b.capacity() >= k + 50);
        assert_eq!(&b.to_vec()[..k], &first[..]);
        assert_eq!(&b.to_vec()[k..], &more[..]);
    }

    #[test]
    fn absurd_growth_reports_out_of_memory() {
        let mut b = buf_with(&[1, 2]);
        let err = b.grow(usize::MAX / 2).unwrap_err();
        assert!(matches!(err, BufferError::OutOfMemory { label: "test", .. }));
        assert_eq!(b.to_vec(), vec![1, 2]);
    }

    // ── fill / get ────────────────────────────────────────────────────────

    #[test]
    fn fill_rewrites_every_record() {
        let mut b = buf_with(&[1, 2, 3]);
        b.fill(0);
        assert_eq!(b.to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let b = buf_with(&[5]);
        assert_eq!(b.get(0), Some(5));
        assert_eq!(b.get(1), None);
    }

    #[test]
    fn dirty_ranges_merge() {
        let mut b = buf_with(&[0; 8]);
        b.take_dirty();
        b.replace_range(1, &[1]).unwrap();
        b.replace_range(5, &[1]).unwrap();
        assert_eq!(b.dirty_bytes(), Some(4..24));
    }
}
