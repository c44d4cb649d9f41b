use bytemuck::Pod;

use super::DeviceBuffer;

/// What the GPU copy of a [`DeviceBuffer`] is bound as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Uniform,
}

impl BufferUsage {
    /// wgpu usage flags. Every buffer is a copy target (uploads) and a copy
    /// source (readback in tooling).
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        let base = match self {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        };
        base | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC
    }
}

/// GPU side of a buffer, sized to match the host capacity it was created from.
pub(crate) struct GpuAllocation {
    buffer: wgpu::Buffer,
    size: u64,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Brings the GPU copy up to date.
    ///
    /// When the host capacity changed since the last sync the GPU buffer is
    /// recreated at the new size and the whole live prefix is written; the
    /// old buffer is dropped once wgpu is done with it. Otherwise only the
    /// dirty span is written. Returns `true` if the GPU buffer was replaced.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let capacity = self.capacity_bytes() as u64;
        if capacity == 0 {
            self.take_dirty();
            return false;
        }

        let stale = self.gpu.as_ref().map_or(true, |g| g.size != capacity);
        if stale {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label()),
                size: capacity,
                usage: self.usage().to_wgpu(),
                mapped_at_creation: false,
            });
            if self.byte_len() > 0 {
                queue.write_buffer(&buffer, 0, self.as_bytes());
            }
            log::trace!("{}: allocated {} byte GPU buffer", self.label(), capacity);
            self.gpu = Some(GpuAllocation {
                buffer,
                size: capacity,
            });
            self.take_dirty();
            return true;
        }

        if let (Some(range), Some(gpu)) = (self.take_dirty(), self.gpu.as_ref()) {
            // Spans past the live length only ever hold zeros already uploaded.
            let end = range.end.min(self.byte_len());
            if range.start < end {
                queue.write_buffer(
                    &gpu.buffer,
                    range.start as u64,
                    &self.as_bytes()[range.start..end],
                );
            }
        }
        false
    }

    /// The uploaded buffer, if [`sync`](Self::sync) has run since allocation.
    pub fn gpu_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|g| &g.buffer)
    }

    /// Slice over the live records, for binding as a vertex buffer.
    pub fn gpu_slice(&self) -> Option<wgpu::BufferSlice<'_>> {
        let len = self.byte_len() as u64;
        match self.gpu.as_ref() {
            Some(g) if len > 0 => Some(g.buffer.slice(..len)),
            _ => None,
        }
    }
}
