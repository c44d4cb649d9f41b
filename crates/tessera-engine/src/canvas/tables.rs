use crate::buffer::{BufferError, BufferUsage, DeviceBuffer};

use super::{Camera2D, CameraUniform, Canvas, MAX_CANVAS_SLOTS, Projection, ProjectionUniform};

/// Camera and projection uniforms indexed by canvas slot.
///
/// Every batch and standalone sprite carries its own copy so a draw never
/// depends on another owner's upload state.
#[derive(Debug)]
pub struct ViewTables {
    cameras: DeviceBuffer<CameraUniform>,
    projections: DeviceBuffer<ProjectionUniform>,
}

impl ViewTables {
    pub fn new() -> Result<Self, BufferError> {
        let slots = MAX_CANVAS_SLOTS as usize;
        let mut cameras = DeviceBuffer::with_capacity("canvas cameras", BufferUsage::Uniform, slots)?;
        let mut projections =
            DeviceBuffer::with_capacity("canvas projections", BufferUsage::Uniform, slots)?;
        cameras.set_all(&vec![Camera2D::IDENTITY.uniform(); slots])?;
        projections.set_all(&vec![Projection::default().uniform(); slots])?;
        Ok(Self {
            cameras,
            projections,
        })
    }

    /// Copies `canvas`'s camera and projection into its slot.
    pub fn refresh(&mut self, canvas: &Canvas) -> Result<(), BufferError> {
        let slot = canvas.slot() as usize;
        self.cameras.replace_range(slot, &[canvas.camera().uniform()])?;
        self.projections
            .replace_range(slot, &[canvas.projection().uniform()])
    }

    pub fn camera(&self, slot: u32) -> Option<CameraUniform> {
        self.cameras.get(slot as usize)
    }

    pub fn projection(&self, slot: u32) -> Option<ProjectionUniform> {
        self.projections.get(slot as usize)
    }

    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.cameras.sync(device, queue);
        self.projections.sync(device, queue);
    }

    /// Uploaded camera and projection buffers.
    pub fn gpu_buffers(&self) -> Option<(&wgpu::Buffer, &wgpu::Buffer)> {
        Some((self.cameras.gpu_buffer()?, self.projections.gpu_buffer()?))
    }
}
