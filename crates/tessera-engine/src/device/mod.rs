//! GPU device, surface and depth target.
//!
//! [`Gpu`] creates the wgpu instance, adapter, device and queue, keeps the
//! window surface configured, and owns the depth texture sprite passes test
//! against. Frames are acquired with [`Gpu::begin_frame`] and finished with
//! [`Gpu::submit`].

mod depth;
mod frame;
mod gpu;
mod init;
mod surface;

pub use depth::DepthTarget;
pub use frame::{GpuFrame, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::GpuInit;
