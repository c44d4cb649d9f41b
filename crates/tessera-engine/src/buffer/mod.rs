//! Growable strided record storage mirrored into GPU buffers.
//!
//! Every per-sprite attribute column is a [`DeviceBuffer`]. The host copy is
//! authoritative and all structural edits (insert, remove, grow) happen on it;
//! the GPU copy is brought up to date lazily, one contiguous dirty range at a
//! time, before a draw reads it.

mod device_buffer;
mod error;
mod gpu;

pub use device_buffer::DeviceBuffer;
pub use error::BufferError;
pub use gpu::BufferUsage;
