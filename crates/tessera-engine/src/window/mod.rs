//! Event loop and window ownership.
//!
//! Owns the `winit` event loop and a single window, and ties the window to
//! its [`Gpu`](crate::device::Gpu).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
