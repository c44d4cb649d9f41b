//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime loop and the application: a
//! per-frame context and the callbacks the runtime drives.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
