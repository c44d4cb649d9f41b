//! Depth-ordered containers.
//!
//! [`ZOrdered`] keeps values sorted by an [`OrderKey`] while handing out
//! [`NodeId`]s that stay valid across unrelated inserts and removals. Keys may
//! be points or bands; [`CompareMode::Containing`] lets a point probe find the
//! band that holds it.

mod key;
mod ordered;

pub use key::{CompareMode, OrderKey, ZKey};
pub use ordered::{NodeId, ZOrdered};
