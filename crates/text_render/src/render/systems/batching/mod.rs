//! Batch rendering system
//!
//! Groups quads by GPU state to minimize draw calls.

pub mod batch_renderer;

pub use batch_renderer::*;
