//! Rendering systems
//!
//! Text layout and rendering, and the quad batching both text and sprites
//! are drawn through.

pub mod batching;
pub mod text;
