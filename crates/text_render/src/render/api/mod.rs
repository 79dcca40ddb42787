//! Backend-facing rendering API
//!
//! The trait the pipeline draws through plus the GPU render-state vocabulary.

pub mod recording;
pub mod render_backend;

pub use recording::{BackendCommand, RecordingBackend};
pub use render_backend::{
    BlendMode, FilterMode, GraphicsBackend, PrimitiveType, TextureHandle, WrapMode,
};
