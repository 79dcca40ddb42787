//! # Text Render
//!
//! Bounded text layout over an on-demand glyph atlas, and state-keyed quad
//! batching shared by text and sprites.
//!
//! ## Features
//!
//! - **Glyph Atlas**: binary-tree packing of glyph bitmaps into one surface
//! - **Glyph Cache**: rasterize on first use, append-only records
//! - **Layout**: character wrapping, nine-way alignment, truncation reporting
//! - **Batching**: one draw call per GPU state transition
//! - **Backend Agnostic**: everything reaches the GPU through `GraphicsBackend`
//!
//! ## Quick Start
//!
//! ```rust
//! use text_render::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = RecordingBackend::new();
//!     let mut renderer = TextRenderer::new(TextRenderConfig::default())?;
//!     let font = renderer.add_font(&mut backend, Box::new(FixedAdvanceRasterizer::default()))?;
//!
//!     let label = renderer.create_text(font, "Score: 100", Rect::new(10, 10, 200, 40))?;
//!     renderer.set_alignment(label, TextAlignment::MIDDLE_CENTER)?;
//!
//!     renderer.queue_text(label, Mat4::identity())?;
//!     renderer.update(&mut backend)?;
//!     renderer.draw(&mut backend, &[Camera::screen(800.0, 600.0)])?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, TextRenderConfig},
        foundation::math::{Mat4, Rect, Vec2, Vec4},
        render::{
            BlendMode, Camera, CharacterPlacement, FilterMode, FixedAdvanceRasterizer, FontId,
            FrameStats, GlyphCacheError, GlyphRasterizer, GraphicsBackend, HorizontalAlign,
            LineBreakMode, RecordingBackend, RenderError, Sprite, TextAlignment, TextBlock,
            TextElementId, TextRenderError, TextRenderer, TextureHandle, VerticalAlign, WrapMode,
        },
    };

    #[cfg(feature = "fontdue")]
    pub use crate::render::FontdueRasterizer;
}
