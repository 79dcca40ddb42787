//! # Rendering System
//!
//! The text-rendering pipeline and the narrow GPU seam it draws through.
//!
//! ## Architecture
//!
//! - **api**: `GraphicsBackend` trait, GPU state enums, the recording backend
//! - **primitives**: vertex layout and the screen camera
//! - **systems::text**: atlas packing, glyph caching, layout, text renderer
//! - **systems::batching**: render-state keyed quad batching shared by text and sprites

use thiserror::Error;

pub mod api;
pub mod primitives;
pub mod systems;

pub use api::{
    BackendCommand, BlendMode, FilterMode, GraphicsBackend, PrimitiveType, RecordingBackend,
    TextureHandle, WrapMode,
};
pub use primitives::{Camera, Vertex};
pub use systems::batching::{Batch, BatchKey, BatchStats, DrawBatcher, QuadGeometry};
pub use systems::text::{
    AtlasNode, CharacterPlacement, FixedAdvanceRasterizer, FontGlyphCache, FontId, FrameStats,
    GlyphAtlasPacker, GlyphCacheError, GlyphKey, GlyphMetrics, GlyphRasterizer, GlyphRecord,
    HorizontalAlign, LayoutSettings, Line, LineBreakMode, RasterizedGlyph, Sprite, TextAlignment,
    TextBlock, TextElement, TextElementId, TextLayoutEngine, TextRenderError, TextRenderer,
    TextResult, VerticalAlign,
};

#[cfg(feature = "fontdue")]
pub use systems::text::FontdueRasterizer;

/// Rendering system errors
///
/// Backends report their own failures through these variants without
/// exposing API-specific details.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// A handle did not refer to a live backend resource
    #[error("Unknown texture handle: {0:?}")]
    UnknownTexture(TextureHandle),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
