//! Text rendering system
//!
//! Glyph atlas packing, on-demand glyph caching, line layout and the text
//! renderer that batches laid-out glyphs alongside sprites.
//!
//! # Architecture
//!
//! - **atlas_packer**: binary-tree rectangle packer over one atlas surface
//! - **rasterizer**: glyph metric and bitmap sources
//! - **font_atlas**: glyph cache writing rasterized bitmaps into the atlas
//! - **text_layout**: character-wrapped, aligned line layout
//! - **text_renderer**: element management and per-frame batching

pub mod atlas_packer;
pub mod font_atlas;
pub mod rasterizer;
pub mod text_layout;
pub mod text_renderer;

pub use atlas_packer::{AtlasNode, GlyphAtlasPacker};
pub use font_atlas::{FontGlyphCache, GlyphCacheError, GlyphKey, GlyphRecord, GlyphResult};
#[cfg(feature = "fontdue")]
pub use rasterizer::FontdueRasterizer;
pub use rasterizer::{FixedAdvanceRasterizer, GlyphMetrics, GlyphRasterizer, RasterizedGlyph};
pub use text_layout::{
    CharacterPlacement, HorizontalAlign, LayoutSettings, Line, LineBreakMode, TextAlignment,
    TextBlock, TextLayoutEngine, VerticalAlign,
};
pub use text_renderer::{
    FontId, FrameStats, Sprite, TextElement, TextElementId, TextRenderError, TextRenderer,
    TextResult,
};
