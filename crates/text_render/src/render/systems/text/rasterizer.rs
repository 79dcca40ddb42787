//! Glyph rasterization sources
//!
//! The glyph cache asks a [`GlyphRasterizer`] for metrics (layout only needs
//! those) and for coverage bitmaps (only when a glyph must become resident in
//! the atlas).

use std::collections::HashMap;

use crate::foundation::math::IVec2;

/// Metrics of one glyph at one pixel size
///
/// `bearing.x` is the offset from the pen position to the bitmap's left edge,
/// `bearing.y` the distance from the baseline up to the bitmap's top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Offset from pen position to bitmap top-left (Y up from baseline)
    pub bearing: IVec2,
    /// Pen advance after this glyph
    pub advance: IVec2,
}

/// Coverage bitmap and metrics for one glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedGlyph {
    /// Glyph metrics
    pub metrics: GlyphMetrics,
    /// Row-major 8-bit coverage, `width * height` bytes
    pub bitmap: Vec<u8>,
}

/// Source of glyph metrics and bitmaps for a (codepoint, size) pair
pub trait GlyphRasterizer {
    /// Metrics without rasterizing; `None` if the font has no such glyph
    fn metrics(&mut self, character: char, size: u32) -> Option<GlyphMetrics>;

    /// Rasterize the glyph; `None` if the font has no such glyph
    fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph>;
}

/// Deterministic fixed-advance rasterizer
///
/// Every glyph is a solid block `width` pixels wide (overridable per
/// character) whose height and ascent scale with the requested size.
/// Whitespace produces an empty bitmap with a normal advance. Useful for
/// headless tools and tests where a real font file is unavailable.
#[derive(Debug, Clone)]
pub struct FixedAdvanceRasterizer {
    advance_ratio: f32,
    widths: HashMap<char, u32>,
    missing: Vec<char>,
}

impl FixedAdvanceRasterizer {
    /// Glyph advance as a fraction of the pixel size
    pub fn new(advance_ratio: f32) -> Self {
        Self { advance_ratio, widths: HashMap::new(), missing: Vec::new() }
    }

    /// Override the width (and advance) of one character
    pub fn with_width(mut self, character: char, width: u32) -> Self {
        self.widths.insert(character, width);
        self
    }

    /// Report `character` as absent from the font
    pub fn without_glyph(mut self, character: char) -> Self {
        self.missing.push(character);
        self
    }

    fn glyph_width(&self, character: char, size: u32) -> u32 {
        self.widths
            .get(&character)
            .copied()
            .unwrap_or_else(|| ((size as f32 * self.advance_ratio).round() as u32).max(1))
    }
}

impl Default for FixedAdvanceRasterizer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl GlyphRasterizer for FixedAdvanceRasterizer {
    fn metrics(&mut self, character: char, size: u32) -> Option<GlyphMetrics> {
        if self.missing.contains(&character) || size == 0 {
            return None;
        }

        let advance = self.glyph_width(character, size);
        let ascent = (size * 3 / 4) as i32;
        if character.is_whitespace() {
            return Some(GlyphMetrics {
                width: 0,
                height: 0,
                bearing: IVec2::new(0, ascent),
                advance: IVec2::new(advance as i32, 0),
            });
        }

        Some(GlyphMetrics {
            width: advance,
            height: size,
            bearing: IVec2::new(0, ascent),
            advance: IVec2::new(advance as i32, 0),
        })
    }

    fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph> {
        let metrics = self.metrics(character, size)?;
        let bitmap = vec![u8::MAX; (metrics.width * metrics.height) as usize];
        Some(RasterizedGlyph { metrics, bitmap })
    }
}

/// TrueType/OpenType rasterizer backed by `fontdue`
#[cfg(feature = "fontdue")]
pub struct FontdueRasterizer {
    font: fontdue::Font,
}

#[cfg(feature = "fontdue")]
impl FontdueRasterizer {
    /// Load a font from raw TTF/OTF bytes
    pub fn from_bytes(font_data: &[u8]) -> Result<Self, super::GlyphCacheError> {
        let font = fontdue::Font::from_bytes(font_data, fontdue::FontSettings::default())
            .map_err(|e| super::GlyphCacheError::FontLoad(e.to_string()))?;
        log::info!("Loaded font with {} glyphs", font.glyph_count());
        Ok(Self { font })
    }

    fn convert(metrics: &fontdue::Metrics) -> GlyphMetrics {
        GlyphMetrics {
            width: metrics.width as u32,
            height: metrics.height as u32,
            // fontdue reports the bottom edge; convert to a top bearing
            bearing: IVec2::new(metrics.xmin, metrics.ymin + metrics.height as i32),
            advance: IVec2::new(
                metrics.advance_width.round() as i32,
                metrics.advance_height.round() as i32,
            ),
        }
    }
}

#[cfg(feature = "fontdue")]
impl GlyphRasterizer for FontdueRasterizer {
    fn metrics(&mut self, character: char, size: u32) -> Option<GlyphMetrics> {
        if self.font.lookup_glyph_index(character) == 0 {
            return None;
        }
        Some(Self::convert(&self.font.metrics(character, size as f32)))
    }

    fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph> {
        if self.font.lookup_glyph_index(character) == 0 {
            return None;
        }
        let (metrics, bitmap) = self.font.rasterize(character, size as f32);
        Some(RasterizedGlyph { metrics: Self::convert(&metrics), bitmap })
    }
}
