//! Font glyph cache
//!
//! Rasterizes glyphs on demand, packs their bitmaps into a single coverage
//! atlas and remembers where each (codepoint, size) pair landed. The cache is
//! append-only: records are never evicted and the atlas never shrinks.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::atlas_packer::GlyphAtlasPacker;
use super::rasterizer::{GlyphMetrics, GlyphRasterizer};
use crate::foundation::math::{IVec2, Rect};

/// Result type for glyph cache operations
pub type GlyphResult<T> = Result<T, GlyphCacheError>;

/// Errors that can occur while resolving glyphs
#[derive(Debug, thiserror::Error)]
pub enum GlyphCacheError {
    /// The atlas has no free region large enough for the glyph bitmap
    #[error("Glyph atlas full: cannot place '{character}' at {size}px")]
    AtlasFull {
        /// Requested character
        character: char,
        /// Requested pixel size
        size: u32,
    },

    /// The rasterizer has no glyph for the character
    #[error("Glyph '{character}' not found at {size}px")]
    GlyphNotFound {
        /// Requested character
        character: char,
        /// Requested pixel size
        size: u32,
    },

    /// Failed to load font from file or data
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    /// Failed to export the atlas image
    #[error("Failed to export atlas image: {0}")]
    Export(#[from] image::ImageError),
}

/// Lookup key of a cached glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    /// Character code
    pub character: char,
    /// Pixel size
    pub size: u32,
}

impl GlyphKey {
    /// Create a key
    pub const fn new(character: char, size: u32) -> Self {
        Self { character, size }
    }
}

/// A glyph resident in the atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRecord {
    /// Character code
    pub character: char,
    /// Pixel size it was rasterized at
    pub size: u32,
    /// Placement of the bitmap in atlas pixels (excluding padding)
    pub atlas_rect: Rect,
    /// Offset from pen position to bitmap top-left (Y up from baseline)
    pub bearing: IVec2,
    /// Pen advance after this glyph
    pub advance: IVec2,
    /// Bitmap size in pixels
    pub bitmap_size: (u32, u32),
}

/// Pixel count of a `width` x `height` surface, without `u32` overflow
fn surface_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// On-demand glyph cache over one atlas surface
#[derive(Debug)]
pub struct FontGlyphCache {
    packer: GlyphAtlasPacker,
    coverage: Vec<u8>,
    padding: u32,
    metrics: HashMap<GlyphKey, Option<GlyphMetrics>>,
    records: HashMap<GlyphKey, GlyphRecord>,
    exhausted: HashSet<GlyphKey>,
    next_id: u32,
    dirty: bool,
}

impl FontGlyphCache {
    /// Create an empty cache with a `width` x `height` atlas
    ///
    /// `padding` empty pixels are reserved on every side of each bitmap.
    pub fn new(width: u32, height: u32, padding: u32) -> Self {
        log::info!("Created {}x{} glyph atlas ({}px padding)", width, height, padding);
        Self {
            packer: GlyphAtlasPacker::new(width, height),
            coverage: vec![0; surface_len(width, height)],
            padding,
            metrics: HashMap::new(),
            records: HashMap::new(),
            exhausted: HashSet::new(),
            next_id: 1,
            dirty: true,
        }
    }

    /// Metrics for a glyph, memoized; does not touch the atlas
    pub fn metrics(
        &mut self,
        rasterizer: &mut dyn GlyphRasterizer,
        character: char,
        size: u32,
    ) -> Option<GlyphMetrics> {
        let key = GlyphKey::new(character, size);
        if let Some(record) = self.records.get(&key) {
            return Some(GlyphMetrics {
                width: record.bitmap_size.0,
                height: record.bitmap_size.1,
                bearing: record.bearing,
                advance: record.advance,
            });
        }
        *self.metrics.entry(key).or_insert_with(|| rasterizer.metrics(character, size))
    }

    /// Resident record for a glyph, rasterizing and packing it on a miss
    ///
    /// A failed placement is reported as [`GlyphCacheError::AtlasFull`] and
    /// nothing is recorded; callers must not assume UVs for that glyph. The
    /// atlas never frees space, so the failure is remembered and later
    /// requests for the same key fail without rasterizing again.
    pub fn get_glyph(
        &mut self,
        rasterizer: &mut dyn GlyphRasterizer,
        character: char,
        size: u32,
    ) -> GlyphResult<&GlyphRecord> {
        let key = GlyphKey::new(character, size);
        if self.exhausted.contains(&key) {
            return Err(GlyphCacheError::AtlasFull { character, size });
        }
        if !self.records.contains_key(&key) {
            let record = match self.rasterize_into_atlas(rasterizer, key) {
                Ok(record) => record,
                Err(e @ GlyphCacheError::AtlasFull { .. }) => {
                    self.exhausted.insert(key);
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            self.records.insert(key, record);
        }
        self.records.get(&key).ok_or(GlyphCacheError::GlyphNotFound { character, size })
    }

    fn rasterize_into_atlas(
        &mut self,
        rasterizer: &mut dyn GlyphRasterizer,
        key: GlyphKey,
    ) -> GlyphResult<GlyphRecord> {
        let GlyphKey { character, size } = key;
        let glyph = rasterizer
            .rasterize(character, size)
            .ok_or(GlyphCacheError::GlyphNotFound { character, size })?;
        let metrics = glyph.metrics;

        let atlas_rect = if metrics.width == 0 || metrics.height == 0 {
            Rect::default()
        } else {
            let id = self.next_id;
            let placed = self
                .packer
                .insert(metrics.width + self.padding * 2, metrics.height + self.padding * 2, id)
                .ok_or_else(|| {
                    log::warn!(
                        "Glyph atlas exhausted placing '{}' at {}px ({}x{})",
                        character,
                        size,
                        metrics.width,
                        metrics.height
                    );
                    GlyphCacheError::AtlasFull { character, size }
                })?;
            self.next_id += 1;

            let rect = Rect::new(
                placed.x + self.padding as i32,
                placed.y + self.padding as i32,
                metrics.width as i32,
                metrics.height as i32,
            );
            self.blit(rect, &glyph.bitmap);
            rect
        };

        log::debug!("Cached glyph '{}' at {}px -> {:?}", character, size, atlas_rect);
        self.metrics.remove(&key);

        Ok(GlyphRecord {
            character,
            size,
            atlas_rect,
            bearing: metrics.bearing,
            advance: metrics.advance,
            bitmap_size: (metrics.width, metrics.height),
        })
    }

    fn blit(&mut self, rect: Rect, bitmap: &[u8]) {
        let atlas_width = self.packer.size().0 as usize;
        let row_len = rect.width as usize;
        for (row, src) in bitmap.chunks_exact(row_len).take(rect.height as usize).enumerate() {
            let start = (rect.y as usize + row) * atlas_width + rect.x as usize;
            self.coverage[start..start + row_len].copy_from_slice(src);
        }
        self.dirty = true;
    }

    /// Resident record without rasterizing
    pub fn record(&self, character: char, size: u32) -> Option<&GlyphRecord> {
        self.records.get(&GlyphKey::new(character, size))
    }

    /// Number of resident glyphs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no glyph is resident
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Atlas dimensions
    pub const fn atlas_dimensions(&self) -> (u32, u32) {
        self.packer.size()
    }

    /// The underlying packer
    pub const fn packer(&self) -> &GlyphAtlasPacker {
        &self.packer
    }

    /// 8-bit coverage surface, row-major
    pub fn coverage(&self) -> &[u8] {
        &self.coverage
    }

    /// Whether the coverage changed since the last [`Self::mark_uploaded`]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the GPU copy matches the coverage surface
    pub fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    /// Coverage expanded to RGBA8 with white color and coverage in alpha
    pub fn rgba_pixels(&self) -> Vec<u8> {
        self.coverage.iter().flat_map(|&alpha| [u8::MAX, u8::MAX, u8::MAX, alpha]).collect()
    }

    /// Save the coverage atlas to a grayscale PNG for debugging
    pub fn save_debug_image(&self, path: impl AsRef<Path>) -> GlyphResult<()> {
        let (width, height) = self.atlas_dimensions();
        image::save_buffer(path, &self.coverage, width, height, image::ExtendedColorType::L8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::systems::text::rasterizer::{FixedAdvanceRasterizer, RasterizedGlyph};

    #[test]
    fn test_cache_hit_returns_same_record() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(64, 64, 0);

        let first = cache.get_glyph(&mut rasterizer, 'A', 10).unwrap().clone();
        let second = cache.get_glyph(&mut rasterizer, 'A', 10).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(first.atlas_rect, Rect::new(0, 0, 5, 10));
    }

    #[test]
    fn test_sizes_are_cached_separately() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(64, 64, 0);
        cache.get_glyph(&mut rasterizer, 'A', 10).unwrap();
        cache.get_glyph(&mut rasterizer, 'A', 20).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_atlas_full_is_reported() {
        let mut rasterizer = FixedAdvanceRasterizer::new(1.0);
        let mut cache = FontGlyphCache::new(16, 16, 0);

        assert!(cache.get_glyph(&mut rasterizer, 'A', 16).is_ok());
        let err = cache.get_glyph(&mut rasterizer, 'B', 16).unwrap_err();
        assert!(matches!(err, GlyphCacheError::AtlasFull { character: 'B', size: 16 }));
        assert!(cache.record('B', 16).is_none());
        assert_eq!(cache.len(), 1);
    }

    /// Counts rasterize calls of the wrapped rasterizer
    struct CountingRasterizer {
        inner: FixedAdvanceRasterizer,
        rasterized: usize,
    }

    impl GlyphRasterizer for CountingRasterizer {
        fn metrics(&mut self, character: char, size: u32) -> Option<GlyphMetrics> {
            self.inner.metrics(character, size)
        }

        fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph> {
            self.rasterized += 1;
            self.inner.rasterize(character, size)
        }
    }

    #[test]
    fn test_atlas_full_is_not_retried() {
        let mut rasterizer = CountingRasterizer { inner: FixedAdvanceRasterizer::new(1.0), rasterized: 0 };
        let mut cache = FontGlyphCache::new(16, 16, 0);
        cache.get_glyph(&mut rasterizer, 'A', 16).unwrap();

        for _ in 0..5 {
            let err = cache.get_glyph(&mut rasterizer, 'B', 16).unwrap_err();
            assert!(matches!(err, GlyphCacheError::AtlasFull { character: 'B', size: 16 }));
        }
        assert_eq!(rasterizer.rasterized, 2);
        assert_eq!(cache.packer().nodes().len(), 1);
    }

    #[test]
    fn test_surface_len_does_not_overflow_u32() {
        assert_eq!(surface_len(64, 32), 2048);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(surface_len(65_536, 65_536), 1usize << 32);
    }

    #[test]
    fn test_padding_reserves_border() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(64, 64, 2);
        let record = cache.get_glyph(&mut rasterizer, 'A', 10).unwrap();
        assert_eq!(record.atlas_rect, Rect::new(2, 2, 5, 10));
        assert_eq!(cache.packer().occupied_area(), 9 * 14);
    }

    #[test]
    fn test_whitespace_uses_no_atlas_space() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(32, 32, 1);
        let record = cache.get_glyph(&mut rasterizer, ' ', 10).unwrap();
        assert_eq!(record.atlas_rect, Rect::default());
        assert_eq!(cache.packer().occupied_area(), 0);
    }

    #[test]
    fn test_missing_glyph() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5).without_glyph('x');
        let mut cache = FontGlyphCache::new(32, 32, 0);
        assert!(cache.metrics(&mut rasterizer, 'x', 10).is_none());
        assert!(matches!(
            cache.get_glyph(&mut rasterizer, 'x', 10),
            Err(GlyphCacheError::GlyphNotFound { .. })
        ));
    }

    #[test]
    fn test_metrics_do_not_touch_atlas() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(32, 32, 0);
        let metrics = cache.metrics(&mut rasterizer, 'Q', 12).unwrap();
        assert_eq!(metrics.width, 6);
        assert!(cache.is_empty());
        assert_eq!(cache.packer().nodes().len(), 1);
    }

    #[test]
    fn test_blit_and_rgba_expansion() {
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5);
        let mut cache = FontGlyphCache::new(8, 8, 0);
        cache.mark_uploaded();
        cache.get_glyph(&mut rasterizer, 'A', 4).unwrap();
        assert!(cache.is_dirty());

        // 2x4 block at the origin
        assert_eq!(cache.coverage()[0], 255);
        assert_eq!(cache.coverage()[1], 255);
        assert_eq!(cache.coverage()[2], 0);
        assert_eq!(cache.coverage()[8 * 3 + 1], 255);
        assert_eq!(cache.coverage()[8 * 4], 0);

        let rgba = cache.rgba_pixels();
        assert_eq!(rgba.len(), 8 * 8 * 4);
        assert_eq!(&rgba[0..4], &[255, 255, 255, 255]);
        assert_eq!(&rgba[8..12], &[255, 255, 255, 0]);
    }
}
