//! Text renderer
//!
//! Owns fonts and text elements, lays elements out lazily, and turns queued
//! text and sprites into batched quads once per frame.
//!
//! # Frame Flow
//!
//! 1. `queue_text` / `add_sprite` for everything visible this frame
//! 2. `update` rebuilds the batches and uploads atlases and vertices
//! 3. `draw` replays every batch once per camera
//!
//! Layout is cached per element together with the configuration generation
//! it was computed from; any layout-affecting setter bumps the generation and
//! the next query recomputes.

use std::collections::HashSet;
use std::path::Path;

use slotmap::{new_key_type, SlotMap};

use super::font_atlas::{FontGlyphCache, GlyphCacheError};
use super::rasterizer::GlyphRasterizer;
use super::text_layout::{
    CharacterPlacement, LayoutSettings, LineBreakMode, TextAlignment, TextBlock, TextLayoutEngine,
};
use crate::config::{ConfigError, TextRenderConfig};
use crate::foundation::math::{Mat4, Rect, Vec2, Vec4};
use crate::render::api::{BlendMode, FilterMode, GraphicsBackend, TextureHandle, WrapMode};
use crate::render::primitives::Camera;
use crate::render::systems::batching::{BatchKey, DrawBatcher, QuadGeometry};
use crate::render::{RenderError, RenderResult};

new_key_type! {
    /// Handle to a font registered with a [`TextRenderer`]
    pub struct FontId;

    /// Handle to a text element owned by a [`TextRenderer`]
    pub struct TextElementId;
}

/// Result type for text renderer operations
pub type TextResult<T> = Result<T, TextRenderError>;

/// Errors that can occur in the text renderer
#[derive(Debug, thiserror::Error)]
pub enum TextRenderError {
    /// No element with this id exists
    #[error("Unknown text element: {0:?}")]
    UnknownElement(TextElementId),

    /// No font with this id exists
    #[error("Unknown font: {0:?}")]
    UnknownFont(FontId),

    /// Glyph resolution failed
    #[error("Glyph error: {0}")]
    Glyph(#[from] GlyphCacheError),

    /// The graphics backend failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The renderer configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A registered font: glyph cache, its rasterizer and its atlas texture
struct FontSlot {
    cache: FontGlyphCache,
    rasterizer: Box<dyn GlyphRasterizer>,
    texture: TextureHandle,
}

impl FontSlot {
    /// Make every distinct glyph of `block` resident in the atlas
    fn ensure_resident(&mut self, block: &TextBlock) -> Result<(), GlyphCacheError> {
        let mut seen = HashSet::new();
        for placement in block.placements() {
            if seen.insert((placement.character, placement.size)) {
                self.cache.get_glyph(self.rasterizer.as_mut(), placement.character, placement.size)?;
            }
        }
        Ok(())
    }
}

/// Layout result tagged with the configuration it came from
#[derive(Debug)]
struct CachedLayout {
    generation: u64,
    block: TextBlock,
}

/// A managed block of text
#[derive(Debug)]
pub struct TextElement {
    characters: Vec<char>,
    font: FontId,
    font_size: u32,
    rect: Rect,
    alignment: TextAlignment,
    line_break_mode: LineBreakMode,
    line_spacing: i32,
    color: Vec4,
    scissor: Option<Rect>,
    sorting_layer: i32,
    generation: u64,
    layout: Option<CachedLayout>,
}

impl TextElement {
    /// Text content
    pub fn text(&self) -> String {
        self.characters.iter().collect()
    }

    /// Font used for layout and rendering
    pub const fn font(&self) -> FontId {
        self.font
    }

    /// Glyph pixel size
    pub const fn font_size(&self) -> u32 {
        self.font_size
    }

    /// Bounding rect
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Block alignment
    pub const fn alignment(&self) -> TextAlignment {
        self.alignment
    }

    /// Line breaking policy
    pub const fn line_break_mode(&self) -> LineBreakMode {
        self.line_break_mode
    }

    /// Extra pixels between lines
    pub const fn line_spacing(&self) -> i32 {
        self.line_spacing
    }

    /// Tint color
    pub const fn color(&self) -> Vec4 {
        self.color
    }

    /// Scissor rectangle, if clipping is enabled
    pub const fn scissor(&self) -> Option<Rect> {
        self.scissor
    }

    /// Draw order; lower layers are drawn first
    pub const fn sorting_layer(&self) -> i32 {
        self.sorting_layer
    }

    /// Configuration generation, bumped by every layout-affecting change
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the cached layout is missing or stale
    pub fn needs_layout(&self) -> bool {
        self.layout.as_ref().map_or(true, |cached| cached.generation != self.generation)
    }

    /// Cached layout, if any
    pub fn cached_block(&self) -> Option<&TextBlock> {
        self.layout.as_ref().map(|cached| &cached.block)
    }

    fn layout_settings(&self) -> LayoutSettings {
        LayoutSettings {
            font_size: self.font_size,
            rect: self.rect,
            line_break_mode: self.line_break_mode,
            alignment: self.alignment,
            line_spacing: self.line_spacing,
        }
    }

    /// Store `value`, bumping the generation if it changed
    fn update<T: PartialEq>(generation: &mut u64, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            *generation += 1;
        }
    }
}

/// A textured quad drawn through the same batches as text
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Sampled texture
    pub texture: TextureHandle,
    /// Texture dimensions in texels
    pub texture_size: (u32, u32),
    /// Sampled region, top-left origin
    pub source_rect: Rect,
    /// Pivot position
    pub position: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Pivot as a fraction of size
    pub pivot: Vec2,
    /// Tint color
    pub color: Vec4,
    /// Framebuffer blend
    pub blend: BlendMode,
    /// Sampler filter
    pub filter: FilterMode,
    /// Sampler wrap
    pub wrap: WrapMode,
    /// Scissor rectangle
    pub scissor: Option<Rect>,
    /// Draw order; lower layers are drawn first
    pub sorting_layer: i32,
}

impl Sprite {
    /// Whole-texture sprite at the origin, drawn at texture size
    pub fn new(texture: TextureHandle, texture_size: (u32, u32)) -> Self {
        let (width, height) = texture_size;
        Self {
            texture,
            texture_size,
            source_rect: Rect::new(0, 0, width as i32, height as i32),
            position: Vec2::zeros(),
            size: Vec2::new(width as f32, height as f32),
            pivot: Vec2::zeros(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            blend: BlendMode::Alpha,
            filter: FilterMode::Bilinear,
            wrap: WrapMode::Clamp,
            scissor: None,
            sorting_layer: 0,
        }
    }

    /// Sample a sub-region of the texture
    pub fn with_source_rect(mut self, source_rect: Rect) -> Self {
        self.source_rect = source_rect;
        self
    }

    /// Place and size the sprite
    pub fn with_bounds(mut self, position: Vec2, size: Vec2) -> Self {
        self.position = position;
        self.size = size;
        self
    }

    /// Set the tint color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Set the draw order
    pub fn with_sorting_layer(mut self, sorting_layer: i32) -> Self {
        self.sorting_layer = sorting_layer;
        self
    }

    fn batch_key(&self) -> BatchKey {
        BatchKey {
            texture: self.texture,
            filter: self.filter,
            wrap: self.wrap,
            blend: self.blend,
            scissor: self.scissor,
        }
    }

    fn quad(&self, world: Mat4) -> QuadGeometry {
        QuadGeometry {
            position: self.position,
            size: self.size,
            pivot: self.pivot,
            source_rect: self.source_rect,
            texture_size: self.texture_size,
            color: self.color,
            world,
        }
    }
}

/// Per-frame statistics reported by [`TextRenderer::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Text elements batched
    pub text_elements: usize,
    /// Sprites batched
    pub sprites: usize,
    /// Queued items skipped for zero alpha
    pub skipped_invisible: usize,
    /// Glyphs dropped because they could not be made resident
    pub missing_glyphs: usize,
    /// Quads submitted to the batcher
    pub quads: usize,
    /// Batches formed (draw calls per camera)
    pub batches: usize,
    /// Atlas textures re-uploaded
    pub atlas_uploads: usize,
}

#[derive(Debug, Clone)]
enum QueuedItem {
    Text { id: TextElementId, world: Mat4 },
    Sprite { sprite: Sprite, world: Mat4 },
}

/// Text and sprite renderer over one [`DrawBatcher`]
pub struct TextRenderer {
    config: TextRenderConfig,
    layout_engine: TextLayoutEngine,
    fonts: SlotMap<FontId, FontSlot>,
    elements: SlotMap<TextElementId, TextElement>,
    queue: Vec<QueuedItem>,
    batcher: DrawBatcher,
    last_stats: FrameStats,
}

impl TextRenderer {
    /// Create a renderer from a validated configuration
    pub fn new(config: TextRenderConfig) -> TextResult<Self> {
        config.validate()?;
        log::info!(
            "Text renderer ready: {}x{} atlases, default {}px",
            config.atlas_width,
            config.atlas_height,
            config.default_font_size
        );
        Ok(Self {
            batcher: DrawBatcher::with_capacity(config.initial_vertex_capacity),
            config,
            layout_engine: TextLayoutEngine::new(),
            fonts: SlotMap::with_key(),
            elements: SlotMap::with_key(),
            queue: Vec::new(),
            last_stats: FrameStats::default(),
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &TextRenderConfig {
        &self.config
    }

    /// Register a font and create its atlas texture
    pub fn add_font(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        rasterizer: Box<dyn GlyphRasterizer>,
    ) -> TextResult<FontId> {
        let (width, height) = (self.config.atlas_width, self.config.atlas_height);
        let texture = backend.create_texture(width, height)?;
        let cache = FontGlyphCache::new(width, height, self.config.glyph_padding);
        let id = self.fonts.insert(FontSlot { cache, rasterizer, texture });
        log::info!("Registered font {:?} with atlas texture {:?}", id, texture);
        Ok(id)
    }

    /// Glyph cache of a font
    pub fn font_cache(&self, font: FontId) -> Option<&FontGlyphCache> {
        self.fonts.get(font).map(|slot| &slot.cache)
    }

    /// Atlas texture of a font
    pub fn font_texture(&self, font: FontId) -> Option<TextureHandle> {
        self.fonts.get(font).map(|slot| slot.texture)
    }

    /// Write a font's atlas coverage to an image file
    pub fn save_atlas_image(&self, font: FontId, path: impl AsRef<Path>) -> TextResult<()> {
        let slot = self.fonts.get(font).ok_or(TextRenderError::UnknownFont(font))?;
        slot.cache.save_debug_image(path)?;
        Ok(())
    }

    /// Create a text element with the configured defaults
    pub fn create_text(&mut self, font: FontId, text: &str, rect: Rect) -> TextResult<TextElementId> {
        if !self.fonts.contains_key(font) {
            return Err(TextRenderError::UnknownFont(font));
        }
        let id = self.elements.insert(TextElement {
            characters: text.chars().collect(),
            font,
            font_size: self.config.default_font_size,
            rect,
            alignment: TextAlignment::default(),
            line_break_mode: LineBreakMode::default(),
            line_spacing: self.config.default_line_spacing,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            scissor: None,
            sorting_layer: 0,
            generation: 0,
            layout: None,
        });
        log::debug!("Created text element {:?} ({} chars)", id, text.chars().count());
        Ok(id)
    }

    /// Destroy a text element; returns whether it existed
    pub fn remove_text(&mut self, id: TextElementId) -> bool {
        self.elements.remove(id).is_some()
    }

    /// A text element
    pub fn element(&self, id: TextElementId) -> Option<&TextElement> {
        self.elements.get(id)
    }

    /// Number of live text elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn element_mut(&mut self, id: TextElementId) -> TextResult<&mut TextElement> {
        self.elements.get_mut(id).ok_or(TextRenderError::UnknownElement(id))
    }

    /// Replace the text content
    pub fn set_text(&mut self, id: TextElementId, text: &str) -> TextResult<()> {
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.characters, text.chars().collect());
        Ok(())
    }

    /// Switch to another registered font
    pub fn set_font(&mut self, id: TextElementId, font: FontId) -> TextResult<()> {
        if !self.fonts.contains_key(font) {
            return Err(TextRenderError::UnknownFont(font));
        }
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.font, font);
        Ok(())
    }

    /// Set the glyph pixel size
    pub fn set_font_size(&mut self, id: TextElementId, font_size: u32) -> TextResult<()> {
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.font_size, font_size);
        Ok(())
    }

    /// Set the bounding rect
    pub fn set_rect(&mut self, id: TextElementId, rect: Rect) -> TextResult<()> {
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.rect, rect);
        Ok(())
    }

    /// Set the block alignment
    pub fn set_alignment(&mut self, id: TextElementId, alignment: TextAlignment) -> TextResult<()> {
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.alignment, alignment);
        Ok(())
    }

    /// Set the line breaking policy
    pub fn set_line_break_mode(&mut self, id: TextElementId, mode: LineBreakMode) -> TextResult<()> {
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.line_break_mode, mode);
        Ok(())
    }

    /// Set the extra spacing between lines
    ///
    /// Negative spacing is rejected, as in [`TextRenderConfig::validate`].
    pub fn set_line_spacing(&mut self, id: TextElementId, line_spacing: i32) -> TextResult<()> {
        if line_spacing < 0 {
            return Err(ConfigError::Invalid(format!("line_spacing cannot be negative, got {line_spacing}")).into());
        }
        let element = self.element_mut(id)?;
        TextElement::update(&mut element.generation, &mut element.line_spacing, line_spacing);
        Ok(())
    }

    /// Set the tint color; does not affect layout
    pub fn set_color(&mut self, id: TextElementId, color: Vec4) -> TextResult<()> {
        self.element_mut(id)?.color = color;
        Ok(())
    }

    /// Enable or disable clipping; does not affect layout
    pub fn set_scissor(&mut self, id: TextElementId, scissor: Option<Rect>) -> TextResult<()> {
        self.element_mut(id)?.scissor = scissor;
        Ok(())
    }

    /// Set the draw order; does not affect layout
    pub fn set_sorting_layer(&mut self, id: TextElementId, sorting_layer: i32) -> TextResult<()> {
        self.element_mut(id)?.sorting_layer = sorting_layer;
        Ok(())
    }

    /// Recompute the element's layout if its configuration changed
    fn refresh_layout(&mut self, id: TextElementId) -> TextResult<()> {
        let element = self.elements.get_mut(id).ok_or(TextRenderError::UnknownElement(id))?;
        if !element.needs_layout() {
            return Ok(());
        }
        let font = self.fonts.get_mut(element.font).ok_or(TextRenderError::UnknownFont(element.font))?;

        let block = self.layout_engine.layout(
            &mut font.cache,
            font.rasterizer.as_mut(),
            &element.characters,
            &element.layout_settings(),
        );
        if block.is_truncated() {
            log::debug!(
                "Text element {:?} truncated: {}/{} characters fit",
                id,
                block.consumed_count(),
                block.total_count()
            );
        }
        element.layout = Some(CachedLayout { generation: element.generation, block });
        Ok(())
    }

    /// Up-to-date layout of an element, with every glyph resident
    ///
    /// Fails with [`GlyphCacheError::AtlasFull`] if a glyph cannot be packed.
    pub fn text_block(&mut self, id: TextElementId) -> TextResult<&TextBlock> {
        self.refresh_layout(id)?;
        let element = self.elements.get(id).ok_or(TextRenderError::UnknownElement(id))?;
        let font = self.fonts.get_mut(element.font).ok_or(TextRenderError::UnknownFont(element.font))?;
        let block = element.cached_block().ok_or(TextRenderError::UnknownElement(id))?;
        font.ensure_resident(block)?;
        Ok(block)
    }

    /// Up-to-date character placements of an element
    pub fn placements(&mut self, id: TextElementId) -> TextResult<&[CharacterPlacement]> {
        Ok(self.text_block(id)?.placements())
    }

    /// Queue an element for this frame
    pub fn queue_text(&mut self, id: TextElementId, world: Mat4) -> TextResult<()> {
        if !self.elements.contains_key(id) {
            return Err(TextRenderError::UnknownElement(id));
        }
        self.queue.push(QueuedItem::Text { id, world });
        Ok(())
    }

    /// Queue a sprite for this frame
    pub fn add_sprite(&mut self, sprite: Sprite, world: Mat4) {
        self.queue.push(QueuedItem::Sprite { sprite, world });
    }

    /// Number of items queued for the next [`Self::update`]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Build this frame's batches and upload them
    ///
    /// Queued items are drawn in ascending sorting layer, in queue order
    /// within a layer. The queue is empty afterwards.
    pub fn update(&mut self, backend: &mut dyn GraphicsBackend) -> TextResult<FrameStats> {
        self.batcher.clear();
        let mut queue = std::mem::take(&mut self.queue);
        let elements = &self.elements;
        queue.sort_by_key(|item| match item {
            QueuedItem::Text { id, .. } => elements.get(*id).map_or(0, TextElement::sorting_layer),
            QueuedItem::Sprite { sprite, .. } => sprite.sorting_layer,
        });

        let mut stats = FrameStats::default();
        for item in &queue {
            match item {
                QueuedItem::Text { id, world } => self.batch_text(*id, *world, &mut stats)?,
                QueuedItem::Sprite { sprite, world } => {
                    if sprite.color.w <= 0.0 {
                        stats.skipped_invisible += 1;
                        continue;
                    }
                    self.batcher.submit(&sprite.quad(*world), sprite.batch_key());
                    stats.sprites += 1;
                }
            }
        }

        for slot in self.fonts.values_mut() {
            if slot.cache.is_dirty() {
                let (width, height) = slot.cache.atlas_dimensions();
                backend.upload_texture(slot.texture, width, height, &slot.cache.rgba_pixels())?;
                slot.cache.mark_uploaded();
                stats.atlas_uploads += 1;
            }
        }

        self.batcher.upload(backend)?;
        let batch_stats = self.batcher.stats();
        stats.quads = batch_stats.quad_count;
        stats.batches = batch_stats.batch_count;

        queue.clear();
        self.queue = queue;
        self.last_stats = stats;
        log::debug!("Frame update: {:?}", stats);
        Ok(stats)
    }

    fn batch_text(&mut self, id: TextElementId, world: Mat4, stats: &mut FrameStats) -> TextResult<()> {
        let Some(element) = self.elements.get(id) else {
            log::warn!("Queued text element {:?} no longer exists", id);
            return Ok(());
        };
        if element.color.w <= 0.0 {
            stats.skipped_invisible += 1;
            return Ok(());
        }

        self.refresh_layout(id)?;
        let element = self.elements.get(id).ok_or(TextRenderError::UnknownElement(id))?;
        let font = self.fonts.get_mut(element.font).ok_or(TextRenderError::UnknownFont(element.font))?;
        let Some(block) = element.cached_block() else {
            return Ok(());
        };

        let key = BatchKey {
            texture: font.texture,
            filter: self.config.text_filter,
            wrap: self.config.text_wrap,
            blend: BlendMode::Alpha,
            scissor: element.scissor,
        };
        let texture_size = font.cache.atlas_dimensions();

        for placement in block.placements() {
            let record = match font.cache.get_glyph(font.rasterizer.as_mut(), placement.character, placement.size) {
                Ok(record) => record,
                Err(GlyphCacheError::AtlasFull { .. } | GlyphCacheError::GlyphNotFound { .. }) => {
                    stats.missing_glyphs += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if record.atlas_rect.is_empty() {
                continue;
            }

            let quad = QuadGeometry::new(placement.rect, record.atlas_rect, texture_size)
                .with_color(element.color)
                .with_world(world);
            self.batcher.submit(&quad, key);
        }
        stats.text_elements += 1;
        Ok(())
    }

    /// Replay this frame's batches once per camera
    ///
    /// Returns the total number of draw calls, `cameras.len()` times the
    /// batch count.
    pub fn draw(&self, backend: &mut dyn GraphicsBackend, cameras: &[Camera]) -> RenderResult<usize> {
        let mut draw_calls = 0;
        for camera in cameras {
            backend.set_view_projection(&camera.view_projection_matrix());
            draw_calls += self.batcher.flush(backend)?;
        }
        log::trace!("Drew {} batches for {} cameras", self.batcher.batches().len(), cameras.len());
        Ok(draw_calls)
    }

    /// The batcher holding this frame's batches
    pub const fn batcher(&self) -> &DrawBatcher {
        &self.batcher
    }

    /// Statistics of the last [`Self::update`]
    pub const fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{BackendCommand, RecordingBackend};
    use crate::render::systems::text::rasterizer::{FixedAdvanceRasterizer, GlyphMetrics, RasterizedGlyph};
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup(config: TextRenderConfig) -> (TextRenderer, RecordingBackend, FontId) {
        let mut backend = RecordingBackend::new();
        let mut renderer = TextRenderer::new(config).unwrap();
        let font = renderer
            .add_font(&mut backend, Box::new(FixedAdvanceRasterizer::new(0.5)))
            .unwrap();
        (renderer, backend, font)
    }

    fn small_config() -> TextRenderConfig {
        TextRenderConfig::default().with_atlas_size(128, 128).with_glyph_padding(0)
    }

    #[test]
    fn test_layout_is_cached_until_config_changes() {
        let (mut renderer, _backend, font) = setup(small_config());
        let id = renderer.create_text(font, "hello", Rect::new(0, 0, 200, 40)).unwrap();
        assert!(renderer.element(id).unwrap().needs_layout());

        let first = renderer.placements(id).unwrap().to_vec();
        assert_eq!(first.len(), 5);
        assert!(!renderer.element(id).unwrap().needs_layout());

        renderer.set_color(id, Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
        assert!(!renderer.element(id).unwrap().needs_layout());

        renderer.set_rect(id, Rect::new(0, 0, 200, 40)).unwrap();
        assert!(!renderer.element(id).unwrap().needs_layout(), "unchanged value keeps the layout");

        renderer.set_text(id, "hi").unwrap();
        assert!(renderer.element(id).unwrap().needs_layout());
        assert_eq!(renderer.placements(id).unwrap().len(), 2);

        // CharacterWrap is already set
        renderer.set_line_break_mode(id, LineBreakMode::CharacterWrap).unwrap();
        assert!(!renderer.element(id).unwrap().needs_layout());

        let generation = renderer.element(id).unwrap().generation();
        renderer.set_font_size(id, 20).unwrap();
        assert_eq!(renderer.element(id).unwrap().generation(), generation + 1);
        assert!(renderer.element(id).unwrap().needs_layout());
        assert_eq!(renderer.placements(id).unwrap()[1].rect.x, 10);
    }

    #[test]
    fn test_set_font_relays_out_with_new_metrics() {
        let (mut renderer, mut backend, narrow) = setup(small_config());
        let wide = renderer
            .add_font(&mut backend, Box::new(FixedAdvanceRasterizer::new(1.0)))
            .unwrap();
        let id = renderer.create_text(narrow, "ab", Rect::new(0, 0, 200, 40)).unwrap();
        assert_eq!(renderer.placements(id).unwrap()[1].rect.x, 8);

        let generation = renderer.element(id).unwrap().generation();
        renderer.set_font(id, wide).unwrap();
        assert_eq!(renderer.element(id).unwrap().generation(), generation + 1);
        assert!(renderer.element(id).unwrap().needs_layout());
        assert_eq!(renderer.placements(id).unwrap()[1].rect.x, 16);
        assert!(renderer.font_cache(wide).unwrap().record('a', 16).is_some());

        renderer.set_font(id, wide).unwrap();
        assert!(!renderer.element(id).unwrap().needs_layout());
    }

    #[test]
    fn test_negative_line_spacing_is_rejected() {
        let (mut renderer, _backend, font) = setup(small_config());
        // 16px glyphs are 8px wide: one line of 4 fits
        let id = renderer.create_text(font, "abcdefghijkl", Rect::new(0, 0, 32, 16)).unwrap();

        let result = renderer.set_line_spacing(id, -16);
        assert!(matches!(result, Err(TextRenderError::Config(ConfigError::Invalid(_)))));
        assert_eq!(renderer.element(id).unwrap().line_spacing(), 0);

        let block = renderer.text_block(id).unwrap();
        assert_eq!(block.lines().len(), 1);
        assert_eq!(block.placed_count(), 4);
        assert!(block.is_truncated());
    }

    /// Fixed-advance rasterizer that counts bitmap requests
    struct CountingRasterizer {
        inner: FixedAdvanceRasterizer,
        rasterized: Rc<Cell<usize>>,
    }

    impl GlyphRasterizer for CountingRasterizer {
        fn metrics(&mut self, character: char, size: u32) -> Option<GlyphMetrics> {
            self.inner.metrics(character, size)
        }

        fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph> {
            self.rasterized.set(self.rasterized.get() + 1);
            self.inner.rasterize(character, size)
        }
    }

    #[test]
    fn test_exhausted_glyph_is_not_rasterized_every_frame() {
        let config = TextRenderConfig::default().with_atlas_size(16, 16).with_glyph_padding(0);
        let mut backend = RecordingBackend::new();
        let mut renderer = TextRenderer::new(config).unwrap();
        let rasterized = Rc::new(Cell::new(0));
        let rasterizer = CountingRasterizer { inner: FixedAdvanceRasterizer::new(0.5), rasterized: Rc::clone(&rasterized) };
        let font = renderer.add_font(&mut backend, Box::new(rasterizer)).unwrap();
        let id = renderer.create_text(font, "abc", Rect::new(0, 0, 200, 40)).unwrap();

        for _ in 0..5 {
            renderer.queue_text(id, Mat4::identity()).unwrap();
            let stats = renderer.update(&mut backend).unwrap();
            assert_eq!(stats.missing_glyphs, 1);
            assert_eq!(stats.quads, 2);
            assert_eq!(rasterized.get(), 3);
        }
    }

    #[test]
    fn test_placements_make_glyphs_resident() {
        let (mut renderer, _backend, font) = setup(small_config());
        let id = renderer.create_text(font, "abca", Rect::new(0, 0, 200, 40)).unwrap();
        renderer.placements(id).unwrap();

        let cache = renderer.font_cache(font).unwrap();
        assert_eq!(cache.len(), 3);
        assert!(cache.record('a', 16).is_some());
    }

    #[test]
    fn test_placements_report_atlas_full() {
        // 16px glyphs are 8x16; a 16x16 atlas holds two
        let config = TextRenderConfig::default().with_atlas_size(16, 16).with_glyph_padding(0);
        let (mut renderer, _backend, font) = setup(config);
        let id = renderer.create_text(font, "abc", Rect::new(0, 0, 200, 40)).unwrap();

        let result = renderer.placements(id);
        assert!(matches!(result, Err(TextRenderError::Glyph(GlyphCacheError::AtlasFull { character: 'c', .. }))));
    }

    #[test]
    fn test_update_counts_missing_glyphs() {
        let config = TextRenderConfig::default().with_atlas_size(16, 16).with_glyph_padding(0);
        let (mut renderer, mut backend, font) = setup(config);
        let id = renderer.create_text(font, "abc", Rect::new(0, 0, 200, 40)).unwrap();
        renderer.queue_text(id, Mat4::identity()).unwrap();

        let stats = renderer.update(&mut backend).unwrap();
        assert_eq!(stats.missing_glyphs, 1);
        assert_eq!(stats.quads, 2);
    }

    #[test]
    fn test_update_builds_one_batch_per_state() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let a = renderer.create_text(font, "ab", Rect::new(0, 0, 200, 40)).unwrap();
        let b = renderer.create_text(font, "c d", Rect::new(0, 50, 200, 40)).unwrap();
        renderer.queue_text(a, Mat4::identity()).unwrap();
        renderer.queue_text(b, Mat4::identity()).unwrap();

        let stats = renderer.update(&mut backend).unwrap();
        assert_eq!(stats.text_elements, 2);
        // The space has no bitmap
        assert_eq!(stats.quads, 4);
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.atlas_uploads, 1);
        assert_eq!(backend.vertices().len(), 24);
        assert_eq!(renderer.queued_count(), 0);
    }

    #[test]
    fn test_scissor_splits_batches() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let a = renderer.create_text(font, "ab", Rect::new(0, 0, 200, 40)).unwrap();
        let b = renderer.create_text(font, "cd", Rect::new(0, 50, 200, 40)).unwrap();
        renderer.set_scissor(b, Some(Rect::new(0, 50, 100, 20))).unwrap();
        renderer.queue_text(a, Mat4::identity()).unwrap();
        renderer.queue_text(b, Mat4::identity()).unwrap();

        let stats = renderer.update(&mut backend).unwrap();
        assert_eq!(stats.batches, 2);
        assert_eq!(renderer.batcher().batches()[1].key.scissor, Some(Rect::new(0, 50, 100, 20)));
    }

    #[test]
    fn test_invisible_items_are_skipped() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let id = renderer.create_text(font, "ab", Rect::new(0, 0, 200, 40)).unwrap();
        renderer.set_color(id, Vec4::new(1.0, 1.0, 1.0, 0.0)).unwrap();
        renderer.queue_text(id, Mat4::identity()).unwrap();
        let texture = backend.create_texture(4, 4).unwrap();
        renderer.add_sprite(Sprite::new(texture, (4, 4)).with_color(Vec4::zeros()), Mat4::identity());

        let stats = renderer.update(&mut backend).unwrap();
        assert_eq!(stats.skipped_invisible, 2);
        assert_eq!(stats.quads, 0);
        assert!(renderer.element(id).unwrap().needs_layout());
    }

    #[test]
    fn test_sorting_layers_order_submission() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let id = renderer.create_text(font, "a", Rect::new(0, 0, 200, 40)).unwrap();
        renderer.set_sorting_layer(id, 5).unwrap();
        let texture = backend.create_texture(4, 4).unwrap();

        renderer.queue_text(id, Mat4::identity()).unwrap();
        renderer.add_sprite(Sprite::new(texture, (4, 4)), Mat4::identity());
        renderer.update(&mut backend).unwrap();

        let batches = renderer.batcher().batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].key.texture, texture);
        assert_eq!(Some(batches[1].key.texture), renderer.font_texture(font));
    }

    #[test]
    fn test_draw_replays_batches_per_camera() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let id = renderer.create_text(font, "ab", Rect::new(0, 0, 200, 40)).unwrap();
        let texture = backend.create_texture(4, 4).unwrap();
        renderer.queue_text(id, Mat4::identity()).unwrap();
        renderer.add_sprite(Sprite::new(texture, (4, 4)), Mat4::identity());
        renderer.update(&mut backend).unwrap();

        backend.clear_commands();
        let cameras = [Camera::screen(800.0, 600.0), Camera::screen(400.0, 300.0)];
        let draws = renderer.draw(&mut backend, &cameras).unwrap();
        assert_eq!(draws, 4);
        assert_eq!(backend.draw_call_count(), 4);

        let view_projections = backend
            .commands()
            .iter()
            .filter(|command| matches!(command, BackendCommand::SetViewProjection(_)))
            .count();
        assert_eq!(view_projections, 2);
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let (mut renderer, _backend, font) = setup(small_config());
        let id = renderer.create_text(font, "a", Rect::new(0, 0, 10, 10)).unwrap();
        assert!(renderer.remove_text(id));
        assert!(!renderer.remove_text(id));
        assert!(matches!(renderer.placements(id), Err(TextRenderError::UnknownElement(_))));
        assert!(matches!(renderer.queue_text(id, Mat4::identity()), Err(TextRenderError::UnknownElement(_))));
    }

    #[test]
    fn test_removed_element_in_queue_is_skipped() {
        let (mut renderer, mut backend, font) = setup(small_config());
        let id = renderer.create_text(font, "a", Rect::new(0, 0, 10, 20)).unwrap();
        renderer.queue_text(id, Mat4::identity()).unwrap();
        renderer.remove_text(id);
        let stats = renderer.update(&mut backend).unwrap();
        assert_eq!(stats.text_elements, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TextRenderConfig::default().with_atlas_size(0, 64);
        assert!(matches!(TextRenderer::new(config), Err(TextRenderError::Config(_))));
    }
}
