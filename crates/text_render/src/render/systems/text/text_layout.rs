//! Text layout engine
//!
//! Lays a codepoint sequence out into lines inside a bounding rectangle and
//! produces one destination rectangle per placed character.
//!
//! # Layout Coordinate System
//!
//! - Screen space, origin at the top-left, +Y down
//! - Lines are stacked downward from the top of the bounding rect, then
//!   realigned as a whole if the alignment is not upper-left
//! - Glyphs on a line share a baseline; the line's top is the tallest
//!   glyph's top
//!
//! Wrapping is per character: a line ends before the first glyph whose right
//! edge would cross the bounding width. A line that would make the content
//! taller than the bounding rect is dropped whole and layout stops.

use super::font_atlas::FontGlyphCache;
use super::rasterizer::GlyphRasterizer;
use crate::foundation::math::Rect;

/// How text is broken into lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineBreakMode {
    /// Break before any character that would overflow the line
    #[default]
    CharacterWrap,
}

/// Horizontal component of a text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    /// Lines start at the left edge
    Left,
    /// Lines are centered in the bounding width
    Center,
    /// Lines end at the right edge
    Right,
}

/// Vertical component of a text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    /// Content hangs from the top edge
    Upper,
    /// Content is centered in the bounding height
    Middle,
    /// Content rests on the bottom edge
    Lower,
}

/// Placement of a text block inside its bounding rect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextAlignment {
    /// Horizontal component, applied per line
    pub horizontal: HorizontalAlign,
    /// Vertical component, applied once per block
    pub vertical: VerticalAlign,
}

impl TextAlignment {
    /// Upper-left (layout default)
    pub const UPPER_LEFT: Self = Self::new(HorizontalAlign::Left, VerticalAlign::Upper);
    /// Upper-center
    pub const UPPER_CENTER: Self = Self::new(HorizontalAlign::Center, VerticalAlign::Upper);
    /// Upper-right
    pub const UPPER_RIGHT: Self = Self::new(HorizontalAlign::Right, VerticalAlign::Upper);
    /// Middle-left
    pub const MIDDLE_LEFT: Self = Self::new(HorizontalAlign::Left, VerticalAlign::Middle);
    /// Middle-center
    pub const MIDDLE_CENTER: Self = Self::new(HorizontalAlign::Center, VerticalAlign::Middle);
    /// Middle-right
    pub const MIDDLE_RIGHT: Self = Self::new(HorizontalAlign::Right, VerticalAlign::Middle);
    /// Lower-left
    pub const LOWER_LEFT: Self = Self::new(HorizontalAlign::Left, VerticalAlign::Lower);
    /// Lower-center
    pub const LOWER_CENTER: Self = Self::new(HorizontalAlign::Center, VerticalAlign::Lower);
    /// Lower-right
    pub const LOWER_RIGHT: Self = Self::new(HorizontalAlign::Right, VerticalAlign::Lower);

    /// Compose an alignment
    pub const fn new(horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        Self { horizontal, vertical }
    }
}

impl Default for TextAlignment {
    fn default() -> Self {
        Self::UPPER_LEFT
    }
}

/// Destination of one placed character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterPlacement {
    /// Character code
    pub character: char,
    /// Pixel size the glyph was measured at
    pub size: u32,
    /// Destination rectangle in screen space
    pub rect: Rect,
}

/// One laid-out line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// First placement index (inclusive)
    pub start: usize,
    /// Last placement index (exclusive)
    pub end: usize,
    /// Bounding box of the line's glyphs
    pub content_rect: Rect,
}

impl Line {
    /// Number of placed characters on the line
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the line holds no placements
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of one layout pass
///
/// Built wholesale by [`TextLayoutEngine::layout`] and never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    rect: Rect,
    content_rect: Rect,
    lines: Vec<Line>,
    placements: Vec<CharacterPlacement>,
    consumed: usize,
    total: usize,
}

impl TextBlock {
    /// Bounding rect the block was laid out in
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Bounding box of all laid-out lines
    pub const fn content_rect(&self) -> Rect {
        self.content_rect
    }

    /// Lines, top to bottom
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Placed characters in input order
    pub fn placements(&self) -> &[CharacterPlacement] {
        &self.placements
    }

    /// Placements of one line
    pub fn line_placements(&self, line: &Line) -> &[CharacterPlacement] {
        &self.placements[line.start..line.end]
    }

    /// Number of characters that received a destination rect
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// Number of input characters consumed, including glyphs the font lacks
    pub const fn consumed_count(&self) -> usize {
        self.consumed
    }

    /// Number of input characters
    pub const fn total_count(&self) -> usize {
        self.total
    }

    /// Whether some input did not fit in the bounding rect
    pub const fn is_truncated(&self) -> bool {
        self.consumed < self.total
    }
}

/// Parameters of one layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSettings {
    /// Glyph pixel size
    pub font_size: u32,
    /// Bounding rect
    pub rect: Rect,
    /// Line breaking policy
    pub line_break_mode: LineBreakMode,
    /// Block alignment
    pub alignment: TextAlignment,
    /// Extra pixels between consecutive lines; negative values count as 0
    pub line_spacing: i32,
}

impl LayoutSettings {
    /// Upper-left, character-wrapped settings without line spacing
    pub fn new(font_size: u32, rect: Rect) -> Self {
        Self {
            font_size,
            rect,
            line_break_mode: LineBreakMode::CharacterWrap,
            alignment: TextAlignment::UPPER_LEFT,
            line_spacing: 0,
        }
    }

    /// Set the alignment
    pub const fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the line spacing
    pub const fn with_line_spacing(mut self, line_spacing: i32) -> Self {
        self.line_spacing = line_spacing;
        self
    }
}

/// Stateless line layout engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLayoutEngine;

/// A line measured but not yet committed to the block
struct PendingLine {
    line: Line,
    consumed: usize,
}

impl TextLayoutEngine {
    /// Create a layout engine
    pub const fn new() -> Self {
        Self
    }

    /// Lay `characters` out inside `settings.rect`
    ///
    /// Only glyph metrics are read from the cache; no glyph is packed into
    /// the atlas. With unchanged cache contents the output is identical for
    /// identical inputs.
    pub fn layout(
        &self,
        glyphs: &mut FontGlyphCache,
        rasterizer: &mut dyn GlyphRasterizer,
        characters: &[char],
        settings: &LayoutSettings,
    ) -> TextBlock {
        let rect = settings.rect;
        let line_spacing = settings.line_spacing.max(0);
        let mut block = TextBlock {
            rect,
            content_rect: Rect::new(rect.x, rect.y, 0, 0),
            total: characters.len(),
            ..TextBlock::default()
        };

        let mut content_height = 0;
        let mut content_width = 0;
        while block.consumed < characters.len() {
            let spacing = if block.lines.is_empty() { 0 } else { line_spacing };
            let line_top = rect.y + content_height + spacing;

            let remaining = &characters[block.consumed..];
            let Some(pending) = self.measure_line(glyphs, rasterizer, remaining, line_top, settings, &mut block.placements) else {
                break;
            };

            if pending.line.is_empty() {
                // Only glyphs the font lacks; nothing to stack
                block.consumed += pending.consumed;
                continue;
            }

            let height = content_height + spacing + pending.line.content_rect.height;
            if height > rect.height {
                block.placements.truncate(pending.line.start);
                break;
            }

            content_height = height;
            content_width = content_width.max(pending.line.content_rect.width);
            block.consumed += pending.consumed;
            block.lines.push(pending.line);
        }

        block.content_rect = Rect::new(
            block.lines.first().map_or(rect.x, |line| line.content_rect.x),
            rect.y,
            content_width,
            content_height,
        );

        if settings.alignment != TextAlignment::UPPER_LEFT {
            Self::align(&mut block, settings.alignment, line_spacing);
        }

        log::debug!(
            "Laid out {}/{} characters in {} lines, content {:?}",
            block.placed_count(),
            block.total,
            block.lines.len(),
            block.content_rect
        );
        block
    }

    /// Greedily fill one line; `None` when not even one character fits
    fn measure_line(
        &self,
        glyphs: &mut FontGlyphCache,
        rasterizer: &mut dyn GlyphRasterizer,
        characters: &[char],
        line_top: i32,
        settings: &LayoutSettings,
        placements: &mut Vec<CharacterPlacement>,
    ) -> Option<PendingLine> {
        let rect = settings.rect;
        let start = placements.len();
        let mut bearings = Vec::new();
        let mut x_advance = 0;
        let mut ascent = i32::MIN;
        let mut descent = i32::MAX;
        let mut consumed = 0;

        for &character in characters {
            let Some(metrics) = glyphs.metrics(rasterizer, character, settings.font_size) else {
                log::trace!("No glyph for {:?} at {}px, skipping", character, settings.font_size);
                consumed += 1;
                continue;
            };

            let (width, height) = (metrics.width as i32, metrics.height as i32);
            match settings.line_break_mode {
                LineBreakMode::CharacterWrap => {
                    if x_advance + width > rect.width {
                        break;
                    }
                }
            }

            placements.push(CharacterPlacement {
                character,
                size: settings.font_size,
                rect: Rect::new(rect.x + x_advance + metrics.bearing.x, 0, width, height),
            });
            bearings.push(metrics.bearing.y);
            ascent = ascent.max(metrics.bearing.y);
            descent = descent.min(metrics.bearing.y - height);
            x_advance += metrics.advance.x;
            consumed += 1;
        }

        if consumed == 0 {
            return None;
        }

        let end = placements.len();
        if start == end {
            return Some(PendingLine {
                line: Line { start, end, content_rect: Rect::new(rect.x, line_top, 0, 0) },
                consumed,
            });
        }

        for (placement, bearing) in placements[start..end].iter_mut().zip(bearings) {
            placement.rect.y = line_top + (ascent - bearing);
        }

        let first = placements[start].rect;
        let last = placements[end - 1].rect;
        Some(PendingLine {
            line: Line {
                start,
                end,
                content_rect: Rect::new(first.x, line_top, last.right() - first.x, ascent - descent),
            },
            consumed,
        })
    }

    /// Move every line to its aligned origin
    ///
    /// The horizontal offset depends only on the line's width; the vertical
    /// origin is computed once for the block.
    fn align(block: &mut TextBlock, alignment: TextAlignment, line_spacing: i32) {
        let rect = block.rect;
        let content_height = block.content_rect.height;

        let line_x = |line: &Line| match alignment.horizontal {
            HorizontalAlign::Left => line.content_rect.x,
            HorizontalAlign::Center => rect.x + (rect.width - line.content_rect.width) / 2,
            HorizontalAlign::Right => rect.right() - line.content_rect.width,
        };

        let mut targets = Vec::with_capacity(block.lines.len());
        match alignment.vertical {
            VerticalAlign::Upper | VerticalAlign::Middle => {
                let mut y = match alignment.vertical {
                    VerticalAlign::Middle => rect.y + (rect.height - content_height) / 2,
                    _ => rect.y,
                };
                for line in &block.lines {
                    targets.push((line_x(line), y));
                    y += line.content_rect.height + line_spacing;
                }
            }
            VerticalAlign::Lower => {
                let mut y = rect.bottom();
                for line in block.lines.iter().rev() {
                    y -= line.content_rect.height;
                    targets.push((line_x(line), y));
                    y -= line_spacing;
                }
                targets.reverse();
            }
        }

        let mut content_rect = Rect::default();
        for (line, (x, y)) in block.lines.iter_mut().zip(targets) {
            let dx = x - line.content_rect.x;
            let dy = y - line.content_rect.y;
            for placement in &mut block.placements[line.start..line.end] {
                placement.rect = placement.rect.translated(dx, dy);
            }
            line.content_rect = line.content_rect.translated(dx, dy);
            content_rect = content_rect.union(&line.content_rect);
        }

        if let Some(first) = block.lines.first() {
            // Zero-sized lines are skipped by the union
            if content_rect.is_empty() {
                content_rect = Rect::new(first.content_rect.x, 0, 0, 0);
            }
            content_rect.y = first.content_rect.y;
            content_rect.height = content_height;
            block.content_rect = content_rect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::IVec2;
    use crate::render::systems::text::rasterizer::{FixedAdvanceRasterizer, GlyphMetrics, RasterizedGlyph};

    /// 10px glyphs: 5px wide, 10px tall, ascent 7
    fn setup() -> (FontGlyphCache, FixedAdvanceRasterizer) {
        (FontGlyphCache::new(256, 256, 0), FixedAdvanceRasterizer::new(0.5))
    }

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn test_single_line_upper_left() {
        let (mut cache, mut rasterizer) = setup();
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 100, 50));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abc"), &settings);

        assert_eq!(block.lines().len(), 1);
        let xs: Vec<i32> = block.placements().iter().map(|p| p.rect.x).collect();
        assert_eq!(xs, vec![0, 5, 10]);
        assert!(block.placements().iter().all(|p| p.rect.y == 0));
        assert_eq!(block.content_rect(), Rect::new(0, 0, 15, 10));
        assert!(!block.is_truncated());
    }

    #[test]
    fn test_character_wrap_boundary() {
        let mut cache = FontGlyphCache::new(256, 256, 0);
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5).with_width('A', 10).with_width('B', 10);
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 15, 100));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("AB"), &settings);

        assert_eq!(block.lines().len(), 2);
        assert_eq!(block.line_placements(&block.lines()[0])[0].character, 'A');
        assert_eq!(block.lines()[0].len(), 1);
        assert_eq!(block.line_placements(&block.lines()[1])[0].character, 'B');
        assert_eq!(block.placements()[1].rect.y, 10);
    }

    #[test]
    fn test_glyph_wider_than_box_places_nothing() {
        let mut cache = FontGlyphCache::new(256, 256, 0);
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5).with_width('W', 40);
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 30, 100));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("Wab"), &settings);

        assert_eq!(block.placed_count(), 0);
        assert!(block.lines().is_empty());
        assert_eq!(block.consumed_count(), 0);
        assert!(block.is_truncated());
    }

    #[test]
    fn test_overflowing_line_is_dropped_whole() {
        let (mut cache, mut rasterizer) = setup();
        // 4 glyphs per line, exactly one line tall, input spans 3 lines
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 20, 10));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abcdefghijkl"), &settings);

        assert_eq!(block.lines().len(), 1);
        assert_eq!(block.placed_count(), 4);
        assert_eq!(block.consumed_count(), 4);
        assert_eq!(block.total_count(), 12);
        assert!(block.is_truncated());
        assert_eq!(block.content_rect().height, 10);
    }

    #[test]
    fn test_layout_is_repeatable() {
        let (mut cache, mut rasterizer) = setup();
        let settings = LayoutSettings::new(10, Rect::new(3, 7, 23, 40))
            .with_alignment(TextAlignment::LOWER_RIGHT)
            .with_line_spacing(2);
        let engine = TextLayoutEngine::new();
        let text = chars("the quick brown fox");
        let first = engine.layout(&mut cache, &mut rasterizer, &text, &settings);
        let second = engine.layout(&mut cache, &mut rasterizer, &text, &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn test_middle_center_centers_content() {
        let (mut cache, mut rasterizer) = setup();
        let bounds = Rect::new(10, 20, 101, 77);
        let settings = LayoutSettings::new(10, bounds).with_alignment(TextAlignment::MIDDLE_CENTER);
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("hello world, centered"), &settings);

        let content = block.content_rect().center();
        let expected = bounds.center();
        assert!((content.x - expected.x).abs() <= 1.0, "{content:?} vs {expected:?}");
        assert!((content.y - expected.y).abs() <= 1.0, "{content:?} vs {expected:?}");
    }

    #[test]
    fn test_each_alignment_stays_inside_bounds() {
        let (mut cache, mut rasterizer) = setup();
        let bounds = Rect::new(0, 0, 60, 60);
        let horizontals = [HorizontalAlign::Left, HorizontalAlign::Center, HorizontalAlign::Right];
        let verticals = [VerticalAlign::Upper, VerticalAlign::Middle, VerticalAlign::Lower];
        for horizontal in horizontals {
            for vertical in verticals {
                let settings = LayoutSettings::new(10, bounds)
                    .with_alignment(TextAlignment::new(horizontal, vertical));
                let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abcdefghijklmnopq"), &settings);
                assert_eq!(block.placed_count(), 17);
                for placement in block.placements() {
                    assert!(bounds.contains_rect(&placement.rect), "{horizontal:?}/{vertical:?}: {placement:?}");
                }
            }
        }
    }

    #[test]
    fn test_lower_right_anchors_last_line() {
        let (mut cache, mut rasterizer) = setup();
        let bounds = Rect::new(0, 0, 20, 50);
        let settings = LayoutSettings::new(10, bounds).with_alignment(TextAlignment::LOWER_RIGHT);
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abcdef"), &settings);

        let lines = block.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content_rect, Rect::new(10, 40, 10, 10));
        assert_eq!(lines[0].content_rect, Rect::new(0, 30, 20, 10));
        assert_eq!(block.content_rect(), Rect::new(0, 30, 20, 20));
    }

    #[test]
    fn test_line_spacing_separates_lines() {
        let (mut cache, mut rasterizer) = setup();
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 10, 100)).with_line_spacing(4);
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abcd"), &settings);

        assert_eq!(block.lines().len(), 2);
        assert_eq!(block.lines()[1].content_rect.y, 14);
        assert_eq!(block.content_rect().height, 24);
    }

    #[test]
    fn test_negative_line_spacing_counts_as_zero() {
        let (mut cache, mut rasterizer) = setup();
        // One 10px line of 4 glyphs fits; the input spans 3 lines
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 20, 10)).with_line_spacing(-10);
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("abcdefghijkl"), &settings);

        assert_eq!(block.lines().len(), 1);
        assert_eq!(block.placed_count(), 4);
        assert!(block.is_truncated());
    }

    #[test]
    fn test_missing_glyphs_are_consumed() {
        let mut cache = FontGlyphCache::new(256, 256, 0);
        let mut rasterizer = FixedAdvanceRasterizer::new(0.5).without_glyph('#');
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 100, 20));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &chars("a#b"), &settings);

        assert_eq!(block.placed_count(), 2);
        assert_eq!(block.consumed_count(), 3);
        assert_eq!(block.placements()[1].rect.x, 5);
    }

    /// 'x' sits on the baseline, 'g' descends 3px, 'T' is 4px taller than 'x'
    struct MixedBearings;

    impl GlyphRasterizer for MixedBearings {
        fn metrics(&mut self, character: char, _size: u32) -> Option<GlyphMetrics> {
            let (height, bearing_y) = match character {
                'x' => (5, 5),
                'g' => (8, 5),
                'T' => (9, 9),
                _ => return None,
            };
            Some(GlyphMetrics {
                width: 5,
                height,
                bearing: IVec2::new(0, bearing_y),
                advance: IVec2::new(6, 0),
            })
        }

        fn rasterize(&mut self, character: char, size: u32) -> Option<RasterizedGlyph> {
            let metrics = self.metrics(character, size)?;
            Some(RasterizedGlyph { metrics, bitmap: vec![u8::MAX; (metrics.width * metrics.height) as usize] })
        }
    }

    #[test]
    fn test_mixed_bearings_share_baseline() {
        let mut cache = FontGlyphCache::new(256, 256, 0);
        let settings = LayoutSettings::new(10, Rect::new(0, 0, 100, 100));
        let block = TextLayoutEngine::new().layout(&mut cache, &mut MixedBearings, &chars("xgT"), &settings);

        // Ascent 9 over descent 3
        assert_eq!(block.lines()[0].content_rect.height, 12);
        let ys: Vec<i32> = block.placements().iter().map(|p| p.rect.y).collect();
        assert_eq!(ys, vec![4, 4, 0]);
        let xs: Vec<i32> = block.placements().iter().map(|p| p.rect.x).collect();
        assert_eq!(xs, vec![0, 6, 12]);
    }

    #[test]
    fn test_empty_input() {
        let (mut cache, mut rasterizer) = setup();
        let settings = LayoutSettings::new(10, Rect::new(5, 5, 50, 50))
            .with_alignment(TextAlignment::MIDDLE_CENTER);
        let block = TextLayoutEngine::new().layout(&mut cache, &mut rasterizer, &[], &settings);
        assert!(block.lines().is_empty());
        assert_eq!(block.content_rect(), Rect::new(5, 5, 0, 0));
        assert!(!block.is_truncated());
    }
}
