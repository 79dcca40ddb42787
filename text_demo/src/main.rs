//! Headless text rendering demo
//!
//! Builds a small HUD (title, score counter, clipped message log, background
//! panel sprite), runs a few frames against the recording backend and logs
//! what would have been submitted to the GPU.
//!
//! Usage: `text_demo [config.toml|config.ron] [--font font.ttf] [--atlas out.png]`

use std::path::PathBuf;

use nalgebra::Vector3;
use text_render::prelude::*;

const SCREEN_WIDTH: f32 = 800.0;
const SCREEN_HEIGHT: f32 = 600.0;
const FRAMES: u32 = 5;

struct Options {
    config: Option<PathBuf>,
    font: Option<PathBuf>,
    atlas_png: Option<PathBuf>,
}

impl Options {
    fn from_args() -> Result<Self, String> {
        let mut options = Self { config: None, font: None, atlas_png: None };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--font" => options.font = Some(args.next().ok_or("--font needs a path")?.into()),
                "--atlas" => options.atlas_png = Some(args.next().ok_or("--atlas needs a path")?.into()),
                _ if options.config.is_none() => options.config = Some(arg.into()),
                _ => return Err(format!("unexpected argument: {arg}")),
            }
        }
        Ok(options)
    }
}

struct HudDemo {
    backend: RecordingBackend,
    renderer: TextRenderer,
    font: FontId,
    cameras: Vec<Camera>,
    score: TextElementId,
    log: TextElementId,
    title: TextElementId,
    panel: Sprite,
}

impl HudDemo {
    fn new(config: TextRenderConfig, font_path: Option<&PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut backend = RecordingBackend::new();
        let mut renderer = TextRenderer::new(config)?;
        let font = renderer.add_font(&mut backend, load_rasterizer(font_path)?)?;

        let title = renderer.create_text(font, "TEXT DEMO", Rect::new(0, 20, SCREEN_WIDTH as i32, 48))?;
        renderer.set_font_size(title, 32)?;
        renderer.set_alignment(title, TextAlignment::UPPER_CENTER)?;
        renderer.set_sorting_layer(title, 1)?;

        let score = renderer.create_text(font, "Score: 0", Rect::new(600, 20, 180, 24))?;
        renderer.set_alignment(score, TextAlignment::UPPER_RIGHT)?;
        renderer.set_sorting_layer(score, 1)?;

        let log = renderer.create_text(font, "", Rect::new(20, 420, 360, 160))?;
        renderer.set_alignment(log, TextAlignment::LOWER_LEFT)?;
        renderer.set_line_spacing(log, 2)?;
        renderer.set_scissor(log, Some(Rect::new(20, 420, 360, 160)))?;
        renderer.set_color(log, Vec4::new(0.8, 0.9, 1.0, 1.0))?;
        renderer.set_sorting_layer(log, 1)?;

        let panel_texture = backend.create_texture(16, 16)?;
        backend.upload_texture(panel_texture, 16, 16, &[255; 16 * 16 * 4])?;
        let panel = Sprite::new(panel_texture, (16, 16))
            .with_bounds(Vec2::new(10.0, 410.0), Vec2::new(380.0, 180.0))
            .with_color(Vec4::new(0.0, 0.0, 0.0, 0.6));

        let mut minimap = Camera::screen(SCREEN_WIDTH, SCREEN_HEIGHT);
        minimap.set_viewport(SCREEN_WIDTH / 4.0, SCREEN_HEIGHT / 4.0);

        Ok(Self {
            backend,
            renderer,
            font,
            cameras: vec![Camera::screen(SCREEN_WIDTH, SCREEN_HEIGHT), minimap],
            score,
            log,
            title,
            panel,
        })
    }

    fn frame(&mut self, frame: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.renderer.set_text(self.score, &format!("Score: {}", frame * 250))?;
        let messages: Vec<String> = (0..=frame).map(|i| format!("[{i:02}] message received")).collect();
        self.renderer.set_text(self.log, &messages.join(" "))?;

        // Title bobs without relayout
        let bob = Mat4::new_translation(&Vector3::new(0.0, (frame as f32 * 0.8).sin() * 4.0, 0.0));
        self.renderer.queue_text(self.title, bob)?;
        self.renderer.queue_text(self.score, Mat4::identity())?;
        self.renderer.add_sprite(self.panel.clone(), Mat4::identity());
        self.renderer.queue_text(self.log, Mat4::identity())?;

        let stats = self.renderer.update(&mut self.backend)?;
        self.backend.clear_commands();
        let draws = self.renderer.draw(&mut self.backend, &self.cameras)?;

        if let Some(block) = self.renderer.element(self.log).and_then(|element| element.cached_block()) {
            if block.is_truncated() {
                log::info!(
                    "Frame {frame}: message log shows {}/{} characters",
                    block.consumed_count(),
                    block.total_count()
                );
            }
        }
        log::info!(
            "Frame {frame}: {} quads in {} batches, {} draw calls for {} cameras, {} atlas uploads, {} missing glyphs",
            stats.quads,
            stats.batches,
            draws,
            self.cameras.len(),
            stats.atlas_uploads,
            stats.missing_glyphs
        );
        Ok(())
    }

    fn run(&mut self, atlas_png: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
        for frame in 0..FRAMES {
            self.frame(frame)?;
        }

        if let Some(cache) = self.renderer.font_cache(self.font) {
            log::info!(
                "Atlas holds {} glyphs, {} of {} square pixels used",
                cache.len(),
                cache.packer().occupied_area(),
                u64::from(cache.atlas_dimensions().0) * u64::from(cache.atlas_dimensions().1)
            );
        }
        if let Some(path) = atlas_png {
            self.renderer.save_atlas_image(self.font, path)?;
            log::info!("Wrote atlas to {}", path.display());
        }
        Ok(())
    }
}

#[cfg(feature = "fontdue")]
fn load_rasterizer(path: Option<&PathBuf>) -> Result<Box<dyn GlyphRasterizer>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            log::info!("Loading font {}", path.display());
            Ok(Box::new(FontdueRasterizer::from_bytes(&bytes)?))
        }
        None => Ok(Box::new(FixedAdvanceRasterizer::default())),
    }
}

#[cfg(not(feature = "fontdue"))]
fn load_rasterizer(path: Option<&PathBuf>) -> Result<Box<dyn GlyphRasterizer>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        log::warn!("Ignoring font {}: built without the fontdue feature", path.display());
    }
    Ok(Box::new(FixedAdvanceRasterizer::default()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = Options::from_args()?;
    let config = match &options.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            TextRenderConfig::load_from_file(path)?
        }
        None => TextRenderConfig::default(),
    };

    log::info!("Starting text demo");
    let mut demo = HudDemo::new(config, options.font.as_ref())?;
    demo.run(options.atlas_png.as_ref())?;
    log::info!("Text demo finished");
    Ok(())
}
