//! Configuration system
//!
//! File-backed configuration for the text rendering pipeline. Files are
//! selected by extension: `.toml` through `toml`, `.ron` through `ron`.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::render::api::{FilterMode, WrapMode};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Text Render Configuration
///
/// Sizes and defaults for glyph atlases, text elements and the shared
/// vertex buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRenderConfig {
    /// Width of every glyph atlas surface in pixels
    pub atlas_width: u32,
    /// Height of every glyph atlas surface in pixels
    pub atlas_height: u32,
    /// Empty pixels reserved around each glyph bitmap
    pub glyph_padding: u32,
    /// Font size assigned to newly created text elements
    pub default_font_size: u32,
    /// Extra pixels between consecutive lines for new text elements
    pub default_line_spacing: i32,
    /// Sampler filter used for glyph quads
    pub text_filter: FilterMode,
    /// Sampler wrap mode used for glyph quads
    pub text_wrap: WrapMode,
    /// Number of vertices to reserve in the shared vertex buffer
    pub initial_vertex_capacity: usize,
}

impl Default for TextRenderConfig {
    fn default() -> Self {
        Self {
            atlas_width: 1024,
            atlas_height: 1024,
            glyph_padding: 1,
            default_font_size: 16,
            default_line_spacing: 0,
            text_filter: FilterMode::Bilinear,
            text_wrap: WrapMode::Clamp,
            initial_vertex_capacity: 6 * 1024,
        }
    }
}

impl Config for TextRenderConfig {}

impl TextRenderConfig {
    /// Largest atlas edge accepted by `validate`
    pub const MAX_ATLAS_EDGE: u32 = 16384;

    /// Set atlas dimensions
    pub fn with_atlas_size(mut self, width: u32, height: u32) -> Self {
        self.atlas_width = width;
        self.atlas_height = height;
        self
    }

    /// Set glyph padding
    pub fn with_glyph_padding(mut self, padding: u32) -> Self {
        self.glyph_padding = padding;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, edge) in [("atlas_width", self.atlas_width), ("atlas_height", self.atlas_height)] {
            if edge == 0 || edge > Self::MAX_ATLAS_EDGE {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in 1..={}, got {edge}",
                    Self::MAX_ATLAS_EDGE
                )));
            }
        }

        if self.glyph_padding * 2 >= self.atlas_width.min(self.atlas_height) {
            return Err(ConfigError::Invalid(format!(
                "glyph_padding {} leaves no room in a {}x{} atlas",
                self.glyph_padding, self.atlas_width, self.atlas_height
            )));
        }

        if self.default_font_size == 0 {
            return Err(ConfigError::Invalid("default_font_size must be positive".to_string()));
        }

        if self.default_line_spacing < 0 {
            return Err(ConfigError::Invalid("default_line_spacing cannot be negative".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TextRenderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_atlas() {
        let config = TextRenderConfig::default().with_atlas_size(0, 512);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_oversized_padding() {
        let config = TextRenderConfig::default().with_atlas_size(8, 8).with_glyph_padding(4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("text_render_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("text.toml");

        let config = TextRenderConfig::default().with_atlas_size(512, 256);
        config.save_to_file(&path).unwrap();
        let loaded = TextRenderConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let parsed: TextRenderConfig = ron::from_str("(atlas_width: 2048)").unwrap();
        assert_eq!(parsed.atlas_width, 2048);
        assert_eq!(parsed.atlas_height, 1024);
    }

    #[test]
    fn test_unknown_extension() {
        let result = TextRenderConfig::load_from_file("does_not_matter.ini");
        // The read fails first for a missing file; both are errors
        assert!(result.is_err());
    }
}
