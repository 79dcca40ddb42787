//! In-memory graphics backend
//!
//! Records every call as a [`BackendCommand`] instead of talking to a GPU.
//! Used by headless tools and tests to inspect exactly what the pipeline
//! submits.

use std::collections::HashMap;

use super::render_backend::{
    BlendMode, FilterMode, GraphicsBackend, PrimitiveType, TextureHandle, WrapMode,
};
use crate::foundation::math::{Mat4, Rect};
use crate::render::primitives::Vertex;
use crate::render::{RenderError, RenderResult};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// `create_texture`
    CreateTexture {
        /// Handle returned to the caller
        texture: TextureHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// `upload_texture`
    UploadTexture {
        /// Target texture
        texture: TextureHandle,
        /// Number of bytes uploaded
        bytes: usize,
    },
    /// `bind_texture`
    BindTexture {
        /// Bound texture
        texture: TextureHandle,
        /// Sampler filter
        filter: FilterMode,
        /// Sampler wrap
        wrap: WrapMode,
    },
    /// `set_blend_mode`
    SetBlendMode(BlendMode),
    /// `set_scissor`
    SetScissor(Option<Rect>),
    /// `upload_vertices`
    UploadVertices {
        /// Number of vertices uploaded
        count: usize,
    },
    /// `set_view_projection`
    SetViewProjection(Mat4),
    /// `draw_range`
    DrawRange {
        /// Topology
        primitive: PrimitiveType,
        /// First vertex
        start: u32,
        /// Vertex count
        count: u32,
    },
}

/// Graphics backend that records calls
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<BackendCommand>,
    textures: HashMap<TextureHandle, (u32, u32)>,
    vertices: Vec<Vertex>,
    next_texture: u32,
}

impl RecordingBackend {
    /// Create an empty recording backend
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded commands in call order
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Last uploaded vertex buffer
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of recorded draw calls
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, BackendCommand::DrawRange { .. }))
            .count()
    }

    /// Forget recorded commands, keeping textures alive
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn require_texture(&self, texture: TextureHandle) -> RenderResult<(u32, u32)> {
        self.textures.get(&texture).copied().ok_or(RenderError::UnknownTexture(texture))
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> RenderResult<TextureHandle> {
        if width == 0 || height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture size {width}x{height} is empty"
            )));
        }
        self.next_texture += 1;
        let texture = TextureHandle(self.next_texture);
        self.textures.insert(texture, (width, height));
        self.commands.push(BackendCommand::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> RenderResult<()> {
        let size = self.require_texture(texture)?;
        if size != (width, height) || rgba.len() != (width * height * 4) as usize {
            return Err(RenderError::RenderingFailed(format!(
                "upload of {} bytes as {width}x{height} does not match texture {texture:?} ({}x{})",
                rgba.len(),
                size.0,
                size.1
            )));
        }
        self.commands.push(BackendCommand::UploadTexture { texture, bytes: rgba.len() });
        Ok(())
    }

    fn bind_texture(
        &mut self,
        texture: TextureHandle,
        filter: FilterMode,
        wrap: WrapMode,
    ) -> RenderResult<()> {
        self.require_texture(texture)?;
        self.commands.push(BackendCommand::BindTexture { texture, filter, wrap });
        Ok(())
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.commands.push(BackendCommand::SetBlendMode(blend));
    }

    fn set_scissor(&mut self, scissor: Option<Rect>) {
        self.commands.push(BackendCommand::SetScissor(scissor));
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) -> RenderResult<()> {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        self.commands.push(BackendCommand::UploadVertices { count: vertices.len() });
        Ok(())
    }

    fn set_view_projection(&mut self, view_projection: &Mat4) {
        self.commands.push(BackendCommand::SetViewProjection(*view_projection));
    }

    fn draw_range(
        &mut self,
        primitive: PrimitiveType,
        start_vertex: u32,
        vertex_count: u32,
    ) -> RenderResult<()> {
        if (start_vertex + vertex_count) as usize > self.vertices.len() {
            return Err(RenderError::RenderingFailed(format!(
                "draw range {start_vertex}+{vertex_count} exceeds {} uploaded vertices",
                self.vertices.len()
            )));
        }
        self.commands.push(BackendCommand::DrawRange {
            primitive,
            start: start_vertex,
            count: vertex_count,
        });
        Ok(())
    }
}
