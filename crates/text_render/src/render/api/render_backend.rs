//! Backend abstraction trait for the rendering system
//!
//! The text renderer and draw batcher only ever talk to the GPU through
//! [`GraphicsBackend`]: texture creation and upload, binding, blend and
//! scissor state, one vertex buffer upload per frame and ranged draws.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Rect};
use crate::render::primitives::Vertex;
use crate::render::RenderResult;

/// Handle to a texture resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Nearest-texel sampling
    Point,
    /// Linear interpolation between texels
    Bilinear,
}

/// Texture addressing outside the [0, 1] range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    /// Tile the texture
    Repeat,
    /// Clamp to the edge texel
    Clamp,
}

/// Framebuffer blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// Overwrite the destination
    Opaque,
    /// Standard `src * a + dst * (1 - a)`
    Alpha,
    /// `src * a + dst`
    Additive,
}

/// Primitive topology for ranged draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Independent triangles, three vertices each
    Triangles,
}

/// GPU operations consumed by the text pipeline
///
/// Implementations are expected to be cheap to call repeatedly; the batcher
/// issues state changes for every batch without diffing.
pub trait GraphicsBackend {
    /// Create an RGBA8 texture of the given size
    fn create_texture(&mut self, width: u32, height: u32) -> RenderResult<TextureHandle>;

    /// Replace the full contents of a texture with tightly packed RGBA8 pixels
    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> RenderResult<()>;

    /// Bind a texture with the given sampler state for subsequent draws
    fn bind_texture(
        &mut self,
        texture: TextureHandle,
        filter: FilterMode,
        wrap: WrapMode,
    ) -> RenderResult<()>;

    /// Set the blend equation for subsequent draws
    fn set_blend_mode(&mut self, blend: BlendMode);

    /// Enable the scissor test with the given rect, or disable it with `None`
    fn set_scissor(&mut self, scissor: Option<Rect>);

    /// Replace the shared vertex buffer contents
    fn upload_vertices(&mut self, vertices: &[Vertex]) -> RenderResult<()>;

    /// Set the view-projection matrix used by subsequent draws
    fn set_view_projection(&mut self, view_projection: &Mat4);

    /// Draw `vertex_count` vertices starting at `start_vertex`
    fn draw_range(
        &mut self,
        primitive: PrimitiveType,
        start_vertex: u32,
        vertex_count: u32,
    ) -> RenderResult<()>;
}
