//! Vertex layout for batched quads

use bytemuck::{Pod, Zeroable};

/// Vertex data for textured, tinted quads
///
/// Layout is `V3F_C4F_T2F`: 36 bytes, tightly packed for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position after the world transform
    pub position: [f32; 3],
    /// Tint color (RGBA)
    pub color: [f32; 4],
    /// Normalized texture coordinates, (0, 0) at the texture's top-left
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size of one vertex in bytes
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// View a vertex slice as raw bytes for upload
    pub fn as_bytes(vertices: &[Self]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}
