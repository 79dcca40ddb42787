//! # Draw Batcher
//!
//! Accumulates textured quads into one vertex buffer and groups consecutive
//! quads that share GPU state into batches, so a frame costs one draw call
//! per state change instead of one per quad.
//!
//! ## Batching Rule
//!
//! Only the most recent batch is ever extended. A quad whose [`BatchKey`]
//! differs from the last batch starts a new one, even if an older batch has
//! the same key: submission order is draw order, and draw order matters for
//! blending.

use crate::foundation::math::{Mat4, Point3, Rect, Vec2, Vec4};
use crate::render::api::{
    BlendMode, FilterMode, GraphicsBackend, PrimitiveType, TextureHandle, WrapMode,
};
use crate::render::primitives::Vertex;
use crate::render::RenderResult;

/// Vertices emitted per quad (two triangles, no index buffer)
pub const VERTICES_PER_QUAD: usize = 6;

/// GPU state shared by every quad in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Sampled texture
    pub texture: TextureHandle,
    /// Sampler filter
    pub filter: FilterMode,
    /// Sampler wrap
    pub wrap: WrapMode,
    /// Framebuffer blend
    pub blend: BlendMode,
    /// Scissor rectangle, `None` for the full target
    pub scissor: Option<Rect>,
}

impl BatchKey {
    /// Alpha-blended, clamped, bilinear key without scissor
    pub const fn new(texture: TextureHandle) -> Self {
        Self {
            texture,
            filter: FilterMode::Bilinear,
            wrap: WrapMode::Clamp,
            blend: BlendMode::Alpha,
            scissor: None,
        }
    }
}

/// A contiguous vertex range drawn with one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    /// State for the whole range
    pub key: BatchKey,
    /// First vertex (inclusive)
    pub start: usize,
    /// Last vertex (exclusive)
    pub end: usize,
}

impl Batch {
    /// Number of vertices in the batch
    pub const fn vertex_count(&self) -> usize {
        self.end - self.start
    }
}

/// Geometry of one quad before it is turned into vertices
///
/// `source_rect` is in texel coordinates with a top-left origin and is
/// normalized against `texture_size`. The quad's local top-left corner is
/// `position - pivot * size` before `world` is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGeometry {
    /// Pivot position
    pub position: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Pivot as a fraction of size, (0, 0) for top-left
    pub pivot: Vec2,
    /// Region of the texture mapped onto the quad
    pub source_rect: Rect,
    /// Texture dimensions used to normalize `source_rect`
    pub texture_size: (u32, u32),
    /// Tint color
    pub color: Vec4,
    /// Transform applied to the four corners
    pub world: Mat4,
}

impl QuadGeometry {
    /// Untransformed, untinted quad with a top-left pivot
    pub fn new(rect: Rect, source_rect: Rect, texture_size: (u32, u32)) -> Self {
        Self {
            position: Vec2::new(rect.x as f32, rect.y as f32),
            size: Vec2::new(rect.width as f32, rect.height as f32),
            pivot: Vec2::zeros(),
            source_rect,
            texture_size,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            world: Mat4::identity(),
        }
    }

    /// Set the tint color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Set the world transform
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Set the pivot
    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    /// Normalized (u0, v0, u1, v1) of the source rect
    pub fn uv_bounds(&self) -> [f32; 4] {
        let (width, height) = self.texture_size;
        if width == 0 || height == 0 {
            return [0.0; 4];
        }
        let (width, height) = (width as f32, height as f32);
        let rect = self.source_rect;
        [
            rect.x as f32 / width,
            rect.y as f32 / height,
            rect.right() as f32 / width,
            rect.bottom() as f32 / height,
        ]
    }

    /// The six vertices of the quad: TL, TR, BR, BR, BL, TL
    pub fn vertices(&self) -> [Vertex; VERTICES_PER_QUAD] {
        let origin = self.position - self.pivot.component_mul(&self.size);
        let [u0, v0, u1, v1] = self.uv_bounds();
        let color: [f32; 4] = self.color.into();

        let corner = |x: f32, y: f32, u: f32, v: f32| {
            let point = self.world.transform_point(&Point3::new(x, y, 0.0));
            Vertex { position: [point.x, point.y, point.z], color, uv: [u, v] }
        };

        let (left, top) = (origin.x, origin.y);
        let (right, bottom) = (origin.x + self.size.x, origin.y + self.size.y);
        let top_left = corner(left, top, u0, v0);
        let top_right = corner(right, top, u1, v0);
        let bottom_right = corner(right, bottom, u1, v1);
        let bottom_left = corner(left, bottom, u0, v1);

        [top_left, top_right, bottom_right, bottom_right, bottom_left, top_left]
    }
}

/// Statistics for the current frame's batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Quads submitted
    pub quad_count: usize,
    /// Vertices accumulated
    pub vertex_count: usize,
    /// Batches formed (equals draw calls per flush)
    pub batch_count: usize,
}

impl BatchStats {
    /// Average quads per batch
    pub fn avg_quads_per_batch(&self) -> f32 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.quad_count as f32 / self.batch_count as f32
        }
    }
}

/// Accumulates quads into state-keyed batches
#[derive(Debug, Default)]
pub struct DrawBatcher {
    vertices: Vec<Vertex>,
    batches: Vec<Batch>,
}

impl DrawBatcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batcher with room for `vertex_capacity` vertices
    pub fn with_capacity(vertex_capacity: usize) -> Self {
        Self { vertices: Vec::with_capacity(vertex_capacity), batches: Vec::new() }
    }

    /// Drop all vertices and batches, keeping allocations
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.batches.clear();
    }

    /// Append a quad under `key`
    pub fn submit(&mut self, quad: &QuadGeometry, key: BatchKey) {
        let start = self.vertices.len();
        self.vertices.extend_from_slice(&quad.vertices());
        let end = self.vertices.len();

        match self.batches.last_mut() {
            Some(batch) if batch.key == key => batch.end = end,
            _ => self.batches.push(Batch { key, start, end }),
        }
    }

    /// All accumulated vertices in submission order
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Batches in draw order
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Whether nothing has been submitted
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Current statistics
    pub fn stats(&self) -> BatchStats {
        BatchStats {
            quad_count: self.vertices.len() / VERTICES_PER_QUAD,
            vertex_count: self.vertices.len(),
            batch_count: self.batches.len(),
        }
    }

    /// Upload the accumulated vertices
    pub fn upload(&self, backend: &mut dyn GraphicsBackend) -> RenderResult<()> {
        backend.upload_vertices(&self.vertices)
    }

    /// Issue one draw per batch against the uploaded vertex buffer
    ///
    /// State is set for every batch. Returns the number of draw calls.
    pub fn flush(&self, backend: &mut dyn GraphicsBackend) -> RenderResult<usize> {
        for batch in &self.batches {
            backend.bind_texture(batch.key.texture, batch.key.filter, batch.key.wrap)?;
            backend.set_blend_mode(batch.key.blend);
            backend.set_scissor(batch.key.scissor);
            backend.draw_range(PrimitiveType::Triangles, batch.start as u32, batch.vertex_count() as u32)?;
        }
        log::trace!("Flushed {} batches ({} vertices)", self.batches.len(), self.vertices.len());
        Ok(self.batches.len())
    }
}
