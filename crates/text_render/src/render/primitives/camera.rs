//! # 2D Screen Camera
//!
//! Orthographic camera for screen-space text and sprites.
//!
//! ## Coordinate System
//! Pixel space with the origin at the top-left of the viewport, X+ right and
//! Y+ down. The projection maps the viewport to clip space with the top edge
//! at NDC +1.

use crate::foundation::math::{Mat4, Vec2};
use nalgebra::Vector3;

/// Orthographic camera covering a pixel viewport
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Top-left of the visible region in world pixels
    pub position: Vec2,
    /// Viewport width in pixels
    pub width: f32,
    /// Viewport height in pixels
    pub height: f32,
    /// Uniform zoom factor (1.0 = one world pixel per screen pixel)
    pub zoom: f32,
}

impl Camera {
    /// Create a camera covering `width` x `height` pixels from the origin
    pub fn screen(width: f32, height: f32) -> Self {
        Self { position: Vec2::zeros(), width, height, zoom: 1.0 }
    }

    /// Move the visible region
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Resize the viewport (window resize)
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::new_scaling(self.zoom)
            * Mat4::new_translation(&Vector3::new(-self.position.x, -self.position.y, 0.0))
    }

    /// Orthographic projection for a Y-down pixel viewport
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_orthographic(0.0, self.width, self.height, 0.0, -1.0, 1.0)
    }

    /// Combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
