//! Viewport placement of the raster buffer inside the outer surface.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Partial viewport change. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportUpdate {
    #[serde(default)]
    pub dimensions: Option<Size>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl ViewportUpdate {
    /// Whether the update changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_none() && self.position.is_none() && self.scale.is_none()
    }
}

/// Describes how the buffer is positioned and scaled within the outer surface.
///
/// The scaled buffer is centred within its logical footprint, so the offset is
/// `position + (dimension - dimension * scale) / 2` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Logical footprint of the buffer in surface space.
    dimensions: Size,
    /// Top-left of the footprint in surface space.
    position: Point,
    /// Uniform scale applied to the buffer.
    scale: f64,
    /// Cached top-left of the scaled buffer in surface space.
    offset: Vec2,
}

impl Viewport {
    /// Create a viewport and compute its offsets.
    pub fn new(dimensions: Size, position: Point, scale: f64) -> Self {
        Self {
            dimensions,
            position,
            scale,
            offset: compute_offsets(position, dimensions, scale),
        }
    }

    pub fn dimensions(&self) -> Size {
        self.dimensions
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Top-left of the scaled buffer in surface space.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Apply a partial update. Offsets are recomputed only when something changed.
    ///
    /// Returns `true` if the viewport was modified.
    pub fn apply(&mut self, update: ViewportUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(dimensions) = update.dimensions {
            self.dimensions = dimensions;
        }
        if let Some(position) = update.position {
            self.position = position;
        }
        if let Some(scale) = update.scale {
            self.scale = scale;
        }
        self.offset = compute_offsets(self.position, self.dimensions, self.scale);
        true
    }

    /// Buffer-to-surface transform for the rendering layer.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Surface-to-buffer transform for pointer input.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a pointer position in surface space to buffer-local coordinates.
    pub fn surface_to_buffer(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    /// Convert a buffer-local position to surface space.
    pub fn buffer_to_surface(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    /// Size of the buffer once scaled into surface space.
    pub fn scaled_size(&self) -> Size {
        Size::new(self.dimensions.width * self.scale, self.dimensions.height * self.scale)
    }
}

/// Offset that centres a scaled footprint within its unscaled one.
pub fn compute_offsets(position: Point, dimensions: Size, scale: f64) -> Vec2 {
    Vec2::new(
        position.x + (dimensions.width - dimensions.width * scale) / 2.0,
        position.y + (dimensions.height - dimensions.height * scale) / 2.0,
    )
}
