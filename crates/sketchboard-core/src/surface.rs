//! Raster surface: owns the pixel buffer and rasterizes strokes into it.

use crate::style::DrawStyle;
use kurbo::{BezPath, PathEl, Point};
use std::fmt;
use tiny_skia::{FillRule, Pixmap, PixmapPaint, Transform};

/// The stroke currently being painted.
#[derive(Clone)]
struct ActiveStroke {
    /// Buffer contents before the stroke began. Each render restores this and
    /// re-strokes the full smoothed path, so repeated renders never accumulate.
    base: Pixmap,
    points: Vec<Point>,
    style: DrawStyle,
}

/// A raster buffer plus the in-progress stroke.
///
/// Drawing calls only mark the surface as needing a render; [`Surface::render`]
/// performs the rasterization and is meant to run once per frame.
#[derive(Clone)]
pub struct Surface {
    pixmap: Pixmap,
    stroke: Option<ActiveStroke>,
    needs_render: bool,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("stroke_points", &self.stroke_points().len())
            .field("needs_render", &self.needs_render)
            .finish()
    }
}

impl Surface {
    /// Create a transparent surface. Returns `None` for zero or oversized dimensions.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            stroke: None,
            needs_render: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The live buffer.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Whether a stroke is in progress.
    pub fn is_painting(&self) -> bool {
        self.stroke.is_some()
    }

    /// Whether drawing commands are waiting for the next render.
    pub fn needs_render(&self) -> bool {
        self.needs_render
    }

    /// Points accumulated for the current stroke.
    pub fn stroke_points(&self) -> &[Point] {
        self.stroke.as_ref().map_or(&[], |s| s.points.as_slice())
    }

    /// Start a stroke at `point` (buffer coordinates).
    ///
    /// Ignored if a stroke is already in progress.
    pub fn begin_stroke(&mut self, point: Point, style: DrawStyle) {
        if self.stroke.is_some() {
            log::debug!("begin_stroke ignored: stroke already in progress");
            return;
        }
        self.stroke = Some(ActiveStroke {
            base: self.pixmap.clone(),
            points: vec![point],
            style,
        });
        self.needs_render = true;
    }

    /// Append a point to the current stroke. No-op when not painting.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = &mut self.stroke {
            stroke.points.push(point);
            self.needs_render = true;
        }
    }

    /// Finish the current stroke. Any pending render is flushed first so the
    /// buffer holds the final stroke. Returns `false` if nothing was being painted.
    pub fn end_stroke(&mut self) -> bool {
        if self.stroke.is_none() {
            return false;
        }
        self.render();
        self.stroke = None;
        true
    }

    /// Rasterize pending drawing commands. Returns `true` if pixels were touched.
    pub fn render(&mut self) -> bool {
        if !self.needs_render {
            return false;
        }
        self.needs_render = false;

        let Some(stroke) = &self.stroke else {
            return false;
        };

        self.pixmap.data_mut().copy_from_slice(stroke.base.data());
        paint_stroke(&mut self.pixmap, &stroke.points, &stroke.style);
        true
    }

    /// Clear the buffer and blit `image` at the origin.
    pub fn replace_buffer(&mut self, image: &Pixmap) {
        if image.width() == self.pixmap.width() && image.height() == self.pixmap.height() {
            self.pixmap.data_mut().copy_from_slice(image.data());
        } else {
            self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
            self.pixmap.draw_pixmap(
                0,
                0,
                image.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        self.needs_render = false;
    }

    /// Clear the buffer to transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }
}

/// Build the smoothed stroke path.
///
/// Each point after the first contributes a quadratic segment whose control point is
/// the previous point and whose end is the midpoint between the previous point and
/// this one. A final line reaches the last point.
pub fn smooth_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((&first, rest)) = points.split_first() else {
        return path;
    };

    path.move_to(first);
    let mut prev = first;
    for &point in rest {
        path.quad_to(prev, prev.midpoint(point));
        prev = point;
    }
    path.line_to(prev);
    path
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn paint_stroke(pixmap: &mut Pixmap, points: &[Point], style: &DrawStyle) {
    let paint = style.paint();

    // A tap without movement has no path extent; paint a round dot instead.
    let distinct = points.windows(2).any(|w| w[0] != w[1]);
    if !distinct {
        if let Some(&p) = points.first() {
            let radius = (style.width / 2.0).max(0.5) as f32;
            if let Some(dot) = tiny_skia::PathBuilder::from_circle(p.x as f32, p.y as f32, radius) {
                pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
        return;
    }

    if let Some(path) = to_skia_path(&smooth_path(points)) {
        pixmap.stroke_path(&path, &paint, &style.stroke(), Transform::identity(), None);
    }
}
