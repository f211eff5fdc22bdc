//! Stroke style: colour, width and compositing mode.

use peniko::Color;
use serde::{Deserialize, Serialize};
use tiny_skia::BlendMode;

/// Default stroke colour (`#1b9cd8`).
pub const DEFAULT_STROKE_COLOR: Color = Color::from_rgba8(27, 156, 216, 255);

/// Default stroke width in buffer pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 4.0;

/// How a stroke combines with the pixels already in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// Paint the stroke colour over existing pixels (`source-over`).
    #[default]
    Brush,
    /// Clear covered pixels to transparent (`destination-out`).
    Eraser,
}

impl DrawMode {
    /// The blend mode used to rasterize strokes in this mode.
    pub fn blend_mode(self) -> BlendMode {
        match self {
            DrawMode::Brush => BlendMode::SourceOver,
            DrawMode::Eraser => BlendMode::DestinationOut,
        }
    }

    /// Canvas-style name of the compositing operation.
    pub fn composite_operation(self) -> &'static str {
        match self {
            DrawMode::Brush => "source-over",
            DrawMode::Eraser => "destination-out",
        }
    }
}

/// Current stroke settings, read by the surface when a stroke begins.
#[derive(Debug, Clone, Copy)]
pub struct DrawStyle {
    pub color: Color,
    pub width: f64,
    pub mode: DrawMode,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR,
            width: DEFAULT_STROKE_WIDTH,
            mode: DrawMode::Brush,
        }
    }
}

impl DrawStyle {
    /// Build the tiny-skia paint for this style.
    pub(crate) fn paint(&self) -> tiny_skia::Paint<'static> {
        let rgba = self.color.to_rgba8();
        // destination-out removes coverage scaled by source alpha, so erasing is always opaque.
        let alpha = match self.mode {
            DrawMode::Brush => rgba.a,
            DrawMode::Eraser => 255,
        };
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(rgba.r, rgba.g, rgba.b, alpha);
        paint.anti_alias = true;
        paint.blend_mode = self.mode.blend_mode();
        paint
    }

    /// Build the tiny-skia stroke (round caps and joins).
    pub(crate) fn stroke(&self) -> tiny_skia::Stroke {
        tiny_skia::Stroke {
            width: self.width as f32,
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..Default::default()
        }
    }
}

/// Parse a CSS colour string.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and `rgba(r, g, b, a)`
/// where `a` is a float in `0..=1`.
pub fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        return match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
                Some(Color::from_rgba8(r, g, b, 255))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Color::from_rgba8(r, g, b, 255))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Color::from_rgba8(r, g, b, a))
            }
            _ => None,
        };
    }

    let (args, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = s.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }

    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    let a = if has_alpha {
        let alpha = parts[3].parse::<f64>().ok()?;
        if !(0.0..=1.0).contains(&alpha) {
            return None;
        }
        (alpha * 255.0).round() as u8
    } else {
        255
    };

    Some(Color::from_rgba8(r, g, b, a))
}
