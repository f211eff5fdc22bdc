//! Board configuration.

use crate::board::{BoardError, BoardResult};
use crate::history::DEFAULT_MAX_HISTORY;
use crate::style::{DEFAULT_STROKE_WIDTH, parse_color};
use kurbo::{Point, Size};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upper bound on a single snapshot decode.
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 2000;

/// Settings a board is constructed from.
///
/// Every field has a default, so a partial JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Raster buffer width in pixels.
    pub width: u32,
    /// Raster buffer height in pixels.
    pub height: u32,
    /// Logical footprint in surface space. Defaults to the buffer size.
    pub dimensions: Option<Size>,
    /// Top-left of the footprint in surface space.
    pub position: Point,
    pub scale: f64,
    /// Maximum number of history snapshots, including the initial blank one.
    pub max_history: usize,
    /// CSS colour string.
    pub stroke_color: String,
    pub stroke_width: f64,
    pub decode_timeout_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            dimensions: None,
            position: Point::ZERO,
            scale: 1.0,
            max_history: DEFAULT_MAX_HISTORY,
            stroke_color: "#1b9cd8".to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            decode_timeout_ms: DEFAULT_DECODE_TIMEOUT_MS,
        }
    }
}

impl BoardConfig {
    /// Config for a buffer of the given size, everything else default.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> BoardResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BoardError::Configuration(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> BoardResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardError::Configuration(format!(
                "buffer must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_history == 0 {
            return Err(BoardError::Configuration(
                "max_history must be at least 1".to_string(),
            ));
        }
        validate_scale(self.scale)?;
        validate_stroke_width(self.stroke_width)?;
        if let Some(dimensions) = self.dimensions {
            validate_dimensions(dimensions)?;
        }
        self.color()?;
        Ok(())
    }

    /// The parsed stroke colour.
    pub fn color(&self) -> BoardResult<Color> {
        parse_color(&self.stroke_color).ok_or_else(|| {
            BoardError::Configuration(format!("unrecognized colour '{}'", self.stroke_color))
        })
    }

    /// Logical footprint, falling back to the buffer size.
    pub fn footprint(&self) -> Size {
        self.dimensions
            .unwrap_or_else(|| Size::new(self.width as f64, self.height as f64))
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }
}

pub(crate) fn validate_scale(scale: f64) -> BoardResult<()> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(BoardError::Configuration(format!(
            "scale must be positive, got {scale}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_stroke_width(width: f64) -> BoardResult<()> {
    if !(width.is_finite() && width > 0.0) {
        return Err(BoardError::Configuration(format!(
            "stroke width must be positive, got {width}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_dimensions(dimensions: Size) -> BoardResult<()> {
    if !(dimensions.width.is_finite()
        && dimensions.height.is_finite()
        && dimensions.width > 0.0
        && dimensions.height > 0.0)
    {
        return Err(BoardError::Configuration(format!(
            "dimensions must be positive, got {}x{}",
            dimensions.width, dimensions.height
        )));
    }
    Ok(())
}
