//! Pointer events delivered by the embedding UI layer.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pointer event type for unified mouse/touch handling.
///
/// Positions are in outer-surface coordinates; the board maps them into buffer
/// space through its viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
    /// Pointer left the surface; finishes any stroke like `Up`.
    Leave,
}

impl PointerEvent {
    /// Surface position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => Some(*position),
            PointerEvent::Leave => None,
        }
    }

    /// Whether this event ends a gesture.
    pub fn is_release(&self) -> bool {
        matches!(self, PointerEvent::Up { .. } | PointerEvent::Leave)
    }
}
