//! SketchBoard Core Library
//!
//! A raster drawing board with smoothed brush/eraser strokes, a bounded undo/redo
//! history of encoded snapshots, and cropped PNG export.

pub mod board;
pub mod codec;
pub mod config;
pub mod export;
pub mod history;
pub mod input;
pub mod style;
pub mod surface;
pub mod viewport;

pub use board::{Board, BoardError, BoardResult};
pub use codec::{CodecError, CodecResult, ExportFormat, PngCodec, Snapshot, SnapshotCodec};
pub use config::BoardConfig;
pub use export::{ContentBounds, ExportedImage};
pub use history::History;
pub use input::PointerEvent;
pub use style::{DrawMode, DrawStyle, parse_color};
pub use surface::Surface;
pub use viewport::{Viewport, ViewportUpdate};
