//! Board controller: surface, history, codec and viewport behind one API.

use crate::codec::{BoxFuture, CodecError, CodecResult, PngCodec, SnapshotCodec};
use crate::config::{BoardConfig, validate_dimensions, validate_scale, validate_stroke_width};
use crate::export::{ExportedImage, export_final};
use crate::history::History;
use crate::input::PointerEvent;
use crate::style::{DrawMode, DrawStyle, parse_color};
use crate::surface::Surface;
use crate::viewport::{Viewport, ViewportUpdate};
use kurbo::Point;
use peniko::Color;
use std::fmt;
use std::future::Future;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use thiserror::Error;
use tiny_skia::Pixmap;

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Board errors.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("An undo/redo is already in flight")]
    RestoreInFlight,
    #[error("A stroke is in progress")]
    StrokeInProgress,
    #[error("Snapshot decode timed out after {0:?}")]
    DecodeTimeout(Duration),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestoreDirection {
    Undo,
    Redo,
}

impl fmt::Display for RestoreDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreDirection::Undo => f.write_str("undo"),
            RestoreDirection::Redo => f.write_str("redo"),
        }
    }
}

/// An undo/redo waiting for its snapshot to decode.
///
/// The history cursor only moves once the decoded image has been blitted, so
/// dropping a pending restore leaves the board exactly as it was.
struct PendingRestore {
    direction: RestoreDirection,
    future: BoxFuture<'static, CodecResult<Pixmap>>,
    started: Instant,
}

/// A drawing board.
///
/// Drive it from the host event loop: forward pointer events, call [`Board::tick`]
/// once per frame, and register a change hook to refresh undo/redo/export
/// affordances.
pub struct Board<C: SnapshotCodec = PngCodec> {
    surface: Surface,
    history: History,
    codec: C,
    viewport: Viewport,
    style: DrawStyle,
    pending: Option<PendingRestore>,
    decode_timeout: Duration,
    on_change: Option<Box<dyn FnMut()>>,
}

impl Board<PngCodec> {
    /// Create a board using the PNG data URL codec.
    pub fn new(config: &BoardConfig) -> BoardResult<Self> {
        Self::with_codec(config, PngCodec)
    }
}

impl<C: SnapshotCodec> Board<C> {
    /// Create a board with a custom snapshot codec.
    ///
    /// The blank buffer is snapshotted immediately so history starts with one entry.
    pub fn with_codec(config: &BoardConfig, codec: C) -> BoardResult<Self> {
        config.validate()?;

        let surface = Surface::new(config.width, config.height).ok_or_else(|| {
            BoardError::Configuration(format!(
                "cannot allocate a {}x{} buffer",
                config.width, config.height
            ))
        })?;
        let history = History::new(config.max_history).ok_or_else(|| {
            BoardError::Configuration("max_history must be at least 1".to_string())
        })?;

        let style = DrawStyle {
            color: config.color()?,
            width: config.stroke_width,
            mode: DrawMode::Brush,
        };

        let mut board = Self {
            surface,
            history,
            codec,
            viewport: Viewport::new(config.footprint(), config.position, config.scale),
            style,
            pending: None,
            decode_timeout: config.decode_timeout(),
            on_change: None,
        };
        board.save()?;

        log::info!(
            "Created {}x{} board (history capacity {})",
            config.width,
            config.height,
            config.max_history
        );
        Ok(board)
    }

    /// Register the change hook, replacing any previous one.
    ///
    /// It fires after every committed mutation: a finished stroke, an applied undo,
    /// an applied redo.
    pub fn on_change(&mut self, hook: impl FnMut() + 'static) {
        self.on_change = Some(Box::new(hook));
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of snapshots in history, including the initial blank one.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Whether an undo/redo is waiting on its decode.
    pub fn is_restoring(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_painting(&self) -> bool {
        self.surface.is_painting()
    }

    pub fn style(&self) -> &DrawStyle {
        &self.style
    }

    pub fn mode(&self) -> DrawMode {
        self.style.mode
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The live raster buffer, for the host to present.
    pub fn pixmap(&self) -> &Pixmap {
        self.surface.pixmap()
    }

    pub fn select_brush(&mut self) {
        self.style.mode = DrawMode::Brush;
    }

    pub fn select_eraser(&mut self) {
        self.style.mode = DrawMode::Eraser;
    }

    /// Set the colour for subsequent strokes.
    pub fn set_stroke_color(&mut self, color: Color) {
        self.style.color = color;
    }

    /// Set the colour from a CSS colour string.
    pub fn set_stroke_color_str(&mut self, color: &str) -> BoardResult<()> {
        let color = parse_color(color)
            .ok_or_else(|| BoardError::Configuration(format!("unrecognized colour '{color}'")))?;
        self.set_stroke_color(color);
        Ok(())
    }

    /// Set the width for subsequent strokes.
    pub fn set_stroke_width(&mut self, width: f64) -> BoardResult<()> {
        validate_stroke_width(width)?;
        self.style.width = width;
        Ok(())
    }

    /// Dispatch a pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> BoardResult<()> {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { .. } | PointerEvent::Leave => {
                self.pointer_up()?;
            }
        }
        Ok(())
    }

    /// Start a stroke at a surface-space position.
    pub fn pointer_down(&mut self, position: Point) {
        if self.pending.is_some() {
            log::debug!("Pointer down ignored while a restore is in flight");
            return;
        }
        if self.surface.is_painting() {
            return;
        }
        let local = self.viewport.surface_to_buffer(position);
        self.surface.begin_stroke(local, self.style);
    }

    /// Extend the current stroke. Ignored when not painting.
    pub fn pointer_move(&mut self, position: Point) {
        if !self.surface.is_painting() {
            return;
        }
        let local = self.viewport.surface_to_buffer(position);
        self.surface.extend_stroke(local);
    }

    /// Finish the current stroke, snapshot it and notify.
    ///
    /// Returns `false` when no stroke was in progress.
    pub fn pointer_up(&mut self) -> BoardResult<bool> {
        if !self.surface.end_stroke() {
            return Ok(false);
        }
        self.save()?;
        self.emit_change();
        Ok(true)
    }

    /// Per-frame tick: advance an in-flight restore and rasterize pending strokes.
    ///
    /// Returns `true` if the buffer changed and should be presented.
    pub fn tick(&mut self) -> bool {
        let restored = match self.poll_restore() {
            Ok(restored) => restored,
            Err(e) => {
                log::error!("Restore failed: {e}");
                false
            }
        };
        let painted = self.surface.render();
        restored || painted
    }

    /// Step back one snapshot.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. Otherwise the decode starts
    /// and is applied as soon as it completes (possibly before this returns); the
    /// change hook fires once the buffer has been repainted.
    pub fn undo(&mut self) -> BoardResult<bool> {
        self.start_restore(RestoreDirection::Undo)
    }

    /// Step forward one snapshot. See [`Board::undo`].
    pub fn redo(&mut self) -> BoardResult<bool> {
        self.start_restore(RestoreDirection::Redo)
    }

    /// Block until an in-flight restore completes and apply it.
    ///
    /// Fails with [`BoardError::DecodeTimeout`] once the decode outlives the configured
    /// timeout; the restore is dropped and the history cursor stays put.
    pub fn settle(&mut self) -> BoardResult<()> {
        pollster::block_on(std::future::poll_fn(|cx| {
            match self.poll_restore() {
                Err(e) => Poll::Ready(Err(e)),
                Ok(_) if self.pending.is_none() => Poll::Ready(Ok(())),
                Ok(_) => {
                    // The decode is polled with a no-op waker, so re-poll on an interval
                    // until it completes or hits the decode timeout.
                    std::thread::sleep(SETTLE_POLL_INTERVAL);
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
        }))
    }

    /// Abandon an in-flight restore. History and buffer stay unchanged.
    pub fn cancel_restore(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                log::debug!("Cancelled in-flight {}", pending.direction);
                true
            }
            None => false,
        }
    }

    /// Crop the buffer to its painted content and encode it.
    ///
    /// Returns `None` for a blank buffer.
    pub fn export(&self) -> BoardResult<Option<ExportedImage>> {
        Ok(export_final(&self.codec, self.surface.pixmap())?)
    }

    /// Reposition or rescale the buffer within the outer surface.
    ///
    /// History and buffer contents are kept. Rejected while a stroke is in progress.
    pub fn update(&mut self, update: ViewportUpdate) -> BoardResult<bool> {
        if self.surface.is_painting() {
            return Err(BoardError::StrokeInProgress);
        }
        if let Some(scale) = update.scale {
            validate_scale(scale)?;
        }
        if let Some(dimensions) = update.dimensions {
            validate_dimensions(dimensions)?;
        }

        let changed = self.viewport.apply(update);
        if changed {
            let offset = self.viewport.offset();
            log::debug!(
                "Viewport updated: offset ({}, {}), scale {}",
                offset.x,
                offset.y,
                self.viewport.scale()
            );
        }
        Ok(changed)
    }

    fn save(&mut self) -> BoardResult<()> {
        let snapshot = self.codec.encode(self.surface.pixmap())?;
        self.history.push(snapshot);
        log::debug!(
            "Snapshot {}/{} saved",
            self.history.index() + 1,
            self.history.len()
        );
        Ok(())
    }

    fn start_restore(&mut self, direction: RestoreDirection) -> BoardResult<bool> {
        if self.pending.is_some() {
            log::warn!("Rejected {direction}: a restore is already in flight");
            return Err(BoardError::RestoreInFlight);
        }
        if self.surface.is_painting() {
            return Err(BoardError::StrokeInProgress);
        }

        let snapshot = match direction {
            RestoreDirection::Undo => self.history.peek_previous(),
            RestoreDirection::Redo => self.history.peek_next(),
        };
        let Some(snapshot) = snapshot else {
            log::debug!("Nothing to {direction}");
            return Ok(false);
        };

        self.pending = Some(PendingRestore {
            direction,
            future: self.codec.decode(snapshot),
            started: Instant::now(),
        });
        self.poll_restore()?;
        Ok(true)
    }

    /// Poll the in-flight decode once. Returns `true` if a restore was applied.
    fn poll_restore(&mut self) -> BoardResult<bool> {
        let Some(mut pending) = self.pending.take() else {
            return Ok(false);
        };

        let mut cx = Context::from_waker(Waker::noop());
        match pending.future.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(image)) => {
                self.apply_restore(pending.direction, &image);
                Ok(true)
            }
            Poll::Ready(Err(e)) => Err(e.into()),
            Poll::Pending => {
                if pending.started.elapsed() >= self.decode_timeout {
                    log::warn!(
                        "Snapshot decode for {} timed out after {:?}",
                        pending.direction,
                        self.decode_timeout
                    );
                    return Err(BoardError::DecodeTimeout(self.decode_timeout));
                }
                self.pending = Some(pending);
                Ok(false)
            }
        }
    }

    fn apply_restore(&mut self, direction: RestoreDirection, image: &Pixmap) {
        self.surface.replace_buffer(image);
        match direction {
            RestoreDirection::Undo => self.history.undo(),
            RestoreDirection::Redo => self.history.redo(),
        };
        log::debug!(
            "Applied {direction}, now at {}/{}",
            self.history.index() + 1,
            self.history.len()
        );
        self.emit_change();
    }

    fn emit_change(&mut self) {
        if let Some(hook) = self.on_change.as_mut() {
            hook();
        }
    }
}

impl<C: SnapshotCodec> fmt::Debug for Board<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("history_len", &self.history.len())
            .field("history_index", &self.history.index())
            .field("style", &self.style)
            .field("viewport", &self.viewport)
            .field("restoring", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Snapshot;
    use kurbo::Size;
    use std::cell::Cell;
    use std::pin::Pin;
    use std::rc::Rc;

    fn board() -> Board {
        Board::new(&BoardConfig::with_size(64, 64)).unwrap()
    }

    fn stroke(board: &mut Board<impl SnapshotCodec>, from: (f64, f64), to: (f64, f64)) {
        board.pointer_down(Point::new(from.0, from.1));
        board.tick();
        board.pointer_move(Point::new(to.0, to.1));
        board.tick();
        assert!(board.pointer_up().unwrap());
    }

    fn change_counter(board: &mut Board<impl SnapshotCodec>) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let hook_count = count.clone();
        board.on_change(move || hook_count.set(hook_count.get() + 1));
        count
    }

    /// Future that stays pending until the shared flag is set.
    struct WaitOpen(Rc<Cell<bool>>);

    impl Future for WaitOpen {
        type Output = ();

        fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
            if self.0.get() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        }
    }

    /// PNG codec whose decodes wait on a gate.
    struct GatedCodec {
        open: Rc<Cell<bool>>,
    }

    impl SnapshotCodec for GatedCodec {
        fn encode(&self, pixmap: &Pixmap) -> CodecResult<Snapshot> {
            PngCodec.encode(pixmap)
        }

        fn decode(&self, snapshot: &Snapshot) -> BoxFuture<'static, CodecResult<Pixmap>> {
            let gate = WaitOpen(self.open.clone());
            let inner = PngCodec.decode(snapshot);
            Box::pin(async move {
                gate.await;
                inner.await
            })
        }
    }

    /// Codec whose decodes never complete.
    struct StalledCodec;

    impl SnapshotCodec for StalledCodec {
        fn encode(&self, pixmap: &Pixmap) -> CodecResult<Snapshot> {
            PngCodec.encode(pixmap)
        }

        fn decode(&self, _snapshot: &Snapshot) -> BoxFuture<'static, CodecResult<Pixmap>> {
            Box::pin(std::future::pending())
        }
    }

    fn gated_board(timeout_ms: u64) -> (Board<GatedCodec>, Rc<Cell<bool>>) {
        let open = Rc::new(Cell::new(false));
        let config = BoardConfig {
            decode_timeout_ms: timeout_ms,
            ..BoardConfig::with_size(32, 32)
        };
        let board = Board::with_codec(&config, GatedCodec { open: open.clone() }).unwrap();
        (board, open)
    }

    #[test]
    fn test_new_board_has_baseline() {
        let board = board();
        assert_eq!(board.history_len(), 1);
        assert!(!board.can_undo());
        assert!(!board.can_redo());
        assert_eq!(board.mode(), DrawMode::Brush);
    }

    #[test]
    fn test_history_grows_per_stroke() {
        let mut board = board();
        for n in 1..=5 {
            stroke(&mut board, (4.0, 4.0 + n as f64 * 8.0), (60.0, 4.0 + n as f64 * 8.0));
            assert_eq!(board.history_len(), n + 1);
            assert!(board.can_undo());
            assert!(!board.can_redo());
        }
    }

    #[test]
    fn test_undo_redo_restores_exact_pixels() {
        let mut board = board();
        board.set_stroke_color(Color::from_rgba8(200, 40, 10, 180));
        stroke(&mut board, (5.0, 5.0), (50.0, 40.0));
        let after_first = board.pixmap().data().to_vec();
        stroke(&mut board, (10.0, 60.0), (60.0, 10.0));
        let after_second = board.pixmap().data().to_vec();

        assert!(board.undo().unwrap());
        assert!(!board.is_restoring());
        assert_eq!(board.pixmap().data(), after_first.as_slice());

        assert!(board.redo().unwrap());
        assert_eq!(board.pixmap().data(), after_second.as_slice());
        assert!(!board.can_redo());
    }

    #[test]
    fn test_undo_to_blank() {
        let mut board = board();
        stroke(&mut board, (5.0, 5.0), (50.0, 40.0));
        board.undo().unwrap();
        assert!(board.pixmap().pixels().iter().all(|p| p.alpha() == 0));
        assert!(!board.can_undo());
        assert!(board.can_redo());
    }

    #[test]
    fn test_new_stroke_after_undo_drops_redo() {
        let mut board = board();
        stroke(&mut board, (5.0, 5.0), (50.0, 5.0));
        stroke(&mut board, (5.0, 20.0), (50.0, 20.0));
        board.undo().unwrap();
        assert!(board.can_redo());

        stroke(&mut board, (5.0, 40.0), (50.0, 40.0));
        assert!(!board.can_redo());
        assert_eq!(board.history_len(), 3);
    }

    #[test]
    fn test_unavailable_undo_redo_are_noops() {
        let mut board = board();
        let changes = change_counter(&mut board);
        assert!(!board.undo().unwrap());
        assert!(!board.redo().unwrap());
        assert_eq!(changes.get(), 0);
        assert_eq!(board.history_len(), 1);
    }

    #[test]
    fn test_change_hook_fires_on_commits() {
        let mut board = board();
        let changes = change_counter(&mut board);

        stroke(&mut board, (5.0, 5.0), (50.0, 5.0));
        assert_eq!(changes.get(), 1);
        board.undo().unwrap();
        assert_eq!(changes.get(), 2);
        board.redo().unwrap();
        assert_eq!(changes.get(), 3);

        // Style changes are not commits.
        board.select_eraser();
        board.set_stroke_width(10.0).unwrap();
        assert_eq!(changes.get(), 3);
    }

    #[test]
    fn test_pointer_up_without_stroke() {
        let mut board = board();
        let changes = change_counter(&mut board);
        assert!(!board.pointer_up().unwrap());
        board.pointer_move(Point::new(3.0, 3.0));
        assert_eq!(board.history_len(), 1);
        assert_eq!(changes.get(), 0);
    }

    #[test]
    fn test_leave_finishes_stroke() {
        let mut board = board();
        board
            .handle_pointer(PointerEvent::Down {
                position: Point::new(5.0, 5.0),
            })
            .unwrap();
        board
            .handle_pointer(PointerEvent::Move {
                position: Point::new(30.0, 30.0),
            })
            .unwrap();
        board.handle_pointer(PointerEvent::Leave).unwrap();
        assert!(!board.is_painting());
        assert_eq!(board.history_len(), 2);
    }

    #[test]
    fn test_eraser_leaves_transparent_pixels() {
        let mut board = board();
        board.set_stroke_width(12.0).unwrap();
        stroke(&mut board, (0.0, 32.0), (64.0, 32.0));
        assert_eq!(board.pixmap().pixel(32, 32).unwrap().alpha(), 255);

        board.select_eraser();
        board.set_stroke_width(20.0).unwrap();
        stroke(&mut board, (0.0, 32.0), (64.0, 32.0));
        for x in 8..56 {
            for y in 28..36 {
                let px = board.pixmap().pixel(x, y).unwrap();
                assert_eq!(px.alpha(), 0, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_translucent_color_still_erases_fully() {
        let mut board = board();
        board.set_stroke_width(12.0).unwrap();
        stroke(&mut board, (0.0, 32.0), (64.0, 32.0));

        board.set_stroke_color_str("rgba(0, 0, 0, 0.5)").unwrap();
        board.select_eraser();
        board.set_stroke_width(20.0).unwrap();
        stroke(&mut board, (0.0, 32.0), (64.0, 32.0));
        assert_eq!(board.pixmap().pixel(32, 32).unwrap().alpha(), 0);
    }

    #[test]
    fn test_export() {
        let mut board = board();
        assert!(board.export().unwrap().is_none());

        board.set_stroke_width(2.0).unwrap();
        stroke(&mut board, (20.0, 30.0), (40.0, 30.0));
        let exported = board.export().unwrap().unwrap();
        assert!(exported.x >= 17 && exported.x <= 20);
        assert!(exported.y >= 27 && exported.y <= 30);
        assert!(exported.width >= 20);
        assert!(exported.height >= 2 && exported.height <= 6);
        assert!(exported.file.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_history_cap() {
        let config = BoardConfig {
            max_history: 3,
            ..BoardConfig::with_size(32, 32)
        };
        let mut board = Board::new(&config).unwrap();
        for n in 0..6 {
            stroke(&mut board, (2.0, 2.0 + n as f64 * 4.0), (30.0, 2.0 + n as f64 * 4.0));
            assert!(board.history_len() <= 3);
        }
        assert!(board.undo().unwrap());
        assert!(board.undo().unwrap());
        assert!(!board.can_undo());
        assert!(!board.undo().unwrap());
        assert!(board.redo().unwrap());
        assert!(board.can_redo());
    }

    #[test]
    fn test_in_flight_guard() {
        let (mut board, open) = gated_board(60_000);
        let changes = change_counter(&mut board);
        stroke(&mut board, (2.0, 2.0), (30.0, 30.0));
        let painted = board.pixmap().data().to_vec();
        assert_eq!(changes.get(), 1);

        assert!(board.undo().unwrap());
        assert!(board.is_restoring());
        assert!(matches!(board.undo(), Err(BoardError::RestoreInFlight)));
        assert!(matches!(board.redo(), Err(BoardError::RestoreInFlight)));

        // Strokes cannot start while the restore is pending.
        board.pointer_down(Point::new(5.0, 5.0));
        assert!(!board.is_painting());

        board.tick();
        assert!(board.is_restoring());
        assert!(board.can_undo());
        assert_eq!(board.pixmap().data(), painted.as_slice());

        open.set(true);
        assert!(board.tick());
        assert!(!board.is_restoring());
        assert!(!board.can_undo());
        assert!(board.can_redo());
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn test_settle_applies_pending_restore() {
        let (mut board, open) = gated_board(60_000);
        stroke(&mut board, (2.0, 2.0), (30.0, 30.0));
        board.undo().unwrap();
        open.set(true);
        board.settle().unwrap();
        assert!(!board.is_restoring());
        assert!(board.can_redo());
        board.settle().unwrap();
    }

    #[test]
    fn test_cancel_restore_keeps_state() {
        let (mut board, _open) = gated_board(60_000);
        stroke(&mut board, (2.0, 2.0), (30.0, 30.0));
        board.undo().unwrap();
        assert!(board.cancel_restore());
        assert!(!board.cancel_restore());
        assert!(board.can_undo());
        assert!(!board.can_redo());
    }

    #[test]
    fn test_decode_timeout_releases_guard() {
        let (mut board, _open) = gated_board(0);
        stroke(&mut board, (2.0, 2.0), (30.0, 30.0));
        assert!(matches!(board.undo(), Err(BoardError::DecodeTimeout(_))));
        assert!(!board.is_restoring());
        assert!(board.can_undo());
        assert_eq!(board.history_len(), 2);
    }

    #[test]
    fn test_settle_gives_up_on_stalled_decode() {
        let config = BoardConfig {
            decode_timeout_ms: 10,
            ..BoardConfig::with_size(32, 32)
        };
        let mut board = Board::with_codec(&config, StalledCodec).unwrap();
        let changes = change_counter(&mut board);
        stroke(&mut board, (2.0, 2.0), (30.0, 30.0));
        let painted = board.pixmap().data().to_vec();

        assert!(board.undo().unwrap());
        assert!(board.is_restoring());
        let started = Instant::now();
        assert!(matches!(board.settle(), Err(BoardError::DecodeTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));

        assert!(!board.is_restoring());
        assert!(board.can_undo());
        assert!(!board.can_redo());
        assert_eq!(board.pixmap().data(), painted.as_slice());
        assert_eq!(changes.get(), 1);

        // The guard is released, so a new request can start.
        assert!(board.undo().unwrap());
    }

    #[test]
    fn test_pointer_maps_through_viewport() {
        let config = BoardConfig {
            scale: 0.5,
            ..BoardConfig::with_size(64, 64)
        };
        let mut board = Board::new(&config).unwrap();
        assert_eq!(board.viewport().offset(), kurbo::Vec2::new(16.0, 16.0));

        board.set_stroke_width(2.0).unwrap();
        // Surface (20, 36) -> buffer (8, 40); surface (44, 36) -> buffer (56, 40).
        stroke(&mut board, (20.0, 36.0), (44.0, 36.0));
        assert!(board.pixmap().pixel(32, 40).unwrap().alpha() > 0);
        assert_eq!(board.pixmap().pixel(32, 20).unwrap().alpha(), 0);
    }

    #[test]
    fn test_update_keeps_history() {
        let mut board = board();
        stroke(&mut board, (5.0, 5.0), (50.0, 5.0));
        let changed = board
            .update(ViewportUpdate {
                dimensions: Some(Size::new(128.0, 128.0)),
                scale: Some(2.0),
                ..Default::default()
            })
            .unwrap();
        assert!(changed);
        assert_eq!(board.history_len(), 2);
        assert!(board.can_undo());
        assert_eq!(board.viewport().offset(), kurbo::Vec2::new(-64.0, -64.0));
        assert!(!board.update(ViewportUpdate::default()).unwrap());
    }

    #[test]
    fn test_update_rejected_during_stroke() {
        let mut board = board();
        board.pointer_down(Point::new(5.0, 5.0));
        let result = board.update(ViewportUpdate {
            scale: Some(2.0),
            ..Default::default()
        });
        assert!(matches!(result, Err(BoardError::StrokeInProgress)));
        assert!(matches!(board.undo(), Err(BoardError::StrokeInProgress)));
        board.pointer_up().unwrap();
    }

    #[test]
    fn test_invalid_inputs() {
        let mut board = board();
        assert!(matches!(
            board.update(ViewportUpdate {
                scale: Some(0.0),
                ..Default::default()
            }),
            Err(BoardError::Configuration(_))
        ));
        assert!(matches!(
            board.set_stroke_width(-1.0),
            Err(BoardError::Configuration(_))
        ));
        assert!(matches!(
            board.set_stroke_color_str("nope"),
            Err(BoardError::Configuration(_))
        ));
        board.set_stroke_color_str("rgb(1, 2, 3)").unwrap();
        assert_eq!(board.style().color.to_rgba8().b, 3);

        assert!(matches!(
            Board::new(&BoardConfig::with_size(0, 0)),
            Err(BoardError::Configuration(_))
        ));
    }

    #[test]
    fn test_style_applies_to_next_stroke() {
        let mut board = board();
        board.pointer_down(Point::new(5.0, 32.0));
        board.pointer_move(Point::new(60.0, 32.0));
        board.set_stroke_color(Color::from_rgba8(0, 255, 0, 255));
        board.pointer_up().unwrap();
        let px = board.pixmap().pixel(32, 32).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (27, 156, 216));
    }
}
