//! Toolbar affordance state derived from the board.

use serde::Serialize;
use sketchboard_core::{Board, DrawMode, SnapshotCodec};

/// Enabled/active flags for the board's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ToolbarState {
    pub undo_enabled: bool,
    pub redo_enabled: bool,
    /// Download is offered once there is any history to move through.
    pub download_enabled: bool,
    pub brush_active: bool,
    pub eraser_active: bool,
}

impl ToolbarState {
    /// Snapshot the current board affordances.
    pub fn from_board<C: SnapshotCodec>(board: &Board<C>) -> Self {
        let mut state = Self::default();
        state.refresh_history(board);
        state.set_mode(board.mode());
        state
    }

    /// Recompute the history-driven flags. Called from the change hook.
    pub fn refresh_history<C: SnapshotCodec>(&mut self, board: &Board<C>) {
        let can_undo = board.can_undo();
        let can_redo = board.can_redo();
        self.undo_enabled = can_undo;
        self.redo_enabled = can_redo;
        self.download_enabled = can_undo || can_redo;
    }

    /// Mark the brush or eraser button active.
    pub fn set_mode(&mut self, mode: DrawMode) {
        self.brush_active = mode == DrawMode::Brush;
        self.eraser_active = mode == DrawMode::Eraser;
    }
}
