//! Replays scripted UI actions against a board.
//!
//! A script stands in for the page's button and pointer wiring: each action maps to
//! one controller call, pointer actions are followed by a frame tick, and undo/redo
//! wait for their decode before the next action runs.

use crate::toolbar::ToolbarState;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use sketchboard_core::{Board, BoardConfig, BoardError, ExportedImage, ViewportUpdate};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Script errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Result type for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// One scripted UI action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Brush,
    Eraser,
    Color { value: String },
    Width { value: f64 },
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
    Undo,
    Redo,
    Viewport(ViewportUpdate),
    Export,
}

/// A script file: optional board config plus the actions to replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: Option<BoardConfig>,
    pub actions: Vec<Action>,
}

impl Script {
    pub fn from_json(json: &str) -> ScriptResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> ScriptResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// A board plus the toolbar state kept in sync through its change hook.
pub struct Session {
    board: Board,
    toolbar: ToolbarState,
    changed: Rc<Cell<bool>>,
    exports: Vec<ExportedImage>,
}

impl Session {
    pub fn new(config: &BoardConfig) -> ScriptResult<Self> {
        let mut board = Board::new(config)?;
        let changed = Rc::new(Cell::new(false));
        let hook_flag = changed.clone();
        board.on_change(move || hook_flag.set(true));

        let toolbar = ToolbarState::from_board(&board);
        Ok(Self {
            board,
            toolbar,
            changed,
            exports: Vec::new(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn toolbar(&self) -> ToolbarState {
        self.toolbar
    }

    /// Results of every `export` action so far, with blank exports skipped.
    pub fn exports(&self) -> &[ExportedImage] {
        &self.exports
    }

    /// Replay every action in order, stopping at the first error.
    pub fn run(&mut self, actions: &[Action]) -> ScriptResult<()> {
        for (i, action) in actions.iter().enumerate() {
            log::debug!("Action {i}: {action:?}");
            self.apply(action)?;
        }
        Ok(())
    }

    /// Apply a single action.
    pub fn apply(&mut self, action: &Action) -> ScriptResult<()> {
        match action {
            Action::Brush => {
                self.board.select_brush();
                self.toolbar.set_mode(self.board.mode());
            }
            Action::Eraser => {
                self.board.select_eraser();
                self.toolbar.set_mode(self.board.mode());
            }
            Action::Color { value } => self.board.set_stroke_color_str(value)?,
            Action::Width { value } => self.board.set_stroke_width(*value)?,
            Action::Down { x, y } => {
                self.board.pointer_down(Point::new(*x, *y));
                self.board.tick();
            }
            Action::Move { x, y } => {
                self.board.pointer_move(Point::new(*x, *y));
                self.board.tick();
            }
            Action::Up | Action::Leave => {
                self.board.pointer_up()?;
            }
            Action::Undo => {
                if self.board.undo()? {
                    self.board.settle()?;
                }
            }
            Action::Redo => {
                if self.board.redo()? {
                    self.board.settle()?;
                }
            }
            Action::Viewport(update) => {
                self.board.update(*update)?;
            }
            Action::Export => match self.board.export()? {
                Some(image) => {
                    log::info!(
                        "Export: {}x{} at ({}, {}), {} byte payload",
                        image.width,
                        image.height,
                        image.x,
                        image.y,
                        image.file.len()
                    );
                    self.exports.push(image);
                }
                None => log::info!("Export skipped: canvas is empty"),
            },
        }

        if self.changed.replace(false) {
            self.toolbar.refresh_history(&self.board);
        }
        Ok(())
    }
}
