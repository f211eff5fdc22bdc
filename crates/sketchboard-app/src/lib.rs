//! SketchBoard Application
//!
//! Headless shell around the core board: replays scripted UI actions and keeps
//! toolbar affordances in sync with the board's change notifications.

mod session;
mod toolbar;

pub use session::{Action, Script, ScriptError, ScriptResult, Session};
pub use toolbar::ToolbarState;
