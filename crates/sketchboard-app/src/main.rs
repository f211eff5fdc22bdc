//! Main application entry point.

use clap::Parser;
use sketchboard_app::{Script, ScriptError, ScriptResult, Session};
use sketchboard_core::{BoardConfig, ExportFormat};
use std::path::PathBuf;
use std::process::ExitCode;

/// Replay a pointer/action script against a drawing board and export the result.
#[derive(Debug, Parser)]
#[command(name = "sketchboard", version)]
struct Cli {
    /// JSON script with optional `config` and a list of `actions`.
    script: PathBuf,

    /// Board config JSON; overrides the script's own config.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the cropped export. Nothing is written if omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output representation: `png` or `base64`.
    #[arg(short, long, default_value = "png")]
    format: ExportFormat,
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting SketchBoard");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ScriptResult<()> {
    let script = Script::load(&cli.script)?;
    let config = match &cli.config {
        Some(path) => BoardConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => script.config.clone().unwrap_or_default(),
    };

    let mut session = Session::new(&config)?;
    session.run(&script.actions)?;

    let board = session.board();
    let export = board.export()?;
    let summary = serde_json::json!({
        "history_len": board.history_len(),
        "can_undo": board.can_undo(),
        "can_redo": board.can_redo(),
        "toolbar": session.toolbar(),
        "export": export.as_ref().map(|image| serde_json::json!({
            "x": image.x,
            "y": image.y,
            "width": image.width,
            "height": image.height,
        })),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match (export, cli.out) {
        (Some(image), Some(path)) => {
            let bytes = image
                .to_bytes(cli.format)
                .map_err(|e| ScriptError::Board(e.into()))?;
            std::fs::write(&path, bytes)?;
            log::info!("Wrote {} export to {}", cli.format, path.display());
        }
        (None, Some(path)) => {
            log::warn!("Canvas is empty; not writing {}", path.display());
        }
        _ => {}
    }
    Ok(())
}
