/// Entry point and editor loop.

mod config;
mod domain;
mod error;
mod logging;
mod sim;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::event::KeyCode;
use tracing::{debug, info, warn};

use config::EditorConfig;
use logging::{LogConfig, LogTarget};
use sim::codec;
use sim::event::EditorEvent;
use sim::session::{EditorSession, Mode, PaintColor};
use ui::input::InputState;
use ui::renderer::{Renderer, StatusLine};

const FRAME_SLEEP: Duration = Duration::from_millis(10);
const MSG_FRAMES: u32 = 300;

#[derive(Parser)]
#[command(
    name = "piecegrid",
    version,
    about = "Paint a grid, split it into pieces, pull pieces apart to inspect them"
)]
struct Cli {
    /// Puzzle to open: a token string (`0,2,...`) or a share URL with `?puzzle=`.
    #[arg(long, value_name = "TOKENS|URL", conflicts_with = "file")]
    puzzle: Option<String>,

    /// Puzzle file to open (as written by the save key).
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). Overrides config.toml.
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Write logs to a file. Overrides config.toml.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Load, print the token string, share URL and pieces, then exit.
    #[arg(long)]
    print_only: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = EditorConfig::load();

    let level = LogConfig::parse_level(cli.log_level.as_deref().unwrap_or(&config.log.level));
    let target = match cli.log_file.clone().or_else(|| config.log.file.clone()) {
        Some(path) => LogTarget::File(path),
        None if cli.print_only => LogTarget::Stderr,
        None => LogTarget::Off,
    };
    if let Err(e) = logging::init_logging(&LogConfig { level, target }) {
        eprintln!("Warning: could not open log file: {e}");
    }
    for w in &config.warnings {
        eprintln!("Warning: {w}");
        warn!("{w}");
    }

    let mut session = EditorSession::new(
        config.grid.width,
        config.grid.height,
        config.palette.clone(),
        &config.editor,
    );
    let mut status = StatusLine::default();
    let loaded = startup_load(&mut session, &cli, &mut status);

    if cli.print_only {
        print_summary(&session, &config);
        return if loaded { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return ExitCode::FAILURE;
    }
    renderer.publish_layout(&mut session);

    let result = editor_loop(&mut session, &mut renderer, &mut status);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Editor error: {e}");
        return ExitCode::FAILURE;
    }

    let token = session.save_to_string();
    println!("Share: {}", codec::share_url(&config.editor.share_base_url, &token));
    ExitCode::SUCCESS
}

/// Apply `--puzzle` / `--file`. Returns false if a requested load failed.
fn startup_load(session: &mut EditorSession, cli: &Cli, status: &mut StatusLine) -> bool {
    let source = if let Some(arg) = &cli.puzzle {
        match codec::decode_puzzle_arg(arg) {
            Some(tokens) => Ok(tokens),
            None => Err(format!("no `{}` parameter in URL", codec::QUERY_PARAM)),
        }
    } else if let Some(path) = &cli.file {
        codec::load_file(path).map_err(|e| format!("{}: {e}", path.display()))
    } else {
        return true;
    };

    let result = source.and_then(|tokens| session.load_from_string(&tokens).map_err(|e| e.to_string()));
    match result {
        Ok(cells) => {
            status.set(format!("Loaded {cells} cells, {} pieces", session.pieces().len()), MSG_FRAMES);
            true
        }
        Err(reason) => {
            warn!(%reason, "startup load failed");
            if cli.print_only {
                eprintln!("Load failed: {reason}");
            }
            status.set(format!("Load failed: {reason}"), MSG_FRAMES);
            false
        }
    }
}

fn print_summary(session: &EditorSession, config: &EditorConfig) {
    let token = session.save_to_string();
    println!("{token}");
    println!("{}", codec::share_url(&config.editor.share_base_url, &token));
    println!(
        "{}x{} grid, {} cells, {} pieces",
        session.grid().width(), session.grid().height(),
        session.grid().painted_count(), session.pieces().len(),
    );
    for (i, piece) in session.pieces().pieces().iter().enumerate() {
        let (x, y) = piece.blocks[0];
        println!("  piece {:>3}: color {} · {} blocks · first ({}, {})",
            i, piece.color.0, piece.blocks.len(), x, y);
    }
}

fn editor_loop(
    session: &mut EditorSession,
    renderer: &mut Renderer,
    status: &mut StatusLine,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = InputState::new();

    loop {
        input.drain_events();

        if input.ctrl_c_pressed() || input.any_pressed(KEYS_QUIT) {
            break;
        }

        input.dispatch(session);
        handle_commands(session, &input, status);

        // Batched segmentation: at most once per frame.
        session.sync();
        announce(session.drain_events(), status);
        status.tick();

        renderer.render(session, status)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_PAINT: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_DEBUG: &[KeyCode] = &[KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_ERASE: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
const KEYS_CLEAR: &[KeyCode] = &[KeyCode::Char('c'), KeyCode::Char('C')];
const KEYS_SAVE: &[KeyCode] = &[KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RELOAD: &[KeyCode] = &[KeyCode::Char('l'), KeyCode::Char('L')];

fn handle_commands(session: &mut EditorSession, input: &InputState, status: &mut StatusLine) {
    if input.any_pressed(KEYS_PAINT) {
        session.set_mode(Mode::Paint);
    } else if input.any_pressed(KEYS_DEBUG) {
        session.set_mode(Mode::Debug);
    }

    if let Some(d) = input.pressed_digit() {
        if let Err(e) = session.set_paint_color_index(d as i32) {
            status.set(e.to_string(), MSG_FRAMES);
        }
    } else if input.any_pressed(KEYS_ERASE) {
        if let Err(e) = session.set_paint_color(PaintColor::Erase) {
            status.set(e.to_string(), MSG_FRAMES);
        }
    }

    if input.any_pressed(KEYS_CLEAR) && !input.ctrl_c_pressed() {
        session.clear_grid();
    }

    if input.any_pressed(KEYS_SAVE) {
        let token = session.save_to_string();
        let path = codec::default_puzzle_path();
        match codec::save_file(&path, &token) {
            Ok(()) => {
                info!(path = %path.display(), "puzzle saved");
                status.set(format!("Saved {} │ {}", path.display(), token), MSG_FRAMES);
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                status.set(format!("Save failed: {e}"), MSG_FRAMES);
            }
        }
    } else if input.any_pressed(KEYS_RELOAD) {
        let path = codec::default_puzzle_path();
        match codec::load_file(&path) {
            Ok(tokens) => {
                if let Err(e) = session.load_from_string(&tokens) {
                    status.set(format!("Load failed: {e}"), MSG_FRAMES);
                }
            }
            Err(e) => status.set(format!("Nothing to load: {e}"), MSG_FRAMES),
        }
    }
}

/// Turn session events into status messages and logs.
fn announce(events: Vec<EditorEvent>, status: &mut StatusLine) {
    for event in events {
        match event {
            EditorEvent::ModeChanged { mode } => status.set(format!("Mode: {mode}"), MSG_FRAMES / 2),
            EditorEvent::PaintColorChanged { color } => {
                let label = match color {
                    PaintColor::Color(c) => format!("Brush: color {}", c.0),
                    PaintColor::Erase => "Brush: erase".to_string(),
                };
                status.set(label, MSG_FRAMES / 2);
            }
            EditorEvent::GridCleared => status.set("Grid cleared", MSG_FRAMES / 2),
            EditorEvent::Loaded { cells } => status.set(format!("Loaded {cells} cells"), MSG_FRAMES),
            EditorEvent::LoadFailed { reason } => status.set(format!("Load failed: {reason}"), MSG_FRAMES),
            EditorEvent::PulledLevelChanged { piece, level } => {
                debug!(piece = piece.0, level, "pulled");
            }
            EditorEvent::PieceGrabbed { .. }
            | EditorEvent::CellPainted { .. }
            | EditorEvent::Resegmented { .. } => {}
        }
    }
}
