/// EditorSession: the complete state of one editing session.
///
/// ## Ownership
///
///   - `grid`: painted content, the only source of truth.
///   - `pieces`: derived from `grid` by `segment()`. Rebuilt wholesale,
///     never patched. Only the pull handler writes to it, and only the
///     pulled level.
///
/// ## Interaction
///
/// Pointer input goes through the `PointerSink` methods:
///
///   Idle ──down──▶ Dragging(Paint)            mode = paint
///   Idle ──down──▶ Dragging(Pull{piece})      mode = debug, on a piece
///   Idle ──down──▶ Dragging(Inert)            mode = debug, off any piece
///   Dragging ──up──▶ Idle
///
/// A second down while dragging is ignored until the matching up.
/// Paint moves mark the piece set dirty; it is rebuilt once when the paint
/// drag ends (or by `sync()`), not on every move.
///
/// Positions outside the grid are "no cell" and never an error here.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::config::EditorSettings;
use crate::domain::grid::{ColorIndex, Grid};
use crate::domain::palette::Palette;
use crate::domain::piece::{PieceId, PieceSet};
use crate::domain::segment::segment;
use crate::error::{EditorError, Result};
use super::codec;
use super::event::EditorEvent;
use super::pointer::{pulled_level_for_drag, DragAction, DragState, Layout, Point};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Mode {
    #[default]
    Paint,
    Debug,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Paint => "paint",
            Mode::Debug => "debug",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "paint" => Ok(Mode::Paint),
            "debug" => Ok(Mode::Debug),
            other => Err(EditorError::InvalidMode(other.to_string())),
        }
    }
}

/// Brush for paint drags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PaintColor {
    Color(ColorIndex),
    Erase,
}

impl PaintColor {
    /// Cell value this brush writes.
    pub fn cell(self) -> Option<ColorIndex> {
        match self {
            PaintColor::Color(c) => Some(c),
            PaintColor::Erase => None,
        }
    }
}

impl Default for PaintColor {
    fn default() -> Self {
        PaintColor::Color(ColorIndex(0))
    }
}

/// Keys the core reacts to. Everything else belongs to the shell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EditorKey {
    Delete,
    Backspace,
    Other,
}

/// Platform-neutral input sink. A hosting shell adapts its own input
/// system to these calls.
pub trait PointerSink {
    fn on_pointer_down(&mut self, p: Point);
    fn on_pointer_move(&mut self, p: Point);
    fn on_pointer_up(&mut self, p: Point);
    /// Returns true if the key was consumed.
    fn on_key_down(&mut self, key: EditorKey) -> bool;
}

pub struct EditorSession {
    grid: Grid,
    pieces: PieceSet,
    pieces_dirty: bool,
    palette: Palette,

    mode: Mode,
    paint_color: PaintColor,
    pull_sensitivity: f32,

    layout: Layout,
    pointer: Option<Point>,
    drag: DragState,

    events: Vec<EditorEvent>,
}

// ── Construction ──

impl EditorSession {
    pub fn new(width: usize, height: usize, palette: Palette, settings: &EditorSettings) -> Self {
        let grid = Grid::new(width, height);
        let paint_color = match settings.initial_color {
            PaintColor::Color(c) if !palette.contains(c) => PaintColor::default(),
            other => other,
        };
        EditorSession {
            pieces: PieceSet::empty(width, height),
            grid,
            pieces_dirty: false,
            palette,
            mode: settings.initial_mode,
            paint_color,
            pull_sensitivity: settings.pull_sensitivity,
            layout: Layout::new(width, height, 1, 1),
            pointer: None,
            drag: DragState::Idle,
            events: vec![],
        }
    }
}

// ── Read-only accessors (rendering, hit-testing) ──

impl EditorSession {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pieces(&self) -> &PieceSet {
        &self.pieces
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn paint_color(&self) -> PaintColor {
        self.paint_color
    }

    #[allow(dead_code)]
    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    #[allow(dead_code)]
    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[allow(dead_code)]
    pub fn is_dirty(&self) -> bool {
        self.pieces_dirty
    }

    /// Cell under the pointer, if any.
    pub fn pointer_cell(&self) -> Option<(usize, usize)> {
        self.pointer.and_then(|p| self.layout.cell_at(p))
    }

    /// Piece to highlight in debug mode: the piece being pulled during a
    /// pull drag, nothing during other drags, else the piece under the
    /// pointer. Never mutates.
    pub fn hovered_piece(&self) -> Option<PieceId> {
        if self.mode != Mode::Debug {
            return None;
        }
        if self.drag.is_down() {
            return self.drag.pulled_piece();
        }
        let (x, y) = self.pointer_cell()?;
        self.pieces.piece_at(x, y)
    }

    /// Cell to preview the brush on: paint mode, pointer up, over the grid.
    pub fn paint_cursor(&self) -> Option<(usize, usize)> {
        if self.mode != Mode::Paint || self.drag.is_down() {
            return None;
        }
        self.pointer_cell()
    }

    /// Pulled level to draw a cell with. Always 0 in paint mode.
    pub fn display_pulled_level(&self, x: usize, y: usize) -> u8 {
        match self.mode {
            Mode::Paint => 0,
            Mode::Debug => self.pieces.pulled_level_at(x, y),
        }
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Commands ──

impl EditorSession {
    /// Switch mode. Always rebuilds the piece set, which resets every
    /// pulled level. An active drag is neutralized since its piece id (or
    /// its brush) no longer applies.
    pub fn set_mode(&mut self, mode: Mode) {
        if let DragState::Dragging { origin, .. } = self.drag {
            self.drag = DragState::Dragging { action: DragAction::Inert, origin };
        }
        self.mode = mode;
        self.resegment();
        info!(%mode, "mode changed");
        self.events.push(EditorEvent::ModeChanged { mode });
    }

    #[allow(dead_code)]
    pub fn set_mode_str(&mut self, tag: &str) -> Result<()> {
        let mode = tag.parse::<Mode>()?;
        self.set_mode(mode);
        Ok(())
    }

    pub fn set_paint_color(&mut self, color: PaintColor) -> Result<()> {
        if let PaintColor::Color(c) = color {
            if !self.palette.contains(c) {
                return Err(EditorError::InvalidColorIndex(c.0 as i32));
            }
        }
        self.paint_color = color;
        debug!(?color, "paint color changed");
        self.events.push(EditorEvent::PaintColorChanged { color });
        Ok(())
    }

    /// Integer form used by UI controls: any negative value is the erase
    /// sentinel, anything past the palette is rejected.
    pub fn set_paint_color_index(&mut self, index: i32) -> Result<()> {
        if index < 0 {
            return self.set_paint_color(PaintColor::Erase);
        }
        let c = u8::try_from(index).map_err(|_| EditorError::InvalidColorIndex(index))?;
        self.set_paint_color(PaintColor::Color(ColorIndex(c)))
    }

    pub fn clear_grid(&mut self) {
        self.grid.clear();
        self.drag_reset_if_pulling();
        self.resegment();
        info!("grid cleared");
        self.events.push(EditorEvent::GridCleared);
    }

    /// Renderer-owned geometry. Grid dimensions always follow the grid.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = Layout {
            grid_w: self.grid.width(),
            grid_h: self.grid.height(),
            ..layout
        }
        .sanitized();
    }

    /// Full rebuild of the piece set from the grid.
    pub fn resegment(&mut self) {
        self.pieces = segment(&self.grid);
        self.pieces_dirty = false;
        debug!(pieces = self.pieces.len(), "resegmented");
        self.events.push(EditorEvent::Resegmented { pieces: self.pieces.len() });
    }

    /// Rebuild only if painting has invalidated the piece set.
    pub fn sync(&mut self) {
        if self.pieces_dirty {
            self.resegment();
        }
    }

    fn drag_reset_if_pulling(&mut self) {
        if let DragState::Dragging { action: DragAction::Pull { .. }, origin } = self.drag {
            self.drag = DragState::Dragging { action: DragAction::Inert, origin };
        }
    }
}

// ── Persistence ──

impl EditorSession {
    pub fn save_to_string(&self) -> String {
        codec::encode_grid(&self.grid)
    }

    /// Replace the grid with decoded content and rebuild pieces.
    /// On a malformed string the grid falls back to empty, the failure is
    /// recorded as a `LoadFailed` event, and the error is returned.
    pub fn load_from_string(&mut self, s: &str) -> Result<usize> {
        let decoded = codec::decode_grid(s, self.grid.width(), self.grid.height(), &self.palette);
        self.drag = match self.drag {
            DragState::Dragging { origin, .. } => DragState::Dragging { action: DragAction::Inert, origin },
            DragState::Idle => DragState::Idle,
        };
        match decoded {
            Ok(grid) => {
                self.grid = grid;
                self.resegment();
                let cells = self.grid.painted_count();
                info!(cells, pieces = self.pieces.len(), "puzzle loaded");
                self.events.push(EditorEvent::Loaded { cells });
                Ok(cells)
            }
            Err(e) => {
                self.grid.clear();
                self.resegment();
                warn!(error = %e, "puzzle load failed, starting empty");
                self.events.push(EditorEvent::LoadFailed { reason: e.to_string() });
                Err(e)
            }
        }
    }
}

// ── Pointer handling ──

impl EditorSession {
    fn paint_cell(&mut self, x: usize, y: usize) {
        let value = self.paint_color.cell();
        if self.grid.at(x, y) == value {
            return;
        }
        if self.grid.set(x, y, value).is_ok() {
            self.pieces_dirty = true;
            self.events.push(EditorEvent::CellPainted { x, y, color: value });
        }
    }
}

impl PointerSink for EditorSession {
    fn on_pointer_down(&mut self, p: Point) {
        if self.drag.is_down() {
            return;
        }
        self.pointer = Some(p);

        let action = match self.mode {
            Mode::Paint => DragAction::Paint,
            Mode::Debug => {
                self.sync();
                let hit = self.layout.cell_at(p)
                    .and_then(|(x, y)| self.pieces.piece_at(x, y))
                    .and_then(|id| self.pieces.get(id).map(|piece| (id, piece.pulled_level)));
                match hit {
                    Some((piece, baseline)) => {
                        debug!(piece = piece.0, baseline, "piece grabbed");
                        self.events.push(EditorEvent::PieceGrabbed { piece, baseline });
                        DragAction::Pull { piece, baseline }
                    }
                    None => DragAction::Inert,
                }
            }
        };
        self.drag = DragState::Dragging { action, origin: p };
    }

    fn on_pointer_move(&mut self, p: Point) {
        self.pointer = Some(p);

        let DragState::Dragging { action, origin } = self.drag else {
            return;
        };
        match action {
            DragAction::Paint => {
                if let Some((x, y)) = self.layout.cell_at(p) {
                    self.paint_cell(x, y);
                }
            }
            DragAction::Pull { piece, baseline } => {
                let level = pulled_level_for_drag(baseline, origin.y, p.y, self.pull_sensitivity);
                let before = self.pieces.get(piece).map(|pc| pc.pulled_level);
                if before.is_some() && before != Some(level) {
                    if let Some(level) = self.pieces.set_pulled_level(piece, level) {
                        self.events.push(EditorEvent::PulledLevelChanged { piece, level });
                    }
                }
            }
            DragAction::Inert => {}
        }
    }

    fn on_pointer_up(&mut self, p: Point) {
        self.pointer = Some(p);
        let DragState::Dragging { action, .. } = self.drag else {
            return;
        };
        self.drag = DragState::Idle;
        if action == DragAction::Paint {
            self.sync();
        }
    }

    fn on_key_down(&mut self, key: EditorKey) -> bool {
        match key {
            EditorKey::Delete | EditorKey::Backspace => {
                self.paint_color = PaintColor::Erase;
                self.events.push(EditorEvent::PaintColorChanged { color: PaintColor::Erase });
                true
            }
            EditorKey::Other => false,
        }
    }
}
