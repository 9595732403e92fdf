/// Events emitted by session mutators.
/// The shell drains these for logging and the status line; they carry no
/// state the session itself depends on.

use crate::domain::grid::ColorIndex;
use crate::domain::piece::PieceId;
use super::session::{Mode, PaintColor};

#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    CellPainted { x: usize, y: usize, color: Option<ColorIndex> },
    PieceGrabbed { piece: PieceId, baseline: u8 },
    PulledLevelChanged { piece: PieceId, level: u8 },
    Resegmented { pieces: usize },
    ModeChanged { mode: Mode },
    PaintColorChanged { color: PaintColor },
    GridCleared,
    Loaded { cells: usize },
    LoadFailed { reason: String },
}
