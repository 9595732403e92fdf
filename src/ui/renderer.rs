/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer only reads the session, except for publishing the grid
/// `Layout` it derived from the terminal size so pointer hits line up with
/// what is on screen.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::palette::Rgb;
use crate::domain::piece::{PieceId, MAX_PULLED_LEVEL};
use crate::sim::pointer::{Layout, Point};
use crate::sim::session::{EditorSession, Mode, PaintColor};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every cell, so terminal default colors
    /// never show through between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Status line ──

/// Transient message shown under the grid, cleared after `ttl` frames.
#[derive(Default)]
pub struct StatusLine {
    pub text: String,
    ttl: u32,
}

impl StatusLine {
    pub fn set(&mut self, text: impl Into<String>, ttl: u32) {
        self.text = text.into();
        self.ttl = ttl;
    }

    /// Advance one frame.
    pub fn tick(&mut self) {
        if self.ttl > 0 {
            self.ttl -= 1;
            if self.ttl == 0 { self.text.clear(); }
        }
    }
}

// ── Renderer ──

/// Each grid cell is 2 terminal columns × 1 row.
pub const CELL_W: i32 = 2;
pub const CELL_H: i32 = 1;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// Rows a fully pulled bottom row hangs below the map.
const PULL_ROWS: usize = MAX_PULLED_LEVEL as usize;
/// HUD + gap above the map; pull overhang, message, gap, help below it.
const RESERVED_ROWS: usize = MAP_ROW + PULL_ROWS + 3;
/// Brightness of the shaft a pulled piece leaves behind.
const SHAFT_SHADE: f32 = 0.45;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const HIGHLIGHT: Color = Color::Rgb { r: 255, g: 255, b: 0 };
const GRID_DOT: Color = Color::Rgb { r: 70, g: 90, b: 120 };

fn to_color(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

/// Readable text color on top of `c`.
fn contrast(c: Rgb) -> Color {
    let luma = 299 * c.r as u32 + 587 * c.g as u32 + 114 * c.b as u32;
    if luma > 128_000 { Color::Black } else { Color::White }
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_mode: Option<Mode>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_mode: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Grid placement for a terminal of `term_w × term_h`.
    pub fn layout_for(term_w: usize, term_h: usize, grid_w: usize, grid_h: usize) -> Layout {
        let view_h = term_h.saturating_sub(RESERVED_ROWS) as i32;
        let base = Layout::new(grid_w, grid_h, CELL_W, CELL_H).centered(term_w as i32, view_h);
        let mut origin = base.origin;
        origin.y += MAP_ROW as i32;
        base.with_origin(origin)
    }

    /// Hand the session the grid placement for the current terminal size.
    pub fn publish_layout(&self, session: &mut EditorSession) {
        let (gw, gh) = (session.grid().width(), session.grid().height());
        session.set_layout(Self::layout_for(self.term_w, self.term_h, gw, gh));
    }

    pub fn render(&mut self, session: &mut EditorSession, status: &StatusLine) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.publish_layout(session);

        // Mode switch → clean repaint
        if self.last_mode != Some(session.mode()) {
            self.back.cells.fill(Cell::INVALID);
            self.last_mode = Some(session.mode());
        }

        self.front.clear();
        self.compose_hud(session);
        self.compose_grid(session);
        self.compose_footer(session, status);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, s: &EditorSession) {
        let brush = match s.paint_color() {
            PaintColor::Color(c) => format!("color {}", c.0),
            PaintColor::Erase => "erase".to_string(),
        };
        let hud = format!(
            " PIECE GRID  mode:{:<5}  brush:{:<8}  cells:{:<4}  pieces:{} ",
            s.mode(), brush, s.grid().painted_count(), s.pieces().len(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // Brush swatch after the text
        if let PaintColor::Color(c) = s.paint_color() {
            if let Some(rgb) = s.palette().get(c) {
                let x = hud.chars().count();
                self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, to_color(rgb)));
                self.front.set(x + 1, HUD_ROW, Cell::new(' ', Color::White, to_color(rgb)));
            }
        }
    }

    fn compose_grid(&mut self, s: &EditorSession) {
        let layout = s.layout();
        let hovered = s.hovered_piece();
        let cursor = s.paint_cursor();
        let mut pulled = Vec::new();

        for y in 0..layout.grid_h {
            for x in 0..layout.grid_w {
                let level = s.display_pulled_level(x, y);
                let visual = if level > 0 {
                    pulled.push((level, x, y));
                    shaft_visual(s, x, y, hovered)
                } else {
                    cell_visual(s, x, y, 0, hovered, cursor)
                };
                self.put_cell(layout.cell_origin(x, y), visual);
            }
        }

        // Pulled faces hang `level` rows below their cell, over whatever is
        // there; deeper pulls are drawn last.
        pulled.sort_by_key(|&(level, _, _)| level);
        for (level, x, y) in pulled {
            let mut at = layout.cell_origin(x, y);
            for _ in 1..level {
                at.y += CELL_H;
                self.put_cell(at, shaft_visual(s, x, y, hovered));
            }
            at.y += CELL_H;
            self.put_cell(at, cell_visual(s, x, y, level, hovered, cursor));
        }
    }

    fn put_cell(&mut self, at: Point, (c0, c1): (Cell, Cell)) {
        if at.x < 0 || at.y < 0 { return; }
        let (col, row) = (at.x as usize, at.y as usize);
        if row >= self.front.height { return; }
        self.front.set(col, row, c0);
        self.front.set(col + 1, row, c1);
    }

    fn compose_footer(&mut self, s: &EditorSession, status: &StatusLine) {
        let layout = s.layout();
        let map_bottom = (layout.origin.y.max(0) as usize) + layout.grid_h * CELL_H as usize + PULL_ROWS;
        let height = self.front.height;
        let msg_row = map_bottom.min(height.saturating_sub(3));
        let help_row = (map_bottom + 2).min(height.saturating_sub(1));

        if !status.text.is_empty() && msg_row < height {
            let msg = format!(" ◈ {} ", status.text);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        if help_row < height && help_row != msg_row {
            let help = match s.mode() {
                Mode::Paint => " P:Paint D:Debug │ 0-9:Color E/Del:Erase │ C:Clear S:Save L:Load Q:Quit │ drag to paint",
                Mode::Debug => " P:Paint D:Debug │ S:Save L:Load Q:Quit │ drag a piece up/down to pull it",
            };
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }
}

/// Two terminal cells for the face of grid cell (x, y), drawn at `level`.
fn cell_visual(
    s: &EditorSession,
    x: usize,
    y: usize,
    level: u8,
    hovered: Option<PieceId>,
    cursor: Option<(usize, usize)>,
) -> (Cell, Cell) {
    let painted = s.grid().get(x, y).ok().flatten().and_then(|c| s.palette().get(c));

    // Brush preview in paint mode
    if cursor == Some((x, y)) {
        return match s.paint_color() {
            PaintColor::Color(c) => {
                let rgb = s.palette().get(c).unwrap_or(Rgb::new(255, 255, 255));
                let bg = to_color(rgb.darken(0.6));
                (Cell::new('[', to_color(rgb), bg), Cell::new(']', to_color(rgb), bg))
            }
            PaintColor::Erase => {
                let bg = painted.map_or(Color::Reset, to_color);
                (Cell::new('[', HIGHLIGHT, bg), Cell::new(']', HIGHLIGHT, bg))
            }
        };
    }

    let Some(rgb) = painted else {
        return (Cell::new('·', GRID_DOT, Color::Reset), Cell::new(' ', GRID_DOT, Color::Reset));
    };

    let face = piece_color(s, x, y, rgb, hovered);
    let fg = contrast(face);
    let glyph = if level > 0 {
        char::from_digit(level as u32, 10).unwrap_or('?')
    } else {
        ' '
    };
    (Cell::new(glyph, fg, to_color(face)), Cell::new(' ', fg, to_color(face)))
}

/// Darkened column between a pulled cell's home row and its face.
fn shaft_visual(s: &EditorSession, x: usize, y: usize, hovered: Option<PieceId>) -> (Cell, Cell) {
    let rgb = s.grid().get(x, y).ok().flatten()
        .and_then(|c| s.palette().get(c))
        .unwrap_or(Rgb::new(0, 0, 0));
    let bg = to_color(piece_color(s, x, y, rgb, hovered).darken(SHAFT_SHADE));
    (Cell::new(' ', Color::White, bg), Cell::new(' ', Color::White, bg))
}

fn piece_color(s: &EditorSession, x: usize, y: usize, rgb: Rgb, hovered: Option<PieceId>) -> Rgb {
    if hovered.is_some() && s.pieces().piece_at(x, y) == hovered {
        Rgb::new(255, 255, 0)
    } else {
        rgb
    }
}
