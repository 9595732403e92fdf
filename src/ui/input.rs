/// Input state tracker.
///
/// Drains crossterm events once per frame and sorts them into:
///   - fresh key presses (edge-triggered; Release events are ignored)
///   - pointer inputs, translated from terminal mouse events
///
/// Mouse coordinates are terminal cells and are passed through unchanged
/// as the editor's local pointer space; the renderer's `Layout` maps them
/// onto grid cells.
///
/// A left-button press is delivered as down followed by a move at the same
/// point, so a single click paints the cell under it.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::sim::pointer::Point;
use crate::sim::session::{EditorKey, PointerSink};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerInput {
    Down(Point),
    Move(Point),
    Up(Point),
}

pub struct InputState {
    /// Keys pressed during the most recent `drain_events()`.
    pub pressed: Vec<KeyEvent>,
    /// Pointer inputs in arrival order.
    pub pointer: Vec<PointerInput>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            pressed: Vec::with_capacity(8),
            pointer: Vec::with_capacity(16),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        self.pointer.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if key.kind != KeyEventKind::Release {
                        self.pressed.push(key);
                    }
                }
                Ok(Event::Mouse(m)) => self.pointer.extend(translate_mouse(m)),
                _ => {}
            }
        }
    }

    /// Feed this frame's pointer inputs and core keys to a sink.
    pub fn dispatch(&self, sink: &mut impl PointerSink) {
        for input in &self.pointer {
            match *input {
                PointerInput::Down(p) => sink.on_pointer_down(p),
                PointerInput::Move(p) => sink.on_pointer_move(p),
                PointerInput::Up(p) => sink.on_pointer_up(p),
            }
        }
        for key in &self.pressed {
            sink.on_key_down(editor_key(key.code));
        }
    }

    /// Was any of these keys pressed this frame?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        self.pressed.iter().any(|k| codes.contains(&k.code))
    }

    /// Digit key pressed this frame, if any (last one wins).
    pub fn pressed_digit(&self) -> Option<u8> {
        self.pressed.iter().rev().find_map(|k| match k.code {
            KeyCode::Char(c) => c.to_digit(10).map(|d| d as u8),
            _ => None,
        })
    }

    /// Check if any key event this frame is Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.pressed.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

pub fn editor_key(code: KeyCode) -> EditorKey {
    match code {
        KeyCode::Delete => EditorKey::Delete,
        KeyCode::Backspace => EditorKey::Backspace,
        _ => EditorKey::Other,
    }
}

/// Terminal mouse event → pointer inputs. Only the left button drags.
pub fn translate_mouse(m: MouseEvent) -> Vec<PointerInput> {
    let p = Point::new(m.column as i32, m.row as i32);
    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => vec![PointerInput::Down(p), PointerInput::Move(p)],
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => vec![PointerInput::Move(p)],
        MouseEventKind::Up(MouseButton::Left) => vec![PointerInput::Up(p)],
        _ => vec![],
    }
}
