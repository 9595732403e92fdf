/// Pointer geometry and drag state.
///
/// ## Coordinate spaces
///
/// Pointer events arrive in a local 2-D space (terminal cells for the
/// crossterm shell, but nothing here assumes that). `Layout` maps that
/// space onto grid cells:
///   - `origin`: local position of the grid's top-left corner
///   - `cell_w` / `cell_h`: size of one grid cell in local units
///
/// Points left of or above the grid floor to negative cells and are
/// rejected, so every position outside the grid is simply "no cell".

use crate::domain::piece::{PieceId, MAX_PULLED_LEVEL};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub origin: Point,
    pub cell_w: i32,
    pub cell_h: i32,
    pub grid_w: usize,
    pub grid_h: usize,
}

impl Layout {
    /// Grid at the local origin with the given cell size.
    pub fn new(grid_w: usize, grid_h: usize, cell_w: i32, cell_h: i32) -> Self {
        Layout {
            origin: Point::new(0, 0),
            cell_w: cell_w.max(1),
            cell_h: cell_h.max(1),
            grid_w,
            grid_h,
        }
    }

    /// Center the grid inside a `view_w × view_h` area. When the grid is
    /// larger than the view on an axis, it is pinned to the top/left edge.
    pub fn centered(self, view_w: i32, view_h: i32) -> Self {
        let pad = |view: i32, cells: usize, size: i32| {
            let span = cells as i64 * size.max(1) as i64;
            ((view as i64 - span) / 2).clamp(0, i32::MAX as i64) as i32
        };
        Layout {
            origin: Point::new(
                pad(view_w, self.grid_w, self.cell_w),
                pad(view_h, self.grid_h, self.cell_h),
            ),
            ..self
        }
    }

    pub fn with_origin(self, origin: Point) -> Self {
        Layout { origin, ..self }
    }

    /// Same layout with cell sizes forced to at least one unit.
    pub fn sanitized(self) -> Self {
        Layout {
            cell_w: self.cell_w.max(1),
            cell_h: self.cell_h.max(1),
            ..self
        }
    }

    /// Grid cell under a local point, or `None` outside the grid.
    /// Any `i32` point is accepted; offsets are taken in `i64`.
    pub fn cell_at(&self, p: Point) -> Option<(usize, usize)> {
        let cx = (p.x as i64 - self.origin.x as i64).div_euclid(self.cell_w.max(1) as i64);
        let cy = (p.y as i64 - self.origin.y as i64).div_euclid(self.cell_h.max(1) as i64);
        let cx = usize::try_from(cx).ok()?;
        let cy = usize::try_from(cy).ok()?;
        if cx < self.grid_w && cy < self.grid_h {
            Some((cx, cy))
        } else {
            None
        }
    }

    /// Local position of a cell's top-left corner.
    pub fn cell_origin(&self, x: usize, y: usize) -> Point {
        let step = |o: i32, i: usize, size: i32| {
            (o as i64 + i as i64 * size as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
        };
        Point::new(
            step(self.origin.x, x, self.cell_w),
            step(self.origin.y, y, self.cell_h),
        )
    }
}

/// What an active drag does on each move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragAction {
    Paint,
    /// Pull a piece; `baseline` is its level when the drag began.
    Pull { piece: PieceId, baseline: u8 },
    /// Pointer is down but landed on nothing draggable (debug mode, no piece).
    Inert,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { action: DragAction, origin: Point },
}

impl DragState {
    pub fn is_down(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    pub fn pulled_piece(&self) -> Option<PieceId> {
        match self {
            DragState::Dragging { action: DragAction::Pull { piece, .. }, .. } => Some(*piece),
            _ => None,
        }
    }
}

/// Pulled level for a pull drag:
/// `clamp(round(baseline + (current_y - origin_y) / sensitivity), 0, MAX)`.
///
/// Halves round toward +∞. A non-positive sensitivity is treated as the
/// smallest positive step.
pub fn pulled_level_for_drag(baseline: u8, origin_y: i32, current_y: i32, sensitivity: f32) -> u8 {
    let step = sensitivity.max(f32::EPSILON);
    let raw = baseline as f32 + (current_y as f32 - origin_y as f32) / step;
    let rounded = (raw + 0.5).floor();
    if rounded.is_nan() {
        return baseline.min(MAX_PULLED_LEVEL);
    }
    rounded.clamp(0.0, MAX_PULLED_LEVEL as f32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cell_at_maps_inside_points() {
        let l = Layout::new(32, 32, 2, 1).with_origin(Point::new(4, 2));
        assert_eq!(l.cell_at(Point::new(4, 2)), Some((0, 0)));
        assert_eq!(l.cell_at(Point::new(5, 2)), Some((0, 0)));
        assert_eq!(l.cell_at(Point::new(6, 3)), Some((1, 1)));
        assert_eq!(l.cell_at(Point::new(4 + 63, 2 + 31)), Some((31, 31)));
    }

    #[test]
    fn cell_at_rejects_outside_points() {
        let l = Layout::new(32, 32, 2, 1).with_origin(Point::new(4, 2));
        assert_eq!(l.cell_at(Point::new(3, 2)), None); // one column left
        assert_eq!(l.cell_at(Point::new(4, 1)), None); // one row above
        assert_eq!(l.cell_at(Point::new(4 + 64, 2)), None);
        assert_eq!(l.cell_at(Point::new(4, 2 + 32)), None);
        assert_eq!(l.cell_at(Point::new(i32::MIN / 2, 0)), None);
    }

    #[test]
    fn extreme_points_are_no_cell() {
        let l = Layout::new(4, 4, 2, 1).with_origin(Point::new(10, 5));
        assert_eq!(l.cell_at(Point::new(i32::MIN, 0)), None);
        assert_eq!(l.cell_at(Point::new(i32::MAX, i32::MAX)), None);
        assert_eq!(l.cell_at(Point::new(0, i32::MIN)), None);

        let far = Layout::new(4, 4, 2, 1).with_origin(Point::new(i32::MAX, i32::MIN));
        assert_eq!(far.cell_at(Point::new(i32::MIN, i32::MAX)), None);
    }

    #[test]
    fn zero_cell_size_is_one_unit() {
        let raw = Layout { cell_w: 0, cell_h: -3, ..Layout::new(4, 4, 1, 1) };
        assert_eq!(raw.cell_at(Point::new(2, 3)), Some((2, 3)));
        let fixed = raw.sanitized();
        assert_eq!((fixed.cell_w, fixed.cell_h), (1, 1));
    }

    #[test]
    fn centered_layout() {
        let l = Layout::new(4, 4, 2, 1).centered(20, 10);
        assert_eq!(l.origin, Point::new(6, 3));
        // Too small a view pins to the corner.
        let l = Layout::new(32, 32, 2, 1).centered(40, 20);
        assert_eq!(l.origin, Point::new(0, 0));
    }

    #[test]
    fn cell_origin_inverts_cell_at() {
        let l = Layout::new(8, 8, 3, 2).with_origin(Point::new(1, 1));
        let p = l.cell_origin(5, 6);
        assert_eq!(l.cell_at(p), Some((5, 6)));
    }

    #[test]
    fn pull_rounds_and_clamps() {
        assert_eq!(pulled_level_for_drag(0, 10, 10, 1.0), 0);
        assert_eq!(pulled_level_for_drag(0, 10, 12, 1.0), 2);
        assert_eq!(pulled_level_for_drag(1, 10, 9, 1.0), 0);
        assert_eq!(pulled_level_for_drag(0, 0, 10, 20.0), 1); // 0.5 rounds up
        assert_eq!(pulled_level_for_drag(0, 0, 9, 20.0), 0);
        assert_eq!(pulled_level_for_drag(2, 0, 1000, 1.0), MAX_PULLED_LEVEL);
        assert_eq!(pulled_level_for_drag(2, 0, -1000, 1.0), 0);
    }

    #[test]
    fn drag_state_queries() {
        let d = DragState::Dragging {
            action: DragAction::Pull { piece: PieceId(3), baseline: 1 },
            origin: Point::new(0, 0),
        };
        assert!(d.is_down());
        assert_eq!(d.pulled_piece(), Some(PieceId(3)));
        assert!(!DragState::Idle.is_down());
        assert_eq!(DragState::Idle.pulled_piece(), None);
    }

    proptest! {
        #[test]
        fn pull_never_leaves_range(
            baseline in 0u8..=MAX_PULLED_LEVEL,
            origin in -100_000i32..100_000,
            current in -100_000i32..100_000,
            sensitivity in -5.0f32..50.0,
        ) {
            let level = pulled_level_for_drag(baseline, origin, current, sensitivity);
            prop_assert!(level <= MAX_PULLED_LEVEL);
        }
    }
}
