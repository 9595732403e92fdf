/// The painted grid: the single source of truth for editor content.
///
/// Each cell is either empty (`None`) or holds a `ColorIndex` into the
/// session palette. Dimensions are fixed at construction.
///
/// The public accessors are bounds-checked and return `OutOfBounds`
/// rather than silently clamping. `at()` is the unchecked fast path for
/// code that has already validated its coordinates (segmentation).

use crate::error::{EditorError, Result};

/// Index into the palette.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ColorIndex(pub u8);

impl ColorIndex {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<Option<ColorIndex>>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![vec![None; width]; height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Option<ColorIndex>> {
        self.check(x, y)?;
        Ok(self.cells[y][x])
    }

    pub fn set(&mut self, x: usize, y: usize, value: Option<ColorIndex>) -> Result<()> {
        self.check(x, y)?;
        self.cells[y][x] = value;
        Ok(())
    }

    /// Unchecked read. Panics on out-of-range coordinates.
    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> Option<ColorIndex> {
        self.cells[y][x]
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(None);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(Option::is_none))
    }

    /// Painted cells in row-major order (top row first).
    pub fn painted_cells(&self) -> impl Iterator<Item = (usize, usize, ColorIndex)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter().enumerate().filter_map(move |(x, c)| c.map(|c| (x, y, c)))
        })
    }

    pub fn painted_count(&self) -> usize {
        self.painted_cells().count()
    }

    fn check(&self, x: usize, y: usize) -> Result<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(EditorError::OutOfBounds { x: x as i64, y: y as i64 })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a grid from a diagram. `.` is empty, digits are color indices.
    pub(crate) fn grid_from(rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let mut grid = Grid::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if let Some(d) = ch.to_digit(10) {
                    grid.set(x, y, Some(ColorIndex(d as u8))).unwrap();
                }
            }
        }
        grid
    }

    #[test]
    fn new_grid_is_empty() {
        let g = Grid::new(32, 32);
        assert!(g.is_empty());
        assert_eq!(g.painted_count(), 0);
        assert_eq!(g.get(31, 31).unwrap(), None);
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let mut g = Grid::new(4, 3);
        assert!(matches!(g.get(4, 0), Err(EditorError::OutOfBounds { x: 4, y: 0 })));
        assert!(matches!(g.set(0, 3, Some(ColorIndex(1))), Err(EditorError::OutOfBounds { .. })));
        assert!(g.is_empty());
    }

    #[test]
    fn painted_cells_are_row_major() {
        let g = grid_from(&[
            ".1.",
            "2.3",
        ]);
        let cells: Vec<_> = g.painted_cells().collect();
        assert_eq!(cells, vec![
            (1, 0, ColorIndex(1)),
            (0, 1, ColorIndex(2)),
            (2, 1, ColorIndex(3)),
        ]);
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut g = grid_from(&["12", "34"]);
        g.clear();
        assert!(g.is_empty());
    }
}
