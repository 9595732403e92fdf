/// Pieces: maximal 4-connected groups of same-colored cells.
///
/// A `PieceSet` is derived state. It is produced wholesale by
/// `segment::segment()` and never patched cell by cell. The only mutation
/// allowed afterwards is the pulled level, and only from inside the crate
/// (the session's pull handler).
///
/// `PieceId`s are valid only for the set that issued them; any
/// re-segmentation reassigns every id.

use super::grid::ColorIndex;

/// Highest pulled level a piece can be displaced to.
pub const MAX_PULLED_LEVEL: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct PieceId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub color: ColorIndex,
    /// Cells in discovery order. Never empty.
    pub blocks: Vec<(usize, usize)>,
    /// Visual-only vertical offset, `0..=MAX_PULLED_LEVEL`.
    pub pulled_level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceSet {
    pieces: Vec<Piece>,
    /// `matrix[y][x]` is the owning piece, `None` for empty cells.
    matrix: Vec<Vec<Option<PieceId>>>,
    width: usize,
    height: usize,
}

impl PieceSet {
    pub fn empty(width: usize, height: usize) -> Self {
        PieceSet {
            pieces: vec![],
            matrix: vec![vec![None; width]; height],
            width,
            height,
        }
    }

    pub(super) fn from_parts(
        pieces: Vec<Piece>,
        matrix: Vec<Vec<Option<PieceId>>>,
        width: usize,
        height: usize,
    ) -> Self {
        PieceSet { pieces, matrix, width, height }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0)
    }

    /// Owning piece of a cell. Out-of-range coordinates own nothing.
    #[inline]
    pub fn piece_at(&self, x: usize, y: usize) -> Option<PieceId> {
        if x < self.width && y < self.height {
            self.matrix[y][x]
        } else {
            None
        }
    }

    pub fn pulled_level_at(&self, x: usize, y: usize) -> u8 {
        self.piece_at(x, y)
            .and_then(|id| self.get(id))
            .map_or(0, |p| p.pulled_level)
    }

    /// Set a piece's pulled level, clamped to `0..=MAX_PULLED_LEVEL`.
    /// Returns the stored value, or `None` for an unknown id.
    pub(crate) fn set_pulled_level(&mut self, id: PieceId, level: u8) -> Option<u8> {
        let piece = self.pieces.get_mut(id.0)?;
        piece.pulled_level = level.min(MAX_PULLED_LEVEL);
        Some(piece.pulled_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_piece_set() -> PieceSet {
        let piece = Piece {
            color: ColorIndex(4),
            blocks: vec![(1, 0), (1, 1)],
            pulled_level: 0,
        };
        let mut matrix = vec![vec![None; 3]; 2];
        matrix[0][1] = Some(PieceId(0));
        matrix[1][1] = Some(PieceId(0));
        PieceSet::from_parts(vec![piece], matrix, 3, 2)
    }

    #[test]
    fn piece_at_is_bounds_safe() {
        let set = one_piece_set();
        assert_eq!(set.piece_at(1, 1), Some(PieceId(0)));
        assert_eq!(set.piece_at(0, 0), None);
        assert_eq!(set.piece_at(3, 0), None);
        assert_eq!(set.piece_at(0, 99), None);
    }

    #[test]
    fn pulled_level_is_clamped() {
        let mut set = one_piece_set();
        assert_eq!(set.set_pulled_level(PieceId(0), 2), Some(2));
        assert_eq!(set.pulled_level_at(1, 0), 2);
        assert_eq!(set.set_pulled_level(PieceId(0), 200), Some(MAX_PULLED_LEVEL));
        assert_eq!(set.set_pulled_level(PieceId(7), 1), None);
    }

    #[test]
    fn empty_set_owns_nothing() {
        let set = PieceSet::empty(4, 4);
        assert!(set.is_empty());
        assert_eq!(set.piece_at(2, 2), None);
        assert_eq!(set.pulled_level_at(2, 2), 0);
    }
}
