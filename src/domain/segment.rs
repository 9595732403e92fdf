/// Segmentation: partition a grid into pieces.
///
/// Cells are scanned row-major, top row first. Each painted cell not yet
/// owned by a piece seeds a new piece, which is grown by a 4-neighbor flood
/// fill over cells of the same color. The fill uses an explicit stack, so
/// memory is bounded by the grid size rather than call depth.
///
/// Piece ids follow scan order starting at 0. Every rebuilt piece starts at
/// pulled level 0; levels from a previous set are not carried over.
///
/// O(W·H): each cell is pushed at most four times and claimed once.

use super::grid::Grid;
use super::piece::{Piece, PieceId, PieceSet};

pub fn segment(grid: &Grid) -> PieceSet {
    let (width, height) = (grid.width(), grid.height());
    let mut matrix: Vec<Vec<Option<PieceId>>> = vec![vec![None; width]; height];
    let mut pieces: Vec<Piece> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(64);

    for y in 0..height {
        for x in 0..width {
            let color = match grid.at(x, y) {
                Some(c) if matrix[y][x].is_none() => c,
                _ => continue,
            };

            let id = PieceId(pieces.len());
            let mut blocks = Vec::new();
            stack.clear();
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                if matrix[cy][cx].is_some() || grid.at(cx, cy) != Some(color) {
                    continue;
                }
                matrix[cy][cx] = Some(id);
                blocks.push((cx, cy));

                if cx > 0 { stack.push((cx - 1, cy)); }
                if cx + 1 < width { stack.push((cx + 1, cy)); }
                if cy > 0 { stack.push((cx, cy - 1)); }
                if cy + 1 < height { stack.push((cx, cy + 1)); }
            }

            pieces.push(Piece { color, blocks, pulled_level: 0 });
        }
    }

    PieceSet::from_parts(pieces, matrix, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use crate::domain::grid::ColorIndex;
    use proptest::prelude::*;
    use std::collections::{BTreeSet, VecDeque};

    fn block_set(piece: &Piece) -> BTreeSet<(usize, usize)> {
        piece.blocks.iter().copied().collect()
    }

    #[test]
    fn empty_grid_has_no_pieces() {
        let set = segment(&Grid::new(32, 32));
        assert!(set.is_empty());
        assert_eq!(set.piece_at(0, 0), None);
    }

    #[test]
    fn gap_splits_same_color_row() {
        let set = segment(&grid_from(&["22.2"]));
        assert_eq!(set.len(), 2);
        assert_eq!(block_set(&set.pieces()[0]), BTreeSet::from([(0, 0), (1, 0)]));
        assert_eq!(block_set(&set.pieces()[1]), BTreeSet::from([(3, 0)]));
        assert_eq!(set.pieces()[0].color, ColorIndex(2));
        assert_eq!(set.piece_at(2, 0), None);
    }

    #[test]
    fn l_shape_is_one_piece() {
        let set = segment(&grid_from(&[
            "1..",
            "1..",
            "11.",
        ]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.pieces()[0].blocks.len(), 4);
    }

    #[test]
    fn diagonal_pairs_are_separate() {
        let set = segment(&grid_from(&[
            "1.1",
            ".1.",
            "1.1",
        ]));
        assert_eq!(set.len(), 5);

        let set = segment(&grid_from(&[
            "11..",
            "..11",
        ]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn different_colors_do_not_merge() {
        let set = segment(&grid_from(&[
            "1122",
            "1122",
        ]));
        assert_eq!(set.len(), 2);
        assert_ne!(set.piece_at(1, 0), set.piece_at(2, 0));
    }

    #[test]
    fn ids_follow_scan_order() {
        let set = segment(&grid_from(&[
            "..3",
            "1..",
            "..2",
        ]));
        assert_eq!(set.pieces()[0].color, ColorIndex(3));
        assert_eq!(set.pieces()[1].color, ColorIndex(1));
        assert_eq!(set.pieces()[2].color, ColorIndex(2));
        assert_eq!(set.piece_at(2, 0), Some(PieceId(0)));
        assert_eq!(set.piece_at(2, 2), Some(PieceId(2)));
    }

    #[test]
    fn spiral_fills_without_recursion_limits() {
        // Full 64x64 single-color grid: one piece, every cell owned.
        let mut g = Grid::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                g.set(x, y, Some(ColorIndex(0))).unwrap();
            }
        }
        let set = segment(&g);
        assert_eq!(set.len(), 1);
        assert_eq!(set.pieces()[0].blocks.len(), 64 * 64);
    }

    #[test]
    fn rebuild_starts_at_level_zero() {
        let g = grid_from(&["11", "1."]);
        let mut set = segment(&g);
        set.set_pulled_level(PieceId(0), 3);
        let rebuilt = segment(&g);
        assert!(rebuilt.pieces().iter().all(|p| p.pulled_level == 0));
    }

    // ── Properties ──

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1usize..10, 1usize..10).prop_flat_map(|(w, h)| {
            proptest::collection::vec(proptest::option::of(0u8..3), w * h).prop_map(move |cells| {
                let mut g = Grid::new(w, h);
                for (i, c) in cells.into_iter().enumerate() {
                    g.set(i % w, i / w, c.map(ColorIndex)).unwrap();
                }
                g
            })
        })
    }

    fn connected_within(piece: &Piece) -> bool {
        let cells = block_set(piece);
        let start = piece.blocks[0];
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some((x, y)) = queue.pop_front() {
            let mut neighbors = vec![(x + 1, y), (x, y + 1)];
            if x > 0 { neighbors.push((x - 1, y)); }
            if y > 0 { neighbors.push((x, y - 1)); }
            for n in neighbors {
                if cells.contains(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen.len() == cells.len()
    }

    proptest! {
        #[test]
        fn partition_covers_painted_cells_exactly(g in arb_grid()) {
            let set = segment(&g);
            let mut union = BTreeSet::new();
            for (i, piece) in set.pieces().iter().enumerate() {
                prop_assert!(!piece.blocks.is_empty());
                for &(x, y) in &piece.blocks {
                    prop_assert!(union.insert((x, y)), "cell owned twice");
                    prop_assert_eq!(set.piece_at(x, y), Some(PieceId(i)));
                }
            }
            let painted: BTreeSet<_> = g.painted_cells().map(|(x, y, _)| (x, y)).collect();
            prop_assert_eq!(union, painted);
        }

        #[test]
        fn pieces_are_connected_and_homogeneous(g in arb_grid()) {
            let set = segment(&g);
            for piece in set.pieces() {
                prop_assert!(connected_within(piece));
                for &(x, y) in &piece.blocks {
                    prop_assert_eq!(g.at(x, y), Some(piece.color));
                }
                prop_assert_eq!(piece.pulled_level, 0);
            }
        }

        #[test]
        fn pieces_are_maximal(g in arb_grid()) {
            let set = segment(&g);
            for y in 0..g.height() {
                for x in 0..g.width() {
                    if x + 1 < g.width() && g.at(x, y).is_some() && g.at(x, y) == g.at(x + 1, y) {
                        prop_assert_eq!(set.piece_at(x, y), set.piece_at(x + 1, y));
                    }
                    if y + 1 < g.height() && g.at(x, y).is_some() && g.at(x, y) == g.at(x, y + 1) {
                        prop_assert_eq!(set.piece_at(x, y), set.piece_at(x, y + 1));
                    }
                }
            }
        }
    }
}
