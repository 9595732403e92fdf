/// Core editor data: palette, grid, pieces and segmentation.

pub mod grid;
pub mod palette;
pub mod piece;
pub mod segment;
