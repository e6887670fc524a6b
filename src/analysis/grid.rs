//! Accumulation grid: fixed square cells over the pipe image.

use crate::detection::BoundingBox;

/// Cell coordinates `(column, row)`.
pub type Cell = (i64, i64);

/// Cell holding the box origin (top-left corner).
pub fn origin_cell(bbox: &BoundingBox, cell_px: f64) -> Cell {
    (
        (bbox.x1 as f64 / cell_px).floor() as i64,
        (bbox.y1 as f64 / cell_px).floor() as i64,
    )
}

/// The eight cells surrounding `cell`.
pub fn neighbours((x, y): Cell) -> impl Iterator<Item = Cell> {
    (-1..=1)
        .flat_map(move |dx| (-1..=1).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .map(move |(dx, dy)| (x + dx, y + dy))
}
