//! Offset grid geometry consumed by the flight path generator.
//!
//! The map is a column-offset hex grid: odd columns sit half a cell lower
//! than even columns, so the rows reachable in a neighbouring column depend
//! on the parity of the column being left.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::numbers::round_f64_to_i32;

/// Map reference naming a location (airfield, port, task force position).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridRef(pub String);

impl GridRef {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single grid cell addressed by column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub column: i32,
    pub row: i32,
}

impl GridCell {
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    #[must_use]
    pub const fn is_odd_column(self) -> bool {
        self.column & 1 == 1
    }

    /// Rows in the column to the left or right that border this cell.
    #[must_use]
    pub const fn neighbour_rows(self) -> (i32, i32) {
        if self.is_odd_column() {
            (self.row, self.row + 1)
        } else {
            (self.row - 1, self.row)
        }
    }

    /// Number of grid steps between two cells.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let (ax, ay, az) = self.cube();
        let (bx, by, bz) = other.cube();
        let dx = (ax - bx).unsigned_abs();
        let dy = (ay - by).unsigned_abs();
        let dz = (az - bz).unsigned_abs();
        dx.max(dy).max(dz)
    }

    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }

    const fn cube(self) -> (i32, i32, i32) {
        let x = self.column;
        let z = self.row - (self.column - (self.column & 1)) / 2;
        (x, -x - z, z)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.column, self.row)
    }
}

/// Pixel-space position of a cell center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Map service resolving references to cells and cells to pixel centers.
pub trait GridService {
    /// Resolve a map reference to its cell, `None` if the reference is unknown.
    fn cell_of(&self, reference: &GridRef) -> Option<GridCell>;

    /// Pixel center of a cell.
    fn center_of(&self, cell: GridCell) -> Point;

    /// Cell containing a pixel position.
    fn cell_at(&self, point: Point) -> GridCell;

    /// Uniform horizontal spacing between column centers.
    fn cell_size(&self) -> f64;

    fn distance(&self, from: GridCell, to: GridCell) -> u32 {
        from.distance(to)
    }

    fn are_adjacent(&self, a: GridCell, b: GridCell) -> bool {
        self.distance(a, b) == 1
    }
}

/// Rectangular offset grid with named locations.
///
/// References resolve through the named location table first, then as a
/// four-digit `CCRR` cell number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetGrid {
    pub columns: i32,
    pub rows: i32,
    pub cell_size: f64,
    #[serde(default)]
    pub locations: HashMap<GridRef, GridCell>,
}

impl OffsetGrid {
    #[must_use]
    pub fn new(columns: i32, rows: i32, cell_size: f64) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            locations: HashMap::new(),
        }
    }

    /// Register a named location.
    #[must_use]
    pub fn with_location(mut self, name: &str, cell: GridCell) -> Self {
        self.locations.insert(GridRef::new(name), cell);
        self
    }

    #[must_use]
    pub const fn contains(&self, cell: GridCell) -> bool {
        cell.column >= 0 && cell.row >= 0 && cell.column < self.columns && cell.row < self.rows
    }

    fn parse_cell_number(reference: &GridRef) -> Option<GridCell> {
        let raw = reference.as_str();
        if raw.len() != 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let column = raw[..2].parse().ok()?;
        let row = raw[2..].parse().ok()?;
        Some(GridCell::new(column, row))
    }

    fn column_offset(&self, column: i32) -> f64 {
        if column & 1 == 1 {
            self.cell_size / 2.0
        } else {
            0.0
        }
    }
}

impl GridService for OffsetGrid {
    fn cell_of(&self, reference: &GridRef) -> Option<GridCell> {
        let cell = self
            .locations
            .get(reference)
            .copied()
            .or_else(|| Self::parse_cell_number(reference))?;
        self.contains(cell).then_some(cell)
    }

    fn center_of(&self, cell: GridCell) -> Point {
        Point::new(
            f64::from(cell.column) * self.cell_size,
            f64::from(cell.row).mul_add(self.cell_size, self.column_offset(cell.column)),
        )
    }

    fn cell_at(&self, point: Point) -> GridCell {
        let column = round_f64_to_i32(point.x / self.cell_size);
        let row = round_f64_to_i32((point.y - self.column_offset(column)) / self.cell_size);
        GridCell::new(column, row)
    }

    fn cell_size(&self) -> f64 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> OffsetGrid {
        OffsetGrid::new(40, 30, 32.0).with_location("Scapa Flow", GridCell::new(5, 4))
    }

    #[test]
    fn neighbour_rows_follow_column_parity() {
        assert_eq!(GridCell::new(4, 7).neighbour_rows(), (6, 7));
        assert_eq!(GridCell::new(5, 7).neighbour_rows(), (7, 8));
    }

    #[test]
    fn adjacency_matches_neighbour_rows() {
        let even = GridCell::new(4, 7);
        assert!(even.is_adjacent(GridCell::new(5, 6)));
        assert!(even.is_adjacent(GridCell::new(5, 7)));
        assert!(even.is_adjacent(GridCell::new(3, 6)));
        assert!(even.is_adjacent(GridCell::new(4, 8)));
        assert!(!even.is_adjacent(GridCell::new(5, 8)));

        let odd = GridCell::new(5, 7);
        assert!(odd.is_adjacent(GridCell::new(6, 8)));
        assert!(odd.is_adjacent(GridCell::new(4, 7)));
        assert!(!odd.is_adjacent(GridCell::new(6, 6)));
    }

    #[test]
    fn distance_counts_steps() {
        let a = GridCell::new(0, 0);
        assert_eq!(a.distance(a), 0);
        assert_eq!(a.distance(GridCell::new(0, 5)), 5);
        assert_eq!(a.distance(GridCell::new(6, 0)), 6);
        assert_eq!(a.distance(GridCell::new(4, 2)), 4);
    }

    #[test]
    fn references_resolve_by_name_or_number() {
        let grid = grid();
        assert_eq!(
            grid.cell_of(&GridRef::new("Scapa Flow")),
            Some(GridCell::new(5, 4))
        );
        assert_eq!(grid.cell_of(&GridRef::new("0712")), Some(GridCell::new(7, 12)));
        assert_eq!(grid.cell_of(&GridRef::new("Narvik")), None);
        assert_eq!(grid.cell_of(&GridRef::new("9999")), None);
    }

    #[test]
    fn centers_round_trip_to_cells() {
        let grid = grid();
        for column in 0..6 {
            for row in 0..6 {
                let cell = GridCell::new(column, row);
                assert_eq!(grid.cell_at(grid.center_of(cell)), cell);
            }
        }
        let odd = grid.center_of(GridCell::new(1, 2));
        assert!((odd.y - 80.0).abs() < f64::EPSILON);
    }
}
