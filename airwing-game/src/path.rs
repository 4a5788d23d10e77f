//! Flight path generation over the offset grid.
//!
//! A path is traced by sampling the straight line between two cell centers
//! once per column, then filling the rows skipped between consecutive
//! samples so that every step moves to an adjacent cell.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::grid::{GridCell, GridRef, GridService, Point};
use crate::numbers::{len_to_u32, round_f64_to_i32};

/// Errors raised while building a flight path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("map reference {reference} does not resolve to a grid cell")]
    UnresolvedCell { reference: GridRef },
    #[error("flight path has no cells")]
    Empty,
}

/// How the traversal sequence was derived from the out-bound leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FlightPathKind {
    /// Origin to target only.
    OneWay,
    /// Out-bound leg followed by the same cells flown back.
    RoundTrip,
    /// Turned back for home after `turn_back_at` steps of the out-bound leg.
    Recalled { turn_back_at: u32 },
}

/// Persisted flight path state; cells are re-derived from the endpoints on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightPathRecord {
    pub kind: FlightPathKind,
    pub progress: u32,
}

impl FlightPathRecord {
    /// Turn back at the recorded out-bound position without rebuilding the cells.
    ///
    /// Returns the steps home, as [`FlightPath::recall`] does.
    pub const fn recall(&mut self) -> u32 {
        match self.kind {
            FlightPathKind::Recalled { turn_back_at } => {
                turn_back_at.saturating_mul(2).saturating_sub(self.progress)
            }
            FlightPathKind::OneWay | FlightPathKind::RoundTrip => {
                self.kind = FlightPathKind::Recalled {
                    turn_back_at: self.progress,
                };
                self.progress
            }
        }
    }
}

/// Insertion-ordered cell set.
#[derive(Debug, Default)]
struct CellSequence {
    cells: Vec<GridCell>,
    seen: HashSet<GridCell>,
}

impl CellSequence {
    fn insert(&mut self, cell: GridCell) {
        if self.seen.insert(cell) {
            self.cells.push(cell);
        }
    }

    fn into_vec(self) -> Vec<GridCell> {
        self.cells
    }
}

/// Resolve both endpoints and trace the out-bound leg between them.
///
/// # Errors
///
/// Returns `PathError::UnresolvedCell` when either reference is unknown to the grid.
pub fn plan_out_bound(
    grid: &dyn GridService,
    origin: &GridRef,
    target: &GridRef,
) -> Result<Vec<GridCell>, PathError> {
    let from = grid
        .cell_of(origin)
        .ok_or_else(|| PathError::UnresolvedCell {
            reference: origin.clone(),
        })?;
    let to = grid
        .cell_of(target)
        .ok_or_else(|| PathError::UnresolvedCell {
            reference: target.clone(),
        })?;
    Ok(trace_line(grid, from, to))
}

/// Adjacent-cell sequence from `origin` to `target`, both inclusive.
#[must_use]
pub fn trace_line(grid: &dyn GridService, origin: GridCell, target: GridCell) -> Vec<GridCell> {
    let samples = sample_columns(grid, origin, target);
    fill_rows(&samples)
}

/// Append the in-bound leg: the out-bound cells reversed, minus the target.
#[must_use]
pub fn add_in_bound(out_bound: &[GridCell]) -> Vec<GridCell> {
    let mut cells = out_bound.to_vec();
    if let Some((_, back)) = out_bound.split_last() {
        cells.extend(back.iter().rev().copied());
    }
    cells
}

fn sample_columns(grid: &dyn GridService, origin: GridCell, target: GridCell) -> Vec<GridCell> {
    let size = grid.cell_size();
    let start = grid.center_of(origin);
    let end = grid.center_of(target);

    let mut sequence = CellSequence::default();
    sequence.insert(origin);

    let intervals = round_f64_to_i32((end.x - start.x) / size);
    if intervals != 0 {
        let slope = (end.y - start.y) / (end.x - start.x);
        let intercept = slope.mul_add(-start.x, start.y);
        let direction = intervals.signum();
        for step in 1..=intervals.abs() {
            let x = f64::from(step * direction).mul_add(size, start.x);
            let y = slope.mul_add(x, intercept);
            sequence.insert(grid.cell_at(Point::new(x, y)));
        }
    }

    sequence.insert(target);
    sequence.into_vec()
}

fn fill_rows(samples: &[GridCell]) -> Vec<GridCell> {
    let mut sequence = CellSequence::default();
    for pair in samples.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        sequence.insert(from);
        for cell in bridge(from, to) {
            sequence.insert(cell);
        }
    }
    if let Some(last) = samples.last() {
        sequence.insert(*last);
    }
    sequence.into_vec()
}

/// Cells in `from`'s column needed before `to` becomes adjacent.
fn bridge(from: GridCell, to: GridCell) -> Vec<GridCell> {
    let column = from.column;
    if column == to.column {
        return if to.row > from.row {
            (from.row + 1..to.row)
                .map(|row| GridCell::new(column, row))
                .collect()
        } else {
            (to.row + 1..from.row)
                .rev()
                .map(|row| GridCell::new(column, row))
                .collect()
        };
    }

    let (upper, lower) = from.neighbour_rows();
    let odd = from.is_odd_column();
    if to.row > lower {
        let last = if odd { to.row - 1 } else { to.row };
        (from.row + 1..=last)
            .map(|row| GridCell::new(column, row))
            .collect()
    } else if to.row < upper {
        let last = if odd { to.row } else { to.row + 1 };
        (last..from.row)
            .rev()
            .map(|row| GridCell::new(column, row))
            .collect()
    } else {
        Vec::new()
    }
}

/// Traversal sequence for a mission with a progress cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightPath {
    kind: FlightPathKind,
    out_bound: Vec<GridCell>,
    cells: Vec<GridCell>,
    progress: u32,
}

impl FlightPath {
    /// Build a path of the given kind from its out-bound leg.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Empty` when the out-bound leg has no cells.
    pub fn new(kind: FlightPathKind, out_bound: Vec<GridCell>) -> Result<Self, PathError> {
        if out_bound.is_empty() {
            return Err(PathError::Empty);
        }
        let cells = match kind {
            FlightPathKind::OneWay => out_bound.clone(),
            FlightPathKind::RoundTrip => add_in_bound(&out_bound),
            FlightPathKind::Recalled { turn_back_at } => turn_back(&out_bound, turn_back_at),
        };
        Ok(Self {
            kind,
            out_bound,
            cells,
            progress: 0,
        })
    }

    /// Rebuild a persisted path from its re-derived out-bound leg.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Empty` when the out-bound leg has no cells.
    pub fn from_record(record: FlightPathRecord, out_bound: Vec<GridCell>) -> Result<Self, PathError> {
        let mut path = Self::new(record.kind, out_bound)?;
        path.progress = record.progress.min(path.total_distance());
        Ok(path)
    }

    #[must_use]
    pub const fn record(&self) -> FlightPathRecord {
        FlightPathRecord {
            kind: self.kind,
            progress: self.progress,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FlightPathKind {
        self.kind
    }

    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    #[must_use]
    pub fn out_bound(&self) -> &[GridCell] {
        &self.out_bound
    }

    /// Grid steps from origin to target.
    #[must_use]
    pub fn out_bound_distance(&self) -> u32 {
        len_to_u32(self.out_bound.len().saturating_sub(1))
    }

    /// Grid steps across the whole traversal sequence.
    #[must_use]
    pub fn total_distance(&self) -> u32 {
        len_to_u32(self.cells.len().saturating_sub(1))
    }

    #[must_use]
    pub const fn progress(&self) -> u32 {
        self.progress
    }

    /// Cell the mission occupies at the current cursor.
    #[must_use]
    pub fn current_cell(&self) -> GridCell {
        let index = usize::try_from(self.progress).unwrap_or(usize::MAX);
        self.cells
            .get(index)
            .or_else(|| self.cells.last())
            .copied()
            .unwrap_or(self.out_bound[0])
    }

    /// Steps left before the traversal sequence ends.
    #[must_use]
    pub fn remaining_distance(&self) -> u32 {
        self.total_distance().saturating_sub(self.progress)
    }

    #[must_use]
    pub fn reached_target(&self) -> bool {
        self.progress >= self.out_bound_distance()
    }

    #[must_use]
    pub fn reached_home(&self) -> bool {
        self.progress >= self.total_distance()
    }

    /// Move toward the target, never past it.
    pub fn advance_out_bound(&mut self, steps: u32) {
        let limit = self.out_bound_distance().min(self.total_distance());
        self.progress = self.progress.saturating_add(steps).min(limit);
    }

    /// Move along the remaining sequence.
    pub fn advance(&mut self, steps: u32) {
        self.progress = self
            .progress
            .saturating_add(steps)
            .min(self.total_distance());
    }

    /// Jump to the end of the sequence.
    pub fn finish(&mut self) {
        self.progress = self.total_distance();
    }

    /// Turn back from the current out-bound position and return the steps home.
    pub fn recall(&mut self) -> u32 {
        let turn_back_at = self.progress.min(self.out_bound_distance());
        self.kind = FlightPathKind::Recalled { turn_back_at };
        self.cells = turn_back(&self.out_bound, turn_back_at);
        self.progress = turn_back_at;
        self.remaining_distance()
    }
}

fn turn_back(out_bound: &[GridCell], turn_back_at: u32) -> Vec<GridCell> {
    let index = usize::try_from(turn_back_at)
        .unwrap_or(usize::MAX)
        .min(out_bound.len().saturating_sub(1));
    add_in_bound(&out_bound[..=index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::OffsetGrid;

    fn grid() -> OffsetGrid {
        OffsetGrid::new(60, 60, 20.0)
    }

    fn assert_adjacent(cells: &[GridCell]) {
        for pair in cells.windows(2) {
            assert!(
                pair[0].is_adjacent(pair[1]),
                "{} and {} are not adjacent in {cells:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn straight_column_fills_every_row() {
        let grid = grid();
        let cells = trace_line(&grid, GridCell::new(4, 2), GridCell::new(4, 7));
        assert_eq!(cells.len(), 6);
        assert_adjacent(&cells);

        let upward = trace_line(&grid, GridCell::new(4, 7), GridCell::new(4, 2));
        assert_eq!(upward.first(), Some(&GridCell::new(4, 7)));
        assert_eq!(upward.last(), Some(&GridCell::new(4, 2)));
        assert_adjacent(&upward);
    }

    #[test]
    fn steep_lines_fill_rows_by_parity() {
        let grid = grid();
        for (from, to) in [
            (GridCell::new(2, 2), GridCell::new(3, 9)),
            (GridCell::new(3, 2), GridCell::new(4, 9)),
            (GridCell::new(2, 9), GridCell::new(3, 2)),
            (GridCell::new(3, 9), GridCell::new(4, 2)),
            (GridCell::new(9, 1), GridCell::new(6, 14)),
        ] {
            let cells = trace_line(&grid, from, to);
            assert_eq!(cells.first(), Some(&from));
            assert_eq!(cells.last(), Some(&to));
            assert_adjacent(&cells);
            assert_eq!(cells.len() - 1, from.distance(to) as usize);
        }
    }

    #[test]
    fn same_cell_produces_single_cell_path() {
        let grid = grid();
        let cell = GridCell::new(5, 5);
        assert_eq!(trace_line(&grid, cell, cell), vec![cell]);
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let grid = grid();
        let err = plan_out_bound(&grid, &GridRef::new("0101"), &GridRef::new("Atlantis"))
            .unwrap_err();
        assert_eq!(
            err,
            PathError::UnresolvedCell {
                reference: GridRef::new("Atlantis")
            }
        );
    }

    #[test]
    fn round_trip_reverses_out_bound() {
        let grid = grid();
        let out = trace_line(&grid, GridCell::new(1, 1), GridCell::new(7, 4));
        let full = add_in_bound(&out);
        assert_eq!(full.len(), 2 * out.len() - 1);
        assert_eq!(full.first(), full.last());
        assert_adjacent(&full);
    }

    #[test]
    fn cursor_stops_at_target_while_out_bound() {
        let out: Vec<GridCell> = (0..6).map(|row| GridCell::new(0, row)).collect();
        let mut path = FlightPath::new(FlightPathKind::RoundTrip, out).unwrap();
        assert_eq!(path.out_bound_distance(), 5);
        assert_eq!(path.total_distance(), 10);

        path.advance_out_bound(3);
        assert_eq!(path.current_cell(), GridCell::new(0, 3));
        path.advance_out_bound(3);
        assert_eq!(path.progress(), 5);
        assert!(path.reached_target());

        path.advance(4);
        assert_eq!(path.current_cell(), GridCell::new(0, 1));
        path.advance(4);
        assert!(path.reached_home());
        assert_eq!(path.current_cell(), GridCell::new(0, 0));
    }

    #[test]
    fn recall_turns_back_from_current_position() {
        let out: Vec<GridCell> = (0..6).map(|row| GridCell::new(0, row)).collect();
        let mut path = FlightPath::new(FlightPathKind::RoundTrip, out).unwrap();
        path.advance_out_bound(3);

        let home = path.recall();
        assert_eq!(home, 3);
        assert_eq!(path.kind(), FlightPathKind::Recalled { turn_back_at: 3 });
        assert_eq!(path.cells().len(), 7);
        assert_eq!(path.current_cell(), GridCell::new(0, 3));

        let restored = FlightPath::from_record(path.record(), path.out_bound().to_vec()).unwrap();
        assert_eq!(restored, path);
    }

    #[test]
    fn recalling_a_record_matches_recalling_the_path() {
        let out: Vec<GridCell> = (0..6).map(|row| GridCell::new(0, row)).collect();
        let mut path = FlightPath::new(FlightPathKind::RoundTrip, out.clone()).unwrap();
        path.advance_out_bound(3);
        let mut record = path.record();

        assert_eq!(record.recall(), path.recall());
        assert_eq!(record, path.record());
        assert_eq!(FlightPath::from_record(record, out).unwrap(), path);

        path.advance(1);
        let mut returning = path.record();
        assert_eq!(returning.recall(), path.remaining_distance());
        assert_eq!(returning, path.record());
    }

    #[test]
    fn empty_out_bound_is_rejected() {
        assert_eq!(
            FlightPath::new(FlightPathKind::OneWay, Vec::new()).unwrap_err(),
            PathError::Empty
        );
    }
}
