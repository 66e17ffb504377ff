#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable level geometry for the Zombie House pursuit engine.
//!
//! The world crate owns the typed tile grid produced by level generation, the
//! ASCII layout format used by tools and tests, the navigation graph built once
//! per level, and a reference collider that answers blocking queries against
//! the grid's walls.

mod collider;
mod layout;
mod navigation;

pub use collider::GridCollider;
pub use layout::{LayoutError, LevelLayout, Spawn};
pub use navigation::{CornerFlags, GraphRecord, NavigationGraph, PositionClass, WallFlags};

use glam::Vec2;
use zombie_house_core::{CellCoord, TileKind};

/// Smallest number of columns or rows a level may have.
pub const MIN_GRID_SIDE: u32 = 2;

/// Reasons a tile grid may be rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The grid is narrower or shorter than two cells.
    #[error("grid of {columns}x{rows} cells is smaller than 2x2")]
    TooSmall {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The tile buffer does not match the requested dimensions.
    #[error("expected {expected} tiles but received {actual}")]
    TileCount {
        /// Number of tiles implied by the dimensions.
        expected: usize,
        /// Number of tiles supplied.
        actual: usize,
    },
}

/// Dense row-major grid of typed tiles, fixed for the lifetime of a level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
}

impl Grid {
    /// Creates a grid from tiles stored in row-major order.
    pub fn new(columns: u32, rows: u32, tiles: Vec<TileKind>) -> Result<Self, GridError> {
        if columns < MIN_GRID_SIDE || rows < MIN_GRID_SIDE {
            return Err(GridError::TooSmall { columns, rows });
        }

        let expected = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(usize::MAX);
        if tiles.len() != expected {
            return Err(GridError::TileCount {
                expected,
                actual: tiles.len(),
            });
        }

        Ok(Self {
            columns,
            rows,
            tiles,
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Tile stored at the provided cell.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<TileKind> {
        self.index(cell)
            .and_then(|index| self.tiles.get(index))
            .copied()
    }

    /// Reports whether an agent may stand on the cell. Off-grid cells are not walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.tile(cell).is_some_and(|tile| !tile.is_wall())
    }

    /// Walkability of every cell, one inner vector per row.
    #[must_use]
    pub fn walkability(&self) -> Vec<Vec<bool>> {
        let width = usize::try_from(self.columns).unwrap_or(usize::MAX);
        self.tiles
            .chunks(width)
            .map(|row| row.iter().map(|tile| !tile.is_wall()).collect())
            .collect()
    }

    /// Iterates every cell of the grid in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.columns).map(move |column| CellCoord::new(column, row)))
    }

    /// Cell containing the continuous position, if it lies on the grid.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return None;
        }

        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }

        let column = position.x.floor() as u32;
        let row = position.y.floor() as u32;
        let cell = CellCoord::new(column, row);
        self.contains(cell).then_some(cell)
    }

    /// Continuous position of the cell's centre.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(cell.column() as f32 + 0.5, cell.row() as f32 + 0.5)
    }

    /// Classifies the cell by how many grid sides it touches.
    #[must_use]
    pub fn position_class(&self, cell: CellCoord) -> Option<PositionClass> {
        if !self.contains(cell) {
            return None;
        }

        let on_vertical_side = cell.column() == 0 || cell.column() + 1 == self.columns;
        let on_horizontal_side = cell.row() == 0 || cell.row() + 1 == self.rows;
        Some(match (on_vertical_side, on_horizontal_side) {
            (true, true) => PositionClass::Corner,
            (true, false) | (false, true) => PositionClass::Edge,
            (false, false) => PositionClass::Interior,
        })
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}
