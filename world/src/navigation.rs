//! Static navigation graph built once per level.

use tracing::debug;
use zombie_house_core::{CellCoord, TileKind};

use crate::Grid;

/// Orthogonal steps in `(d_row, d_column)` form: top, right, bottom, left.
const ORTHOGONAL_STEPS: [(i32, i32); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// Diagonal steps in `(d_row, d_column)` form: north-west, north-east, south-east, south-west.
const DIAGONAL_STEPS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, 1), (1, -1)];

/// Placement of a cell relative to the grid boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PositionClass {
    /// One of the four grid corners.
    Corner,
    /// A border cell that is not a corner.
    Edge,
    /// Any cell away from the border.
    Interior,
}

impl PositionClass {
    /// Number of neighbours a cell of this class owns.
    #[must_use]
    pub const fn neighbor_count(self) -> usize {
        match self {
            Self::Corner => 3,
            Self::Edge => 5,
            Self::Interior => 8,
        }
    }
}

/// Orthogonal wall adjacency of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WallFlags {
    /// The cell to the left (column - 1) is a wall.
    pub left: bool,
    /// The cell to the right (column + 1) is a wall.
    pub right: bool,
    /// The cell above (row - 1) is a wall.
    pub top: bool,
    /// The cell below (row + 1) is a wall.
    pub bottom: bool,
}

impl WallFlags {
    /// Reports whether any orthogonal neighbour is a wall.
    #[must_use]
    pub const fn any(self) -> bool {
        self.left || self.right || self.top || self.bottom
    }
}

/// Diagonal wall adjacency of a cell.
///
/// Only populated when no orthogonal wall flag is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CornerFlags {
    /// The cell at row - 1, column - 1 is a wall.
    pub north_west: bool,
    /// The cell at row - 1, column + 1 is a wall.
    pub north_east: bool,
    /// The cell at row + 1, column - 1 is a wall.
    pub south_west: bool,
    /// The cell at row + 1, column + 1 is a wall.
    pub south_east: bool,
}

impl CornerFlags {
    /// Reports whether any diagonal neighbour was flagged as a wall.
    #[must_use]
    pub const fn any(self) -> bool {
        self.north_west || self.north_east || self.south_west || self.south_east
    }
}

/// Precomputed adjacency and wall metadata for one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphRecord {
    cell: CellCoord,
    tile: TileKind,
    class: PositionClass,
    neighbors: Vec<CellCoord>,
    walls: WallFlags,
    corners: CornerFlags,
}

impl GraphRecord {
    /// Cell the record describes.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Tile stored at the cell.
    #[must_use]
    pub const fn tile(&self) -> TileKind {
        self.tile
    }

    /// Position class that determined the neighbour set.
    #[must_use]
    pub const fn class(&self) -> PositionClass {
        self.class
    }

    /// Neighbouring cells, orthogonal neighbours first.
    #[must_use]
    pub fn neighbors(&self) -> &[CellCoord] {
        &self.neighbors
    }

    /// Orthogonal wall adjacency.
    #[must_use]
    pub const fn walls(&self) -> WallFlags {
        self.walls
    }

    /// Diagonal wall adjacency.
    #[must_use]
    pub const fn corners(&self) -> CornerFlags {
        self.corners
    }

    /// Cost of entering the cell, `None` when it is impassable.
    #[must_use]
    pub const fn traversal_cost(&self) -> Option<u32> {
        self.tile.traversal_cost()
    }
}

/// Cell to record lookup shared read-only by the simulation loop and every worker.
#[derive(Clone, Debug)]
pub struct NavigationGraph {
    grid: Grid,
    records: Vec<GraphRecord>,
}

impl NavigationGraph {
    /// Builds one record per grid cell.
    #[must_use]
    pub fn build(grid: Grid) -> Self {
        let records: Vec<GraphRecord> = grid.cells().map(|cell| build_record(&grid, cell)).collect();

        debug!(
            columns = grid.columns(),
            rows = grid.rows(),
            records = records.len(),
            walls = records
                .iter()
                .filter(|record| record.tile.is_wall())
                .count(),
            "navigation graph built"
        );

        Self { grid, records }
    }

    /// Grid the graph was built from.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Record describing the provided cell.
    #[must_use]
    pub fn record(&self, cell: CellCoord) -> Option<&GraphRecord> {
        self.grid
            .index(cell)
            .and_then(|index| self.records.get(index))
    }

    /// Dense index of the cell, matching the record order.
    #[must_use]
    pub fn index_of(&self, cell: CellCoord) -> Option<usize> {
        self.grid.index(cell)
    }

    /// Every record in row-major order.
    #[must_use]
    pub fn records(&self) -> &[GraphRecord] {
        &self.records
    }

    /// Number of records, equal to the number of grid cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether the graph holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn build_record(grid: &Grid, cell: CellCoord) -> GraphRecord {
    let class = grid
        .position_class(cell)
        .unwrap_or(PositionClass::Interior);
    let step = |(d_row, d_column): (i32, i32)| {
        cell.offset(d_row, d_column, grid.columns(), grid.rows())
    };
    let is_wall = |(d_row, d_column): (i32, i32)| {
        step((d_row, d_column))
            .and_then(|neighbor| grid.tile(neighbor))
            .is_some_and(TileKind::is_wall)
    };

    let mut neighbors = Vec::with_capacity(class.neighbor_count());
    neighbors.extend(ORTHOGONAL_STEPS.into_iter().filter_map(step));
    neighbors.extend(DIAGONAL_STEPS.into_iter().filter_map(step));
    debug_assert_eq!(neighbors.len(), class.neighbor_count());

    let walls = WallFlags {
        top: is_wall(ORTHOGONAL_STEPS[0]),
        right: is_wall(ORTHOGONAL_STEPS[1]),
        bottom: is_wall(ORTHOGONAL_STEPS[2]),
        left: is_wall(ORTHOGONAL_STEPS[3]),
    };

    let corners = if walls.any() {
        CornerFlags::default()
    } else {
        CornerFlags {
            north_west: is_wall(DIAGONAL_STEPS[0]),
            north_east: is_wall(DIAGONAL_STEPS[1]),
            south_east: is_wall(DIAGONAL_STEPS[2]),
            south_west: is_wall(DIAGONAL_STEPS[3]),
        }
    };

    GraphRecord {
        cell,
        tile: grid.tile(cell).unwrap_or(TileKind::Wall),
        class,
        neighbors,
        walls,
        corners,
    }
}
