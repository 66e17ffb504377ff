#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Best-first path search over the level's navigation graph.
//!
//! The [`Pathfinder`] keeps its frontier and per-cell bookkeeping between
//! calls so repeated searches on the same level do not reallocate. The graph
//! itself is never mutated; search priorities live in the pathfinder's own
//! workspace, which lets every decision worker own a pathfinder while sharing
//! one graph.

use std::{cmp::Reverse, collections::BinaryHeap};

use tracing::trace;
use zombie_house_core::{CellCoord, Heading};
use zombie_house_world::{GraphRecord, NavigationGraph};

const UNVISITED: u32 = u32::MAX;
const NO_PARENT: usize = usize::MAX;

/// Resolves the canonical heading of a single step between adjacent cells.
///
/// Returns `None` when the cells coincide or are not adjacent.
#[must_use]
pub fn resolve_heading(from: CellCoord, to: CellCoord) -> Option<Heading> {
    let (d_row, d_column) = from.delta_to(to);
    Heading::from_step(d_row, d_column)
}

/// Reasons a search request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The start cell lies outside the graph.
    #[error("start cell {cell:?} lies outside the navigation graph")]
    StartOutsideGraph {
        /// Requested start cell.
        cell: CellCoord,
    },
    /// The goal cell lies outside the graph.
    #[error("goal cell {cell:?} lies outside the navigation graph")]
    GoalOutsideGraph {
        /// Requested goal cell.
        cell: CellCoord,
    },
}

/// Path reconstructed by a successful search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    cells: Vec<CellCoord>,
    next_heading: Option<Heading>,
}

impl PathResult {
    /// Cells from start to goal, both endpoints included.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Heading of the first step, absent when start and goal coincide.
    #[must_use]
    pub const fn next_heading(&self) -> Option<Heading> {
        self.next_heading
    }

    /// Number of cells on the path, endpoints included.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::try_from(self.cells.len()).unwrap_or(u32::MAX)
    }
}

/// Reusable best-first search workspace.
///
/// Frontier entries are ordered by `cost so far + Manhattan distance`; equal
/// priorities pop in insertion order.
#[derive(Debug, Default)]
pub struct Pathfinder {
    cost_so_far: Vec<u32>,
    priority: Vec<u32>,
    came_from: Vec<usize>,
    frontier: BinaryHeap<Reverse<(u32, u64, usize)>>,
    sequence: u64,
}

impl Pathfinder {
    /// Creates an empty pathfinder; buffers grow on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches for a path from `start` to `goal`.
    ///
    /// `Ok(None)` means the goal is unreachable this tick, which includes
    /// either endpoint being impassable. Errors are reserved for endpoints
    /// that miss the graph entirely.
    pub fn find_path(
        &mut self,
        graph: &NavigationGraph,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Option<PathResult>, PathError> {
        let start_index = graph
            .index_of(start)
            .ok_or(PathError::StartOutsideGraph { cell: start })?;
        let goal_index = graph
            .index_of(goal)
            .ok_or(PathError::GoalOutsideGraph { cell: goal })?;

        let records = graph.records();
        if records[start_index].traversal_cost().is_none()
            || records[goal_index].traversal_cost().is_none()
        {
            trace!(?start, ?goal, "search endpoint is impassable");
            return Ok(None);
        }

        self.prepare(records.len());
        self.cost_so_far[start_index] = 0;
        self.push(start_index, start.manhattan_distance(goal));

        let mut reached = false;
        while let Some(Reverse((priority, _, current))) = self.frontier.pop() {
            if priority != self.priority[current] {
                continue;
            }

            if current == goal_index {
                reached = true;
                break;
            }

            let record = &records[current];
            let current_cost = self.cost_so_far[current];
            for &neighbor in record.neighbors() {
                if cuts_wall_corner(record, neighbor) {
                    continue;
                }

                let Some(neighbor_index) = graph.index_of(neighbor) else {
                    continue;
                };
                let Some(step_cost) = records[neighbor_index].traversal_cost() else {
                    continue;
                };

                let candidate = current_cost.saturating_add(step_cost);
                if candidate >= self.cost_so_far[neighbor_index] {
                    continue;
                }

                self.cost_so_far[neighbor_index] = candidate;
                self.came_from[neighbor_index] = current;
                self.push(
                    neighbor_index,
                    candidate.saturating_add(neighbor.manhattan_distance(goal)),
                );
            }
        }

        if !reached {
            trace!(?start, ?goal, "frontier exhausted without reaching goal");
            return Ok(None);
        }

        let cells = self.reconstruct(records, start_index, goal_index);
        let next_heading = match cells.as_slice() {
            [first, second, ..] => resolve_heading(*first, *second),
            _ => None,
        };

        Ok(Some(PathResult {
            cells,
            next_heading,
        }))
    }

    fn prepare(&mut self, node_count: usize) {
        self.cost_so_far.clear();
        self.cost_so_far.resize(node_count, UNVISITED);
        self.priority.clear();
        self.priority.resize(node_count, UNVISITED);
        self.came_from.clear();
        self.came_from.resize(node_count, NO_PARENT);
        self.frontier.clear();
        self.sequence = 0;
    }

    fn push(&mut self, index: usize, priority: u32) {
        self.priority[index] = priority;
        self.frontier.push(Reverse((priority, self.sequence, index)));
        self.sequence += 1;
    }

    fn reconstruct(&self, records: &[GraphRecord], start: usize, goal: usize) -> Vec<CellCoord> {
        let mut cells = vec![records[goal].cell()];
        let mut current = goal;
        while current != start {
            current = self.came_from[current];
            if current == NO_PARENT {
                break;
            }
            cells.push(records[current].cell());
        }
        cells.reverse();
        cells
    }
}

/// Reports whether a diagonal step from `record` would clip a wall corner.
///
/// A right wall forbids both eastward diagonals, a top wall both northward
/// diagonals, and so on. Orthogonal steps are never rejected here.
fn cuts_wall_corner(record: &GraphRecord, neighbor: CellCoord) -> bool {
    let (d_row, d_column) = record.cell().delta_to(neighbor);
    if d_row == 0 || d_column == 0 {
        return false;
    }

    let walls = record.walls();
    (d_column > 0 && walls.right)
        || (d_column < 0 && walls.left)
        || (d_row < 0 && walls.top)
        || (d_row > 0 && walls.bottom)
}
