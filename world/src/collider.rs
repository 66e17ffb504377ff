//! Reference collider that tests agent circles against wall tiles.

use glam::Vec2;
use zombie_house_core::{Blocker, CellCoord, Collider};

use crate::Grid;

/// Answers blocking and contact queries against a level grid.
///
/// Wall and decor tiles are treated as unit squares; the level boundary blocks
/// any circle that would poke outside the grid.
#[derive(Clone, Copy, Debug)]
pub struct GridCollider<'a> {
    grid: &'a Grid,
    contact_radius: f32,
}

impl<'a> GridCollider<'a> {
    /// Creates a collider over the grid; agents touch the target within `contact_radius`.
    #[must_use]
    pub const fn new(grid: &'a Grid, contact_radius: f32) -> Self {
        Self {
            grid,
            contact_radius,
        }
    }
}

impl Collider for GridCollider<'_> {
    fn blocking(&self, position: Vec2, radius: f32) -> Option<Blocker> {
        let width = self.grid.columns() as f32;
        let height = self.grid.rows() as f32;
        if position.x - radius < 0.0
            || position.y - radius < 0.0
            || position.x + radius > width
            || position.y + radius > height
        {
            return Some(Blocker::Boundary);
        }

        let first_column = (position.x - radius).floor().max(0.0) as u32;
        let last_column = ((position.x + radius).floor() as u32).min(self.grid.columns() - 1);
        let first_row = (position.y - radius).floor().max(0.0) as u32;
        let last_row = ((position.y + radius).floor() as u32).min(self.grid.rows() - 1);

        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let cell = CellCoord::new(column, row);
                if self.grid.is_walkable(cell) {
                    continue;
                }

                let min = Vec2::new(column as f32, row as f32);
                let closest = position.clamp(min, min + Vec2::ONE);
                if closest.distance_squared(position) < radius * radius {
                    return Some(Blocker::Tile(cell));
                }
            }
        }

        None
    }

    fn touching(&self, agent: Vec2, target: Vec2) -> bool {
        agent.distance(target) <= self.contact_radius
    }
}
