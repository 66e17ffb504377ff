#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Zombie House pursuit engine.
//!
//! This crate defines the vocabulary that connects the immutable level, the
//! pathfinder, the background decision workers, and the per-frame agent state
//! machine. The simulation loop owns every agent and steps it once per frame;
//! decision workers observe published agent state and answer exclusively with
//! [`Decision`] messages, which the loop applies on its next tick. Collision
//! against static geometry stays behind the [`Collider`] seam.

mod config;

pub use config::{ConfigError, EngineConfig, TierSettings};

use std::time::Duration;

use glam::Vec2;

/// Path length reported when the target cannot be reached this tick.
pub const UNREACHABLE_PATH_LENGTH: u32 = u32::MAX;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Rows grow downwards, columns grow to the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the cell displaced by the provided row and column deltas.
    ///
    /// Yields `None` when the displacement would leave a grid of `columns` by
    /// `rows` cells.
    #[must_use]
    pub fn offset(self, d_row: i32, d_column: i32, columns: u32, rows: u32) -> Option<CellCoord> {
        let row = i64::from(self.row) + i64::from(d_row);
        let column = i64::from(self.column) + i64::from(d_column);
        if row < 0 || column < 0 || row >= i64::from(rows) || column >= i64::from(columns) {
            return None;
        }

        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }

    /// Signed `(d_row, d_column)` delta that leads from `self` to `other`.
    #[must_use]
    pub fn delta_to(self, other: CellCoord) -> (i64, i64) {
        (
            i64::from(other.row) - i64::from(self.row),
            i64::from(other.column) - i64::from(self.column),
        )
    }
}

/// Typed description of a single level tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Solid wall segment.
    Wall,
    /// Walkable floor belonging to one of the level's regions.
    Floor {
        /// Region index, `1..=4` in generated levels.
        region: u8,
    },
    /// Decorative obstacle placed inside a region; blocks like a wall.
    Decor {
        /// Region index the decoration belongs to.
        region: u8,
    },
    /// Walkable exit tile.
    Exit,
}

impl TileKind {
    /// Reports whether the tile blocks movement and counts as a wall for adjacency.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::Wall | Self::Decor { .. })
    }

    /// Cost of entering the tile, or `None` when the cost is infinite.
    #[must_use]
    pub const fn traversal_cost(self) -> Option<u32> {
        if self.is_wall() {
            None
        } else {
            Some(1)
        }
    }
}

/// One of the eight canonical travel directions, 45° apart.
///
/// Angles grow clockwise on screen: 0° points along increasing columns and
/// 90° along increasing rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Heading {
    /// 0°, towards increasing columns.
    East,
    /// 45°.
    SouthEast,
    /// 90°, towards increasing rows.
    South,
    /// 135°.
    SouthWest,
    /// 180°.
    West,
    /// 225°.
    NorthWest,
    /// 270°.
    North,
    /// 315°.
    NorthEast,
}

impl Heading {
    /// Every canonical heading in ascending angle order.
    pub const ALL: [Heading; 8] = [
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
    ];

    /// Resolves a single-step `(d_row, d_column)` tile delta into a heading.
    ///
    /// Returns `None` for `(0, 0)` and for deltas that are not unit steps.
    #[must_use]
    pub const fn from_step(d_row: i64, d_column: i64) -> Option<Heading> {
        match (d_row, d_column) {
            (0, 1) => Some(Self::East),
            (1, 1) => Some(Self::SouthEast),
            (1, 0) => Some(Self::South),
            (1, -1) => Some(Self::SouthWest),
            (0, -1) => Some(Self::West),
            (-1, -1) => Some(Self::NorthWest),
            (-1, 0) => Some(Self::North),
            (-1, 1) => Some(Self::NorthEast),
            _ => None,
        }
    }

    /// Travel angle expressed in whole degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::East => 0,
            Self::SouthEast => 45,
            Self::South => 90,
            Self::SouthWest => 135,
            Self::West => 180,
            Self::NorthWest => 225,
            Self::North => 270,
            Self::NorthEast => 315,
        }
    }

    /// Travel angle as a floating point value suitable for integration.
    #[must_use]
    pub fn angle(self) -> f32 {
        f32::from(self.degrees())
    }
}

/// Wraps an arbitrary angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector pointing along the provided angle in degrees.
#[must_use]
pub fn direction_vector(angle: f32) -> Vec2 {
    let radians = angle.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Behavioural class of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Ordinary agent with a slow decision cadence.
    Regular,
    /// Elite agent that joins the hunt once any regular agent picks up the scent.
    Master,
    /// Replay of a recorded track; never scheduled and never pathfinds.
    Clone,
}

impl Tier {
    /// Every tier in declaration order.
    pub const ALL: [Tier; 3] = [Self::Regular, Self::Master, Self::Clone];
}

/// How a wandering agent picks its travel angle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WalkStyle {
    /// Draws a fresh angle on every decision tick.
    #[default]
    Random,
    /// Keeps its angle until a collision forces a turn.
    Line,
}

/// Per-tier movement and scheduling parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierProfile {
    /// Distance travelled per simulation tick, in tiles.
    pub speed: f32,
    /// Cadence of the tier's decision worker; `None` for unscheduled tiers.
    pub decision_period: Option<Duration>,
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Behavioural state exposed to presentation layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Roaming on random headings.
    Wander,
    /// Following the shortest path towards the target.
    Pursue,
    /// Recovering from a hit; movement is suspended.
    Stunned,
    /// Terminal state; excluded from scheduling and pathfinding.
    Dead,
}

/// Edge-triggered transition signals, delivered once and then cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentSignal {
    /// The agent just lost a health point.
    Damaged,
    /// The agent just died.
    Died,
    /// The agent just made contact with the target.
    Bit,
}

/// Message posted by a decision worker for the simulation loop to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// Agent the decision applies to.
    pub agent: AgentId,
    /// Outcome of the decision tick.
    pub kind: DecisionKind,
}

/// Outcome of a single decision tick for one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecisionKind {
    /// Keep roaming along the provided angle in degrees.
    Wander {
        /// Newly drawn travel angle.
        angle: f32,
    },
    /// A fresh path was found; travel along its first step.
    Pursue {
        /// Heading of the first step of the path.
        heading: Heading,
        /// Number of cells in the path, endpoints included.
        path_length: u32,
    },
    /// The target could not be reached this tick.
    LostTrail,
    /// Resume normal movement after a collision episode.
    ResolveCollision {
        /// Travel angle to commit once the episode ends.
        angle: f32,
    },
}

/// Static object that obstructs an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Blocker {
    /// A wall or decor tile.
    Tile(CellCoord),
    /// The outer edge of the level.
    Boundary,
}

/// Collision predicates supplied by the physics layer.
pub trait Collider {
    /// Returns the first static object overlapping a circle of `radius` at `position`.
    fn blocking(&self, position: Vec2, radius: f32) -> Option<Blocker>;

    /// Reports whether an agent at `agent` touches the target at `target`.
    fn touching(&self, agent: Vec2, target: Vec2) -> bool;
}

/// Stab delivered by the target during a simulation tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strike {
    /// Position the strike originates from, in tiles.
    pub origin: Vec2,
    /// Direction the target faces, in degrees.
    pub facing_degrees: f32,
}

/// Action recorded alongside a clone track frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TrackAction {
    /// Nothing notable happened on this frame.
    #[default]
    None,
    /// The recorded actor lost a health point.
    LoseHealth,
    /// The recorded actor died.
    Die,
}

/// Single recorded frame replayed by a clone agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackFrame {
    /// Position at the frame, in tiles.
    pub position: Vec2,
    /// Travel angle at the frame, in degrees.
    pub angle: f32,
    /// Action recorded on the frame.
    pub action: TrackAction,
}

/// Ordered recording replayed by a clone, one frame per simulation tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    frames: Vec<TrackFrame>,
}

impl Track {
    /// Creates a track from frames recorded in tick order.
    #[must_use]
    pub fn new(frames: Vec<TrackFrame>) -> Self {
        Self { frames }
    }

    /// Frame recorded for the provided tick, if the recording reaches it.
    #[must_use]
    pub fn frame(&self, tick: u64) -> Option<&TrackFrame> {
        usize::try_from(tick)
            .ok()
            .and_then(|index| self.frames.get(index))
    }

    /// Final recorded frame.
    #[must_use]
    pub fn last(&self) -> Option<&TrackFrame> {
        self.frames.last()
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Reports whether the track holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
