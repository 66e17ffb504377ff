//! Lock-free blackboards shared between the simulation loop and the workers.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use zombie_house_core::{AgentId, CellCoord, Tier, WalkStyle};

const NO_CELL: u64 = u64::MAX;

/// Agent state as last published by the simulation loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardState {
    /// Cell used as the search source, absent when the agent is off the grid.
    pub cell: Option<CellCoord>,
    /// Current travel angle in degrees.
    pub angle: f32,
    /// The agent is pursuing the target.
    pub pursuing: bool,
    /// The agent wants a fresh pursuit heading.
    pub needs_new_heading: bool,
    /// A collision reversed the agent's heading and awaits resolution.
    pub angle_adjusted: bool,
    /// The agent is dead and must be skipped.
    pub dead: bool,
}

/// Per-agent blackboard written by the simulation loop and read by its tier's worker.
///
/// Every field is an independent atomic. Readers may observe a mix of values
/// from two consecutive publications.
#[derive(Debug)]
pub struct AgentBoard {
    id: AgentId,
    tier: Tier,
    walk_style: WalkStyle,
    cell: AtomicU64,
    angle_bits: AtomicU32,
    pursuing: AtomicBool,
    needs_new_heading: AtomicBool,
    angle_adjusted: AtomicBool,
    dead: AtomicBool,
}

impl AgentBoard {
    /// Creates a board for a random walker, initially wandering at `angle`.
    #[must_use]
    pub fn new(id: AgentId, tier: Tier, cell: Option<CellCoord>, angle: f32) -> Self {
        Self {
            id,
            tier,
            walk_style: WalkStyle::Random,
            cell: AtomicU64::new(pack(cell)),
            angle_bits: AtomicU32::new(angle.to_bits()),
            pursuing: AtomicBool::new(false),
            needs_new_heading: AtomicBool::new(false),
            angle_adjusted: AtomicBool::new(false),
            dead: AtomicBool::new(false),
        }
    }

    /// Identifier of the agent the board describes.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Tier of the agent the board describes.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Replaces the walk style; fixed once the board is shared.
    #[must_use]
    pub fn with_walk_style(mut self, walk_style: WalkStyle) -> Self {
        self.walk_style = walk_style;
        self
    }

    /// How the agent picks wander angles.
    #[must_use]
    pub const fn walk_style(&self) -> WalkStyle {
        self.walk_style
    }

    /// Publishes the agent's latest state.
    pub fn publish(&self, state: BoardState) {
        self.cell.store(pack(state.cell), Ordering::Relaxed);
        self.angle_bits.store(state.angle.to_bits(), Ordering::Relaxed);
        self.pursuing.store(state.pursuing, Ordering::Release);
        self.needs_new_heading
            .store(state.needs_new_heading, Ordering::Release);
        self.angle_adjusted
            .store(state.angle_adjusted, Ordering::Release);
        self.dead.store(state.dead, Ordering::Release);
    }

    /// Reads the most recently published state.
    #[must_use]
    pub fn snapshot(&self) -> BoardState {
        BoardState {
            dead: self.dead.load(Ordering::Acquire),
            angle_adjusted: self.angle_adjusted.load(Ordering::Acquire),
            needs_new_heading: self.needs_new_heading.load(Ordering::Acquire),
            pursuing: self.pursuing.load(Ordering::Acquire),
            angle: f32::from_bits(self.angle_bits.load(Ordering::Relaxed)),
            cell: unpack(self.cell.load(Ordering::Relaxed)),
        }
    }
}

/// Target cell shared with every worker.
#[derive(Debug)]
pub struct TargetBeacon {
    cell: AtomicU64,
}

impl TargetBeacon {
    /// Creates a beacon pointing at the provided cell.
    #[must_use]
    pub fn new(cell: Option<CellCoord>) -> Self {
        Self {
            cell: AtomicU64::new(pack(cell)),
        }
    }

    /// Publishes the target's current cell; `None` when it left the grid.
    pub fn publish(&self, cell: Option<CellCoord>) {
        self.cell.store(pack(cell), Ordering::Release);
    }

    /// Cell the target occupied at its last publication.
    #[must_use]
    pub fn cell(&self) -> Option<CellCoord> {
        unpack(self.cell.load(Ordering::Acquire))
    }
}

impl Default for TargetBeacon {
    fn default() -> Self {
        Self::new(None)
    }
}

fn pack(cell: Option<CellCoord>) -> u64 {
    cell.map_or(NO_CELL, |cell| {
        (u64::from(cell.column()) << 32) | u64::from(cell.row())
    })
}

fn unpack(bits: u64) -> Option<CellCoord> {
    if bits == NO_CELL {
        return None;
    }

    let column = u32::try_from(bits >> 32).ok()?;
    let row = u32::try_from(bits & u64::from(u32::MAX)).ok()?;
    Some(CellCoord::new(column, row))
}
