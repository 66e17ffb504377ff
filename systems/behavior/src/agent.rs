//! Per-agent state carried between simulation ticks.

use std::sync::Arc;

use glam::Vec2;
use zombie_house_core::{
    AgentId, AgentState, CellCoord, Tier, Track, WalkStyle, UNREACHABLE_PATH_LENGTH,
};
use zombie_house_system_decision::{AgentBoard, BoardState};

/// Independent behaviour flags of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentFlags {
    /// A collision episode is in progress; movement is suspended.
    pub collision_detected: bool,
    /// The heading was reversed by the current collision episode.
    pub angle_adjusted: bool,
    /// The agent is pursuing the target.
    pub pursuing: bool,
    /// The agent wants its decision worker to compute a fresh pursuit heading.
    pub needs_new_heading: bool,
    /// The agent is recovering from a hit.
    pub stunned: bool,
    /// The agent is dead.
    pub dead: bool,
}

/// Single agent owned by a [`Horde`](crate::Horde).
#[derive(Debug)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) tier: Tier,
    pub(crate) walk_style: WalkStyle,
    pub(crate) position: Vec2,
    pub(crate) angle: f32,
    pub(crate) flags: AgentFlags,
    pub(crate) health: u32,
    pub(crate) stun_remaining: u32,
    pub(crate) path_length: u32,
    pub(crate) search_cell: Option<CellCoord>,
    pub(crate) target_cell: Option<CellCoord>,
    pub(crate) touching_target: bool,
    pub(crate) track: Option<Track>,
    pub(crate) board: Arc<AgentBoard>,
}

impl Agent {
    pub(crate) fn new(
        id: AgentId,
        tier: Tier,
        walk_style: WalkStyle,
        position: Vec2,
        angle: f32,
        health: u32,
    ) -> Self {
        Self {
            id,
            tier,
            walk_style,
            position,
            angle,
            flags: AgentFlags::default(),
            health,
            stun_remaining: 0,
            path_length: UNREACHABLE_PATH_LENGTH,
            search_cell: None,
            target_cell: None,
            touching_target: false,
            track: None,
            board: Arc::new(AgentBoard::new(id, tier, None, angle).with_walk_style(walk_style)),
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Tier of the agent.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// How the agent picks wander angles.
    #[must_use]
    pub const fn walk_style(&self) -> WalkStyle {
        self.walk_style
    }

    /// Continuous position in tiles.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Travel angle in degrees.
    #[must_use]
    pub const fn angle(&self) -> f32 {
        self.angle
    }

    /// Current behaviour flags.
    #[must_use]
    pub const fn flags(&self) -> AgentFlags {
        self.flags
    }

    /// Remaining health points.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Ticks left until the stun wears off.
    #[must_use]
    pub const fn stun_remaining(&self) -> u32 {
        self.stun_remaining
    }

    /// Path length measured by the most recent scent test.
    #[must_use]
    pub const fn path_length(&self) -> u32 {
        self.path_length
    }

    /// Cell published to the decision worker as the search source.
    #[must_use]
    pub const fn search_cell(&self) -> Option<CellCoord> {
        self.search_cell
    }

    /// Behavioural state derived from the flags.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        if self.flags.dead {
            AgentState::Dead
        } else if self.flags.stunned {
            AgentState::Stunned
        } else if self.flags.pursuing {
            AgentState::Pursue
        } else {
            AgentState::Wander
        }
    }

    /// Blackboard shared with the agent's decision worker.
    #[must_use]
    pub fn board(&self) -> &Arc<AgentBoard> {
        &self.board
    }

    pub(crate) fn publish(&self) {
        self.board.publish(BoardState {
            cell: self.search_cell,
            angle: self.angle,
            pursuing: self.flags.pursuing,
            needs_new_heading: self.flags.needs_new_heading,
            angle_adjusted: self.flags.angle_adjusted,
            dead: self.flags.dead,
        });
    }
}

/// Per-tick snapshot handed to presentation layers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentView {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Tier of the agent.
    pub tier: Tier,
    /// Continuous position in tiles.
    pub position: Vec2,
    /// Travel angle in degrees.
    pub angle: f32,
    /// Behavioural state.
    pub state: AgentState,
    /// Whether the agent is dead.
    pub dead: bool,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            tier: agent.tier,
            position: agent.position,
            angle: agent.angle,
            state: agent.state(),
            dead: agent.flags.dead,
        }
    }
}
