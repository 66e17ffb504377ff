#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-frame agent state machine driven by the simulation loop.
//!
//! The [`Horde`] owns every agent of a level. Each simulation tick it counts
//! down stuns, resolves collisions against static geometry, integrates
//! movement, runs the scent test that decides between wandering and pursuit,
//! and publishes the result to the agents' blackboards. Decisions posted by
//! the background workers are folded in through [`Horde::apply_decisions`].

mod agent;

pub use agent::{Agent, AgentFlags, AgentView};

use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use tracing::{debug, info};
use zombie_house_core::{
    direction_vector, normalize_degrees, AgentId, AgentSignal, CellCoord, Collider, Decision,
    DecisionKind, EngineConfig, Strike, Tier, Track, TrackAction, WalkStyle,
    UNREACHABLE_PATH_LENGTH,
};
use zombie_house_system_decision::AgentBoard;
use zombie_house_system_pathfinding::Pathfinder;
use zombie_house_world::{Grid, NavigationGraph};

/// Smallest distance covered by one nudge step, so stationary tiers can still leave walls.
const MIN_NUDGE_STEP: f32 = 0.01;

/// Tolerance used when comparing a position with a tile centre line.
const CENTRE_EPSILON: f32 = 1e-4;

/// Mixed into the engine seed so walk styles do not mirror the decision streams.
const WALK_STYLE_SALT: u64 = 0x2545_f491_4f6c_dd1d;

/// Every agent of a level, stepped once per simulation tick.
#[derive(Debug)]
pub struct Horde {
    config: EngineConfig,
    agents: Vec<Agent>,
    pathfinder: Pathfinder,
    rng: ChaCha8Rng,
    tick: u64,
    master_alerted: bool,
    signals: Vec<(AgentId, AgentSignal)>,
    latest: Vec<Option<DecisionKind>>,
}

impl Horde {
    /// Creates an empty horde tuned by `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed ^ WALK_STYLE_SALT),
            config,
            agents: Vec::new(),
            pathfinder: Pathfinder::new(),
            tick: 0,
            master_alerted: false,
            signals: Vec::new(),
            latest: Vec::new(),
        }
    }

    /// Adds a wandering agent at `position` travelling along `angle`.
    ///
    /// The walk style is drawn from the horde's seeded generator with
    /// `line_walk_chance`. Agents spawned with [`Tier::Clone`] get an empty
    /// track and hold their spawn position; use [`Self::spawn_clone`] to
    /// replay a recording.
    pub fn spawn(&mut self, tier: Tier, position: Vec2, angle: f32) -> AgentId {
        let walk_style = if self.rng.gen::<f64>() < self.config.line_walk_chance {
            WalkStyle::Line
        } else {
            WalkStyle::Random
        };
        self.spawn_walking(tier, walk_style, position, angle)
    }

    /// Adds a wandering agent with an explicit walk style.
    pub fn spawn_walking(
        &mut self,
        tier: Tier,
        walk_style: WalkStyle,
        position: Vec2,
        angle: f32,
    ) -> AgentId {
        let id = AgentId::new(u32::try_from(self.agents.len()).unwrap_or(u32::MAX));
        let mut agent = Agent::new(
            id,
            tier,
            walk_style,
            position,
            normalize_degrees(angle),
            self.config.agent_health,
        );
        if tier == Tier::Clone {
            agent.track = Some(Track::default());
        }
        agent.publish();
        self.agents.push(agent);
        debug!(
            agent = id.get(),
            ?tier,
            ?walk_style,
            x = position.x,
            y = position.y,
            "agent spawned"
        );
        id
    }

    /// Adds a clone that replays `track`, one frame per simulation tick.
    pub fn spawn_clone(&mut self, track: Track) -> AgentId {
        let (position, angle) = track
            .frame(0)
            .map_or((Vec2::ZERO, 0.0), |frame| (frame.position, frame.angle));
        let id = self.spawn(Tier::Clone, position, angle);
        if let Some(agent) = self.agents.last_mut() {
            agent.track = Some(track);
        }
        id
    }

    /// Agent with the provided identifier.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.agents.get(index))
    }

    /// Every agent in spawn order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Blackboards of every agent that a decision worker may serve.
    #[must_use]
    pub fn boards(&self) -> Vec<Arc<AgentBoard>> {
        self.agents
            .iter()
            .filter(|agent| agent.tier != Tier::Clone)
            .map(|agent| Arc::clone(&agent.board))
            .collect()
    }

    /// Number of simulation ticks stepped so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Reports whether master agents have been alerted by a pursuing regular agent.
    #[must_use]
    pub const fn master_alerted(&self) -> bool {
        self.master_alerted
    }

    /// Engine configuration the horde runs with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies posted decisions; only the latest decision per agent takes effect.
    pub fn apply_decisions<I>(&mut self, decisions: I) -> usize
    where
        I: IntoIterator<Item = Decision>,
    {
        self.latest.clear();
        self.latest.resize(self.agents.len(), None);
        for decision in decisions {
            let slot = usize::try_from(decision.agent.get())
                .ok()
                .and_then(|index| self.latest.get_mut(index));
            if let Some(slot) = slot {
                *slot = Some(decision.kind);
            }
        }

        let mut applied = 0;
        for index in 0..self.agents.len() {
            let Some(kind) = self.latest[index] else {
                continue;
            };
            let alerted_master = self.is_alerted_master(&self.agents[index]);
            let smell_threshold = self.config.smell_threshold;
            let agent = &mut self.agents[index];
            if agent.flags.dead || agent.tier == Tier::Clone {
                continue;
            }

            if apply_decision(agent, kind, smell_threshold, alerted_master) {
                applied += 1;
            }
            agent.publish();
        }
        applied
    }

    /// Advances every agent by one simulation tick.
    ///
    /// `target` is the target's continuous position; `None` when it is
    /// unavailable, in which case scent tests are skipped and agents keep their
    /// last decision.
    pub fn step<C>(&mut self, graph: &NavigationGraph, target: Option<Vec2>, collider: &C)
    where
        C: Collider + ?Sized,
    {
        let grid = graph.grid();
        let target_cell = target.and_then(|position| grid.cell_at(position));

        for index in 0..self.agents.len() {
            if self.agents[index].tier == Tier::Clone {
                self.replay(index);
                continue;
            }

            self.step_agent(index, graph, target, target_cell, collider);
        }

        if !self.master_alerted
            && self.agents.iter().any(|agent| {
                agent.tier == Tier::Regular && agent.flags.pursuing && !agent.flags.dead
            })
        {
            self.master_alerted = true;
            info!(tick = self.tick, "master agents alerted");
        }

        self.tick += 1;
    }

    /// Applies the target's stab to every live agent inside its cone.
    ///
    /// Returns the number of agents hit.
    pub fn strike(&mut self, strike: Strike) -> usize {
        let half_arc = self.config.strike_arc_degrees / 2.0;
        let reach = self.config.strike_reach;
        let victims: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|agent| !agent.flags.dead && agent.tier != Tier::Clone)
            .filter(|agent| within_cone(strike, agent.position, reach, half_arc))
            .map(Agent::id)
            .collect();

        victims
            .into_iter()
            .filter(|id| self.damage(*id))
            .count()
    }

    /// Removes one health point from the agent, stunning or killing it.
    ///
    /// Returns `false` when the agent does not exist, is dead, or is a clone.
    pub fn damage(&mut self, id: AgentId) -> bool {
        let stun_ticks = self.config.stun_ticks;
        let Some(agent) = usize::try_from(id.get())
            .ok()
            .and_then(|index| self.agents.get_mut(index))
        else {
            return false;
        };
        if agent.flags.dead || agent.tier == Tier::Clone {
            return false;
        }

        agent.health = agent.health.saturating_sub(1);
        self.signals.push((id, AgentSignal::Damaged));
        if agent.health == 0 {
            kill(agent);
            self.signals.push((id, AgentSignal::Died));
            info!(agent = id.get(), tier = ?agent.tier, "agent died");
        } else {
            agent.flags.stunned = true;
            agent.stun_remaining = stun_ticks;
            debug!(agent = id.get(), health = agent.health, "agent stunned");
        }
        agent.publish();
        true
    }

    /// Snapshot of every agent for presentation layers.
    #[must_use]
    pub fn views(&self) -> Vec<AgentView> {
        self.agents.iter().map(AgentView::from).collect()
    }

    /// Takes the transition signals raised since the previous drain.
    pub fn drain_signals(&mut self) -> Vec<(AgentId, AgentSignal)> {
        std::mem::take(&mut self.signals)
    }

    fn is_alerted_master(&self, agent: &Agent) -> bool {
        agent.tier == Tier::Master && self.master_alerted
    }

    fn step_agent<C>(
        &mut self,
        index: usize,
        graph: &NavigationGraph,
        target: Option<Vec2>,
        target_cell: Option<CellCoord>,
        collider: &C,
    ) where
        C: Collider + ?Sized,
    {
        let grid = graph.grid();
        let alerted_master = self.is_alerted_master(&self.agents[index]);
        let speed = self.config.profile(self.agents[index].tier).speed;
        let radius = self.config.agent_radius;
        let max_nudge_steps = self.config.max_nudge_steps;
        let smell_threshold = self.config.smell_threshold;
        let search_radius = self.config.search_radius;

        let agent = &mut self.agents[index];
        if agent.flags.dead {
            return;
        }

        if agent.flags.stunned {
            agent.stun_remaining = agent.stun_remaining.saturating_sub(1);
            if agent.stun_remaining == 0 {
                agent.flags.stunned = false;
                debug!(agent = agent.id.get(), "stun wore off");
            }
            agent.publish();
            return;
        }

        if collider.blocking(agent.position, radius).is_some() && !agent.flags.angle_adjusted {
            begin_collision(agent, graph, collider, speed, radius, max_nudge_steps);
        } else if !agent.flags.collision_detected {
            let candidate = agent.position + direction_vector(agent.angle) * speed;
            if grid.cell_at(candidate).is_some() {
                agent.position = candidate;
            }
        }

        let search_cell = lookahead_cell(grid, agent.position, agent.angle);
        let moved_cell = search_cell != agent.search_cell;
        agent.search_cell = search_cell;
        let target_moved = target_cell != agent.target_cell;
        agent.target_cell = target_cell;

        if let (Some(source), Some(goal)) = (search_cell, target_cell) {
            let length = if alerted_master || source.manhattan_distance(goal) <= search_radius {
                match self.pathfinder.find_path(graph, source, goal) {
                    Ok(Some(path)) => Some(path.length()),
                    Ok(None) => Some(UNREACHABLE_PATH_LENGTH),
                    Err(error) => {
                        debug!(%error, agent = agent.id.get(), "scent test skipped");
                        None
                    }
                }
            } else {
                Some(UNREACHABLE_PATH_LENGTH)
            };

            if let Some(length) = length {
                agent.path_length = length;
                let smells = length <= smell_threshold
                    || (alerted_master && length != UNREACHABLE_PATH_LENGTH);
                match (agent.flags.pursuing, smells) {
                    (false, true) => {
                        agent.flags.pursuing = true;
                        agent.flags.needs_new_heading = true;
                        debug!(agent = agent.id.get(), path_length = length, "pursuit started");
                    }
                    (true, false) => {
                        agent.flags.pursuing = false;
                        agent.flags.needs_new_heading = false;
                        debug!(agent = agent.id.get(), path_length = length, "pursuit lost");
                    }
                    (true, true) if moved_cell || target_moved => {
                        agent.flags.needs_new_heading = true;
                    }
                    _ => {}
                }
            }
        }

        if let Some(target) = target {
            let touching = collider.touching(agent.position, target);
            if touching && !agent.touching_target {
                self.signals.push((agent.id, AgentSignal::Bit));
            }
            agent.touching_target = touching;
        }

        agent.publish();
    }

    fn replay(&mut self, index: usize) {
        let tick = self.tick;
        let agent = &mut self.agents[index];
        if agent.flags.dead {
            return;
        }

        let Some(track) = agent.track.as_ref() else {
            return;
        };
        let (frame, fresh) = match track.frame(tick) {
            Some(frame) => (*frame, true),
            None => match track.last() {
                Some(frame) => (*frame, false),
                None => return,
            },
        };

        agent.position = frame.position;
        agent.angle = normalize_degrees(frame.angle);
        if !fresh {
            return;
        }

        match frame.action {
            TrackAction::None => {}
            TrackAction::LoseHealth => {
                agent.health = agent.health.saturating_sub(1);
                self.signals.push((agent.id, AgentSignal::Damaged));
            }
            TrackAction::Die => {
                kill(agent);
                self.signals.push((agent.id, AgentSignal::Died));
            }
        }
    }
}

/// Folds one decision into the agent; returns whether it changed anything.
fn apply_decision(
    agent: &mut Agent,
    kind: DecisionKind,
    smell_threshold: u32,
    alerted_master: bool,
) -> bool {
    match kind {
        DecisionKind::Wander { angle } => {
            if agent.flags.pursuing || agent.flags.angle_adjusted {
                return false;
            }
            agent.angle = normalize_degrees(angle);
        }
        DecisionKind::Pursue {
            heading,
            path_length,
        } => {
            if !agent.flags.pursuing {
                return false;
            }
            agent.path_length = path_length;
            agent.flags.needs_new_heading = false;
            if path_length <= smell_threshold || alerted_master {
                agent.angle = heading.angle();
            } else {
                agent.flags.pursuing = false;
                debug!(agent = agent.id.get(), path_length, "pursuit lost");
            }
        }
        DecisionKind::LostTrail => {
            if !agent.flags.pursuing {
                return false;
            }
            agent.flags.pursuing = false;
            agent.flags.needs_new_heading = false;
            agent.path_length = UNREACHABLE_PATH_LENGTH;
            debug!(agent = agent.id.get(), "pursuit lost");
        }
        DecisionKind::ResolveCollision { angle } => {
            if !agent.flags.angle_adjusted {
                return false;
            }
            agent.angle = normalize_degrees(angle);
            agent.flags.angle_adjusted = false;
            agent.flags.collision_detected = false;
        }
    }
    true
}

/// Reverses the agent and nudges it clear of the obstruction.
fn begin_collision<C>(
    agent: &mut Agent,
    graph: &NavigationGraph,
    collider: &C,
    speed: f32,
    radius: f32,
    max_nudge_steps: u32,
) where
    C: Collider + ?Sized,
{
    agent.flags.collision_detected = true;
    agent.flags.angle_adjusted = true;
    agent.angle = normalize_degrees(agent.angle + 180.0);

    let step = direction_vector(agent.angle) * speed.max(MIN_NUDGE_STEP);
    let mut nudges = 0;
    while nudges < max_nudge_steps && collider.blocking(agent.position, radius).is_some() {
        agent.position += step;
        nudges += 1;
    }

    if agent.flags.pursuing {
        let grid = graph.grid();
        let corner_cell = grid
            .cell_at(agent.position)
            .filter(|cell| graph.record(*cell).is_some_and(|record| record.corners().any()));
        if let Some(cell) = corner_cell {
            agent.position = grid.center_of(cell);
        }
    }

    debug!(
        agent = agent.id.get(),
        angle = agent.angle,
        nudges,
        "collision reversed heading"
    );
}

/// Cell used as the search source for an agent at `position` travelling along `angle`.
///
/// While the agent has not yet crossed the centre line of its tile along an
/// axis of travel it still counts as standing on the previous tile along that
/// axis. The shift is dropped when it would leave the grid or land on a wall.
fn lookahead_cell(grid: &Grid, position: Vec2, angle: f32) -> Option<CellCoord> {
    let cell = grid.cell_at(position)?;
    let centre = grid.center_of(cell);
    let direction = direction_vector(angle);

    let d_column = trailing_offset(direction.x, position.x, centre.x);
    let d_row = trailing_offset(direction.y, position.y, centre.y);
    if d_column == 0 && d_row == 0 {
        return Some(cell);
    }

    let shifted = cell
        .offset(d_row, d_column, grid.columns(), grid.rows())
        .filter(|shifted| grid.is_walkable(*shifted));
    Some(shifted.unwrap_or(cell))
}

fn trailing_offset(direction: f32, coordinate: f32, centre: f32) -> i32 {
    if direction > CENTRE_EPSILON && coordinate < centre - CENTRE_EPSILON {
        -1
    } else if direction < -CENTRE_EPSILON && coordinate > centre + CENTRE_EPSILON {
        1
    } else {
        0
    }
}

fn within_cone(strike: Strike, position: Vec2, reach: f32, half_arc: f32) -> bool {
    let offset = position - strike.origin;
    let distance = offset.length();
    if distance > reach {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }

    let bearing = offset.y.atan2(offset.x).to_degrees();
    let difference = normalize_degrees(bearing - strike.facing_degrees);
    difference.min(360.0 - difference) <= half_arc
}

fn kill(agent: &mut Agent) {
    agent.health = 0;
    agent.flags = AgentFlags {
        dead: true,
        ..AgentFlags::default()
    };
    agent.stun_remaining = 0;
    agent.path_length = UNREACHABLE_PATH_LENGTH;
}
