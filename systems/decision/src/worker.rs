//! Decision tick executed for every live agent of one tier.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{mpsc::Sender, Arc},
};

use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use tracing::{debug, warn};
use zombie_house_core::{Decision, DecisionKind, Heading, Tier, WalkStyle};
use zombie_house_system_pathfinding::Pathfinder;
use zombie_house_world::NavigationGraph;

use crate::{AgentBoard, BoardState, SchedulerError, TargetBeacon};

/// Re-evaluates wander and pursuit choices for all agents of a tier.
///
/// A worker never touches agent state directly. It reads the agents' boards
/// and posts [`Decision`] messages that the simulation loop applies.
#[derive(Debug)]
pub struct DecisionWorker {
    tier: Tier,
    boards: Vec<Arc<AgentBoard>>,
    graph: Arc<NavigationGraph>,
    target: Arc<TargetBeacon>,
    pathfinder: Pathfinder,
    rng: ChaCha8Rng,
    outbox: Sender<Decision>,
    #[cfg(test)]
    faulty_agent: Option<zombie_house_core::AgentId>,
}

impl DecisionWorker {
    /// Creates a worker for `tier`; boards of other tiers are ignored.
    #[must_use]
    pub fn new(
        tier: Tier,
        boards: Vec<Arc<AgentBoard>>,
        graph: Arc<NavigationGraph>,
        target: Arc<TargetBeacon>,
        seed: u64,
        outbox: Sender<Decision>,
    ) -> Self {
        let boards = boards
            .into_iter()
            .filter(|board| board.tier() == tier)
            .collect();
        Self {
            tier,
            boards,
            graph,
            target,
            pathfinder: Pathfinder::new(),
            rng: ChaCha8Rng::seed_from_u64(tier_seed(seed, tier)),
            outbox,
            #[cfg(test)]
            faulty_agent: None,
        }
    }

    /// Tier served by the worker.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Number of agents the worker iterates, dead ones included.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.boards.len()
    }

    /// Runs one decision tick and returns the number of decisions posted.
    ///
    /// A panic while deciding for one agent is logged and only skips that
    /// agent. Fails once the simulation loop has dropped its inbox.
    pub fn run_once(&mut self) -> Result<usize, SchedulerError> {
        let mut posted = 0;
        for index in 0..self.boards.len() {
            let board = Arc::clone(&self.boards[index]);
            let outcome = catch_unwind(AssertUnwindSafe(|| self.decide(&board)));
            let kind = match outcome {
                Ok(Some(kind)) => kind,
                Ok(None) => continue,
                Err(_) => {
                    warn!(
                        agent = board.id().get(),
                        tier = ?self.tier,
                        "decision panicked; agent skipped this tick"
                    );
                    continue;
                }
            };

            self.outbox
                .send(Decision {
                    agent: board.id(),
                    kind,
                })
                .map_err(|_| SchedulerError::InboxClosed { tier: self.tier })?;
            posted += 1;
        }

        Ok(posted)
    }

    fn decide(&mut self, board: &AgentBoard) -> Option<DecisionKind> {
        #[cfg(test)]
        if self.faulty_agent == Some(board.id()) {
            panic!("decision fault for agent {}", board.id().get());
        }

        let state = &board.snapshot();
        if state.dead {
            return None;
        }

        if state.angle_adjusted {
            let angle = if state.pursuing {
                self.pursuit_step(state)
                    .map_or(state.angle, |(heading, _)| heading.angle())
            } else {
                self.draw_angle(state.angle)
            };
            return Some(DecisionKind::ResolveCollision { angle });
        }

        if state.pursuing {
            if !state.needs_new_heading {
                return None;
            }

            return match self.search(state)? {
                Some((heading, path_length)) => Some(DecisionKind::Pursue {
                    heading,
                    path_length,
                }),
                None => Some(DecisionKind::LostTrail),
            };
        }

        match board.walk_style() {
            WalkStyle::Random => Some(DecisionKind::Wander {
                angle: self.draw_angle(state.angle),
            }),
            WalkStyle::Line => None,
        }
    }

    fn pursuit_step(&mut self, state: &BoardState) -> Option<(Heading, u32)> {
        self.search(state).flatten()
    }

    /// Outer `None` skips the tick, inner `None` means the target is unreachable.
    fn search(&mut self, state: &BoardState) -> Option<Option<(Heading, u32)>> {
        let source = state.cell?;
        let goal = self.target.cell()?;

        match self.pathfinder.find_path(&self.graph, source, goal) {
            Ok(Some(path)) => path
                .next_heading()
                .map(|heading| Some((heading, path.length()))),
            Ok(None) => Some(None),
            Err(error) => {
                debug!(%error, tier = ?self.tier, "pursuit search skipped");
                None
            }
        }
    }

    /// Whole-degree angle in `[0, 360)` that differs from `previous`.
    fn draw_angle(&mut self, previous: f32) -> f32 {
        let previous = previous.round() as i32;
        loop {
            let candidate: i32 = self.rng.gen_range(0..360);
            if candidate != previous {
                return candidate as f32;
            }
        }
    }
}

fn tier_seed(seed: u64, tier: Tier) -> u64 {
    let salt = match tier {
        Tier::Regular => 0x9e37_79b9_7f4a_7c15,
        Tier::Master => 0xbf58_476d_1ce4_e5b9,
        Tier::Clone => 0x94d0_49bb_1331_11eb,
    };
    seed ^ salt
}
