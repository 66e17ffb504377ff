#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level session that wires the pursuit engine together.
//!
//! A [`Session`] owns the navigation graph, the horde, the target beacon and
//! the decision scheduler of one level. Presentation layers call
//! [`Session::tick`] once per frame with the target's position and any strikes
//! it delivered, then read [`Session::views`] and [`Session::drain_signals`].

use std::sync::{
    mpsc::{self, Receiver},
    Arc,
};

use glam::Vec2;
use tracing::info;
use zombie_house_core::{
    AgentId, AgentSignal, CellCoord, ConfigError, Decision, EngineConfig, Strike, Tier, Track,
};
use zombie_house_system_behavior::{AgentView, Horde};
use zombie_house_system_decision::{
    DecisionScheduler, DecisionWorker, SchedulerError, TargetBeacon,
};
use zombie_house_world::{GridCollider, LevelLayout, NavigationGraph};

/// How decision workers are driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SchedulingMode {
    /// One background thread per scheduled tier.
    #[default]
    Threaded,
    /// Workers run only when [`Session::run_decisions`] is called.
    Manual,
}

/// Failures raised while starting or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The decision scheduler failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// One running level.
#[derive(Debug)]
pub struct Session {
    graph: Arc<NavigationGraph>,
    horde: Horde,
    target: Arc<TargetBeacon>,
    target_start: Option<CellCoord>,
    scheduler: DecisionScheduler,
    inbox: Receiver<Decision>,
    contact_distance: f32,
}

impl Session {
    /// Builds the level's graph, spawns its agents and starts their decision workers.
    pub fn start(
        layout: LevelLayout,
        config: EngineConfig,
        mode: SchedulingMode,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let target_start = layout.target();
        let spawns = layout.spawns().to_vec();
        let graph = Arc::new(NavigationGraph::build(layout.into_grid()));

        let mut horde = Horde::new(config.clone());
        for spawn in &spawns {
            let _ = horde.spawn(spawn.tier, graph.grid().center_of(spawn.cell), 0.0);
        }

        let target = Arc::new(TargetBeacon::new(target_start));
        let (outbox, inbox) = mpsc::channel();
        let workers: Vec<DecisionWorker> = Tier::ALL
            .into_iter()
            .filter(|tier| config.profile(*tier).decision_period.is_some())
            .map(|tier| {
                DecisionWorker::new(
                    tier,
                    horde.boards(),
                    Arc::clone(&graph),
                    Arc::clone(&target),
                    config.seed,
                    outbox.clone(),
                )
            })
            .collect();

        let scheduler = match mode {
            SchedulingMode::Threaded => {
                DecisionScheduler::spawn(workers, |tier| config.profile(tier).decision_period)?
            }
            SchedulingMode::Manual => DecisionScheduler::manual(workers),
        };

        info!(
            columns = graph.grid().columns(),
            rows = graph.grid().rows(),
            agents = spawns.len(),
            ?mode,
            "session started"
        );

        Ok(Self {
            graph,
            horde,
            target,
            target_start,
            scheduler,
            inbox,
            contact_distance: config.contact_distance,
        })
    }

    /// Advances the level by one simulation tick.
    ///
    /// Decisions posted since the previous tick are applied first, then the
    /// strikes, then every agent is stepped towards or around `target`.
    pub fn tick(&mut self, target: Option<Vec2>, strikes: &[Strike]) {
        let target_cell = target.and_then(|position| self.graph.grid().cell_at(position));
        self.target.publish(target_cell);

        let _ = self.horde.apply_decisions(self.inbox.try_iter());
        for strike in strikes {
            let _ = self.horde.strike(*strike);
        }

        let collider = GridCollider::new(self.graph.grid(), self.contact_distance);
        self.horde.step(&self.graph, target, &collider);
    }

    /// Runs one decision tick of every worker; manual mode only.
    pub fn run_decisions(&mut self) -> Result<usize, SessionError> {
        Ok(self.scheduler.tick_all()?)
    }

    /// Runs one decision tick of the given tier's worker; manual mode only.
    pub fn run_tier_decisions(&mut self, tier: Tier) -> Result<usize, SessionError> {
        Ok(self.scheduler.tick_tier(tier)?)
    }

    /// Adds a clone that replays a recorded track.
    pub fn spawn_clone(&mut self, track: Track) -> AgentId {
        self.horde.spawn_clone(track)
    }

    /// Snapshot of every agent for presentation layers.
    #[must_use]
    pub fn views(&self) -> Vec<AgentView> {
        self.horde.views()
    }

    /// Takes the transition signals raised since the previous drain.
    pub fn drain_signals(&mut self) -> Vec<(AgentId, AgentSignal)> {
        self.horde.drain_signals()
    }

    /// Navigation graph of the level.
    #[must_use]
    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    /// Agents of the level.
    #[must_use]
    pub const fn horde(&self) -> &Horde {
        &self.horde
    }

    /// Target start cell declared by the layout.
    #[must_use]
    pub const fn target_start(&self) -> Option<CellCoord> {
        self.target_start
    }

    /// Stops the decision workers without waiting for them.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        info!(tick = self.horde.tick(), "session shut down");
    }

    /// Stops the decision workers and waits for their threads to exit.
    pub fn join(mut self) -> Result<(), SessionError> {
        self.scheduler.join()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use zombie_house_core::TierSettings;

    use super::*;

    #[test]
    fn invalid_configuration_is_rejected_before_anything_starts() {
        let layout = LevelLayout::parse("Z.\n.P").expect("layout parses");
        let config = EngineConfig {
            master: TierSettings {
                speed: 0.05,
                decision_period_ms: None,
            },
            ..EngineConfig::default()
        };

        let error = Session::start(layout, config, SchedulingMode::Manual)
            .expect_err("missing master period rejected");
        assert!(matches!(
            error,
            SessionError::Config(ConfigError::MissingDecisionPeriod { tier: Tier::Master })
        ));
    }

    #[test]
    fn spawns_follow_the_layout() {
        let layout = LevelLayout::parse("Z..\n.M.\n..P").expect("layout parses");
        let session = Session::start(layout, EngineConfig::default(), SchedulingMode::Manual)
            .expect("session starts");

        let views = session.views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].tier, Tier::Regular);
        assert_eq!(views[0].position, Vec2::new(0.5, 0.5));
        assert_eq!(views[1].tier, Tier::Master);
        assert_eq!(session.target_start(), Some(CellCoord::new(2, 2)));
        assert_eq!(session.graph().len(), 9);
    }
}
