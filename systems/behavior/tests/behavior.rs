use std::sync::{mpsc, Arc};

use glam::Vec2;
use zombie_house_core::{
    AgentId, AgentSignal, AgentState, CellCoord, Decision, DecisionKind, EngineConfig, Heading,
    Strike, Tier, TierSettings, Track, TrackAction, TrackFrame, WalkStyle,
};
use zombie_house_system_behavior::{Agent, Horde};
use zombie_house_system_decision::{DecisionScheduler, DecisionWorker, TargetBeacon};
use zombie_house_world::{GridCollider, LevelLayout, NavigationGraph};

const CORRIDOR: &str = "
    ##############################################
    #............................................#
    ##############################################
";

#[test]
fn agent_beyond_the_smell_threshold_keeps_wandering() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Regular, level.centre(21, 1), 0.0);

    level.step(&mut horde, Some(level.centre(1, 1)));

    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.path_length(), 21);
    assert_eq!(agent.state(), AgentState::Wander);
    assert!(!agent.flags().needs_new_heading);
}

#[test]
fn agent_at_the_smell_threshold_starts_pursuing() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Regular, level.centre(20, 1), 0.0);

    level.step(&mut horde, Some(level.centre(1, 1)));

    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.path_length(), 20);
    assert_eq!(agent.state(), AgentState::Pursue);
    assert!(agent.flags().needs_new_heading);
    assert!(agent.board().snapshot().needs_new_heading);
}

#[test]
fn pursuer_reverts_to_wander_when_the_target_slips_away() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Regular, level.centre(10, 1), 0.0);

    level.step(&mut horde, Some(level.centre(1, 1)));
    assert_eq!(state_of(&horde, id), AgentState::Pursue);

    level.step(&mut horde, Some(level.centre(44, 1)));
    assert_eq!(state_of(&horde, id), AgentState::Wander);
    assert_eq!(
        horde.agent(id).map(Agent::path_length),
        Some(zombie_house_core::UNREACHABLE_PATH_LENGTH)
    );
}

#[test]
fn hit_stuns_for_the_configured_duration() {
    let level = Level::new(CORRIDOR);
    let config = EngineConfig {
        stun_ticks: 40,
        ..stationary_config(15)
    };
    let mut horde = Horde::new(config);
    let id = horde.spawn(Tier::Regular, level.centre(30, 1), 0.0);

    assert!(horde.damage(id));
    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.health(), 2);
    assert_eq!(agent.state(), AgentState::Stunned);
    assert_eq!(horde.drain_signals(), vec![(id, AgentSignal::Damaged)]);

    for _ in 0..39 {
        level.step(&mut horde, None);
    }
    assert_eq!(state_of(&horde, id), AgentState::Stunned);

    level.step(&mut horde, None);
    let agent = horde.agent(id).expect("agent exists");
    assert!(!agent.flags().stunned);
    assert_eq!(agent.state(), AgentState::Wander);
    assert_eq!(agent.health(), 2);
}

#[test]
fn stunned_agents_do_not_move() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(EngineConfig::default());
    let start = level.centre(30, 1);
    let id = horde.spawn(Tier::Regular, start, 0.0);

    assert!(horde.damage(id));
    for _ in 0..10 {
        level.step(&mut horde, None);
    }
    assert_eq!(horde.agent(id).map(Agent::position), Some(start));
}

#[test]
fn third_hit_kills_and_removes_the_agent_from_scheduling() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(15));
    let id = horde.spawn(Tier::Regular, level.centre(3, 1), 0.0);

    for _ in 0..3 {
        assert!(horde.damage(id));
    }
    assert!(!horde.damage(id), "dead agents take no further damage");

    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.state(), AgentState::Dead);
    assert_eq!(agent.health(), 0);
    assert_eq!(
        horde.drain_signals(),
        vec![
            (id, AgentSignal::Damaged),
            (id, AgentSignal::Damaged),
            (id, AgentSignal::Damaged),
            (id, AgentSignal::Died),
        ]
    );

    level.step(&mut horde, Some(level.centre(1, 1)));
    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.state(), AgentState::Dead);
    assert!(agent.board().snapshot().dead);

    let (outbox, inbox) = mpsc::channel();
    let worker = DecisionWorker::new(
        Tier::Regular,
        horde.boards(),
        Arc::clone(&level.graph),
        Arc::new(TargetBeacon::new(Some(CellCoord::new(1, 1)))),
        3,
        outbox,
    );
    let mut scheduler = DecisionScheduler::manual(vec![worker]);
    assert_eq!(scheduler.tick_all().expect("manual tick"), 0);
    assert!(inbox.try_recv().is_err());
}

#[test]
fn strike_hits_agents_inside_the_cone_only() {
    let mut horde = Horde::new(stationary_config(15));
    let ahead = horde.spawn(Tier::Regular, Vec2::new(10.8, 1.5), 0.0);
    let behind = horde.spawn(Tier::Regular, Vec2::new(9.2, 1.5), 0.0);
    let far = horde.spawn(Tier::Regular, Vec2::new(12.5, 1.5), 0.0);

    let hits = horde.strike(Strike {
        origin: Vec2::new(10.0, 1.5),
        facing_degrees: 0.0,
    });

    assert_eq!(hits, 1);
    assert_eq!(horde.agent(ahead).map(Agent::health), Some(2));
    assert_eq!(horde.agent(behind).map(Agent::health), Some(3));
    assert_eq!(horde.agent(far).map(Agent::health), Some(3));
}

#[test]
fn collision_reverses_heading_and_waits_for_resolution() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(EngineConfig::default());
    let id = horde.spawn(Tier::Regular, Vec2::new(44.85, 1.5), 0.0);

    level.step(&mut horde, None);
    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.angle(), 180.0);
    assert!(agent.flags().collision_detected && agent.flags().angle_adjusted);
    assert!(agent.position().x <= 44.8 + 1e-4);
    let parked = agent.position();

    level.step(&mut horde, None);
    assert_eq!(horde.agent(id).map(Agent::position), Some(parked));

    let applied = horde.apply_decisions([Decision {
        agent: id,
        kind: DecisionKind::ResolveCollision { angle: 180.0 },
    }]);
    assert_eq!(applied, 1);
    let agent = horde.agent(id).expect("agent exists");
    assert!(!agent.flags().collision_detected && !agent.flags().angle_adjusted);

    level.step(&mut horde, None);
    assert!(horde.agent(id).map(Agent::position).expect("agent exists").x < parked.x);
}

#[test]
fn pursuit_decision_steers_the_agent() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Regular, level.centre(10, 1), 90.0);
    level.step(&mut horde, Some(level.centre(1, 1)));

    let applied = horde.apply_decisions([Decision {
        agent: id,
        kind: DecisionKind::Pursue {
            heading: Heading::West,
            path_length: 10,
        },
    }]);
    assert_eq!(applied, 1);
    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.angle(), 180.0);
    assert!(!agent.flags().needs_new_heading);

    let applied = horde.apply_decisions([Decision {
        agent: id,
        kind: DecisionKind::Wander { angle: 33.0 },
    }]);
    assert_eq!(applied, 0, "wander decisions do not override pursuit");
}

#[test]
fn pursuer_turns_around_when_the_target_crosses_over() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Regular, level.centre(10, 1), 90.0);
    let beacon = Arc::new(TargetBeacon::default());
    let (outbox, inbox) = mpsc::channel();
    let worker = DecisionWorker::new(
        Tier::Regular,
        horde.boards(),
        Arc::clone(&level.graph),
        Arc::clone(&beacon),
        5,
        outbox,
    );
    let mut scheduler = DecisionScheduler::manual(vec![worker]);

    let mut round = |horde: &mut Horde, target: CellCoord| {
        beacon.publish(Some(target));
        level.step(horde, Some(level.centre(target.column(), target.row())));
        let _ = scheduler.tick_all().expect("manual tick");
        let _ = horde.apply_decisions(inbox.try_iter());
    };

    round(&mut horde, CellCoord::new(5, 1));
    assert_eq!(state_of(&horde, id), AgentState::Pursue);
    assert_eq!(horde.agent(id).map(Agent::angle), Some(180.0));

    round(&mut horde, CellCoord::new(15, 1));
    let agent = horde.agent(id).expect("agent exists");
    assert_eq!(agent.state(), AgentState::Pursue);
    assert_eq!(agent.angle(), 0.0);
    assert!(!agent.flags().needs_new_heading);

    round(&mut horde, CellCoord::new(15, 1));
    assert_eq!(horde.agent(id).map(Agent::angle), Some(0.0));
}

#[test]
fn walk_style_follows_the_line_walk_chance() {
    let level = Level::new(CORRIDOR);
    let mut lines = Horde::new(EngineConfig {
        line_walk_chance: 1.0,
        ..stationary_config(15)
    });
    let mut randoms = Horde::new(EngineConfig {
        line_walk_chance: 0.0,
        ..stationary_config(15)
    });
    for column in 30..34 {
        let _ = lines.spawn(Tier::Regular, level.centre(column, 1), 0.0);
        let _ = randoms.spawn(Tier::Master, level.centre(column, 1), 0.0);
    }

    assert!(lines.agents().iter().all(|agent| agent.walk_style() == WalkStyle::Line));
    assert!(randoms
        .boards()
        .iter()
        .all(|board| board.walk_style() == WalkStyle::Random));
}

#[test]
fn line_walkers_keep_their_heading_between_collisions() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(15));
    let walker = horde.spawn_walking(Tier::Regular, WalkStyle::Line, level.centre(30, 1), 0.0);
    let roamer = horde.spawn_walking(Tier::Regular, WalkStyle::Random, level.centre(34, 1), 0.0);
    level.step(&mut horde, None);

    let (outbox, inbox) = mpsc::channel();
    let worker = DecisionWorker::new(
        Tier::Regular,
        horde.boards(),
        Arc::clone(&level.graph),
        Arc::new(TargetBeacon::default()),
        9,
        outbox,
    );
    let mut scheduler = DecisionScheduler::manual(vec![worker]);
    let mut previous = 0.0;
    for _ in 0..5 {
        assert_eq!(scheduler.tick_all().expect("manual tick"), 1);
        let _ = horde.apply_decisions(inbox.try_iter());

        let angle = horde.agent(roamer).map(Agent::angle).expect("roamer exists");
        assert_ne!(angle, previous);
        previous = angle;
        assert_eq!(horde.agent(walker).map(Agent::angle), Some(0.0));
    }
}

#[test]
fn regular_pursuit_alerts_the_master() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(15));
    let regular = horde.spawn(Tier::Regular, level.centre(5, 1), 0.0);
    let master = horde.spawn(Tier::Master, level.centre(44, 1), 0.0);
    let target = Some(level.centre(1, 1));

    level.step(&mut horde, target);
    assert_eq!(state_of(&horde, regular), AgentState::Pursue);
    assert_eq!(state_of(&horde, master), AgentState::Wander);
    assert!(horde.master_alerted());

    level.step(&mut horde, target);
    assert_eq!(state_of(&horde, master), AgentState::Pursue);
    assert_eq!(horde.agent(master).map(Agent::path_length), Some(44));

    assert!(horde.damage(regular) && horde.damage(regular) && horde.damage(regular));
    level.step(&mut horde, target);
    assert!(horde.master_alerted(), "the alert latches for the level");
    assert_eq!(state_of(&horde, master), AgentState::Pursue);
}

#[test]
fn bite_fires_once_per_contact() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(15));
    let id = horde.spawn(Tier::Regular, level.centre(5, 1), 0.0);
    let near = Some(Vec2::new(5.9, 1.5));

    level.step(&mut horde, near);
    level.step(&mut horde, near);
    assert_eq!(horde.drain_signals(), vec![(id, AgentSignal::Bit)]);

    level.step(&mut horde, Some(level.centre(9, 1)));
    level.step(&mut horde, near);
    assert_eq!(horde.drain_signals(), vec![(id, AgentSignal::Bit)]);
}

#[test]
fn clones_replay_their_track_and_are_never_scheduled() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(EngineConfig::default());
    let frames = vec![
        frame(2.5, 0.0, TrackAction::None),
        frame(2.6, 0.0, TrackAction::LoseHealth),
        frame(2.7, 90.0, TrackAction::Die),
    ];
    let id = horde.spawn_clone(Track::new(frames));
    assert!(horde.boards().is_empty());

    level.step(&mut horde, None);
    assert_eq!(
        horde.agent(id).map(Agent::position),
        Some(Vec2::new(2.5, 1.5))
    );
    level.step(&mut horde, None);
    level.step(&mut horde, None);

    let agent = horde.agent(id).expect("clone exists");
    assert_eq!(agent.position(), Vec2::new(2.7, 1.5));
    assert_eq!(agent.angle(), 90.0);
    assert_eq!(agent.state(), AgentState::Dead);
    assert_eq!(
        horde.drain_signals(),
        vec![(id, AgentSignal::Damaged), (id, AgentSignal::Died)]
    );

    assert!(!horde.damage(id));
    let decisions = horde.apply_decisions([Decision {
        agent: id,
        kind: DecisionKind::Wander { angle: 10.0 },
    }]);
    assert_eq!(decisions, 0);
}

#[test]
fn views_expose_state_for_rendering() {
    let level = Level::new(CORRIDOR);
    let mut horde = Horde::new(stationary_config(20));
    let id = horde.spawn(Tier::Master, level.centre(4, 1), 270.0);
    level.step(&mut horde, Some(level.centre(1, 1)));

    let views = horde.views();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, id);
    assert_eq!(views[0].tier, Tier::Master);
    assert_eq!(views[0].state, AgentState::Pursue);
    assert!(!views[0].dead);
    assert_eq!(views[0].angle, 270.0);
}

fn frame(column: f32, angle: f32, action: TrackAction) -> TrackFrame {
    TrackFrame {
        position: Vec2::new(column, 1.5),
        angle,
        action,
    }
}

fn state_of(horde: &Horde, id: AgentId) -> AgentState {
    horde.agent(id).expect("agent exists").state()
}

fn stationary_config(smell_threshold: u32) -> EngineConfig {
    let still = TierSettings {
        speed: 0.0,
        decision_period_ms: Some(500),
    };
    EngineConfig {
        smell_threshold,
        regular: still,
        master: still,
        ..EngineConfig::default()
    }
}

struct Level {
    graph: Arc<NavigationGraph>,
}

impl Level {
    fn new(source: &str) -> Self {
        let grid = LevelLayout::parse(source)
            .expect("layout parses")
            .into_grid();
        Self {
            graph: Arc::new(NavigationGraph::build(grid)),
        }
    }

    fn centre(&self, column: u32, row: u32) -> Vec2 {
        self.graph.grid().center_of(CellCoord::new(column, row))
    }

    fn step(&self, horde: &mut Horde, target: Option<Vec2>) {
        let collider = GridCollider::new(self.graph.grid(), 0.5);
        horde.step(&self.graph, target, &collider);
    }
}
