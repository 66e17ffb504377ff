use std::{thread, time::Duration};

use glam::Vec2;
use zombie_house_core::{AgentSignal, AgentState, EngineConfig, Strike, Tier, TierSettings};
use zombie_house_session::{SchedulingMode, Session};
use zombie_house_system_behavior::AgentView;
use zombie_house_world::LevelLayout;

const HALLWAY: &str = "
    ##########
    #Z......P#
    ##########
";

const HOUSE: &str = "
    ##############
    #Z...#....M..#
    #....#.......#
    #.........a..#
    ###.####.#####
    #......Z.....#
    #..P......E..#
    ##############
";

#[test]
fn pursuer_closes_in_and_bites() {
    let config = EngineConfig {
        regular: TierSettings {
            speed: 0.05,
            decision_period_ms: Some(100),
        },
        ..EngineConfig::default()
    };
    let mut session = start(HALLWAY, config, SchedulingMode::Manual);
    let target = target_position(&session);

    let mut bitten = false;
    let mut pursued = false;
    for frame in 0..800 {
        if frame % 5 == 0 {
            let _ = session.run_decisions().expect("manual decisions");
        }
        session.tick(Some(target), &[]);
        pursued |= session.views()[0].state == AgentState::Pursue;
        if session
            .drain_signals()
            .iter()
            .any(|(_, signal)| *signal == AgentSignal::Bit)
        {
            bitten = true;
            break;
        }
    }

    assert!(pursued, "the agent never picked up the scent");
    assert!(bitten, "the agent never reached the target");
}

#[test]
fn manual_sessions_replay_identically() {
    let first = scripted_run();
    let second = scripted_run();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn strikes_are_applied_during_the_tick() {
    let mut session = start(HALLWAY, EngineConfig::default(), SchedulingMode::Manual);
    let agent = session.views()[0];

    session.tick(
        None,
        &[Strike {
            origin: agent.position - Vec2::new(0.5, 0.0),
            facing_degrees: 0.0,
        }],
    );

    let signals = session.drain_signals();
    assert_eq!(signals, vec![(agent.id, AgentSignal::Damaged)]);
    assert_eq!(session.views()[0].state, AgentState::Stunned);
}

#[test]
fn threaded_workers_feed_the_simulation_loop() {
    let still = TierSettings {
        speed: 0.0,
        decision_period_ms: Some(10),
    };
    let config = EngineConfig {
        line_walk_chance: 0.0,
        regular: still,
        master: still,
        ..EngineConfig::default()
    };
    let mut session = start(HOUSE, config, SchedulingMode::Threaded);
    assert!(session.run_decisions().is_err(), "threaded sessions reject manual ticks");

    let mut turned = false;
    for _ in 0..500 {
        thread::sleep(Duration::from_millis(5));
        session.tick(None, &[]);
        if session
            .views()
            .iter()
            .any(|view| view.state == AgentState::Wander && view.angle != 0.0)
        {
            turned = true;
            break;
        }
    }

    session.shutdown();
    session.join().expect("workers exit cleanly");
    assert!(turned, "no wander decision arrived from the worker threads");
}

fn scripted_run() -> Vec<AgentView> {
    let mut session = start(HOUSE, EngineConfig::default(), SchedulingMode::Manual);
    let target = target_position(&session);
    for frame in 0..600 {
        if frame % 30 == 0 {
            let _ = session
                .run_tier_decisions(Tier::Regular)
                .expect("manual decisions");
        }
        if frame % 8 == 0 {
            let _ = session
                .run_tier_decisions(Tier::Master)
                .expect("manual decisions");
        }
        session.tick(Some(target), &[]);
    }
    session.views()
}

fn target_position(session: &Session) -> Vec2 {
    let cell = session.target_start().expect("layout places the target");
    session.graph().grid().center_of(cell)
}

fn start(source: &str, config: EngineConfig, mode: SchedulingMode) -> Session {
    let layout = LevelLayout::parse(source).expect("layout parses");
    Session::start(layout, config, mode).expect("session starts")
}
