#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Zombie House level headlessly.

use std::{fs, path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zombie_house_core::{AgentSignal, EngineConfig, Tier};
use zombie_house_session::{SchedulingMode, Session};
use zombie_house_world::LevelLayout;

/// Headless runner for the Zombie House pursuit engine.
#[derive(Debug, Parser)]
#[command(name = "zombie-house", version, about)]
struct Args {
    /// ASCII level layout to load.
    #[arg(long)]
    map: PathBuf,
    /// TOML engine configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Drive decision workers inline instead of on background threads.
    #[arg(long)]
    manual: bool,
    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
}

/// Entry point for the Zombie House command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let source = fs::read_to_string(&args.map)
        .with_context(|| format!("failed to read level layout {}", args.map.display()))?;
    let layout = LevelLayout::parse(&source)
        .with_context(|| format!("invalid level layout {}", args.map.display()))?;

    let config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read engine config {}", path.display()))?;
            EngineConfig::from_toml_str(&contents)
                .with_context(|| format!("invalid engine config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let mode = if args.manual {
        SchedulingMode::Manual
    } else {
        SchedulingMode::Threaded
    };
    let frame = Duration::from_millis(args.frame_ms.max(1));
    let cadences: Vec<(Tier, u64)> = [Tier::Regular, Tier::Master]
        .into_iter()
        .filter_map(|tier| {
            config
                .profile(tier)
                .decision_period
                .map(|period| (tier, frames_per_period(period, frame)))
        })
        .collect();

    let mut session = Session::start(layout, config, mode).context("failed to start session")?;
    let target = session
        .target_start()
        .map(|cell| session.graph().grid().center_of(cell));

    let mut bites = 0_usize;
    let mut deaths = 0_usize;
    for tick in 0..args.ticks {
        if args.manual {
            for (tier, every) in &cadences {
                if tick % every == 0 {
                    let _ = session.run_tier_decisions(*tier)?;
                }
            }
        } else {
            thread::sleep(frame);
        }

        session.tick(target, &[]);
        for (agent, signal) in session.drain_signals() {
            match signal {
                AgentSignal::Bit => {
                    bites += 1;
                    info!(agent = agent.get(), tick, "target bitten");
                }
                AgentSignal::Died => deaths += 1,
                AgentSignal::Damaged => {}
            }
        }
    }

    session.shutdown();
    println!("ran {} ticks: {bites} bites, {deaths} deaths", args.ticks);
    for view in session.views() {
        println!(
            "agent {:>3} {:<8} {:<8} at ({:>6.2}, {:>6.2}) heading {:>5.1}",
            view.id.get(),
            format!("{:?}", view.tier),
            format!("{:?}", view.state),
            view.position.x,
            view.position.y,
            view.angle,
        );
    }

    session.join().context("decision workers did not stop cleanly")?;
    Ok(())
}

fn frames_per_period(period: Duration, frame: Duration) -> u64 {
    let frames = period.as_millis() / frame.as_millis().max(1);
    u64::try_from(frames).unwrap_or(u64::MAX).max(1)
}
