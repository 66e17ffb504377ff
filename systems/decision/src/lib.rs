#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Periodic background decisions for the agents of each tier.
//!
//! One [`DecisionWorker`] serves every agent of a tier. In threaded mode each
//! worker runs on its own thread and wakes at its tier's cadence; in manual
//! mode the caller drives ticks explicitly, which keeps tests deterministic.
//! Workers only read [`AgentBoard`]s and post [`Decision`]s, so the
//! simulation loop never waits on them.
//!
//! [`Decision`]: zombie_house_core::Decision

mod board;
mod worker;

pub use board::{AgentBoard, BoardState, TargetBeacon};
pub use worker::DecisionWorker;

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, info};
use zombie_house_core::Tier;

/// Failures raised while running decision workers.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn the {tier:?} decision worker")]
    Spawn {
        /// Tier of the worker that failed to start.
        tier: Tier,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A worker was supplied for a tier that has no decision cadence.
    #[error("tier {tier:?} has no decision period")]
    Unscheduled {
        /// Tier lacking a period.
        tier: Tier,
    },
    /// The simulation loop dropped the decision inbox.
    #[error("decision inbox closed while the {tier:?} worker was posting")]
    InboxClosed {
        /// Tier of the worker that noticed.
        tier: Tier,
    },
    /// Manual ticks were requested from a threaded scheduler.
    #[error("scheduler runs on background threads; manual ticks are unavailable")]
    NotManual,
    /// A worker thread terminated by panicking.
    #[error("the {tier:?} decision worker panicked")]
    WorkerPanicked {
        /// Tier of the failed worker.
        tier: Tier,
    },
}

/// Cooperative stop flag shared by the scheduler and its worker threads.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests every holder of the token to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct WorkerThread {
    tier: Tier,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
enum Mode {
    Threaded {
        token: CancellationToken,
        threads: Vec<WorkerThread>,
    },
    Manual {
        workers: Vec<DecisionWorker>,
    },
}

/// Owns the decision workers of a session.
#[derive(Debug)]
pub struct DecisionScheduler {
    mode: Mode,
}

impl DecisionScheduler {
    /// Starts one background thread per worker, each waking at its tier's period.
    ///
    /// Threads already started are cancelled if a later one fails to spawn.
    pub fn spawn<F>(workers: Vec<DecisionWorker>, periods: F) -> Result<Self, SchedulerError>
    where
        F: Fn(Tier) -> Option<Duration>,
    {
        let token = CancellationToken::new();
        let mut scheduler = Self {
            mode: Mode::Threaded {
                token: token.clone(),
                threads: Vec::with_capacity(workers.len()),
            },
        };

        for worker in workers {
            let tier = worker.tier();
            let period = periods(tier)
                .filter(|period| !period.is_zero())
                .ok_or(SchedulerError::Unscheduled { tier })?;
            let worker_token = token.clone();
            let handle = thread::Builder::new()
                .name(format!("decision-{}", tier_name(tier)))
                .spawn(move || run_periodically(worker, period, &worker_token))
                .map_err(|source| SchedulerError::Spawn { tier, source })?;

            if let Mode::Threaded { threads, .. } = &mut scheduler.mode {
                threads.push(WorkerThread {
                    tier,
                    handle: Some(handle),
                });
            }
        }

        Ok(scheduler)
    }

    /// Keeps the workers inline; nothing runs until [`Self::tick_tier`] or [`Self::tick_all`].
    #[must_use]
    pub fn manual(workers: Vec<DecisionWorker>) -> Self {
        Self {
            mode: Mode::Manual { workers },
        }
    }

    /// Reports whether the scheduler is driven manually.
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self.mode, Mode::Manual { .. })
    }

    /// Runs one decision tick for every worker of `tier`.
    pub fn tick_tier(&mut self, tier: Tier) -> Result<usize, SchedulerError> {
        let Mode::Manual { workers } = &mut self.mode else {
            return Err(SchedulerError::NotManual);
        };

        let mut posted = 0;
        for worker in workers.iter_mut().filter(|worker| worker.tier() == tier) {
            posted += worker.run_once()?;
        }
        Ok(posted)
    }

    /// Runs one decision tick for every worker.
    pub fn tick_all(&mut self) -> Result<usize, SchedulerError> {
        let Mode::Manual { workers } = &mut self.mode else {
            return Err(SchedulerError::NotManual);
        };

        let mut posted = 0;
        for worker in workers.iter_mut() {
            posted += worker.run_once()?;
        }
        Ok(posted)
    }

    /// Asks every worker thread to stop without waiting for it.
    ///
    /// Sleeping workers are woken, so each exits within one loop iteration.
    pub fn shutdown(&self) {
        if let Mode::Threaded { token, threads } = &self.mode {
            if token.is_cancelled() {
                return;
            }
            token.cancel();
            for thread in threads {
                if let Some(handle) = &thread.handle {
                    handle.thread().unpark();
                }
            }
            debug!(workers = threads.len(), "decision workers cancelled");
        }
    }

    /// Stops the workers and waits for their threads to exit.
    pub fn join(&mut self) -> Result<(), SchedulerError> {
        self.shutdown();
        let Mode::Threaded { threads, .. } = &mut self.mode else {
            return Ok(());
        };

        let mut result = Ok(());
        for thread in threads.iter_mut() {
            if let Some(handle) = thread.handle.take() {
                if handle.join().is_err() && result.is_ok() {
                    result = Err(SchedulerError::WorkerPanicked { tier: thread.tier });
                }
            }
        }
        result
    }
}

impl Drop for DecisionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_periodically(mut worker: DecisionWorker, period: Duration, token: &CancellationToken) {
    let tier = worker.tier();
    info!(
        tier = tier_name(tier),
        agents = worker.agent_count(),
        period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        "decision worker started"
    );

    let mut deadline = Instant::now() + period;
    while !token.is_cancelled() {
        let now = Instant::now();
        if now < deadline {
            thread::park_timeout(deadline - now);
            continue;
        }

        deadline += period;
        if deadline <= now {
            deadline = now + period;
        }

        if let Err(error) = worker.run_once() {
            info!(tier = tier_name(tier), %error, "decision worker stopping");
            break;
        }
    }

    info!(tier = tier_name(tier), "decision worker stopped");
}

const fn tier_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Regular => "regular",
        Tier::Master => "master",
        Tier::Clone => "clone",
    }
}
