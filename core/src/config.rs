//! Engine tuning loaded from TOML.

use std::time::Duration;

use serde::Deserialize;

use crate::{Tier, TierProfile};

const FRAME_RATE: f32 = 60.0;

/// Tunable parameters of the pursuit engine.
///
/// Every field has a default taken from the game's attribute table, so an
/// empty document yields [`EngineConfig::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Largest path length, in cells, at which an agent smells the target.
    pub smell_threshold: u32,
    /// Largest Manhattan distance at which a pursuit search is attempted at all.
    pub search_radius: u32,
    /// Health points every agent starts with.
    pub agent_health: u32,
    /// Probability that a spawned agent walks in straight lines instead of randomly.
    pub line_walk_chance: f64,
    /// Simulation ticks an agent stays stunned after a hit.
    pub stun_ticks: u32,
    /// Radius of an agent's collision circle, in tiles.
    pub agent_radius: f32,
    /// Upper bound on nudge steps taken to leave an obstruction.
    pub max_nudge_steps: u32,
    /// Centre distance at which an agent touches the target, in tiles.
    pub contact_distance: f32,
    /// Reach of the target's stab, in tiles.
    pub strike_reach: f32,
    /// Full width of the stab cone, in degrees.
    pub strike_arc_degrees: f32,
    /// Seed for the decision workers' random number generators.
    pub seed: u64,
    /// Regular tier settings.
    pub regular: TierSettings,
    /// Master tier settings.
    pub master: TierSettings,
    /// Clone tier settings.
    pub clone: TierSettings,
}

/// Movement speed and decision cadence of a single tier.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierSettings {
    /// Distance travelled per simulation tick, in tiles.
    pub speed: f32,
    /// Decision cadence in milliseconds; absent for unscheduled tiers.
    pub decision_period_ms: Option<u64>,
}

/// Reasons an engine configuration may be rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A scheduled tier lacks a usable decision cadence.
    #[error("tier {tier:?} requires a non-zero decision period")]
    MissingDecisionPeriod {
        /// Tier with the missing cadence.
        tier: Tier,
    },
    /// Clone agents were given a decision cadence.
    #[error("clone agents replay recorded tracks and cannot be scheduled")]
    ScheduledClone,
    /// A tier speed is negative or not finite.
    #[error("tier {tier:?} speed {speed} must be finite and non-negative")]
    InvalidSpeed {
        /// Tier with the offending speed.
        tier: Tier,
        /// Rejected speed value.
        speed: f32,
    },
    /// Agents would spawn without any health.
    #[error("agent health must be at least 1")]
    ZeroHealth,
    /// The line-walk probability lies outside `[0, 1]`.
    #[error("line walk chance {chance} must lie between 0 and 1")]
    InvalidLineWalkChance {
        /// Rejected probability.
        chance: f64,
    },
    /// The agent radius would not fit inside a single tile.
    #[error("agent radius {radius} must lie strictly between 0 and 0.5 tiles")]
    InvalidAgentRadius {
        /// Rejected radius value.
        radius: f32,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smell_threshold: 15,
            search_radius: 20,
            agent_health: 3,
            line_walk_chance: 0.5,
            stun_ticks: 40,
            agent_radius: 0.2,
            max_nudge_steps: 240,
            contact_distance: 0.5,
            strike_reach: 1.0,
            strike_arc_degrees: 50.0,
            seed: 0x5eed,
            regular: TierSettings {
                speed: 0.5 / FRAME_RATE,
                decision_period_ms: Some(2_000),
            },
            master: TierSettings {
                speed: 0.05,
                decision_period_ms: Some(500),
            },
            clone: TierSettings {
                speed: 0.5 / FRAME_RATE,
                decision_period_ms: None,
            },
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_health == 0 {
            return Err(ConfigError::ZeroHealth);
        }

        if !(0.0..=1.0).contains(&self.line_walk_chance) {
            return Err(ConfigError::InvalidLineWalkChance {
                chance: self.line_walk_chance,
            });
        }

        if !(self.agent_radius > 0.0 && self.agent_radius < 0.5) {
            return Err(ConfigError::InvalidAgentRadius {
                radius: self.agent_radius,
            });
        }

        for tier in Tier::ALL {
            let settings = self.settings(tier);
            if !settings.speed.is_finite() || settings.speed < 0.0 {
                return Err(ConfigError::InvalidSpeed {
                    tier,
                    speed: settings.speed,
                });
            }

            match (tier, settings.decision_period_ms) {
                (Tier::Clone, Some(_)) => return Err(ConfigError::ScheduledClone),
                (Tier::Clone, None) => {}
                (_, None | Some(0)) => return Err(ConfigError::MissingDecisionPeriod { tier }),
                (_, Some(_)) => {}
            }
        }

        Ok(())
    }

    /// Raw settings block for the provided tier.
    #[must_use]
    pub fn settings(&self, tier: Tier) -> TierSettings {
        match tier {
            Tier::Regular => self.regular,
            Tier::Master => self.master,
            Tier::Clone => self.clone,
        }
    }

    /// Movement and scheduling profile for the provided tier.
    #[must_use]
    pub fn profile(&self, tier: Tier) -> TierProfile {
        let settings = self.settings(tier);
        TierProfile {
            speed: settings.speed,
            decision_period: settings.decision_period_ms.map(Duration::from_millis),
        }
    }
}
