//! Biome rotation timer
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::bus::{GameEvent, Outbox};
use crate::config::ConfigError;
use crate::state::SessionState;

/// Environment variants the session rotates through during a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    #[default]
    Normal,
    Water,
    Space,
}

impl Biome {
    pub const ALL: [Self; 3] = [Self::Normal, Self::Water, Self::Space];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Water => "water",
            Self::Space => "space",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeRotationConfig {
    /// Shortest countdown between automatic switches, in seconds.
    pub interval_min: f32,
    /// Longest countdown between automatic switches, in seconds.
    pub interval_max: f32,
}

impl Default for BiomeRotationConfig {
    fn default() -> Self {
        Self {
            interval_min: 15.0,
            interval_max: 45.0,
        }
    }
}

impl BiomeRotationConfig {
    /// # Errors
    ///
    /// Returns an error when the interval range is inverted or non-positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_min.is_nan() || self.interval_min <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "biome.interval_min",
                min: 0.0,
                value: self.interval_min,
            });
        }
        if self.interval_min > self.interval_max {
            return Err(ConfigError::InvertedRange {
                field: "biome.interval",
                min: self.interval_min,
                max: self.interval_max,
            });
        }
        Ok(())
    }
}

/// Countdown that swaps the active biome while a day is running.
#[derive(Debug, Clone)]
pub struct BiomeRotation {
    config: BiomeRotationConfig,
    rng: SmallRng,
    countdown: Option<f32>,
}

impl BiomeRotation {
    #[must_use]
    pub const fn new(config: BiomeRotationConfig, rng: SmallRng) -> Self {
        Self {
            config,
            rng,
            countdown: None,
        }
    }

    /// Seconds left before the next automatic switch, if armed.
    #[must_use]
    pub const fn countdown(&self) -> Option<f32> {
        self.countdown
    }

    pub fn on_day_started(&mut self, state: &mut SessionState) -> Outbox {
        self.switch_to(state, Biome::Normal)
    }

    /// Manual override; re-arms the countdown exactly like an automatic switch.
    pub fn force_biome(&mut self, state: &mut SessionState, biome: Biome) -> Outbox {
        self.switch_to(state, biome)
    }

    pub fn disarm(&mut self) {
        self.countdown = None;
    }

    pub fn tick(&mut self, state: &mut SessionState, dt: f32) -> Outbox {
        if !state.timers_running() {
            return Outbox::new();
        }
        let Some(remaining) = self.countdown else {
            return Outbox::new();
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.countdown = Some(remaining);
            return Outbox::new();
        }
        let next = pick_next_biome(state.current_biome(), &mut self.rng);
        log::debug!("biome countdown elapsed, switching to {}", next.as_str());
        self.switch_to(state, next)
    }

    fn switch_to(&mut self, state: &mut SessionState, biome: Biome) -> Outbox {
        state.set_biome(biome);
        self.countdown = Some(self.draw_interval());
        let mut outbox = Outbox::new();
        outbox.push(GameEvent::BiomeChanged { biome });
        outbox
    }

    fn draw_interval(&mut self) -> f32 {
        let min = self.config.interval_min;
        let max = self.config.interval_max;
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }
}

/// Uniformly pick a biome different from `current`.
pub fn pick_next_biome<R: Rng>(current: Biome, rng: &mut R) -> Biome {
    let candidates: Vec<Biome> = Biome::ALL
        .into_iter()
        .filter(|biome| *biome != current)
        .collect();
    candidates.choose(rng).copied().unwrap_or(current)
}
