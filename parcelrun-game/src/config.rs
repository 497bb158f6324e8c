//! Session tuning loaded from JSON with embedded defaults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::biome::{Biome, BiomeRotationConfig};
use crate::day::DayConfig;
use crate::durability::DurabilityConfig;
use crate::minigame::MinigameConfig;
use crate::props::PropConfig;
use crate::proximity::ProximityConfig;

const DEFAULT_SESSION_DATA: &str = include_str!("../data/session.json");

/// Errors raised when session configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} range inverted (min {min} > max {max})")]
    InvertedCount {
        field: &'static str,
        min: u32,
        max: u32,
    },
    #[error("{field} range inverted (min {min:.2} > max {max:.2})")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f32,
        value: f32,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("no needle tuning configured for biome {}", .0.as_str())]
    MissingBiomeTuning(Biome),
    #[error("session config is not valid JSON: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub day: DayConfig,
    pub proximity: ProximityConfig,
    pub minigame: MinigameConfig,
    pub biome: BiomeRotationConfig,
    pub durability: DurabilityConfig,
    pub props: PropConfig,
}

impl GameConfig {
    /// Embedded defaults, falling back to hard-coded values if the asset is unreadable.
    #[must_use]
    pub fn default_config() -> Self {
        Self::from_json(DEFAULT_SESSION_DATA).unwrap_or_else(|err| {
            log::warn!("embedded session config rejected, using built-in defaults: {err}");
            Self::default()
        })
    }

    /// Parse a config document. Omitted sections keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// # Errors
    ///
    /// Returns the first violated bound across every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.day.validate()?;
        self.proximity.validate()?;
        self.minigame.validate()?;
        self.biome.validate()?;
        self.durability.validate()?;
        self.props.validate()?;
        Ok(())
    }
}
