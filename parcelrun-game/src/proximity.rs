//! Vehicle presence and stopping at delivery targets.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bus::{GameEvent, Outbox};
use crate::config::ConfigError;
use crate::state::SessionState;
use crate::world::TargetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityState {
    #[default]
    Idle,
    Approaching,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Speed below which an approaching vehicle counts as stopped.
    pub stop_speed: f32,
    /// Speed at or above which a stopped vehicle counts as moving again.
    pub resume_speed: f32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            stop_speed: 0.1,
            resume_speed: 0.35,
        }
    }
}

impl ProximityConfig {
    /// # Errors
    ///
    /// Returns an error when the hysteresis band is inverted or negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("proximity.stop_speed", self.stop_speed),
            ("proximity.resume_speed", self.resume_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if self.stop_speed > self.resume_speed {
            return Err(ConfigError::InvertedRange {
                field: "proximity.speed_band",
                min: self.stop_speed,
                max: self.resume_speed,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProximityTracker {
    config: ProximityConfig,
    states: HashMap<TargetId, ProximityState>,
}

impl ProximityTracker {
    #[must_use]
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    #[must_use]
    pub fn state_of(&self, target: TargetId) -> ProximityState {
        self.states.get(&target).copied().unwrap_or_default()
    }

    pub fn vehicle_entered(&mut self, state: &SessionState, target: TargetId) -> Outbox {
        let mut outbox = Outbox::new();
        if !state.is_day_active() || !state.is_assigned(target) {
            log::debug!("ignoring entry into unassigned {target}");
            return outbox;
        }
        self.states.insert(target, ProximityState::Approaching);
        outbox.push(GameEvent::PlayerEnteredDeliveryPoint { target });
        outbox
    }

    /// Feed a speed sample for a vehicle inside `target`'s volume.
    pub fn vehicle_speed(&mut self, state: &SessionState, target: TargetId, speed: f32) -> Outbox {
        let mut outbox = Outbox::new();
        if !speed.is_finite() || !state.is_assigned(target) {
            return outbox;
        }
        let next = match self.state_of(target) {
            ProximityState::Approaching if speed < self.config.stop_speed => {
                outbox.push(GameEvent::VehicleStoppedAtDeliveryPoint {
                    target,
                    stopped: true,
                });
                ProximityState::Stopped
            }
            ProximityState::Stopped if speed >= self.config.resume_speed => {
                outbox.push(GameEvent::VehicleStoppedAtDeliveryPoint {
                    target,
                    stopped: false,
                });
                ProximityState::Approaching
            }
            current => current,
        };
        if next != ProximityState::Idle {
            self.states.insert(target, next);
        }
        outbox
    }

    pub fn vehicle_exited(&mut self, state: &SessionState, target: TargetId) -> Outbox {
        let mut outbox = Outbox::new();
        self.states.remove(&target);
        if state.is_assigned(target) {
            outbox.push(GameEvent::PlayerExitedDeliveryPoint { target });
        }
        outbox
    }

    /// Accept an interact press when stopped at the assigned target.
    pub fn interact_pressed(&mut self, state: &SessionState) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(target) = state.assigned_target() else {
            return outbox;
        };
        if !state.is_day_active()
            || state.is_minigame_active()
            || self.state_of(target) != ProximityState::Stopped
        {
            return outbox;
        }
        self.states.insert(target, ProximityState::Idle);
        outbox.push(GameEvent::PlayerInteractedWithDeliveryPoint { target });
        outbox
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn on_assigned(&mut self, target: TargetId) {
        log::debug!("proximity reset for newly assigned {target}");
        self.reset();
    }
}
