//! Vehicle durability: collision damage, destruction latch, repair kits, and
//! knockback resolution for props the vehicle knocks over.
use serde::{Deserialize, Serialize};

use crate::bus::{GameEvent, Outbox};
use crate::config::ConfigError;
use crate::numbers::{finite_or, lerp_clamped};
use crate::state::SessionState;

/// Collision category reported by the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Placed prop obstacle: always deals the minimum damage.
    Soft,
    /// Static scenery: damage scales with impact speed.
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub obstacle: ObstacleKind,
    /// Relative impact speed magnitude.
    pub impact_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurabilityConfig {
    pub min_damage: f32,
    pub max_damage: f32,
    pub impact_speed_ceiling: f32,
    /// Seconds after a counted hit during which further hits are ignored.
    pub immunity: f32,
    pub min_valid_health: f32,
    pub repair_amount: f32,
    pub knockback: KnockbackConfig,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            min_damage: 0.2,
            max_damage: 0.4,
            impact_speed_ceiling: 10.0,
            immunity: 0.5,
            min_valid_health: 0.1,
            repair_amount: 0.5,
            knockback: KnockbackConfig::default(),
        }
    }
}

impl DurabilityConfig {
    /// # Errors
    ///
    /// Returns an error when damage, health or timing bounds are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_damage.is_nan() || self.min_damage < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "durability.min_damage",
                min: 0.0,
                value: self.min_damage,
            });
        }
        if self.min_damage > self.max_damage {
            return Err(ConfigError::InvertedRange {
                field: "durability.damage",
                min: self.min_damage,
                max: self.max_damage,
            });
        }
        if self.impact_speed_ceiling.is_nan() || self.impact_speed_ceiling <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "durability.impact_speed_ceiling",
                min: f32::EPSILON,
                value: self.impact_speed_ceiling,
            });
        }
        if self.immunity.is_nan() || self.immunity < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "durability.immunity",
                min: 0.0,
                value: self.immunity,
            });
        }
        if !(0.0..=1.0).contains(&self.min_valid_health) {
            return Err(ConfigError::RangeViolation {
                field: "durability.min_valid_health",
                min: 0.0,
                max: 1.0,
                value: self.min_valid_health,
            });
        }
        if !(0.0..=1.0).contains(&self.repair_amount) {
            return Err(ConfigError::RangeViolation {
                field: "durability.repair_amount",
                min: 0.0,
                max: 1.0,
                value: self.repair_amount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackConfig {
    pub max_impact_speed: f32,
    pub upward_boost: f32,
    pub force_multiplier: f32,
}

impl Default for KnockbackConfig {
    fn default() -> Self {
        Self {
            max_impact_speed: 100.0,
            upward_boost: 0.5,
            force_multiplier: 1.0,
        }
    }
}

/// Tracks hits against the vehicle for the active day.
#[derive(Debug, Clone)]
pub struct DurabilityTracker {
    config: DurabilityConfig,
    clock: f64,
    last_hit: Option<f64>,
    destroyed: bool,
}

impl DurabilityTracker {
    #[must_use]
    pub const fn new(config: DurabilityConfig) -> Self {
        Self {
            config,
            clock: 0.0,
            last_hit: None,
            destroyed: false,
        }
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub const fn config(&self) -> &DurabilityConfig {
        &self.config
    }

    pub fn on_day_started(&mut self, state: &mut SessionState) {
        state.set_vehicle_health(1.0);
        self.destroyed = false;
        self.last_hit = None;
    }

    /// Advance the immunity clock. Frozen while paused or between days.
    pub fn advance_clock(&mut self, state: &SessionState, dt: f32) {
        if !state.is_day_active() || state.is_paused() || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.clock += f64::from(dt);
    }

    /// Health lost for a hit against `obstacle` at `impact_speed`.
    #[must_use]
    pub fn damage_for(&self, obstacle: ObstacleKind, impact_speed: f32) -> f32 {
        match obstacle {
            ObstacleKind::Soft => self.config.min_damage,
            ObstacleKind::Hard => {
                let speed = finite_or(impact_speed, 0.0).abs();
                lerp_clamped(
                    self.config.min_damage,
                    self.config.max_damage,
                    speed / self.config.impact_speed_ceiling,
                )
            }
        }
    }

    pub fn on_collision(&mut self, state: &mut SessionState, collision: Collision) -> Outbox {
        let mut outbox = Outbox::new();
        if !state.is_day_active() || self.destroyed {
            log::debug!("ignoring collision outside a live day");
            return outbox;
        }
        let immunity = f64::from(self.config.immunity);
        if self
            .last_hit
            .is_some_and(|last| self.clock - last < immunity)
        {
            return outbox;
        }
        self.last_hit = Some(self.clock);

        let damage = self.damage_for(collision.obstacle, collision.impact_speed);
        let health = (state.vehicle_health() - damage).max(0.0);
        state.set_vehicle_health(health);
        outbox.push(GameEvent::VehicleCollidedWithObstacle {
            obstacle: collision.obstacle,
        });

        if state.vehicle_health() < self.config.min_valid_health {
            state.set_vehicle_health(0.0);
            self.destroyed = true;
            log::info!("vehicle destroyed on day {}", state.current_day());
            outbox.push(GameEvent::VehicleDestroyed);
        }
        outbox
    }

    pub fn collect_repair_kit(&mut self, state: &mut SessionState) -> Outbox {
        let mut outbox = Outbox::new();
        if !state.is_day_active() || self.destroyed {
            return outbox;
        }
        state.set_vehicle_health((state.vehicle_health() + self.config.repair_amount).min(1.0));
        outbox.push(GameEvent::VehicleCollectedRepairKit);
        outbox
    }
}

/// Impulse applied to a prop struck along contact `normal`.
///
/// Never returns a non-finite vector: a degenerate direction falls back to
/// up-and-forward, and a non-finite result collapses to zero.
#[must_use]
pub fn knockback_impulse(
    normal: [f32; 3],
    impact_speed: f32,
    config: &KnockbackConfig,
) -> [f32; 3] {
    let speed = finite_or(impact_speed, 0.0).clamp(0.0, config.max_impact_speed);
    let boosted = [normal[0], normal[1] + config.upward_boost, normal[2]];
    let direction = normalize(boosted).unwrap_or(FALLBACK_DIRECTION);
    let scale = speed * config.force_multiplier;
    let impulse = direction.map(|component| component * scale);
    if impulse.iter().all(|component| component.is_finite()) {
        impulse
    } else {
        [0.0; 3]
    }
}

const FALLBACK_DIRECTION: [f32; 3] = [
    0.0,
    std::f32::consts::FRAC_1_SQRT_2,
    std::f32::consts::FRAC_1_SQRT_2,
];

fn normalize(vector: [f32; 3]) -> Option<[f32; 3]> {
    let length = vector
        .iter()
        .map(|component| component * component)
        .sum::<f32>()
        .sqrt();
    if !length.is_finite() || length <= f32::EPSILON {
        return None;
    }
    let unit = vector.map(|component| component / length);
    unit.iter().all(|component| component.is_finite()).then_some(unit)
}
