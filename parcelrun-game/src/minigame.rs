//! Skill-check minigame played at a delivery target.
//!
//! The player keeps a momentum-driven needle inside a wobbling safe zone for
//! the duration of the check. Time spent inside the zone becomes a score in
//! `[0, 1]`, which maps linearly onto a tip. Every wait (intro, reveal, close)
//! is a stored countdown advanced by [`MinigameEngine::tick`].
//!
//! On the first day the delivery at `tutorial_failure_index` always fails: the
//! check runs at half length and resolves with a zero tip.
use rand::rngs::SmallRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::biome::Biome;
use crate::bus::{GameEvent, Outbox};
use crate::config::ConfigError;
use crate::numbers::{finite_or, floor_f32_to_i64, lerp_clamped, round_f32_to_u32, unit_from_hash};
use crate::state::SessionState;
use crate::world::TargetId;

/// Needle and safe-zone feel for one biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedleTuning {
    pub safe_zone_min_width: f32,
    pub safe_zone_max_width: f32,
    /// Radians per second of the zone's sine wobble.
    pub wobble_speed: f32,
    pub wobble_amplitude: f32,
    /// 0 gives a regular wobble; 1 lets noise double or stall its speed.
    pub wobble_randomness: f32,
    pub move_speed: f32,
    /// Fraction of velocity kept per `1 / drag` seconds.
    pub momentum_factor: f32,
    pub drag: f32,
}

impl Default for NeedleTuning {
    fn default() -> Self {
        Self {
            safe_zone_min_width: 200.0,
            safe_zone_max_width: 400.0,
            wobble_speed: 2.0,
            wobble_amplitude: 150.0,
            wobble_randomness: 0.5,
            move_speed: 300.0,
            momentum_factor: 0.2,
            drag: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinigameConfig {
    pub base_duration: f32,
    pub intro_delay: f32,
    pub reveal_duration: f32,
    pub close_delay: f32,
    pub failure_hold: f32,
    pub min_tip: u32,
    pub max_tip: u32,
    pub tutorial_day: u32,
    pub tutorial_failure_index: u32,
    pub track_width: f32,
    pub edge_margin: f32,
    pub biomes: HashMap<Biome, NeedleTuning>,
}

impl Default for MinigameConfig {
    fn default() -> Self {
        let biomes = Biome::ALL
            .into_iter()
            .map(|biome| (biome, NeedleTuning::default()))
            .collect();
        Self {
            base_duration: 15.0,
            intro_delay: 0.8,
            reveal_duration: 1.0,
            close_delay: 2.4,
            failure_hold: 2.0,
            min_tip: 5,
            max_tip: 40,
            tutorial_day: 1,
            tutorial_failure_index: 2,
            track_width: 800.0,
            edge_margin: 10.0,
            biomes,
        }
    }
}

impl MinigameConfig {
    /// # Errors
    ///
    /// Returns an error for inverted tip or width ranges, non-positive timings
    /// or a biome without tuning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tip > self.max_tip {
            return Err(ConfigError::InvertedCount {
                field: "minigame.tip",
                min: self.min_tip,
                max: self.max_tip,
            });
        }
        for (field, value) in [
            ("minigame.base_duration", self.base_duration),
            ("minigame.track_width", self.track_width),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: f32::EPSILON,
                    value,
                });
            }
        }
        for (field, value) in [
            ("minigame.intro_delay", self.intro_delay),
            ("minigame.reveal_duration", self.reveal_duration),
            ("minigame.close_delay", self.close_delay),
            ("minigame.failure_hold", self.failure_hold),
            ("minigame.edge_margin", self.edge_margin),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        for biome in Biome::ALL {
            let tuning = self
                .biomes
                .get(&biome)
                .ok_or(ConfigError::MissingBiomeTuning(biome))?;
            if tuning.safe_zone_min_width > tuning.safe_zone_max_width {
                return Err(ConfigError::InvertedRange {
                    field: "minigame.safe_zone_width",
                    min: tuning.safe_zone_min_width,
                    max: tuning.safe_zone_max_width,
                });
            }
            if !(0.0..=1.0).contains(&tuning.momentum_factor) {
                return Err(ConfigError::RangeViolation {
                    field: "minigame.momentum_factor",
                    min: 0.0,
                    max: 1.0,
                    value: tuning.momentum_factor,
                });
            }
            for (field, value) in [
                ("minigame.move_speed", tuning.move_speed),
                ("minigame.drag", tuning.drag),
                ("minigame.wobble_speed", tuning.wobble_speed),
                ("minigame.wobble_amplitude", tuning.wobble_amplitude),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::MinViolation {
                        field,
                        min: 0.0,
                        value,
                    });
                }
            }
            if !(0.0..=1.0).contains(&tuning.wobble_randomness) {
                return Err(ConfigError::RangeViolation {
                    field: "minigame.wobble_randomness",
                    min: 0.0,
                    max: 1.0,
                    value: tuning.wobble_randomness,
                });
            }
        }
        Ok(())
    }

    fn tuning_for(&self, biome: Biome) -> NeedleTuning {
        self.biomes.get(&biome).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinigamePhase {
    Intro,
    Active,
    Resolving,
    Closed,
}

/// Result of a finished check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillCheckOutcome {
    pub score: f32,
    pub tip: u32,
    pub failed: bool,
}

/// One running skill-check.
#[derive(Debug, Clone, Serialize)]
pub struct MinigameSession {
    target: TargetId,
    phase: MinigamePhase,
    #[serde(skip)]
    tuning: NeedleTuning,
    duration: f32,
    phase_remaining: f32,
    in_zone_time: f32,
    needle_position: f32,
    needle_velocity: f32,
    safe_zone_center: f32,
    safe_zone_width: f32,
    wobble_phase: f32,
    clock: f32,
    #[serde(skip)]
    noise_seed: u64,
    tutorial_failure: bool,
    outcome: Option<SkillCheckOutcome>,
    reveal_elapsed: f32,
}

impl MinigameSession {
    #[must_use]
    pub const fn target(&self) -> TargetId {
        self.target
    }

    #[must_use]
    pub const fn phase(&self) -> MinigamePhase {
        self.phase
    }

    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds left in the current phase.
    #[must_use]
    pub const fn phase_remaining(&self) -> f32 {
        self.phase_remaining
    }

    #[must_use]
    pub const fn in_zone_time(&self) -> f32 {
        self.in_zone_time
    }

    #[must_use]
    pub const fn needle_position(&self) -> f32 {
        self.needle_position
    }

    #[must_use]
    pub const fn needle_velocity(&self) -> f32 {
        self.needle_velocity
    }

    #[must_use]
    pub const fn safe_zone_center(&self) -> f32 {
        self.safe_zone_center
    }

    #[must_use]
    pub const fn safe_zone_width(&self) -> f32 {
        self.safe_zone_width
    }

    #[must_use]
    pub const fn is_tutorial_failure(&self) -> bool {
        self.tutorial_failure
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<SkillCheckOutcome> {
        self.outcome
    }

    #[must_use]
    pub fn needle_in_zone(&self) -> bool {
        (self.needle_position - self.safe_zone_center).abs() <= self.safe_zone_width * 0.5
    }

    /// Live score shown while the check runs.
    #[must_use]
    pub fn score(&self) -> f32 {
        compute_score(self.in_zone_time, self.duration)
    }

    fn step_needle(&mut self, axis: f32, dt: f32, track_width: f32, edge_margin: f32) {
        let axis = finite_or(axis, 0.0).clamp(-1.0, 1.0);
        self.needle_velocity += axis * self.tuning.move_speed * dt;
        self.needle_velocity *= self.tuning.momentum_factor.powf(dt * self.tuning.drag);
        let half = track_width * 0.5;
        self.needle_position =
            (self.needle_position + self.needle_velocity * dt).clamp(-half, half);
        if self.needle_position.abs() >= half - edge_margin {
            self.needle_velocity *= 0.5;
        }
    }

    fn step_safe_zone(&mut self, dt: f32, track_width: f32) {
        self.clock += dt;
        let randomness = self.tuning.wobble_randomness;
        let noise = smooth_noise(self.noise_seed, self.clock * randomness);
        let jitter = noise.mul_add(2.0, -1.0) * randomness;
        self.wobble_phase += dt * self.tuning.wobble_speed * (1.0 + jitter);

        let limit = (track_width - self.safe_zone_width) * 0.5;
        let wobble = self.wobble_phase.sin() * self.tuning.wobble_amplitude;
        self.safe_zone_center = if limit > 0.0 {
            wobble.clamp(-limit, limit)
        } else {
            0.0
        };
    }
}

/// Runs at most one skill-check at a time.
#[derive(Debug, Clone)]
pub struct MinigameEngine {
    config: MinigameConfig,
    rng: SmallRng,
    current: Option<MinigameSession>,
}

impl MinigameEngine {
    #[must_use]
    pub const fn new(config: MinigameConfig, rng: SmallRng) -> Self {
        Self {
            config,
            rng,
            current: None,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&MinigameSession> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Open a check for `target`, replacing any check already running.
    pub fn start(&mut self, state: &mut SessionState, target: TargetId) -> Outbox {
        if !state.set_minigame_active(true) {
            log::debug!("skill-check for {target} refused outside an active day");
            return Outbox::new();
        }
        if let Some(previous) = self.current.take() {
            log::debug!("skill-check for {} replaced by {target}", previous.target);
        }

        let tutorial_failure = state.current_day() == self.config.tutorial_day
            && state.completed_today() == self.config.tutorial_failure_index;
        let duration = if tutorial_failure {
            self.config.base_duration * 0.5
        } else {
            self.config.base_duration
        };
        let tuning = self.config.tuning_for(state.current_biome());
        let safe_zone_width = if tuning.safe_zone_max_width > tuning.safe_zone_min_width {
            self.rng
                .gen_range(tuning.safe_zone_min_width..tuning.safe_zone_max_width)
        } else {
            tuning.safe_zone_min_width
        };

        log::debug!(
            "skill-check started for {target}: {duration:.1}s, zone width {safe_zone_width:.0}"
        );
        self.current = Some(MinigameSession {
            target,
            phase: MinigamePhase::Intro,
            tuning,
            duration,
            phase_remaining: self.config.intro_delay,
            in_zone_time: 0.0,
            needle_position: 0.0,
            needle_velocity: 0.0,
            safe_zone_center: 0.0,
            safe_zone_width,
            wobble_phase: 0.0,
            clock: 0.0,
            noise_seed: self.rng.next_u64(),
            tutorial_failure,
            outcome: None,
            reveal_elapsed: 0.0,
        });
        Outbox::new()
    }

    /// Drop the running check without completing the delivery.
    pub fn cancel(&mut self, state: &mut SessionState) {
        if let Some(session) = self.current.take() {
            log::debug!("skill-check for {} cancelled", session.target);
            state.set_minigame_active(false);
        }
    }

    /// Cancel a check whose delivery was handed to a different target.
    pub fn on_assigned(&mut self, state: &mut SessionState, target: TargetId) {
        if self.current.as_ref().is_some_and(|session| session.target != target) {
            log::debug!("delivery reassigned to {target}");
            self.cancel(state);
        }
    }

    /// Tip shown during the reveal, counting up from zero.
    #[must_use]
    pub fn revealed_tip(&self) -> Option<u32> {
        let session = self.current.as_ref()?;
        let outcome = session.outcome?;
        if outcome.failed {
            return None;
        }
        let progress = if self.config.reveal_duration > 0.0 {
            session.reveal_elapsed / self.config.reveal_duration
        } else {
            1.0
        };
        #[allow(clippy::cast_precision_loss)]
        let tip = outcome.tip as f32;
        Some(round_f32_to_u32(lerp_clamped(0.0, tip, progress)))
    }

    pub fn tick(&mut self, state: &mut SessionState, dt: f32, axis: f32) -> Outbox {
        let mut outbox = Outbox::new();
        if self.current.is_none() || state.is_paused() {
            return outbox;
        }
        let reassigned = self.current.as_ref().is_some_and(|session| {
            state
                .assigned_target()
                .is_some_and(|assigned| assigned != session.target)
        });
        if !state.is_day_active() || !state.is_minigame_active() || reassigned {
            log::debug!("dropping skill-check that outlived its delivery");
            self.current = None;
            state.set_minigame_active(false);
            return outbox;
        }
        if !dt.is_finite() || dt <= 0.0 {
            return outbox;
        }

        let config = &self.config;
        let Some(session) = self.current.as_mut() else {
            return outbox;
        };
        match session.phase {
            MinigamePhase::Intro => {
                session.phase_remaining -= dt;
                if session.phase_remaining <= 0.0 {
                    session.phase = MinigamePhase::Active;
                    session.phase_remaining = session.duration;
                }
            }
            MinigamePhase::Active => {
                let step = dt.min(session.phase_remaining);
                session.step_needle(axis, step, config.track_width, config.edge_margin);
                session.step_safe_zone(step, config.track_width);
                if session.needle_in_zone() {
                    session.in_zone_time += step;
                }
                session.phase_remaining -= dt;
                if session.phase_remaining <= 0.0 {
                    let score = session.score();
                    session.phase = MinigamePhase::Resolving;
                    if session.tutorial_failure {
                        session.outcome = Some(SkillCheckOutcome {
                            score,
                            tip: 0,
                            failed: true,
                        });
                        session.phase_remaining = config.failure_hold;
                        outbox.push(GameEvent::DeliveryFailed {
                            target: session.target,
                        });
                    } else {
                        let tip = compute_tip(score, config.min_tip, config.max_tip);
                        session.outcome = Some(SkillCheckOutcome {
                            score,
                            tip,
                            failed: false,
                        });
                        session.phase_remaining = config.reveal_duration + config.close_delay;
                    }
                    log::debug!(
                        "skill-check for {} resolved at score {score:.2}",
                        session.target
                    );
                }
            }
            MinigamePhase::Resolving => {
                session.reveal_elapsed += dt;
                session.phase_remaining -= dt;
                if session.phase_remaining <= 0.0 {
                    session.phase = MinigamePhase::Closed;
                }
            }
            MinigamePhase::Closed => {}
        }

        if session.phase == MinigamePhase::Closed {
            let target = session.target;
            let tip = session.outcome.map_or(0, |outcome| outcome.tip);
            self.current = None;
            state.set_minigame_active(false);
            outbox.push(GameEvent::DeliveryCompleted { target, tip });
        }
        outbox
    }
}

/// Fraction of the check spent inside the safe zone.
#[must_use]
pub fn compute_score(in_zone_time: f32, duration: f32) -> f32 {
    if duration <= 0.0 || !duration.is_finite() {
        return 0.0;
    }
    finite_or(in_zone_time / duration, 0.0).clamp(0.0, 1.0)
}

#[must_use]
pub fn compute_tip(score: f32, min_tip: u32, max_tip: u32) -> u32 {
    #[allow(clippy::cast_precision_loss)]
    let (low, high) = (min_tip as f32, max_tip as f32);
    round_f32_to_u32(lerp_clamped(low, high, score))
}

/// One-dimensional value noise in `[0, 1)`, smooth between integer lattice points.
#[must_use]
pub fn smooth_noise(seed: u64, x: f32) -> f32 {
    let x = finite_or(x, 0.0);
    let cell = floor_f32_to_i64(x);
    #[allow(clippy::cast_precision_loss)]
    let frac = (x - cell as f32).clamp(0.0, 1.0);
    let left = lattice_value(seed, cell);
    let right = lattice_value(seed, cell.saturating_add(1));
    let eased = frac * frac * frac.mul_add(-2.0, 3.0);
    lerp_clamped(left, right, eased)
}

fn lattice_value(seed: u64, cell: i64) -> f32 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(&cell.to_le_bytes());
    unit_from_hash(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const DT: f32 = 0.05;

    fn engine() -> MinigameEngine {
        MinigameEngine::new(MinigameConfig::default(), SmallRng::seed_from_u64(3))
    }

    fn day_state(day_offset: u32) -> SessionState {
        let mut state = SessionState::new(day_offset);
        state.begin_day(5);
        state
    }

    fn run_to_completion(
        engine: &mut MinigameEngine,
        state: &mut SessionState,
        axis: f32,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..2_000 {
            events.extend(engine.tick(state, DT, axis));
            if !engine.is_running() {
                break;
            }
        }
        events
    }

    #[test]
    fn start_requires_an_active_day() {
        let mut state = SessionState::new(0);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        assert!(!engine.is_running());
        assert!(!state.is_minigame_active());
    }

    #[test]
    fn full_check_completes_delivery_with_tip_in_range() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(2));
        assert!(state.is_minigame_active());
        assert_eq!(engine.session().map(MinigameSession::phase), Some(MinigamePhase::Intro));

        let events = run_to_completion(&mut engine, &mut state, 0.0);
        let Some(GameEvent::DeliveryCompleted { target, tip }) = events.last().copied() else {
            panic!("expected a completed delivery, got {events:?}");
        };
        assert_eq!(target, TargetId(2));
        assert!((5..=40).contains(&tip));
        assert!(!state.is_minigame_active());
        assert!(engine.session().is_none());
    }

    #[test]
    fn phases_advance_through_stored_countdowns() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(0));

        let mut elapsed = 0.0;
        while engine.session().map(MinigameSession::phase) == Some(MinigamePhase::Intro) {
            engine.tick(&mut state, DT, 0.0);
            elapsed += DT;
        }
        assert!((elapsed - 0.8).abs() < DT * 1.5);

        let session = engine.session().expect("active");
        assert!((session.phase_remaining() - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tutorial_delivery_fails_with_zero_tip() {
        let mut state = day_state(0);
        state.record_delivery(5);
        state.record_delivery(5);
        let mut engine = engine();
        engine.start(&mut state, TargetId(4));
        let session = engine.session().expect("running");
        assert!(session.is_tutorial_failure());
        assert!((session.duration() - 7.5).abs() < f32::EPSILON);

        let events = run_to_completion(&mut engine, &mut state, 0.0);
        assert_eq!(
            events,
            vec![
                GameEvent::DeliveryFailed {
                    target: TargetId(4)
                },
                GameEvent::DeliveryCompleted {
                    target: TargetId(4),
                    tip: 0
                },
            ]
        );
    }

    #[test]
    fn tutorial_only_applies_on_first_day() {
        let mut state = day_state(1);
        state.record_delivery(5);
        state.record_delivery(5);
        let mut engine = engine();
        engine.start(&mut state, TargetId(4));
        assert!(!engine.session().expect("running").is_tutorial_failure());
    }

    #[test]
    fn reveal_counts_up_to_final_tip() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        while engine.session().map(MinigameSession::phase) != Some(MinigamePhase::Resolving) {
            engine.tick(&mut state, DT, 0.0);
        }
        let final_tip = engine
            .session()
            .and_then(MinigameSession::outcome)
            .map(|outcome| outcome.tip)
            .expect("resolved");
        assert_eq!(engine.revealed_tip(), Some(0));
        for _ in 0..30 {
            engine.tick(&mut state, DT, 0.0);
        }
        assert_eq!(engine.revealed_tip(), Some(final_tip));
    }

    #[test]
    fn timers_freeze_while_paused() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        state.set_paused(true);
        for _ in 0..100 {
            assert!(engine.tick(&mut state, DT, 1.0).is_empty());
        }
        let session = engine.session().expect("running");
        assert_eq!(session.phase(), MinigamePhase::Intro);
        assert!((session.phase_remaining() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn restart_replaces_running_check() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        for _ in 0..40 {
            engine.tick(&mut state, DT, 0.0);
        }
        engine.start(&mut state, TargetId(7));
        let session = engine.session().expect("running");
        assert_eq!(session.target(), TargetId(7));
        assert_eq!(session.phase(), MinigamePhase::Intro);
        assert!(session.in_zone_time().abs() < f32::EPSILON);
    }

    #[test]
    fn cancel_drops_check_without_completion() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        engine.cancel(&mut state);
        assert!(!state.is_minigame_active());
        assert!(engine.tick(&mut state, DT, 0.0).is_empty());
    }

    #[test]
    fn reassignment_cancels_check_for_the_old_target() {
        let mut state = day_state(3);
        state.assign_target(TargetId(1));
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));

        engine.on_assigned(&mut state, TargetId(1));
        assert!(engine.is_running());

        state.assign_target(TargetId(2));
        engine.on_assigned(&mut state, TargetId(2));
        assert!(!engine.is_running());
        assert!(!state.is_minigame_active());
    }

    #[test]
    fn tick_drops_check_once_its_target_is_no_longer_assigned() {
        let mut state = day_state(3);
        state.assign_target(TargetId(1));
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        state.assign_target(TargetId(2));

        assert!(engine.tick(&mut state, DT, 0.0).is_empty());
        assert!(engine.session().is_none());
        assert!(!state.is_minigame_active());
    }

    #[test]
    fn needle_stays_on_track_and_axis_is_sanitized() {
        let mut state = day_state(3);
        let mut engine = engine();
        engine.start(&mut state, TargetId(1));
        for step in 0..400 {
            let axis = match step % 3 {
                0 => f32::NAN,
                1 => 25.0,
                _ => f32::INFINITY,
            };
            engine.tick(&mut state, DT, axis);
            let Some(session) = engine.session() else {
                break;
            };
            assert!(session.needle_position().abs() <= 400.0);
            assert!(session.needle_position().is_finite());
            let zone_edge = session.safe_zone_center().abs() + session.safe_zone_width() * 0.5;
            assert!(zone_edge <= 400.0 + 1e-3);
        }
    }

    #[test]
    fn score_and_tip_are_monotonic_in_zone_time() {
        let mut last_score = -1.0;
        let mut last_tip = 0;
        for tenth in 0..=200 {
            #[allow(clippy::cast_precision_loss)]
            let in_zone = tenth as f32 * 0.1;
            let score = compute_score(in_zone, 15.0);
            let tip = compute_tip(score, 5, 40);
            assert!(score >= last_score);
            assert!(tip >= last_tip);
            assert!((5..=40).contains(&tip));
            last_score = score;
            last_tip = tip;
        }
        assert_eq!(compute_tip(0.0, 5, 40), 5);
        assert_eq!(compute_tip(1.0, 5, 40), 40);
        assert!(compute_score(3.0, 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn smooth_noise_is_bounded_and_continuous() {
        let mut previous = smooth_noise(11, 0.0);
        for step in 1..2_000 {
            #[allow(clippy::cast_precision_loss)]
            let x = step as f32 * 0.01;
            let value = smooth_noise(11, x);
            assert!((0.0..1.0).contains(&value));
            assert!((value - previous).abs() < 0.05);
            previous = value;
        }
        assert!((smooth_noise(11, 3.0) - smooth_noise(11, 3.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn validation_requires_tuning_for_every_biome() {
        let mut config = MinigameConfig::default();
        assert!(config.validate().is_ok());
        config.biomes.remove(&Biome::Space);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingBiomeTuning(Biome::Space))
        );
    }
    #[test]
    fn validation_rejects_negative_or_nan_needle_motion() {
        for (field, value) in [
            ("minigame.drag", -1.0),
            ("minigame.drag", f32::NAN),
            ("minigame.move_speed", -5.0),
            ("minigame.wobble_amplitude", f32::NAN),
        ] {
            let mut config = MinigameConfig::default();
            let tuning = config.biomes.get_mut(&Biome::Water).expect("water tuning");
            match field {
                "minigame.drag" => tuning.drag = value,
                "minigame.move_speed" => tuning.move_speed = value,
                _ => tuning.wobble_amplitude = value,
            }
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::MinViolation { field: f, .. } if f == field),
                "{field} = {value} gave {err:?}"
            );
        }
    }
}
