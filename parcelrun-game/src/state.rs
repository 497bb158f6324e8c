//! Session-wide mutable state shared by every component.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::biome::Biome;
use crate::store::ScoreRecord;
use crate::world::TargetId;

/// Handle components share; borrows last only for one component call.
pub type SharedSession = Rc<RefCell<SessionState>>;

/// Result of counting a completed delivery against the day quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTally {
    Counted,
    QuotaMet,
    /// No day is active; nothing was recorded.
    Ignored,
}

/// Progress of the current session.
///
/// Fields are private so that the day, minigame and health invariants hold
/// regardless of which component mutates the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    current_day: u32,
    is_day_active: bool,
    is_minigame_active: bool,
    targets_for_day: u32,
    completed_today: u32,
    tips_today: u32,
    total_time_today: f32,
    current_biome: Biome,
    vehicle_health: f32,
    assigned_target: Option<TargetId>,
    paused: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SessionState {
    /// Fresh state for a session with `persisted_days` recorded days behind it.
    #[must_use]
    pub const fn new(persisted_days: u32) -> Self {
        Self {
            current_day: persisted_days,
            is_day_active: false,
            is_minigame_active: false,
            targets_for_day: 0,
            completed_today: 0,
            tips_today: 0,
            total_time_today: 0.0,
            current_biome: Biome::Normal,
            vehicle_health: 1.0,
            assigned_target: None,
            paused: false,
        }
    }

    #[must_use]
    pub fn shared(persisted_days: u32) -> SharedSession {
        Rc::new(RefCell::new(Self::new(persisted_days)))
    }

    #[must_use]
    pub const fn current_day(&self) -> u32 {
        self.current_day
    }

    #[must_use]
    pub const fn is_day_active(&self) -> bool {
        self.is_day_active
    }

    #[must_use]
    pub const fn is_minigame_active(&self) -> bool {
        self.is_minigame_active
    }

    #[must_use]
    pub const fn targets_for_day(&self) -> u32 {
        self.targets_for_day
    }

    #[must_use]
    pub const fn completed_today(&self) -> u32 {
        self.completed_today
    }

    #[must_use]
    pub const fn tips_today(&self) -> u32 {
        self.tips_today
    }

    #[must_use]
    pub const fn total_time_today(&self) -> f32 {
        self.total_time_today
    }

    #[must_use]
    pub const fn current_biome(&self) -> Biome {
        self.current_biome
    }

    #[must_use]
    pub const fn vehicle_health(&self) -> f32 {
        self.vehicle_health
    }

    #[must_use]
    pub const fn assigned_target(&self) -> Option<TargetId> {
        self.assigned_target
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Day timer, biome countdown and minigame-independent clocks advance only here.
    #[must_use]
    pub const fn timers_running(&self) -> bool {
        self.is_day_active && !self.is_minigame_active && !self.paused
    }

    #[must_use]
    pub fn is_assigned(&self, target: TargetId) -> bool {
        self.assigned_target == Some(target)
    }

    pub fn reset(&mut self, persisted_days: u32) {
        *self = Self::new(persisted_days);
    }

    /// Open the next day. A zero quota is raised to one.
    pub fn begin_day(&mut self, targets: u32) {
        self.current_day = self.current_day.saturating_add(1);
        self.is_day_active = true;
        self.is_minigame_active = false;
        self.targets_for_day = targets.max(1);
        self.completed_today = 0;
        self.tips_today = 0;
        self.total_time_today = 0.0;
        self.assigned_target = None;
        self.paused = false;
    }

    pub fn record_delivery(&mut self, tip: u32) -> DeliveryTally {
        if !self.is_day_active {
            return DeliveryTally::Ignored;
        }
        self.completed_today = self
            .completed_today
            .saturating_add(1)
            .min(self.targets_for_day);
        self.tips_today = self.tips_today.saturating_add(tip);
        if self.completed_today >= self.targets_for_day {
            DeliveryTally::QuotaMet
        } else {
            DeliveryTally::Counted
        }
    }

    /// Add `dt` to the day timer when timers are running. Returns whether time accrued.
    pub fn accrue_time(&mut self, dt: f32) -> bool {
        if !self.timers_running() || !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.total_time_today += dt;
        true
    }

    /// Flag the skill-check. Activation is refused outside an active day.
    pub fn set_minigame_active(&mut self, active: bool) -> bool {
        if active && !self.is_day_active {
            return false;
        }
        self.is_minigame_active = active;
        true
    }

    /// Close the day and produce its score record.
    pub fn finish_day(&mut self) -> ScoreRecord {
        self.is_day_active = false;
        self.is_minigame_active = false;
        self.paused = false;
        ScoreRecord {
            time_taken: self.total_time_today,
            tips_earned: self.tips_today,
        }
    }

    /// Force-end the day without a record and roll the day counter back.
    pub fn abort_day(&mut self) {
        self.is_day_active = false;
        self.is_minigame_active = false;
        self.paused = false;
        self.assigned_target = None;
        self.current_day = self.current_day.saturating_sub(1);
    }

    pub fn set_vehicle_health(&mut self, health: f32) {
        if health.is_nan() {
            log::warn!("ignoring NaN vehicle health");
            return;
        }
        self.vehicle_health = health.clamp(0.0, 1.0);
    }

    pub fn assign_target(&mut self, target: TargetId) {
        self.assigned_target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.assigned_target = None;
    }

    pub fn set_biome(&mut self, biome: Biome) {
        self.current_biome = biome;
    }

    /// Pausing needs an active day; resuming is always accepted.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if paused && !self.is_day_active {
            return false;
        }
        self.paused = paused;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_seeds_day_from_persisted_history() {
        let mut state = SessionState::new(0);
        state.begin_day(3);
        state.reset(4);
        assert_eq!(state.current_day(), 4);
        assert!(!state.is_day_active());
        assert!((state.vehicle_health() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn quota_is_met_exactly_at_equality() {
        let mut state = SessionState::new(0);
        state.begin_day(3);
        assert_eq!(state.record_delivery(5), DeliveryTally::Counted);
        assert_eq!(state.record_delivery(12), DeliveryTally::Counted);
        assert_eq!(state.record_delivery(30), DeliveryTally::QuotaMet);
        assert_eq!(state.completed_today(), 3);
        assert_eq!(state.tips_today(), 47);

        state.record_delivery(1);
        assert!(state.completed_today() <= state.targets_for_day());
    }

    #[test]
    fn zero_quota_is_raised_to_one() {
        let mut state = SessionState::new(0);
        state.begin_day(0);
        assert_eq!(state.targets_for_day(), 1);
    }

    #[test]
    fn deliveries_outside_a_day_are_ignored() {
        let mut state = SessionState::new(0);
        assert_eq!(state.record_delivery(9), DeliveryTally::Ignored);
        assert_eq!(state.tips_today(), 0);
    }

    #[test]
    fn timer_accrues_only_while_running() {
        let mut state = SessionState::new(0);
        assert!(!state.accrue_time(1.0));
        state.begin_day(3);
        assert!(state.accrue_time(0.5));
        assert!(state.set_minigame_active(true));
        assert!(!state.accrue_time(2.0));
        state.set_minigame_active(false);
        assert!(state.set_paused(true));
        assert!(!state.accrue_time(2.0));
        state.set_paused(false);
        assert!(!state.accrue_time(f32::NAN));
        assert!(!state.accrue_time(-1.0));
        assert!((state.total_time_today() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn minigame_requires_active_day() {
        let mut state = SessionState::new(0);
        assert!(!state.set_minigame_active(true));
        assert!(!state.is_minigame_active());
        assert!(!state.set_paused(true));
    }

    #[test]
    fn finish_and_abort_differ_in_day_accounting() {
        let mut state = SessionState::new(2);
        state.begin_day(5);
        state.accrue_time(12.5);
        state.record_delivery(7);
        let record = state.finish_day();
        assert_eq!(record.tips_earned, 7);
        assert!((record.time_taken - 12.5).abs() < f32::EPSILON);
        assert_eq!(state.current_day(), 3);

        state.begin_day(5);
        state.assign_target(TargetId(1));
        state.abort_day();
        assert_eq!(state.current_day(), 3);
        assert!(state.assigned_target().is_none());
        assert!(!state.is_day_active());
    }

    #[test]
    fn health_is_clamped_and_nan_ignored() {
        let mut state = SessionState::new(0);
        state.set_vehicle_health(1.7);
        assert!((state.vehicle_health() - 1.0).abs() < f32::EPSILON);
        state.set_vehicle_health(-0.3);
        assert!(state.vehicle_health().abs() < f32::EPSILON);
        state.set_vehicle_health(f32::NAN);
        assert!(state.vehicle_health().abs() < f32::EPSILON);
    }
}
