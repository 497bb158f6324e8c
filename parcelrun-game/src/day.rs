//! Day lifecycle: quota selection, the day timer, and score recording.
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::ScoreStore;
use crate::bus::{GameEvent, Outbox};
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::state::{DeliveryTally, SessionState};
use crate::world::TargetId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayConfig {
    /// Fixed quota for the first `opening_days` days.
    pub opening_day_quota: u32,
    pub opening_days: u32,
    pub quota_min: u32,
    pub quota_max: u32,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            opening_day_quota: 3,
            opening_days: 2,
            quota_min: 5,
            quota_max: 7,
        }
    }
}

impl DayConfig {
    /// # Errors
    ///
    /// Returns an error when the quota range is inverted.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.quota_min > self.quota_max {
            return Err(ConfigError::InvertedCount {
                field: "day.quota",
                min: self.quota_min,
                max: self.quota_max,
            });
        }
        Ok(())
    }
}

/// Opens and closes days and writes a score record for each completed one.
#[derive(Debug)]
pub struct DayController<S: ScoreStore> {
    config: DayConfig,
    rng: SmallRng,
    store: Rc<S>,
}

impl<S: ScoreStore> DayController<S> {
    pub const fn new(config: DayConfig, rng: SmallRng, store: Rc<S>) -> Self {
        Self { config, rng, store }
    }

    /// Deliveries required on `day` (1-based).
    pub fn daily_quota(&mut self, day: u32) -> u32 {
        if day <= self.config.opening_days {
            return self.config.opening_day_quota.max(1);
        }
        let DayConfig {
            quota_min,
            quota_max,
            ..
        } = self.config;
        if quota_min > quota_max {
            log::warn!("inverted quota range {quota_min}..={quota_max}, using {quota_min}");
            return quota_min.max(1);
        }
        self.rng.gen_range(quota_min..=quota_max).max(1)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::DayInProgress`] when a day is already running.
    pub fn start_day(&mut self, state: &mut SessionState) -> Result<Outbox, SessionError> {
        if state.is_day_active() {
            return Err(SessionError::DayInProgress {
                day: state.current_day(),
            });
        }
        let quota = self.daily_quota(state.current_day().saturating_add(1));
        state.begin_day(quota);
        log::info!(
            "day {} started with {} deliveries",
            state.current_day(),
            state.targets_for_day()
        );
        let mut outbox = Outbox::new();
        outbox.push(GameEvent::DayStarted);
        Ok(outbox)
    }

    /// Advance the day timer. Returns whether time accrued.
    pub fn tick(&mut self, state: &mut SessionState, dt: f32) -> bool {
        state.accrue_time(dt)
    }

    pub fn on_delivery_completed(
        &mut self,
        state: &mut SessionState,
        target: TargetId,
        tip: u32,
    ) -> Outbox {
        if !state.is_assigned(target) {
            log::debug!("ignoring completion for unassigned {target}");
            return Outbox::new();
        }
        match state.record_delivery(tip) {
            DeliveryTally::QuotaMet => self.end_day(state),
            DeliveryTally::Counted | DeliveryTally::Ignored => Outbox::new(),
        }
    }

    /// Close the active day and persist its record.
    pub fn end_day(&mut self, state: &mut SessionState) -> Outbox {
        let mut outbox = Outbox::new();
        if !state.is_day_active() {
            return outbox;
        }
        let record = state.finish_day();
        if let Err(err) = self.store.save(&record) {
            log::error!("failed to persist day {} score: {err}", state.current_day());
        }
        log::info!(
            "day {} ended: {:.1}s, {} in tips",
            state.current_day(),
            record.time_taken,
            record.tips_earned
        );
        outbox.push(GameEvent::DayEnded);
        outbox
    }

    /// Force-end the day without a record and roll the day counter back.
    pub fn on_vehicle_destroyed(&mut self, state: &mut SessionState) {
        if !state.is_day_active() {
            return;
        }
        state.abort_day();
        log::info!("day aborted, rolled back to day {}", state.current_day());
    }
}
