//! Delivery queue: shuffled generations of every available target.
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

use crate::bus::{GameEvent, Outbox};
use crate::session::SessionError;
use crate::state::SessionState;
use crate::world::TargetId;

/// Hands out targets one at a time for the active day.
///
/// Each generation is a uniform permutation of the full target set; a new
/// generation is drawn only once the previous one is exhausted, so targets
/// never repeat within a generation.
#[derive(Debug, Clone)]
pub struct DeliveryScheduler {
    targets: Vec<TargetId>,
    queue: VecDeque<TargetId>,
    generations: u32,
    rng: SmallRng,
}

impl DeliveryScheduler {
    #[must_use]
    pub const fn new(rng: SmallRng) -> Self {
        Self {
            targets: Vec::new(),
            queue: VecDeque::new(),
            generations: 0,
            rng,
        }
    }

    /// Targets still waiting in the current generation, head first.
    pub fn queued(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.queue.iter().copied()
    }

    #[must_use]
    pub const fn generations(&self) -> u32 {
        self.generations
    }

    /// Capture the day's targets and assign the first one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDeliveryTargets`] when `available` is empty.
    pub fn on_day_started(
        &mut self,
        state: &mut SessionState,
        available: &[TargetId],
    ) -> Result<Outbox, SessionError> {
        self.targets.clear();
        self.queue.clear();
        self.generations = 0;
        if available.is_empty() {
            log::error!("day {} started with no delivery targets", state.current_day());
            return Err(SessionError::NoDeliveryTargets);
        }
        self.targets.extend_from_slice(available);
        self.targets.sort_unstable();
        self.targets.dedup();
        if self.targets.len() < available.len() {
            log::warn!(
                "dropped {} duplicate delivery targets",
                available.len() - self.targets.len()
            );
        }
        Ok(self.assign_next(state))
    }

    /// A fresh uniform permutation of every target.
    pub fn shuffled_generation(&mut self) -> Vec<TargetId> {
        let mut generation = self.targets.clone();
        generation.shuffle(&mut self.rng);
        generation
    }

    /// Pop the next target, drawing a new generation when the queue runs dry.
    pub fn assign_next(&mut self, state: &mut SessionState) -> Outbox {
        let mut outbox = Outbox::new();
        if self.queue.is_empty() {
            let generation = self.shuffled_generation();
            self.queue.extend(generation);
            self.generations = self.generations.saturating_add(1);
        }
        let Some(target) = self.queue.pop_front() else {
            log::warn!("no delivery target to assign");
            state.clear_target();
            return outbox;
        };
        state.assign_target(target);
        log::debug!("assigned {target}");
        outbox.push(GameEvent::DeliveryPointAssigned { target });
        outbox
    }

    pub fn on_delivery_completed(&mut self, state: &mut SessionState, target: TargetId) -> Outbox {
        if !state.is_day_active() || !state.is_assigned(target) {
            log::debug!("ignoring stale completion for {target}");
            return Outbox::new();
        }
        self.assign_next(state)
    }

    /// Drop the queue and the assignment when the day ends.
    pub fn clear(&mut self, state: &mut SessionState) {
        self.queue.clear();
        self.targets.clear();
        state.clear_target();
    }
}
