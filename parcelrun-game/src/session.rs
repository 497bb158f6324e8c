//! Session orchestrator wiring every component onto one event bus.
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::ScoreStore;
use crate::biome::{Biome, BiomeRotation};
use crate::bus::{EventBus, EventKind, GameEvent, Outbox, SubscriptionId};
use crate::config::{ConfigError, GameConfig};
use crate::day::DayController;
use crate::durability::{Collision, DurabilityTracker, knockback_impulse};
use crate::minigame::{MinigameEngine, MinigameSession};
use crate::numbers::len_to_u32;
use crate::props::{PropPlanner, SpawnPlan};
use crate::proximity::{ProximityState, ProximityTracker};
use crate::queue::DeliveryScheduler;
use crate::rng::{DOMAIN_BIOME, DOMAIN_DAY, DOMAIN_MINIGAME, DOMAIN_PROPS, DOMAIN_QUEUE, stream_rng};
use crate::state::{SessionState, SharedSession};
use crate::store::{ScoreHistory, load_history_or_empty};
use crate::world::{TargetId, World};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("no delivery targets are available")]
    NoDeliveryTargets,
    #[error("day {day} is already in progress")]
    DayInProgress { day: u32 },
    #[error("invalid session configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Per-tick input from the embedding platform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Horizontal steer axis in `[-1, 1]`, driving the skill-check needle.
    pub steer_axis: f32,
}

type Shared<T> = Rc<RefCell<T>>;

/// One running game: shared state, components and the bus that connects them.
pub struct GameSession<S: ScoreStore + 'static> {
    bus: EventBus,
    state: SharedSession,
    world: Rc<World>,
    store: Rc<S>,
    config: GameConfig,
    day: Shared<DayController<S>>,
    scheduler: Shared<DeliveryScheduler>,
    proximity: Shared<ProximityTracker>,
    minigame: Shared<MinigameEngine>,
    biome: Shared<BiomeRotation>,
    durability: Shared<DurabilityTracker>,
    props: Shared<PropPlanner>,
    subscriptions: Vec<SubscriptionId>,
}

impl<S: ScoreStore + 'static> std::fmt::Debug for GameSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("state", &self.state.try_borrow().ok())
            .field("targets", &self.world.targets.len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl<S: ScoreStore + 'static> GameSession<S> {
    /// Build a session whose randomness derives entirely from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when `config` fails validation.
    pub fn new(
        config: GameConfig,
        world: World,
        store: S,
        seed: u64,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let store = Rc::new(store);
        let history = load_history_or_empty(&*store);
        let state = SessionState::shared(len_to_u32(history.scores.len()));

        let day = DayController::new(
            config.day.clone(),
            stream_rng(seed, DOMAIN_DAY),
            Rc::clone(&store),
        );
        let scheduler = DeliveryScheduler::new(stream_rng(seed, DOMAIN_QUEUE));
        let proximity = ProximityTracker::new(config.proximity.clone());
        let minigame =
            MinigameEngine::new(config.minigame.clone(), stream_rng(seed, DOMAIN_MINIGAME));
        let biome = BiomeRotation::new(config.biome.clone(), stream_rng(seed, DOMAIN_BIOME));
        let durability = DurabilityTracker::new(config.durability.clone());
        let props = PropPlanner::new(
            config.props.clone(),
            stream_rng(seed, DOMAIN_PROPS),
            world.placement_zones.clone(),
        );

        let mut session = Self {
            bus: EventBus::new(),
            state,
            world: Rc::new(world),
            store,
            config,
            day: Rc::new(RefCell::new(day)),
            scheduler: Rc::new(RefCell::new(scheduler)),
            proximity: Rc::new(RefCell::new(proximity)),
            minigame: Rc::new(RefCell::new(minigame)),
            biome: Rc::new(RefCell::new(biome)),
            durability: Rc::new(RefCell::new(durability)),
            props: Rc::new(RefCell::new(props)),
            subscriptions: Vec::new(),
        };
        session.wire_components();
        Ok(session)
    }

    /// Build a session with the embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when the defaults fail validation.
    pub fn with_defaults(world: World, store: S, seed: u64) -> Result<Self, SessionError> {
        Self::new(GameConfig::default_config(), world, store, seed)
    }

    fn wire_components(&mut self) {
        let targets = self.world.target_ids();
        let mut ids = Vec::new();

        // Day start.
        ids.push(self.wire(EventKind::DayStarted, &self.scheduler, move |scheduler, state, _| {
            scheduler
                .on_day_started(state, &targets)
                .unwrap_or_default()
        }));
        ids.push(self.wire(EventKind::DayStarted, &self.proximity, |proximity, _, _| {
            proximity.reset();
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::DayStarted, &self.biome, |biome, state, _| {
            biome.on_day_started(state)
        }));
        ids.push(self.wire(EventKind::DayStarted, &self.durability, |durability, state, _| {
            durability.on_day_started(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::DayStarted, &self.props, |props, _, _| {
            props.on_day_started();
            Outbox::new()
        }));

        // Deliveries: the day controller counts before the scheduler moves on.
        ids.push(self.wire(EventKind::DeliveryCompleted, &self.day, |day, state, event| {
            match *event {
                GameEvent::DeliveryCompleted { target, tip } => {
                    day.on_delivery_completed(state, target, tip)
                }
                _ => Outbox::new(),
            }
        }));
        ids.push(self.wire(
            EventKind::DeliveryCompleted,
            &self.scheduler,
            |scheduler, state, event| match *event {
                GameEvent::DeliveryCompleted { target, .. } => {
                    scheduler.on_delivery_completed(state, target)
                }
                _ => Outbox::new(),
            },
        ));
        ids.push(self.wire(
            EventKind::DeliveryPointAssigned,
            &self.proximity,
            |proximity, _, event| {
                if let GameEvent::DeliveryPointAssigned { target } = *event {
                    proximity.on_assigned(target);
                }
                Outbox::new()
            },
        ));
        ids.push(self.wire(
            EventKind::DeliveryPointAssigned,
            &self.minigame,
            |minigame, state, event| {
                if let GameEvent::DeliveryPointAssigned { target } = *event {
                    minigame.on_assigned(state, target);
                }
                Outbox::new()
            },
        ));
        ids.push(self.wire(
            EventKind::PlayerInteractedWithDeliveryPoint,
            &self.minigame,
            |minigame, state, event| match *event {
                GameEvent::PlayerInteractedWithDeliveryPoint { target }
                    if state.is_assigned(target) =>
                {
                    minigame.start(state, target)
                }
                _ => Outbox::new(),
            },
        ));
        ids.push(self.wire(EventKind::BiomeChanged, &self.props, |props, _, event| {
            if let GameEvent::BiomeChanged { biome } = *event {
                props.on_biome_changed(biome);
            }
            Outbox::new()
        }));

        // Day end.
        ids.push(self.wire(EventKind::DayEnded, &self.scheduler, |scheduler, state, _| {
            scheduler.clear(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::DayEnded, &self.proximity, |proximity, _, _| {
            proximity.reset();
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::DayEnded, &self.minigame, |minigame, state, _| {
            minigame.cancel(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::DayEnded, &self.biome, |biome, _, _| {
            biome.disarm();
            Outbox::new()
        }));

        // Destruction pre-empts any running skill-check before the day rolls back.
        ids.push(self.wire(EventKind::VehicleDestroyed, &self.minigame, |minigame, state, _| {
            minigame.cancel(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::VehicleDestroyed, &self.day, |day, state, _| {
            day.on_vehicle_destroyed(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::VehicleDestroyed, &self.scheduler, |scheduler, state, _| {
            scheduler.clear(state);
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::VehicleDestroyed, &self.proximity, |proximity, _, _| {
            proximity.reset();
            Outbox::new()
        }));
        ids.push(self.wire(EventKind::VehicleDestroyed, &self.biome, |biome, _, _| {
            biome.disarm();
            Outbox::new()
        }));

        self.subscriptions = ids;
    }

    /// Subscribe a component handler that borrows the component and the state
    /// for the duration of the call, then publishes its outbox.
    fn wire<C, F>(&self, kind: EventKind, component: &Shared<C>, mut react: F) -> SubscriptionId
    where
        C: 'static,
        F: FnMut(&mut C, &mut SessionState, &GameEvent) -> Outbox + 'static,
    {
        let state = Rc::clone(&self.state);
        let component = Rc::clone(component);
        self.bus.subscribe(kind, move |event, bus| {
            let outbox = {
                let (Ok(mut component), Ok(mut state)) =
                    (component.try_borrow_mut(), state.try_borrow_mut())
                else {
                    log::warn!("{kind:?} handler skipped: session state is busy");
                    return;
                };
                react(&mut component, &mut state, event)
            };
            bus.publish_all(outbox);
        })
    }

    /// Run `drive` against a component with the state borrowed, then publish.
    fn drive<C, F>(&self, component: &Shared<C>, drive: F)
    where
        F: FnOnce(&mut C, &mut SessionState) -> Outbox,
    {
        let outbox = {
            let (Ok(mut component), Ok(mut state)) =
                (component.try_borrow_mut(), self.state.try_borrow_mut())
            else {
                log::warn!("session call ignored: session state is busy");
                return;
            };
            drive(&mut component, &mut state)
        };
        self.bus.publish_all(outbox);
    }

    /// Open the next day.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDeliveryTargets`] for an empty world and
    /// [`SessionError::DayInProgress`] while a day is running.
    pub fn start_day(&self) -> Result<(), SessionError> {
        if self.world.targets.is_empty() {
            log::error!("cannot start a day without delivery targets");
            return Err(SessionError::NoDeliveryTargets);
        }
        let outbox = {
            let mut day = self.day.borrow_mut();
            let mut state = self.state.borrow_mut();
            day.start_day(&mut state)?
        };
        self.bus.publish_all(outbox);
        Ok(())
    }

    /// Start again after the vehicle was destroyed. The aborted day is replayed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_day`].
    pub fn restart_day(&self) -> Result<(), SessionError> {
        self.start_day()
    }

    /// Advance every timer by `dt` seconds in fixed order.
    pub fn tick(&self, dt: f32, input: &TickInput) {
        {
            let state = self.state.borrow();
            self.durability.borrow_mut().advance_clock(&state, dt);
        }
        self.drive(&self.day, |day, state| {
            day.tick(state, dt);
            Outbox::new()
        });
        let axis = input.steer_axis;
        self.drive(&self.minigame, |minigame, state| minigame.tick(state, dt, axis));
        self.drive(&self.biome, |biome, state| biome.tick(state, dt));
    }

    pub fn vehicle_entered(&self, target: TargetId) {
        self.drive(&self.proximity, |proximity, state| {
            proximity.vehicle_entered(state, target)
        });
    }

    pub fn vehicle_exited(&self, target: TargetId) {
        self.drive(&self.proximity, |proximity, state| {
            proximity.vehicle_exited(state, target)
        });
    }

    /// Speed sample for a vehicle inside `target`'s volume.
    pub fn vehicle_speed(&self, target: TargetId, speed: f32) {
        self.drive(&self.proximity, |proximity, state| {
            proximity.vehicle_speed(state, target, speed)
        });
    }

    pub fn interact_pressed(&self) {
        self.drive(&self.proximity, |proximity, state| {
            proximity.interact_pressed(state)
        });
    }

    pub fn obstacle_collision(&self, collision: Collision) {
        self.drive(&self.durability, |durability, state| {
            durability.on_collision(state, collision)
        });
    }

    pub fn collect_repair_kit(&self) {
        self.drive(&self.durability, |durability, state| {
            durability.collect_repair_kit(state)
        });
    }

    /// Impulse for a prop the vehicle struck, using the configured knockback.
    #[must_use]
    pub fn knockback_impulse(&self, normal: [f32; 3], impact_speed: f32) -> [f32; 3] {
        knockback_impulse(normal, impact_speed, &self.config.durability.knockback)
    }

    /// Manual biome override. Ignored between days.
    pub fn force_biome(&self, biome: Biome) -> bool {
        if !self.state.borrow().is_day_active() {
            return false;
        }
        self.drive(&self.biome, |rotation, state| rotation.force_biome(state, biome));
        true
    }

    pub fn set_paused(&self, paused: bool) -> bool {
        self.state.borrow_mut().set_paused(paused)
    }

    /// Drop all progress and re-read the day counter from persisted history.
    pub fn reset(&self) {
        let persisted = len_to_u32(self.history().scores.len());
        let mut state = self.state.borrow_mut();
        self.minigame.borrow_mut().cancel(&mut state);
        self.scheduler.borrow_mut().clear(&mut state);
        self.proximity.borrow_mut().reset();
        self.biome.borrow_mut().disarm();
        state.reset(persisted);
        log::info!("session reset at day {persisted}");
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent, &EventBus) + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&SessionState) -> R) -> R {
        read(&self.state.borrow())
    }

    #[must_use]
    pub fn minigame_snapshot(&self) -> Option<MinigameSession> {
        self.minigame.borrow().session().cloned()
    }

    #[must_use]
    pub fn revealed_tip(&self) -> Option<u32> {
        self.minigame.borrow().revealed_tip()
    }

    #[must_use]
    pub fn proximity_state(&self, target: TargetId) -> ProximityState {
        self.proximity.borrow().state_of(target)
    }

    #[must_use]
    pub fn queued_targets(&self) -> Vec<TargetId> {
        self.scheduler.borrow().queued().collect()
    }

    #[must_use]
    pub fn prop_plan(&self) -> SpawnPlan {
        self.props.borrow().plan().clone()
    }

    #[must_use]
    pub fn biome_countdown(&self) -> Option<f32> {
        self.biome.borrow().countdown()
    }

    #[must_use]
    pub fn history(&self) -> ScoreHistory {
        load_history_or_empty(&*self.store)
    }
}

impl<S: ScoreStore + 'static> Drop for GameSession<S> {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
