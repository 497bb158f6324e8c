//! Synchronous event bus shared by every session component.
//!
//! Subscribers register against an [`EventKind`] channel and are invoked in
//! subscription order on the publishing thread. Dispatch iterates a snapshot
//! of the channel, so handlers may subscribe, unsubscribe (themselves or
//! others) and publish follow-up events while an event is in flight.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::biome::Biome;
use crate::durability::ObstacleKind;
use crate::world::TargetId;

/// Events a component hands back for the bus to publish once its borrows end.
pub type Outbox = SmallVec<[GameEvent; 2]>;

/// Event vocabulary exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    DayStarted,
    DayEnded,
    BiomeChanged {
        biome: Biome,
    },
    DeliveryPointAssigned {
        target: TargetId,
    },
    PlayerEnteredDeliveryPoint {
        target: TargetId,
    },
    PlayerExitedDeliveryPoint {
        target: TargetId,
    },
    VehicleStoppedAtDeliveryPoint {
        target: TargetId,
        stopped: bool,
    },
    PlayerInteractedWithDeliveryPoint {
        target: TargetId,
    },
    /// The tutorial skill-check resolved as a failed delivery.
    DeliveryFailed {
        target: TargetId,
    },
    DeliveryCompleted {
        target: TargetId,
        tip: u32,
    },
    VehicleCollidedWithObstacle {
        obstacle: ObstacleKind,
    },
    VehicleCollectedRepairKit,
    VehicleDestroyed,
}

/// Channel key for [`GameEvent`] subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DayStarted,
    DayEnded,
    BiomeChanged,
    DeliveryPointAssigned,
    PlayerEnteredDeliveryPoint,
    PlayerExitedDeliveryPoint,
    VehicleStoppedAtDeliveryPoint,
    PlayerInteractedWithDeliveryPoint,
    DeliveryFailed,
    DeliveryCompleted,
    VehicleCollidedWithObstacle,
    VehicleCollectedRepairKit,
    VehicleDestroyed,
}

impl GameEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DayStarted => EventKind::DayStarted,
            Self::DayEnded => EventKind::DayEnded,
            Self::BiomeChanged { .. } => EventKind::BiomeChanged,
            Self::DeliveryPointAssigned { .. } => EventKind::DeliveryPointAssigned,
            Self::PlayerEnteredDeliveryPoint { .. } => EventKind::PlayerEnteredDeliveryPoint,
            Self::PlayerExitedDeliveryPoint { .. } => EventKind::PlayerExitedDeliveryPoint,
            Self::VehicleStoppedAtDeliveryPoint { .. } => EventKind::VehicleStoppedAtDeliveryPoint,
            Self::PlayerInteractedWithDeliveryPoint { .. } => {
                EventKind::PlayerInteractedWithDeliveryPoint
            }
            Self::DeliveryFailed { .. } => EventKind::DeliveryFailed,
            Self::DeliveryCompleted { .. } => EventKind::DeliveryCompleted,
            Self::VehicleCollidedWithObstacle { .. } => EventKind::VehicleCollidedWithObstacle,
            Self::VehicleCollectedRepairKit => EventKind::VehicleCollectedRepairKit,
            Self::VehicleDestroyed => EventKind::VehicleDestroyed,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Rc<RefCell<dyn FnMut(&GameEvent, &EventBus)>>;

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Cloneable handle to a single-threaded subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &registry.subscribers.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler on a channel. Handlers added while an event of the
    /// same kind is being dispatched only see later events.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent, &Self) + 'static,
    {
        let handler: Handler = Rc::new(RefCell::new(handler));
        let mut registry = self.registry.borrow_mut();
        registry.next_id = registry.next_id.saturating_add(1);
        let id = SubscriptionId(registry.next_id);
        registry.subscribers.push(Subscriber { id, kind, handler });
        id
    }

    /// Remove a subscription. Returns false when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|subscriber| subscriber.id != id);
        registry.subscribers.len() != before
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry
            .borrow()
            .subscribers
            .iter()
            .any(|subscriber| subscriber.id == id)
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.kind == kind)
            .count()
    }

    /// Dispatch an event to every live subscriber of its channel.
    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        let snapshot: SmallVec<[(SubscriptionId, Handler); 8]> = self
            .registry
            .borrow()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.kind == kind)
            .map(|subscriber| (subscriber.id, Rc::clone(&subscriber.handler)))
            .collect();

        for (id, handler) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            let Ok(mut callback) = handler.try_borrow_mut() else {
                log::warn!("skipping re-entrant {kind:?} handler {id:?}");
                continue;
            };
            (&mut *callback)(&event, self);
        }
    }

    /// Publish events in order, each fully dispatched before the next.
    pub fn publish_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = GameEvent>,
    {
        for event in events {
            self.publish(event);
        }
    }
}
