//! Parcelrun Game Engine
//!
//! Platform-agnostic session logic for the Parcelrun delivery arcade game:
//! the event bus, the day, delivery, skill-check, biome and durability state
//! machines it coordinates, and the score history contract. Rendering,
//! physics and input live with the embedding platform.

pub mod biome;
pub mod bus;
pub mod config;
pub mod day;
pub mod durability;
pub mod minigame;
pub mod numbers;
pub mod props;
pub mod proximity;
pub mod queue;
pub mod rng;
pub mod session;
pub mod state;
pub mod store;
pub mod world;

// Re-export commonly used types
pub use biome::{Biome, BiomeRotation, BiomeRotationConfig};
pub use bus::{EventBus, EventKind, GameEvent, Outbox, SubscriptionId};
pub use config::{ConfigError, GameConfig};
pub use day::{DayConfig, DayController};
pub use durability::{
    Collision, DurabilityConfig, DurabilityTracker, KnockbackConfig, ObstacleKind,
    knockback_impulse,
};
pub use minigame::{
    MinigameConfig, MinigameEngine, MinigamePhase, MinigameSession, NeedleTuning,
    SkillCheckOutcome, compute_score, compute_tip,
};
pub use props::{ObstaclePlacement, PropConfig, PropPlanner, SpawnPlan};
pub use proximity::{ProximityConfig, ProximityState, ProximityTracker};
pub use queue::DeliveryScheduler;
pub use session::{GameSession, SessionError, TickInput};
pub use state::{DeliveryTally, SessionState, SharedSession};
pub use store::{
    JsonFileScoreStore, MemoryScoreStore, ScoreHistory, ScoreRecord, StoreError,
    load_history_or_empty,
};
pub use world::{DeliveryTarget, TargetId, World, WorldPosition, ZoneId};

/// Trait for abstracting score persistence.
/// Platform-specific implementations should provide this
pub trait ScoreStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append one completed day's record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn save(&self, record: &ScoreRecord) -> Result<(), Self::Error>;

    /// Load every persisted record in day order
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read or parsed.
    fn load_all(&self) -> Result<ScoreHistory, Self::Error>;
}
