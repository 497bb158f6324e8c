//! Obstacle and repair-kit spawn planning over placement zones.
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::biome::Biome;
use crate::config::ConfigError;
use crate::world::ZoneId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropConfig {
    pub obstacles_min: u32,
    pub obstacles_max: u32,
    pub repair_kits_per_day: u32,
    /// Obstacle prop names available in each biome.
    pub catalog: HashMap<Biome, Vec<String>>,
}

impl Default for PropConfig {
    fn default() -> Self {
        let catalog = [
            (Biome::Normal, ["traffic_cone", "crate", "barrel"]),
            (Biome::Water, ["buoy", "driftwood", "coral"]),
            (Biome::Space, ["asteroid", "satellite_debris", "crystal"]),
        ]
        .into_iter()
        .map(|(biome, props)| (biome, props.into_iter().map(String::from).collect()))
        .collect();
        Self {
            obstacles_min: 3,
            obstacles_max: 6,
            repair_kits_per_day: 3,
            catalog,
        }
    }
}

impl PropConfig {
    /// # Errors
    ///
    /// Returns an error when the obstacle count range is inverted.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.obstacles_min > self.obstacles_max {
            return Err(ConfigError::InvertedCount {
                field: "props.obstacles",
                min: self.obstacles_min,
                max: self.obstacles_max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    pub zone: ZoneId,
    pub prop: String,
}

/// Where props should currently stand. Pooling and exact positions stay with
/// the level collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPlan {
    pub biome: Biome,
    pub obstacles: Vec<ObstaclePlacement>,
    pub repair_kits: Vec<ZoneId>,
}

#[derive(Debug, Clone)]
pub struct PropPlanner {
    config: PropConfig,
    rng: SmallRng,
    zones: Vec<ZoneId>,
    plan: SpawnPlan,
}

impl PropPlanner {
    #[must_use]
    pub fn new(config: PropConfig, rng: SmallRng, zones: Vec<ZoneId>) -> Self {
        Self {
            config,
            rng,
            zones,
            plan: SpawnPlan::default(),
        }
    }

    #[must_use]
    pub const fn plan(&self) -> &SpawnPlan {
        &self.plan
    }

    /// Re-place the day's repair kits.
    pub fn on_day_started(&mut self) {
        let count = usize::try_from(self.config.repair_kits_per_day).unwrap_or(usize::MAX);
        self.plan.repair_kits = self.shuffled_zones().into_iter().take(count).collect();
        log::debug!("planned {} repair kits", self.plan.repair_kits.len());
    }

    /// Replace every obstacle with a fresh set from `biome`'s catalog.
    pub fn on_biome_changed(&mut self, biome: Biome) {
        self.plan.biome = biome;
        self.plan.obstacles.clear();
        let Some(catalog) = self.config.catalog.get(&biome).filter(|props| !props.is_empty())
        else {
            log::debug!("no obstacle props for {}", biome.as_str());
            return;
        };
        let (min, max) = (self.config.obstacles_min, self.config.obstacles_max);
        let count = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        let count = usize::try_from(count).unwrap_or(usize::MAX);

        let mut zones = self.zones.clone();
        zones.shuffle(&mut self.rng);
        let mut obstacles = Vec::with_capacity(count.min(zones.len()));
        for zone in zones.into_iter().take(count) {
            if let Some(prop) = catalog.choose(&mut self.rng) {
                obstacles.push(ObstaclePlacement {
                    zone,
                    prop: prop.clone(),
                });
            }
        }
        self.plan.obstacles = obstacles;
    }

    fn shuffled_zones(&mut self) -> Vec<ZoneId> {
        let mut zones = self.zones.clone();
        zones.shuffle(&mut self.rng);
        zones
    }
}
