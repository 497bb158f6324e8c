//! Level content observed by the session: delivery targets and prop zones.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a delivery target placed by level content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Identity of a prop placement zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPosition {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub id: TargetId,
    pub position: WorldPosition,
}

/// Enumerable content the core reads at day start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    #[serde(default)]
    pub targets: Vec<DeliveryTarget>,
    #[serde(default)]
    pub placement_zones: Vec<ZoneId>,
}

impl World {
    /// Build a world from target positions, numbering targets in order.
    #[must_use]
    pub fn from_positions(positions: &[WorldPosition], zone_count: u32) -> Self {
        let targets = positions
            .iter()
            .zip(0_u32..)
            .map(|(position, index)| DeliveryTarget {
                id: TargetId(index),
                position: *position,
            })
            .collect();
        Self {
            targets,
            placement_zones: (0..zone_count).map(ZoneId).collect(),
        }
    }

    #[must_use]
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(|target| target.id).collect()
    }

    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<&DeliveryTarget> {
        self.targets.iter().find(|target| target.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_positions_numbers_targets_and_zones() {
        let world = World::from_positions(
            &[
                WorldPosition::new(0.0, 0.0, 4.0),
                WorldPosition::new(12.0, 0.0, -3.0),
            ],
            3,
        );
        assert_eq!(world.target_ids(), vec![TargetId(0), TargetId(1)]);
        assert_eq!(world.placement_zones.len(), 3);
        let second = world.target(TargetId(1)).expect("second target");
        assert!((second.position.x - 12.0).abs() < f32::EPSILON);
        assert!(world.target(TargetId(9)).is_none());
    }
}
