//! Enumeration types for the colony planner.

use serde::{Deserialize, Serialize};

use crate::grid::Tier;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Natural terrain of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground, traversal cost 1.
    Plain,
    /// Impassable natural wall.
    Wall,
    /// Passable but slow ground, traversal cost 5.
    Swamp,
}

impl Terrain {
    /// Whether units can stand on this terrain.
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

// ---------------------------------------------------------------------------
// Structure kinds
// ---------------------------------------------------------------------------

/// A kind of structure that can be planned and built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Produces units. The zone's primary anchor.
    Spawn,
    /// Extra energy capacity for spawning.
    Extension,
    /// Cheap traversal surface.
    Road,
    /// Passive storage next to sources, controller and mineral.
    Container,
    /// Defensive and repair turret.
    Tower,
    /// Central bulk storage.
    Storage,
    /// Remote energy transfer node.
    Link,
    /// Inter-zone trade hub.
    Terminal,
    /// Mineral reaction chamber.
    Lab,
    /// Harvests the mineral deposit; sits on top of it.
    Extractor,
    /// Commodity production.
    Factory,
    /// Long-range scouting.
    Observer,
    /// Processes power.
    PowerSpawn,
    /// Strategic launcher.
    Nuker,
    /// Protective shell over another cell.
    Rampart,
    /// Constructed barrier.
    Wall,
}

impl StructureKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Spawn,
        Self::Extension,
        Self::Road,
        Self::Container,
        Self::Tower,
        Self::Storage,
        Self::Link,
        Self::Terminal,
        Self::Lab,
        Self::Extractor,
        Self::Factory,
        Self::Observer,
        Self::PowerSpawn,
        Self::Nuker,
        Self::Rampart,
        Self::Wall,
    ];

    /// The lowest tier at which at least one of this kind may exist.
    pub const fn min_tier(self) -> Tier {
        let level = match self {
            Self::Spawn | Self::Road => 1,
            Self::Extension | Self::Rampart | Self::Wall => 2,
            Self::Container | Self::Tower => 3,
            Self::Storage => 4,
            Self::Link => 5,
            Self::Terminal | Self::Lab | Self::Extractor => 6,
            Self::Factory => 7,
            Self::Observer | Self::PowerSpawn | Self::Nuker => 8,
        };
        Tier::clamped(level)
    }

    /// Base construction priority; higher builds sooner.
    pub const fn base_priority(self) -> u32 {
        match self {
            Self::Spawn => 100,
            Self::Tower => 90,
            Self::Storage => 85,
            Self::Extension => 80,
            Self::Container => 70,
            Self::Terminal => 65,
            Self::Link => 60,
            Self::Lab => 50,
            Self::Extractor => 45,
            Self::Factory => 40,
            Self::PowerSpawn => 35,
            Self::Observer => 30,
            Self::Nuker => 20,
            Self::Road => 10,
            Self::Rampart | Self::Wall => 5,
        }
    }

    /// Whether units can walk over a built structure of this kind.
    ///
    /// Ramparts are only walkable for their owner; callers check ownership.
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Road | Self::Container | Self::Rampart)
    }

    /// Whether this kind may share a cell with a road or other structure
    /// without blocking placement.
    pub const fn is_overlay(self) -> bool {
        matches!(self, Self::Road | Self::Container | Self::Rampart)
    }
}

// ---------------------------------------------------------------------------
// Plan status
// ---------------------------------------------------------------------------

/// Lifecycle of a zone plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Being (re)computed.
    Planning,
    /// Computed; nothing placed yet.
    Ready,
    /// Some entries placed, some pending.
    Building,
    /// Every entry placed.
    Complete,
}

// ---------------------------------------------------------------------------
// Road path kinds
// ---------------------------------------------------------------------------

/// Why a road segment exists, by the endpoint of the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Spawn to energy source.
    Source,
    /// Spawn to controller.
    Controller,
    /// Spawn to mineral deposit.
    Mineral,
    /// Spawn to a zone exit.
    Exit,
    /// High-traffic cell with no structural path.
    Internal,
}

impl PathKind {
    /// Base priority contributed by this path kind.
    pub const fn priority(self) -> u32 {
        match self {
            Self::Source => 100,
            Self::Controller => 90,
            Self::Mineral => 70,
            Self::Exit => 60,
            Self::Internal => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_are_not_walkable() {
        assert!(Terrain::Plain.is_walkable());
        assert!(Terrain::Swamp.is_walkable());
        assert!(!Terrain::Wall.is_walkable());
    }

    #[test]
    fn min_tiers_match_unlock_order() {
        assert_eq!(StructureKind::Spawn.min_tier().level(), 1);
        assert_eq!(StructureKind::Extension.min_tier().level(), 2);
        assert_eq!(StructureKind::Container.min_tier().level(), 3);
        assert_eq!(StructureKind::Terminal.min_tier().level(), 6);
        assert_eq!(StructureKind::Nuker.min_tier().level(), 8);
    }

    #[test]
    fn path_kind_priorities_descend() {
        assert!(PathKind::Source.priority() > PathKind::Controller.priority());
        assert!(PathKind::Controller.priority() > PathKind::Mineral.priority());
        assert!(PathKind::Mineral.priority() > PathKind::Exit.priority());
        assert!(PathKind::Exit.priority() > PathKind::Internal.priority());
    }

    #[test]
    fn all_lists_every_kind_once() {
        let mut kinds = StructureKind::ALL.to_vec();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), StructureKind::ALL.len());
    }
}
