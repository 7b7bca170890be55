//! Host service seams.
//!
//! The planner never talks to the game directly. Everything it observes or
//! mutates goes through one of these traits, so tests and the simulation
//! harness can substitute an in-memory world (see [`crate::sandbox`]).
//!
//! - [`WorldQuery`] -- terrain, standing structures, pending sites, key
//!   objects
//! - [`ZoneController`] -- tier, capacity, ownership
//! - [`ConstructionExecutor`] -- places construction sites
//! - [`Pathfinder`] -- opaque path search over a [`CostGrid`]

use colony_types::{
    ObservedSite, ObservedStructure, Position, SiteId, StructureKind, Terrain, Tier, ZoneId,
};

use crate::cost_grid::CostGrid;
use crate::error::{PlacementError, WorldError};

/// Read-only view of the live world.
pub trait WorldQuery {
    /// Terrain of a single cell.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZoneNotVisible`] or
    /// [`WorldError::TerrainUnavailable`] when the host cannot answer.
    fn terrain_at(&self, zone: &ZoneId, position: Position) -> Result<Terrain, WorldError>;

    /// Every standing structure in the zone.
    fn structures(&self, zone: &ZoneId) -> Vec<ObservedStructure>;

    /// Every pending construction site in the zone.
    fn construction_sites(&self, zone: &ZoneId) -> Vec<ObservedSite>;

    /// Energy source positions.
    fn sources(&self, zone: &ZoneId) -> Vec<Position>;

    /// Controller position, if the zone has one.
    fn controller(&self, zone: &ZoneId) -> Option<Position>;

    /// Mineral deposit position, if the zone has one.
    fn mineral(&self, zone: &ZoneId) -> Option<Position>;

    /// Structures standing within Chebyshev `radius` of `center`.
    fn structures_in_range(
        &self,
        zone: &ZoneId,
        center: Position,
        radius: u8,
    ) -> Vec<ObservedStructure> {
        self.structures(zone)
            .into_iter()
            .filter(|s| s.position.distance_to(center) <= radius)
            .collect()
    }
}

/// The zone's development state as seen by the host.
pub trait ZoneController {
    /// Current tier, or `None` if the zone is not owned.
    fn tier(&self, zone: &ZoneId) -> Option<Tier>;

    /// Energy available for spawning at full capacity.
    fn energy_capacity(&self, zone: &ZoneId) -> u32;

    /// Whether the bot owns the zone.
    fn is_owned(&self, zone: &ZoneId) -> bool {
        self.tier(zone).is_some()
    }
}

/// Places construction sites in the world.
pub trait ConstructionExecutor {
    /// Attempt to place a site for `kind` at `position`.
    ///
    /// On success returns the host's correlation id for the site, if it
    /// issues one.
    ///
    /// # Errors
    ///
    /// Returns the [`PlacementError`] the host reported.
    fn try_place(
        &mut self,
        zone: &ZoneId,
        position: Position,
        kind: StructureKind,
    ) -> Result<Option<SiteId>, PlacementError>;
}

/// Outcome of a path search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResult {
    /// Cells from the first step after `from` to the last reached cell.
    pub path: Vec<Position>,
    /// `true` when the search gave up before reaching the target.
    pub incomplete: bool,
}

/// Opaque path search service.
pub trait Pathfinder {
    /// Find a path from `from` to a cell adjacent to or on `to`, using
    /// `costs` for traversal.
    fn find_path(&self, from: Position, to: Position, costs: &CostGrid) -> PathResult;
}
