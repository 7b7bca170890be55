//! In-memory world implementing every host service trait.
//!
//! The [`SandboxWorld`] backs the unit tests, the planner's integration
//! tests and the simulation binary. It enforces the same placement rules a
//! host would: ownership, terrain, occupancy, per-tier ceilings and a
//! world-wide pending site cap.

use std::collections::BTreeMap;

use colony_types::{
    ObservedSite, ObservedStructure, Position, SiteId, StructureId, StructureKind, Terrain, Tier,
    ZoneId,
};
use tracing::debug;

use crate::catalog;
use crate::error::{PlacementError, WorldError};
use crate::services::{ConstructionExecutor, WorldQuery, ZoneController};
use crate::terrain::TerrainGrid;

/// Default world-wide cap on pending construction sites.
pub const DEFAULT_SITE_CAP: usize = 100;

/// Energy capacity contributed by each spawn.
const SPAWN_CAPACITY: u32 = 300;

/// Energy capacity contributed by each extension.
const EXTENSION_CAPACITY: u32 = 50;

#[derive(Debug, Clone)]
struct SandboxZone {
    terrain: TerrainGrid,
    tier: Option<Tier>,
    visible: bool,
    sources: Vec<Position>,
    controller: Option<Position>,
    mineral: Option<Position>,
    structures: BTreeMap<StructureId, ObservedStructure>,
    sites: BTreeMap<SiteId, ObservedSite>,
}

impl SandboxZone {
    fn count(&self, kind: StructureKind) -> usize {
        let built = self.structures.values().filter(|s| s.kind == kind).count();
        let pending = self.sites.values().filter(|s| s.kind == kind).count();
        built.saturating_add(pending)
    }

    fn is_key_object(&self, position: Position) -> bool {
        self.sources.contains(&position)
            || self.controller == Some(position)
            || self.mineral == Some(position)
    }
}

/// A world held entirely in memory.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    zones: BTreeMap<ZoneId, SandboxZone>,
    site_cap: usize,
    next_id: u64,
    placements: Vec<(ZoneId, Position, StructureKind)>,
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxWorld {
    /// An empty world with the default site cap.
    pub const fn new() -> Self {
        Self {
            zones: BTreeMap::new(),
            site_cap: DEFAULT_SITE_CAP,
            next_id: 0,
            placements: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Add a visible zone. A `tier` of 0 means the zone is not owned.
    pub fn add_zone(&mut self, zone: ZoneId, terrain: TerrainGrid, tier: u8) {
        self.zones.insert(
            zone,
            SandboxZone {
                terrain,
                tier: Tier::new(tier),
                visible: true,
                sources: Vec::new(),
                controller: None,
                mineral: None,
                structures: BTreeMap::new(),
                sites: BTreeMap::new(),
            },
        );
    }

    /// Set the zone's tier. A `tier` of 0 releases ownership.
    pub fn set_tier(&mut self, zone: &ZoneId, tier: u8) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.tier = Tier::new(tier);
        }
    }

    /// Hide or reveal a zone. Hidden zones fail terrain reads.
    pub fn set_visible(&mut self, zone: &ZoneId, visible: bool) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.visible = visible;
        }
    }

    /// Replace the zone's energy sources.
    pub fn set_sources(&mut self, zone: &ZoneId, sources: Vec<Position>) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.sources = sources;
        }
    }

    /// Set or clear the zone's controller.
    pub fn set_controller(&mut self, zone: &ZoneId, controller: Option<Position>) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.controller = controller;
        }
    }

    /// Set or clear the zone's mineral deposit.
    pub fn set_mineral(&mut self, zone: &ZoneId, mineral: Option<Position>) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.mineral = mineral;
        }
    }

    /// Overwrite the terrain of one cell.
    pub fn set_terrain(&mut self, zone: &ZoneId, position: Position, terrain: Terrain) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.terrain.set(position, terrain);
        }
    }

    /// Change the world-wide pending site cap.
    pub const fn set_site_cap(&mut self, cap: usize) {
        self.site_cap = cap;
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id = self.next_id.saturating_add(1);
        format!("{prefix}-{}", self.next_id)
    }

    // -----------------------------------------------------------------------
    // World mutation
    // -----------------------------------------------------------------------

    /// Stand a finished, owned structure on a cell, bypassing every
    /// placement rule.
    pub fn add_structure(
        &mut self,
        zone: &ZoneId,
        kind: StructureKind,
        position: Position,
    ) -> Option<StructureId> {
        let id = StructureId::new(self.next_id("structure"));
        let z = self.zones.get_mut(zone)?;
        z.structures.insert(
            id.clone(),
            ObservedStructure {
                id: id.clone(),
                kind,
                position,
                owned: true,
            },
        );
        Some(id)
    }

    /// Add a pending site, bypassing every placement rule.
    pub fn add_site(
        &mut self,
        zone: &ZoneId,
        kind: StructureKind,
        position: Position,
    ) -> Option<SiteId> {
        let id = SiteId::new(self.next_id("site"));
        let z = self.zones.get_mut(zone)?;
        z.sites.insert(
            id.clone(),
            ObservedSite {
                id: id.clone(),
                kind,
                position,
            },
        );
        Some(id)
    }

    /// Remove the structure of `kind` at a cell. Returns whether one existed.
    pub fn remove_structure(
        &mut self,
        zone: &ZoneId,
        kind: StructureKind,
        position: Position,
    ) -> bool {
        let Some(z) = self.zones.get_mut(zone) else {
            return false;
        };
        let before = z.structures.len();
        z.structures
            .retain(|_, s| !(s.kind == kind && s.position == position));
        z.structures.len() < before
    }

    /// Remove a structure by id.
    pub fn remove_structure_by_id(&mut self, zone: &ZoneId, id: &StructureId) -> bool {
        self.zones
            .get_mut(zone)
            .is_some_and(|z| z.structures.remove(id).is_some())
    }

    /// Turn one pending site into a finished structure.
    pub fn complete_site(&mut self, zone: &ZoneId, site: &SiteId) -> Option<StructureId> {
        let finished = self.zones.get_mut(zone)?.sites.remove(site)?;
        self.add_structure(zone, finished.kind, finished.position)
    }

    /// Turn every pending site in the zone into a finished structure.
    /// Returns how many completed.
    pub fn complete_sites(&mut self, zone: &ZoneId) -> usize {
        let ids: Vec<SiteId> = self
            .zones
            .get(zone)
            .map(|z| z.sites.keys().cloned().collect())
            .unwrap_or_default();
        ids.iter()
            .filter(|id| self.complete_site(zone, id).is_some())
            .count()
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every successful `try_place` call, in order.
    pub fn placements(&self) -> &[(ZoneId, Position, StructureKind)] {
        &self.placements
    }

    /// Forget the placement log.
    pub fn clear_placements(&mut self) {
        self.placements.clear();
    }

    /// Standing structures plus pending sites of `kind` in the zone.
    pub fn count(&self, zone: &ZoneId, kind: StructureKind) -> usize {
        self.zones.get(zone).map_or(0, |z| z.count(kind))
    }

    /// Pending sites across every zone.
    pub fn total_sites(&self) -> usize {
        self.zones.values().map(|z| z.sites.len()).sum()
    }

    /// Terrain grid of a zone.
    pub fn terrain(&self, zone: &ZoneId) -> Option<&TerrainGrid> {
        self.zones.get(zone).map(|z| &z.terrain)
    }

    fn check_placement(
        &self,
        zone: &ZoneId,
        position: Position,
        kind: StructureKind,
    ) -> Result<(), PlacementError> {
        let Some((z, tier)) = self
            .zones
            .get(zone)
            .and_then(|z| z.tier.map(|tier| (z, tier)))
        else {
            return Err(PlacementError::Unauthorized(zone.clone()));
        };

        let on_mineral = z.mineral == Some(position);
        let misplaced = if kind == StructureKind::Extractor {
            !on_mineral
        } else {
            z.is_key_object(position)
                || !position.is_interior()
                || z.terrain.get(position) == Terrain::Wall
        };
        if misplaced {
            return Err(PlacementError::Invalid { kind, position });
        }

        let conflict = z.sites.values().any(|s| s.position == position)
            || z
                .structures
                .values()
                .any(|s| s.position == position && !can_stack(s.kind, kind));
        if conflict {
            return Err(PlacementError::Occupied(position));
        }

        let ceiling = usize::try_from(catalog::limit(kind, tier)).unwrap_or(usize::MAX);
        if z.count(kind) >= ceiling {
            return Err(PlacementError::TierTooLow { kind, tier });
        }

        if self.total_sites() >= self.site_cap {
            return Err(PlacementError::SiteCapReached);
        }
        Ok(())
    }
}

/// Whether `new` may be built on a cell already holding `existing`.
fn can_stack(existing: StructureKind, new: StructureKind) -> bool {
    use StructureKind::{Container, Rampart, Road};
    existing != new
        && (existing == Rampart
            || new == Rampart
            || (matches!(existing, Road | Container) && matches!(new, Road | Container)))
}

impl WorldQuery for SandboxWorld {
    fn terrain_at(&self, zone: &ZoneId, position: Position) -> Result<Terrain, WorldError> {
        match self.zones.get(zone) {
            Some(z) if z.visible => Ok(z.terrain.get(position)),
            _ => Err(WorldError::ZoneNotVisible(zone.clone())),
        }
    }

    fn structures(&self, zone: &ZoneId) -> Vec<ObservedStructure> {
        self.zones
            .get(zone)
            .map(|z| z.structures.values().cloned().collect())
            .unwrap_or_default()
    }

    fn construction_sites(&self, zone: &ZoneId) -> Vec<ObservedSite> {
        self.zones
            .get(zone)
            .map(|z| z.sites.values().cloned().collect())
            .unwrap_or_default()
    }

    fn sources(&self, zone: &ZoneId) -> Vec<Position> {
        self.zones
            .get(zone)
            .map(|z| z.sources.clone())
            .unwrap_or_default()
    }

    fn controller(&self, zone: &ZoneId) -> Option<Position> {
        self.zones.get(zone)?.controller
    }

    fn mineral(&self, zone: &ZoneId) -> Option<Position> {
        self.zones.get(zone)?.mineral
    }
}

impl ZoneController for SandboxWorld {
    fn tier(&self, zone: &ZoneId) -> Option<Tier> {
        self.zones.get(zone)?.tier
    }

    fn energy_capacity(&self, zone: &ZoneId) -> u32 {
        let Some(z) = self.zones.get(zone) else {
            return 0;
        };
        let count = |kind| {
            let n = z
                .structures
                .values()
                .filter(|s| s.kind == kind)
                .count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        count(StructureKind::Spawn)
            .saturating_mul(SPAWN_CAPACITY)
            .saturating_add(count(StructureKind::Extension).saturating_mul(EXTENSION_CAPACITY))
    }
}

impl ConstructionExecutor for SandboxWorld {
    fn try_place(
        &mut self,
        zone: &ZoneId,
        position: Position,
        kind: StructureKind,
    ) -> Result<Option<SiteId>, PlacementError> {
        self.check_placement(zone, position, kind)?;
        let id = self
            .add_site(zone, kind, position)
            .ok_or_else(|| PlacementError::Unauthorized(zone.clone()))?;
        self.placements.push((zone.clone(), position, kind));
        debug!(%zone, %position, ?kind, site = %id, "Sandbox site placed");
        Ok(Some(id))
    }
}
