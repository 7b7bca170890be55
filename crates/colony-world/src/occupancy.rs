//! Per-pass snapshot of what stands or is pending on each cell.
//!
//! Planning passes ask "is this cell blocked?" thousands of times. Asking
//! the [`WorldQuery`] each time would rescan every structure, so a pass
//! observes the zone once into an [`Occupancy`] and queries that.

use std::collections::BTreeMap;

use colony_types::{ObservedSite, ObservedStructure, Position, SiteId, StructureKind, ZoneId};

use crate::services::WorldQuery;

/// One structure standing on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStructure {
    /// Kind of the structure.
    pub kind: StructureKind,
    /// Whether the zone owner owns it.
    pub owned: bool,
}

/// Structures and pending sites indexed by cell.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    structures: BTreeMap<Position, Vec<CellStructure>>,
    sites: BTreeMap<Position, (StructureKind, SiteId)>,
}

impl Occupancy {
    /// Observe the zone once through the world query.
    pub fn observe(world: &dyn WorldQuery, zone: &ZoneId) -> Self {
        Self::from_parts(&world.structures(zone), &world.construction_sites(zone))
    }

    /// Build from already-fetched structure and site lists.
    pub fn from_parts(structures: &[ObservedStructure], sites: &[ObservedSite]) -> Self {
        let mut occupancy = Self::default();
        for s in structures {
            occupancy
                .structures
                .entry(s.position)
                .or_default()
                .push(CellStructure {
                    kind: s.kind,
                    owned: s.owned,
                });
        }
        for site in sites {
            occupancy
                .sites
                .insert(site.position, (site.kind, site.id.clone()));
        }
        occupancy
    }

    /// Structures standing at a cell.
    pub fn structures_at(&self, position: Position) -> &[CellStructure] {
        self.structures
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether a structure of `kind` stands at the cell.
    pub fn has_structure(&self, position: Position, kind: StructureKind) -> bool {
        self.structures_at(position).iter().any(|s| s.kind == kind)
    }

    /// Whether a built road covers the cell.
    pub fn has_road(&self, position: Position) -> bool {
        self.has_structure(position, StructureKind::Road)
    }

    /// Pending site at the cell, if any.
    pub fn site_at(&self, position: Position) -> Option<(StructureKind, &SiteId)> {
        self.sites.get(&position).map(|(kind, id)| (*kind, id))
    }

    /// Whether a pending site of `kind` sits at the cell.
    pub fn has_site(&self, position: Position, kind: StructureKind) -> bool {
        self.site_at(position).is_some_and(|(k, _)| k == kind)
    }

    /// Whether the cell holds a structure that blocks new construction
    /// (anything other than a road, container or rampart) or any pending
    /// site.
    pub fn is_blocked(&self, position: Position) -> bool {
        self.sites.contains_key(&position)
            || self
                .structures_at(position)
                .iter()
                .any(|s| !s.kind.is_overlay())
    }

    /// Number of standing structures of `kind`.
    pub fn count(&self, kind: StructureKind) -> u32 {
        let total = self
            .structures
            .values()
            .flatten()
            .filter(|s| s.kind == kind)
            .count();
        u32::try_from(total).unwrap_or(u32::MAX)
    }

    /// Positions of standing structures of `kind`, row-major.
    pub fn positions_of(&self, kind: StructureKind) -> Vec<Position> {
        self.structures
            .iter()
            .filter(|(_, list)| list.iter().any(|s| s.kind == kind))
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Positions of pending sites of `kind`, row-major.
    pub fn sites_of(&self, kind: StructureKind) -> Vec<Position> {
        self.sites
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Number of pending construction sites.
    pub fn pending_sites(&self) -> usize {
        self.sites.len()
    }

    /// Every occupied cell with its structures.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &[CellStructure])> {
        self.structures.iter().map(|(p, list)| (*p, list.as_slice()))
    }
}
