//! Terrain analysis: cell classification, key positions, and the central
//! build anchor.
//!
//! [`analyze`] is the only full-grid scan in the crate. It reads all 2,500
//! cells through the [`WorldQuery`], locates exits and key objects, and
//! derives the anchor from which layout templates are resolved. The result
//! is a plain [`TerrainAnalysis`] record that callers cache with a TTL (see
//! [`crate::cache::TtlCache`]); a stale analysis is acceptable.
//!
//! # Anchor selection
//!
//! [`central_area`] takes the weighted centroid of the controller (weight 2)
//! and sources (weight 1 each). If that cell is a wall it searches rings of
//! Chebyshev radius 1..=10 for the first walkable cell, and falls back to
//! the geometric center when nothing is found.

use colony_types::{
    CELL_COUNT, KeyPositions, Position, StructureKind, Terrain, ZoneId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::occupancy::Occupancy;
use crate::services::WorldQuery;

/// Maximum ring radius searched around the centroid for a walkable anchor.
pub const ANCHOR_SEARCH_RADIUS: u8 = 10;

/// Minimum share of walkable neighbors (in percent) required around bulky
/// structures.
pub const MIN_OPEN_NEIGHBOR_PERCENT: usize = 60;

// ---------------------------------------------------------------------------
// Terrain grid
// ---------------------------------------------------------------------------

/// Terrain of every cell in a zone.
///
/// Serialized as a 2,500-character string (`p` plain, `w` wall, `s` swamp),
/// row-major, to keep persisted blobs small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TerrainGrid {
    cells: Vec<Terrain>,
}

impl TerrainGrid {
    /// A grid where every cell has the same terrain.
    pub fn filled(terrain: Terrain) -> Self {
        Self {
            cells: vec![terrain; CELL_COUNT],
        }
    }

    /// Terrain at a cell. Missing cells read as walls.
    pub fn get(&self, position: Position) -> Terrain {
        self.cells
            .get(position.index())
            .copied()
            .unwrap_or(Terrain::Wall)
    }

    /// Overwrite the terrain at a cell.
    pub fn set(&mut self, position: Position, terrain: Terrain) {
        if let Some(cell) = self.cells.get_mut(position.index()) {
            *cell = terrain;
        }
    }

    /// Whether units can stand on the cell.
    pub fn is_walkable(&self, position: Position) -> bool {
        self.get(position).is_walkable()
    }

    /// Walkable cells among the up-to-8 neighbors.
    pub fn walkable_neighbors(&self, position: Position) -> usize {
        position
            .neighbors()
            .filter(|n| self.is_walkable(*n))
            .count()
    }

    /// Walkable cells in the 3x3 block centered on `position`, including
    /// the cell itself.
    pub fn walkable_in_block(&self, position: Position) -> usize {
        position
            .within(1)
            .filter(|n| self.is_walkable(*n))
            .count()
    }

    /// Number of cells with the given terrain.
    pub fn count(&self, terrain: Terrain) -> usize {
        self.cells.iter().filter(|t| **t == terrain).count()
    }
}

impl From<TerrainGrid> for String {
    fn from(grid: TerrainGrid) -> Self {
        grid.cells
            .iter()
            .map(|t| match t {
                Terrain::Plain => 'p',
                Terrain::Wall => 'w',
                Terrain::Swamp => 's',
            })
            .collect()
    }
}

impl TryFrom<String> for TerrainGrid {
    type Error = WorldError;

    fn try_from(encoded: String) -> Result<Self, Self::Error> {
        let cells = encoded
            .chars()
            .map(|c| match c {
                'p' => Ok(Terrain::Plain),
                'w' => Ok(Terrain::Wall),
                's' => Ok(Terrain::Swamp),
                other => Err(WorldError::MalformedTerrain {
                    reason: format!("unknown terrain code {other:?}"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if cells.len() != CELL_COUNT {
            return Err(WorldError::MalformedTerrain {
                reason: format!("expected {CELL_COUNT} cells, found {}", cells.len()),
            });
        }
        Ok(Self { cells })
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Cached result of a full zone scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainAnalysis {
    /// Per-cell terrain.
    pub terrain: TerrainGrid,
    /// Sources, controller, mineral, spawns, exits.
    pub key_positions: KeyPositions,
    /// Central build anchor.
    pub anchor: Position,
    /// Tick the scan ran.
    pub last_analyzed: u64,
}

/// Scan every cell of the zone and derive key positions and the anchor.
///
/// # Errors
///
/// Propagates the first [`WorldError`] the world query reports. Callers skip
/// the zone for this tick and retry on the next cadence.
pub fn analyze(
    world: &dyn WorldQuery,
    zone: &ZoneId,
    tick: u64,
) -> Result<TerrainAnalysis, WorldError> {
    let mut terrain = TerrainGrid::filled(Terrain::Wall);
    for position in Position::all() {
        terrain.set(position, world.terrain_at(zone, position)?);
    }

    let key_positions = key_positions(world, zone, &terrain);
    let anchor = central_area(&terrain, &key_positions);

    debug!(
        %zone,
        tick,
        walls = terrain.count(Terrain::Wall),
        swamps = terrain.count(Terrain::Swamp),
        exits = key_positions.exits.len(),
        %anchor,
        "Terrain analyzed"
    );

    Ok(TerrainAnalysis {
        terrain,
        key_positions,
        anchor,
        last_analyzed: tick,
    })
}

/// Collect the zone's key positions.
///
/// Spawn-equivalents are standing spawns plus pending spawn sites, in
/// row-major order.
pub fn key_positions(world: &dyn WorldQuery, zone: &ZoneId, terrain: &TerrainGrid) -> KeyPositions {
    let occupancy = Occupancy::observe(world, zone);
    let mut spawns = occupancy.positions_of(StructureKind::Spawn);
    for site in world.construction_sites(zone) {
        if site.kind == StructureKind::Spawn && !spawns.contains(&site.position) {
            spawns.push(site.position);
        }
    }
    spawns.sort();

    let mut sources = world.sources(zone);
    sources.sort();

    KeyPositions {
        sources,
        controller: world.controller(zone),
        mineral: world.mineral(zone),
        spawns,
        exits: exits(terrain),
    }
}

/// Non-wall border cells, row-major.
pub fn exits(terrain: &TerrainGrid) -> Vec<Position> {
    Position::all()
        .filter(|p| p.is_border() && terrain.is_walkable(*p))
        .collect()
}

/// Weighted centroid of controller and sources, snapped to walkable ground.
pub fn central_area(terrain: &TerrainGrid, keys: &KeyPositions) -> Position {
    let centroid = weighted_centroid(keys);
    if terrain.is_walkable(centroid) {
        return centroid;
    }
    (1..=ANCHOR_SEARCH_RADIUS)
        .find_map(|radius| centroid.ring(radius).find(|p| terrain.is_walkable(*p)))
        .unwrap_or(Position::CENTER)
}

/// Controller weighs 2, each source 1; geometric center when neither exists.
fn weighted_centroid(keys: &KeyPositions) -> Position {
    let mut sum_x: i32 = 0;
    let mut sum_y: i32 = 0;
    let mut weight: i32 = 0;

    let weighted = keys
        .controller
        .map(|c| (c, 2))
        .into_iter()
        .chain(keys.sources.iter().map(|s| (*s, 1)));
    for (pos, w) in weighted {
        sum_x = sum_x.saturating_add(i32::from(pos.x).saturating_mul(w));
        sum_y = sum_y.saturating_add(i32::from(pos.y).saturating_mul(w));
        weight = weight.saturating_add(w);
    }

    if weight == 0 {
        return Position::CENTER;
    }
    Position::from_signed(round_div(sum_x, weight), round_div(sum_y, weight))
        .unwrap_or(Position::CENTER)
}

/// Integer division of non-negative values rounded half up.
fn round_div(numerator: i32, denominator: i32) -> i32 {
    numerator
        .saturating_mul(2)
        .saturating_add(denominator)
        .checked_div(denominator.saturating_mul(2))
        .unwrap_or(0)
}

/// Walkable cells within Chebyshev `radius` of `center`, row-major.
pub fn buildable_area(terrain: &TerrainGrid, center: Position, radius: u8) -> Vec<Position> {
    center
        .within(radius)
        .filter(|p| terrain.is_walkable(*p))
        .collect()
}

/// Whether `kind` may be planned at `position`.
///
/// Walls never qualify. Cells holding a blocking structure or a pending
/// site do not qualify. Spawns, towers, storage and terminals also need at
/// least 60% of their 8 neighbors walkable; off-grid neighbors count as
/// blocked.
pub fn suitable_for(
    terrain: &TerrainGrid,
    occupancy: &Occupancy,
    position: Position,
    kind: StructureKind,
) -> bool {
    if !terrain.is_walkable(position) || occupancy.is_blocked(position) {
        return false;
    }
    if needs_open_surroundings(kind) {
        let open = terrain.walkable_neighbors(position);
        return open.saturating_mul(100) >= MIN_OPEN_NEIGHBOR_PERCENT.saturating_mul(8);
    }
    true
}

const fn needs_open_surroundings(kind: StructureKind) -> bool {
    matches!(
        kind,
        StructureKind::Spawn
            | StructureKind::Tower
            | StructureKind::Storage
            | StructureKind::Terminal
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_types::{ObservedStructure, StructureId};

    use super::*;
    use crate::sandbox::SandboxWorld;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn zone() -> ZoneId {
        ZoneId::new("W1N1")
    }

    // -----------------------------------------------------------------------
    // Grid encoding
    // -----------------------------------------------------------------------

    #[test]
    fn grid_round_trips_through_string() {
        let mut grid = TerrainGrid::filled(Terrain::Plain);
        grid.set(pos(3, 4), Terrain::Wall);
        grid.set(pos(4, 4), Terrain::Swamp);
        let encoded: String = grid.clone().into();
        assert_eq!(encoded.len(), CELL_COUNT);
        let decoded = TerrainGrid::try_from(encoded).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn grid_rejects_bad_length_and_codes() {
        assert!(TerrainGrid::try_from(String::from("ppp")).is_err());
        let bad = "x".repeat(CELL_COUNT);
        assert!(TerrainGrid::try_from(bad).is_err());
    }

    #[test]
    fn walkable_block_counts_self() {
        let mut grid = TerrainGrid::filled(Terrain::Plain);
        grid.set(pos(10, 9), Terrain::Wall);
        assert_eq!(grid.walkable_in_block(pos(10, 10)), 8);
        assert_eq!(grid.walkable_neighbors(pos(10, 10)), 7);
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    #[test]
    fn analyze_finds_exits_and_keys() {
        let mut world = SandboxWorld::new();
        world.add_zone(zone(), TerrainGrid::filled(Terrain::Plain), 1);
        world.set_sources(&zone(), vec![pos(10, 10), pos(40, 10)]);
        world.set_controller(&zone(), Some(pos(25, 40)));

        let analysis = analyze(&world, &zone(), 7).unwrap();
        assert_eq!(analysis.last_analyzed, 7);
        // 4 sides of 50 minus the 4 shared corners.
        assert_eq!(analysis.key_positions.exits.len(), 196);
        assert_eq!(analysis.key_positions.sources.len(), 2);
        // (10 + 40 + 2*25) / 4 = 25, (10 + 10 + 2*40) / 4 = 25
        assert_eq!(analysis.anchor, pos(25, 25));
    }

    #[test]
    fn analyze_propagates_invisible_zone() {
        let world = SandboxWorld::new();
        assert!(matches!(
            analyze(&world, &zone(), 0),
            Err(WorldError::ZoneNotVisible(_))
        ));
    }

    #[test]
    fn centroid_rounds_half_up() {
        let keys = KeyPositions {
            sources: vec![pos(10, 10)],
            controller: Some(pos(11, 11)),
            ..KeyPositions::default()
        };
        // (10 + 22) / 3 = 10.67 -> 11
        assert_eq!(weighted_centroid(&keys), pos(11, 11));
    }

    #[test]
    fn central_area_defaults_to_center_without_keys() {
        let grid = TerrainGrid::filled(Terrain::Plain);
        assert_eq!(central_area(&grid, &KeyPositions::default()), Position::CENTER);
    }

    #[test]
    fn central_area_steps_off_walls() {
        let mut grid = TerrainGrid::filled(Terrain::Plain);
        for p in pos(20, 20).within(1) {
            grid.set(p, Terrain::Wall);
        }
        let keys = KeyPositions {
            controller: Some(pos(20, 20)),
            ..KeyPositions::default()
        };
        let anchor = central_area(&grid, &keys);
        assert_eq!(anchor.distance_to(pos(20, 20)), 2);
        assert!(grid.is_walkable(anchor));
    }

    #[test]
    fn central_area_falls_back_when_boxed_in() {
        let mut grid = TerrainGrid::filled(Terrain::Wall);
        grid.set(pos(45, 45), Terrain::Plain);
        let keys = KeyPositions {
            controller: Some(pos(5, 5)),
            ..KeyPositions::default()
        };
        assert_eq!(central_area(&grid, &keys), Position::CENTER);
    }

    // -----------------------------------------------------------------------
    // Suitability
    // -----------------------------------------------------------------------

    #[test]
    fn buildable_area_skips_walls() {
        let mut grid = TerrainGrid::filled(Terrain::Plain);
        grid.set(pos(11, 10), Terrain::Wall);
        let area = buildable_area(&grid, pos(10, 10), 1);
        assert_eq!(area.len(), 8);
        assert!(!area.contains(&pos(11, 10)));
    }

    #[test]
    fn bulky_structures_need_open_neighbors() {
        let mut grid = TerrainGrid::filled(Terrain::Plain);
        // Wall off 4 of 8 neighbors: 50% open.
        for p in [pos(9, 9), pos(10, 9), pos(11, 9), pos(9, 10)] {
            grid.set(p, Terrain::Wall);
        }
        let occ = Occupancy::default();
        assert!(!suitable_for(&grid, &occ, pos(10, 10), StructureKind::Tower));
        assert!(suitable_for(&grid, &occ, pos(10, 10), StructureKind::Extension));
    }

    #[test]
    fn blocked_cells_are_unsuitable_but_roads_are_not() {
        let grid = TerrainGrid::filled(Terrain::Plain);
        let occ = Occupancy::from_parts(
            &[
                ObservedStructure {
                    id: StructureId::new("r"),
                    kind: StructureKind::Road,
                    position: pos(5, 5),
                    owned: true,
                },
                ObservedStructure {
                    id: StructureId::new("e"),
                    kind: StructureKind::Extension,
                    position: pos(6, 5),
                    owned: true,
                },
            ],
            &[],
        );
        assert!(suitable_for(&grid, &occ, pos(5, 5), StructureKind::Extension));
        assert!(!suitable_for(&grid, &occ, pos(6, 5), StructureKind::Extension));
    }
}
