//! Container placement next to sources, the controller and the mineral.
//!
//! Containers do not follow the template. Each target gets at most one
//! container on the best of its 8 neighbors, scored by
//!
//! ```text
//! 100 - 20 * [swamp] + 5 * (walkable cells in its 3x3) + max(0, 25 - dist(center))
//! ```
//!
//! Targets are served in order (sources, controller, mineral) until the
//! caller's cap is reached. A container already standing (or pending) next
//! to a target serves it and is planned in place.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use colony_types::{KeyPositions, PlannedStructure, Position, StructureKind, Terrain, Tier};
use colony_world::{Occupancy, TerrainGrid};
use tracing::debug;

/// Priority of a source container.
pub const SOURCE_PRIORITY: u32 = 90;
/// Priority of the controller container.
pub const CONTROLLER_PRIORITY: u32 = 80;
/// Priority of the mineral container.
pub const MINERAL_PRIORITY: u32 = 60;

const SOURCE_MIN_TIER: Tier = Tier::clamped(3);
const MINERAL_MIN_TIER: Tier = Tier::clamped(6);

/// One object that wants a container next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    label: &'static str,
    at: Position,
    priority: u32,
    min_tier: Tier,
}

fn targets(keys: &KeyPositions, tier: Tier) -> Vec<Target> {
    let sources = keys.sources.iter().map(|at| Target {
        label: "source",
        at: *at,
        priority: SOURCE_PRIORITY,
        min_tier: SOURCE_MIN_TIER,
    });
    let controller = keys.controller.map(|at| Target {
        label: "controller",
        at,
        priority: CONTROLLER_PRIORITY,
        min_tier: SOURCE_MIN_TIER,
    });
    let mineral = keys.mineral.map(|at| Target {
        label: "mineral",
        at,
        priority: MINERAL_PRIORITY,
        min_tier: MINERAL_MIN_TIER,
    });
    sources
        .chain(controller)
        .chain(mineral)
        .filter(|t| tier >= t.min_tier)
        .collect()
}

/// Plan up to `max` containers for the zone's key objects.
///
/// `claimed` holds cells already taken by other planned structures this
/// pass.
pub fn source_containers(
    terrain: &TerrainGrid,
    occupancy: &Occupancy,
    keys: &KeyPositions,
    tier: Tier,
    max: u32,
    claimed: &BTreeSet<Position>,
) -> Vec<PlannedStructure> {
    let cap = usize::try_from(max).unwrap_or(usize::MAX);
    let objects: BTreeSet<Position> = keys.objects().collect();
    let mut taken: BTreeSet<Position> = BTreeSet::new();
    let mut planned = Vec::new();

    for target in targets(keys, tier) {
        if planned.len() >= cap {
            break;
        }

        let existing: Vec<Position> = target
            .at
            .neighbors()
            .filter(|p| {
                occupancy.has_structure(*p, StructureKind::Container)
                    || occupancy.has_site(*p, StructureKind::Container)
            })
            .collect();
        if existing.iter().any(|p| taken.contains(p)) {
            continue;
        }

        let chosen = existing.first().copied().or_else(|| {
            best_cell(terrain, occupancy, target.at, |p| {
                !claimed.contains(&p) && !taken.contains(&p) && !objects.contains(&p)
            })
        });
        let Some(position) = chosen else {
            debug!(target = target.label, at = %target.at, "No valid container cell");
            continue;
        };

        taken.insert(position);
        planned.push(PlannedStructure {
            kind: StructureKind::Container,
            position,
            priority: target.priority,
            required_tier: target.min_tier,
            placed: false,
            site_id: None,
            reason: format!("{} container", target.label),
            rebuild: false,
        });
    }
    planned
}

/// Highest-scoring free neighbor of `target`; ties go to the first cell in
/// row-major order.
fn best_cell(
    terrain: &TerrainGrid,
    occupancy: &Occupancy,
    target: Position,
    free: impl Fn(Position) -> bool,
) -> Option<Position> {
    target
        .neighbors()
        .filter(|p| {
            p.is_interior()
                && free(*p)
                && terrain.is_walkable(*p)
                && !occupancy.is_blocked(*p)
        })
        .map(|p| (score(terrain, p), p))
        .max_by_key(|(score, p)| (*score, Reverse(*p)))
        .map(|(_, p)| p)
}

/// Container cell score.
pub fn score(terrain: &TerrainGrid, position: Position) -> i32 {
    let swamp_penalty = if terrain.get(position) == Terrain::Swamp {
        20
    } else {
        0
    };
    let open = i32::try_from(terrain.walkable_in_block(position)).unwrap_or(0);
    let centrality = 25_i32
        .saturating_sub(i32::from(position.distance_to(Position::CENTER)))
        .max(0);
    100_i32
        .saturating_sub(swamp_penalty)
        .saturating_add(open.saturating_mul(5))
        .saturating_add(centrality)
}
