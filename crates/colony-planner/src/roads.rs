//! Road planner: key-point paths plus busy cells, built inside-out.
//!
//! [`plan_network`] asks the pathfinder for a path from every spawn (or the
//! central anchor before one exists) to every source, the controller, the
//! mineral and the first few exits. Each uncovered cell on a path becomes a
//! candidate at `path priority + traffic / 10`, keeping the best path's
//! priority where paths overlap. Busy cells off every path join at
//! `traffic / 5`, tagged [`PathKind::Internal`].
//!
//! [`place_road_sites`] spends half the site budget per tick. Rebuilds go
//! first, then priority, then distance from the nearest spawn so the core
//! grid finishes before distant spurs.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use colony_types::{PathKind, PlannedRoadSegment, Position, StructureKind, ZoneId, ZonePlan};
use colony_world::{
    ConstructionExecutor, CostGrid, Occupancy, Pathfinder, TerrainAnalysis, TrafficTracker,
};
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::sites::{Attempt, PlacementReport, attempt_all};

/// Segments at or above this priority are placed regardless of traffic.
pub const PRIORITY_THRESHOLD: u32 = 80;

/// Everything the road planner reads about a zone for one pass.
#[derive(Debug, Clone, Copy)]
pub struct RoadInput<'a> {
    /// Zone being planned.
    pub zone: &'a ZoneId,
    /// Cached terrain analysis.
    pub analysis: &'a TerrainAnalysis,
    /// Structures and sites observed this pass.
    pub occupancy: &'a Occupancy,
    /// Traversal costs handed to the pathfinder.
    pub costs: &'a CostGrid,
    /// Movement statistics.
    pub traffic: &'a TrafficTracker,
    /// Path origins: spawn-equivalent positions.
    pub spawns: &'a [Position],
    /// Cells reserved for planned, non-walkable buildings.
    pub reserved: &'a BTreeSet<Position>,
    /// Current tick.
    pub now: u64,
}

impl RoadInput<'_> {
    fn can_hold_road(&self, position: Position, objects: &BTreeSet<Position>) -> bool {
        !objects.contains(&position)
            && !self.spawns.contains(&position)
            && !self.reserved.contains(&position)
            && !self.occupancy.has_road(position)
            && !self.occupancy.is_blocked(position)
    }
}

/// Path targets in priority order: sources, controller, mineral, exits.
fn targets(input: &RoadInput<'_>, max_exits: usize) -> Vec<(Position, PathKind)> {
    let keys = &input.analysis.key_positions;
    keys.sources
        .iter()
        .map(|s| (*s, PathKind::Source))
        .chain(keys.controller.map(|c| (c, PathKind::Controller)))
        .chain(keys.mineral.map(|m| (m, PathKind::Mineral)))
        .chain(keys.exits.iter().take(max_exits).map(|e| (*e, PathKind::Exit)))
        .collect()
}

/// Compute road candidates for the zone, sorted by position.
pub fn plan_network(
    input: &RoadInput<'_>,
    pathfinder: &dyn Pathfinder,
    config: &PlannerConfig,
) -> Vec<PlannedRoadSegment> {
    let objects: BTreeSet<Position> = input.analysis.key_positions.objects().collect();
    let origins: Vec<Position> = if input.spawns.is_empty() {
        vec![input.analysis.anchor]
    } else {
        input.spawns.to_vec()
    };
    let targets = targets(input, config.max_exit_paths);

    let mut candidates: BTreeMap<Position, PlannedRoadSegment> = BTreeMap::new();
    for origin in &origins {
        for (target, path_kind) in &targets {
            let result = pathfinder.find_path(*origin, *target, input.costs);
            if result.incomplete {
                debug!(
                    zone = %input.zone,
                    from = %origin,
                    to = %target,
                    ?path_kind,
                    steps = result.path.len(),
                    "Incomplete road path"
                );
            }
            for cell in result.path {
                if cell == *origin || !input.can_hold_road(cell, &objects) {
                    continue;
                }
                let traffic_score = input.traffic.score(input.zone, cell, input.now);
                let priority = path_kind
                    .priority()
                    .saturating_add(traffic_score.checked_div(10).unwrap_or(0));
                let better = candidates
                    .get(&cell)
                    .is_none_or(|existing| priority > existing.priority);
                if better {
                    candidates.insert(
                        cell,
                        PlannedRoadSegment {
                            position: cell,
                            priority,
                            traffic_score,
                            placed: false,
                            site_id: None,
                            path_kind: *path_kind,
                            rebuild: false,
                        },
                    );
                }
            }
        }
    }

    let busy = input
        .traffic
        .high_traffic(input.zone, config.high_traffic_min_count, input.now);
    for (cell, traffic_score) in busy {
        if candidates.contains_key(&cell) || !input.can_hold_road(cell, &objects) {
            continue;
        }
        candidates.insert(
            cell,
            PlannedRoadSegment {
                position: cell,
                priority: traffic_score.checked_div(5).unwrap_or(0),
                traffic_score,
                placed: false,
                site_id: None,
                path_kind: PathKind::Internal,
                rebuild: false,
            },
        );
    }

    debug!(
        zone = %input.zone,
        origins = origins.len(),
        targets = targets.len(),
        candidates = candidates.len(),
        "Road network planned"
    );
    candidates.into_values().collect()
}

/// Counts from merging fresh candidates into a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoadMerge {
    /// Candidates not previously in the plan.
    pub added: usize,
    /// Existing entries refreshed from a candidate.
    pub updated: usize,
    /// Unplaced entries no longer proposed.
    pub dropped: usize,
}

/// Merge candidates into the plan's road list.
///
/// Entries already in the plan keep their placed flag, correlation id and
/// rebuild flag. Placed or rebuild-flagged entries missing from the
/// candidates are retained; other stale entries are dropped.
pub fn merge_into_plan(
    plan: &mut ZonePlan,
    candidates: Vec<PlannedRoadSegment>,
    tick: u64,
) -> RoadMerge {
    let mut fresh: BTreeMap<Position, PlannedRoadSegment> =
        candidates.into_iter().map(|c| (c.position, c)).collect();
    let mut merge = RoadMerge::default();
    let mut roads = Vec::with_capacity(plan.roads.len().max(fresh.len()));

    for old in plan.roads.drain(..) {
        if let Some(mut new) = fresh.remove(&old.position) {
            new.placed = old.placed;
            new.site_id = old.site_id;
            new.rebuild = old.rebuild;
            roads.push(new);
            merge.updated = merge.updated.saturating_add(1);
        } else if old.placed || old.rebuild {
            roads.push(old);
        } else {
            merge.dropped = merge.dropped.saturating_add(1);
        }
    }
    merge.added = fresh.len();
    roads.extend(fresh.into_values());
    roads.sort_by_key(|r| r.position);

    plan.roads = roads;
    plan.last_updated = tick;
    merge
}

/// Whether at least `percent` of the segments are placed.
pub fn network_complete(roads: &[PlannedRoadSegment], percent: u32) -> bool {
    let total = u64::try_from(roads.len()).unwrap_or(u64::MAX);
    let placed = u64::try_from(roads.iter().filter(|r| r.placed).count()).unwrap_or(0);
    total > 0 && placed.saturating_mul(100) >= u64::from(percent).saturating_mul(total)
}

/// Whether a segment should jump the queue as a rebuild: the reconciler
/// flagged it, or it is a structural segment of a nearly complete network.
pub fn is_rebuild_candidate(segment: &PlannedRoadSegment, network_complete: bool) -> bool {
    segment.rebuild || (network_complete && segment.path_kind != PathKind::Internal)
}

fn nearest_spawn_distance(position: Position, spawns: &[Position]) -> u8 {
    spawns
        .iter()
        .map(|s| position.distance_to(*s))
        .min()
        .unwrap_or(0)
}

/// Place road sites for the best eligible segments.
///
/// The budget is half of `max_construction_sites`. A segment is eligible
/// when unplaced, on an unblocked cell, and busy, high-priority or a
/// rebuild candidate. Segments whose road (or road site) already exists are
/// adopted without spending budget.
pub fn place_road_sites(
    zone: &ZoneId,
    roads: &mut [PlannedRoadSegment],
    spawns: &[Position],
    occupancy: &Occupancy,
    executor: &mut dyn ConstructionExecutor,
    config: &PlannerConfig,
) -> PlacementReport {
    let mut report = PlacementReport::default();

    for road in roads.iter_mut().filter(|r| !r.placed) {
        let site = occupancy
            .site_at(road.position)
            .filter(|(kind, _)| *kind == StructureKind::Road)
            .map(|(_, id)| id.clone());
        if site.is_some() || occupancy.has_road(road.position) {
            road.placed = true;
            road.site_id = site;
            road.rebuild = false;
            report.adopted = report.adopted.saturating_add(1);
        }
    }

    let complete = network_complete(roads, config.rebuild_completion_percent);
    let mut eligible: Vec<(bool, u32, u8, Attempt)> = roads
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.placed && !occupancy.is_blocked(r.position))
        .filter_map(|(index, r)| {
            let rebuild = is_rebuild_candidate(r, complete);
            let wanted = rebuild
                || r.traffic_score >= config.road_traffic_threshold
                || r.priority >= PRIORITY_THRESHOLD;
            wanted.then(|| {
                (
                    rebuild,
                    r.priority,
                    nearest_spawn_distance(r.position, spawns),
                    Attempt {
                        index,
                        position: r.position,
                        kind: StructureKind::Road,
                    },
                )
            })
        })
        .collect();
    eligible.sort_by_key(|(rebuild, priority, distance, attempt)| {
        (!*rebuild, Reverse(*priority), *distance, attempt.position)
    });
    let queue: Vec<Attempt> = eligible.into_iter().map(|(_, _, _, a)| a).collect();

    let unplaced = roads.iter().filter(|r| !r.placed).count();
    report.skipped = unplaced.saturating_sub(queue.len());

    let budget = usize::try_from(config.max_construction_sites.checked_div(2).unwrap_or(0))
        .unwrap_or(0);
    attempt_all(zone, executor, &queue, budget, &mut report, |index, site| {
        if let Some(road) = roads.get_mut(index) {
            road.placed = true;
            road.site_id = site;
            road.rebuild = false;
        }
    });

    if report.placed > 0 || report.failed > 0 {
        info!(
            %zone,
            placed = report.placed,
            adopted = report.adopted,
            failed = report.failed,
            skipped = report.skipped,
            complete,
            "Road sites placed"
        );
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use colony_types::{KeyPositions, ObservedStructure, StructureId, Terrain, Tier};
    use colony_world::{GridPathfinder, SandboxWorld, TerrainGrid};

    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn zone() -> ZoneId {
        ZoneId::new("W1N1")
    }

    fn analysis() -> TerrainAnalysis {
        TerrainAnalysis {
            terrain: TerrainGrid::filled(Terrain::Plain),
            key_positions: KeyPositions {
                sources: vec![pos(25, 15)],
                controller: Some(pos(35, 25)),
                mineral: None,
                spawns: vec![pos(25, 25)],
                exits: Vec::new(),
            },
            anchor: pos(25, 25),
            last_analyzed: 0,
        }
    }

    fn segment(at: Position, priority: u32, path_kind: PathKind) -> PlannedRoadSegment {
        PlannedRoadSegment {
            position: at,
            priority,
            traffic_score: 0,
            placed: false,
            site_id: None,
            path_kind,
            rebuild: false,
        }
    }

    fn candidates(traffic: &TrafficTracker, occupancy: &Occupancy) -> Vec<PlannedRoadSegment> {
        let analysis = analysis();
        let spawns = [pos(25, 25)];
        let reserved = BTreeSet::new();
        let input = RoadInput {
            zone: &zone(),
            analysis: &analysis,
            occupancy,
            costs: &CostGrid::uniform(1),
            traffic,
            spawns: &spawns,
            reserved: &reserved,
            now: 100,
        };
        plan_network(&input, &GridPathfinder::new(), &PlannerConfig::default())
    }

    // -----------------------------------------------------------------------
    // Network planning
    // -----------------------------------------------------------------------

    #[test]
    fn paths_to_source_and_controller() {
        let roads = candidates(&TrafficTracker::new(1500), &Occupancy::default());
        // Nine steps toward each target; diagonal first steps may be shared.
        assert!((17..=18).contains(&roads.len()));
        assert!(
            roads
                .iter()
                .any(|r| r.position.y == 16 && r.priority == 100 && r.path_kind == PathKind::Source)
        );
        assert!(
            roads
                .iter()
                .any(|r| {
                    r.position.x == 34 && r.priority == 90 && r.path_kind == PathKind::Controller
                })
        );
        assert!(!roads.iter().any(|r| r.position == pos(25, 25)));
        assert!(!roads.iter().any(|r| r.position == pos(25, 15)));
        assert!(roads.windows(2).all(|w| w[0].position < w[1].position));
    }

    fn source_cell(roads: &[PlannedRoadSegment]) -> Position {
        roads
            .iter()
            .find(|r| r.path_kind == PathKind::Source)
            .map(|r| r.position)
            .unwrap()
    }

    #[test]
    fn traffic_raises_priority_and_adds_busy_cells() {
        let cell = source_cell(&candidates(&TrafficTracker::new(1500), &Occupancy::default()));
        let mut traffic = TrafficTracker::new(1500);
        for _ in 0..30 {
            traffic.record(&zone(), cell, "hauler", 100);
            traffic.record(&zone(), pos(5, 5), "hauler", 100);
        }
        let roads = candidates(&traffic, &Occupancy::default());
        let on_path = roads.iter().find(|r| r.position == cell).unwrap();
        assert_eq!(on_path.priority, 103);
        assert_eq!(on_path.traffic_score, 30);
        let busy = roads.iter().find(|r| r.position == pos(5, 5)).unwrap();
        assert_eq!(busy.priority, 6);
        assert_eq!(busy.path_kind, PathKind::Internal);
    }

    #[test]
    fn covered_cells_are_skipped() {
        let cell = source_cell(&candidates(&TrafficTracker::new(1500), &Occupancy::default()));
        let occ = Occupancy::from_parts(
            &[ObservedStructure {
                id: StructureId::new("r"),
                kind: StructureKind::Road,
                position: cell,
                owned: true,
            }],
            &[],
        );
        let roads = candidates(&TrafficTracker::new(1500), &occ);
        assert!(!roads.iter().any(|r| r.position == cell));
    }

    #[test]
    fn no_spawn_routes_from_anchor() {
        let mut analysis = analysis();
        analysis.key_positions.spawns.clear();
        let reserved = BTreeSet::new();
        let traffic = TrafficTracker::new(1500);
        let input = RoadInput {
            zone: &zone(),
            analysis: &analysis,
            occupancy: &Occupancy::default(),
            costs: &CostGrid::uniform(1),
            traffic: &traffic,
            spawns: &[],
            reserved: &reserved,
            now: 0,
        };
        let roads = plan_network(&input, &GridPathfinder::new(), &PlannerConfig::default());
        assert!(!roads.is_empty());
        assert!(!roads.iter().any(|r| r.position == pos(25, 25)));
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    #[test]
    fn merge_keeps_placement_state() {
        let mut plan = ZonePlan::new(zone(), Tier::MIN, 0);
        let mut placed = segment(pos(5, 5), 100, PathKind::Source);
        placed.placed = true;
        let mut gone_placed = segment(pos(6, 6), 100, PathKind::Source);
        gone_placed.placed = true;
        let stale = segment(pos(7, 7), 50, PathKind::Internal);
        plan.roads = vec![placed, gone_placed, stale];

        let merge = merge_into_plan(
            &mut plan,
            vec![
                segment(pos(5, 5), 104, PathKind::Source),
                segment(pos(8, 8), 90, PathKind::Controller),
            ],
            42,
        );
        assert_eq!(
            merge,
            RoadMerge {
                added: 1,
                updated: 1,
                dropped: 1
            }
        );
        assert_eq!(plan.roads.len(), 3);
        let refreshed = plan.roads.iter().find(|r| r.position == pos(5, 5)).unwrap();
        assert!(refreshed.placed);
        assert_eq!(refreshed.priority, 104);
        assert!(plan.roads.iter().any(|r| r.position == pos(6, 6)));
        assert_eq!(plan.last_updated, 42);
    }

    // -----------------------------------------------------------------------
    // Site placement
    // -----------------------------------------------------------------------

    fn sandbox() -> SandboxWorld {
        let mut world = SandboxWorld::new();
        world.add_zone(zone(), TerrainGrid::filled(Terrain::Plain), 3);
        world
    }

    fn config(max_sites: u32) -> PlannerConfig {
        PlannerConfig {
            max_construction_sites: max_sites,
            ..PlannerConfig::default()
        }
    }

    #[test]
    fn budget_is_half_the_site_cap() {
        let mut world = sandbox();
        let mut roads: Vec<_> = (10..20)
            .map(|x| segment(pos(x, 10), 100, PathKind::Source))
            .collect();
        let report = place_road_sites(
            &zone(),
            &mut roads,
            &[pos(10, 12)],
            &Occupancy::default(),
            &mut world,
            &config(6),
        );
        assert_eq!(report.placed, 3);
        assert_eq!(roads.iter().filter(|r| r.placed).count(), 3);
    }

    #[test]
    fn equal_priority_builds_inside_out() {
        let mut world = sandbox();
        let mut roads = vec![
            segment(pos(40, 25), 100, PathKind::Source),
            segment(pos(27, 25), 100, PathKind::Source),
            segment(pos(33, 25), 100, PathKind::Source),
        ];
        place_road_sites(
            &zone(),
            &mut roads,
            &[pos(25, 25)],
            &Occupancy::default(),
            &mut world,
            &config(2),
        );
        assert_eq!(world.placements().len(), 1);
        assert_eq!(world.placements()[0].1, pos(27, 25));
    }

    #[test]
    fn low_value_segments_wait() {
        let mut world = sandbox();
        let mut quiet = segment(pos(10, 10), 50, PathKind::Internal);
        quiet.traffic_score = 5;
        let mut busy = segment(pos(12, 10), 10, PathKind::Internal);
        busy.traffic_score = 25;
        let mut roads = vec![quiet, busy];
        let report = place_road_sites(
            &zone(),
            &mut roads,
            &[],
            &Occupancy::default(),
            &mut world,
            &config(10),
        );
        assert_eq!(report.placed, 1);
        assert_eq!(report.skipped, 1);
        assert!(roads[1].placed);
    }

    #[test]
    fn rebuilds_jump_the_queue() {
        let mut world = sandbox();
        let mut rebuild = segment(pos(40, 40), 60, PathKind::Exit);
        rebuild.rebuild = true;
        let mut roads = vec![segment(pos(26, 25), 100, PathKind::Source), rebuild];
        place_road_sites(
            &zone(),
            &mut roads,
            &[pos(25, 25)],
            &Occupancy::default(),
            &mut world,
            &config(2),
        );
        assert_eq!(world.placements()[0].1, pos(40, 40));
        assert!(!roads[1].rebuild);
    }

    #[test]
    fn near_complete_network_rebuilds_structural_gaps() {
        let mut roads: Vec<_> = (0..10)
            .map(|i| {
                let mut s = segment(pos(10 + i, 10), 60, PathKind::Exit);
                s.placed = i != 0;
                s
            })
            .collect();
        assert!(network_complete(&roads, 90));
        assert!(is_rebuild_candidate(&roads[0], true));
        roads[0].path_kind = PathKind::Internal;
        assert!(!is_rebuild_candidate(&roads[0], true));
        assert!(!network_complete(&roads[..5], 90));
    }

    #[test]
    fn existing_roads_are_adopted() {
        let mut world = sandbox();
        world.add_structure(&zone(), StructureKind::Road, pos(10, 10));
        let occ = Occupancy::observe(&world, &zone());
        let mut roads = vec![segment(pos(10, 10), 100, PathKind::Source)];
        let report = place_road_sites(&zone(), &mut roads, &[], &occ, &mut world, &config(10));
        assert_eq!(report.adopted, 1);
        assert_eq!(report.placed, 0);
        assert!(roads[0].placed);
    }
}
