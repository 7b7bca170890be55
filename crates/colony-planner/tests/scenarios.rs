//! End-to-end planner scenarios against the in-memory sandbox world.

#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::collections::BTreeSet;

use colony_planner::layout::{self, LayoutInput, ReplanReason};
use colony_planner::{
    ColonyPlanner, KeyedStore, MemoryStore, PlannerConfig, PlannerError, StepBudget, Unlimited,
};
use colony_types::{
    PathKind, PlannedRoadSegment, PlannedStructure, Position, StructureKind, Terrain, Tier,
    ZoneId, ZonePlan,
};
use colony_world::{GridPathfinder, Occupancy, SandboxWorld, TerrainGrid, catalog, terrain};

// =============================================================================
// Helpers
// =============================================================================

fn pos(x: u8, y: u8) -> Position {
    Position::new(x, y).unwrap()
}

fn tier(level: u8) -> Tier {
    Tier::new(level).unwrap()
}

fn zone() -> ZoneId {
    ZoneId::new("W1N1")
}

/// Open zone with two sources, a controller and one spawn.
fn world(level: u8) -> SandboxWorld {
    let mut world = SandboxWorld::new();
    world.add_zone(zone(), TerrainGrid::filled(Terrain::Plain), level);
    world.set_sources(&zone(), vec![pos(25, 10), pos(40, 30)]);
    world.set_controller(&zone(), Some(pos(10, 30)));
    world.add_structure(&zone(), StructureKind::Spawn, pos(25, 25));
    world
}

fn planner() -> ColonyPlanner<GridPathfinder> {
    ColonyPlanner::new(PlannerConfig::default(), GridPathfinder::new())
}

fn plan_at(world: &SandboxWorld, level: u8) -> ZonePlan {
    let analysis = terrain::analyze(world, &zone(), 0).unwrap();
    let occupancy = Occupancy::observe(world, &zone());
    layout::create_plan(
        &LayoutInput {
            zone: &zone(),
            tier: tier(level),
            analysis: &analysis,
            occupancy: &occupancy,
        },
        0,
    )
}

fn count(plan: &ZonePlan, kind: StructureKind) -> usize {
    plan.buildings.iter().filter(|b| b.kind == kind).count()
}

// =============================================================================
// Containers
// =============================================================================

#[test]
fn no_containers_before_the_tier_allows_them() {
    let world = world(2);
    let analysis = terrain::analyze(&world, &zone(), 0).unwrap();
    let containers = colony_planner::containers::source_containers(
        &analysis.terrain,
        &Occupancy::observe(&world, &zone()),
        &analysis.key_positions,
        tier(2),
        catalog::limit(StructureKind::Container, tier(2)),
        &BTreeSet::new(),
    );
    assert_eq!(analysis.key_positions.sources.len(), 2);
    assert!(containers.is_empty());
    assert_eq!(count(&plan_at(&world, 2), StructureKind::Container), 0);
}

#[test]
fn tier_three_gets_source_and_controller_containers() {
    let plan = plan_at(&world(3), 3);
    let mut priorities: Vec<u32> = plan
        .buildings
        .iter()
        .filter(|b| b.kind == StructureKind::Container)
        .map(|b| b.priority)
        .collect();
    priorities.sort_unstable();
    assert_eq!(priorities, vec![80, 90, 90]);
}

// =============================================================================
// Replanning
// =============================================================================

#[test]
fn over_limit_plan_is_replanned_to_the_ceiling() {
    let world = world(2);
    let mut planner = planner();

    let mut stale = ZonePlan::new(zone(), tier(2), 0);
    stale.buildings = (0..15_u8)
        .map(|i| PlannedStructure {
            kind: StructureKind::Extension,
            position: pos(10 + i * 2, 40),
            priority: 85,
            required_tier: tier(2),
            placed: false,
            site_id: None,
            reason: "stale".to_string(),
            rebuild: false,
        })
        .collect();
    assert_eq!(
        layout::replan_reason(Some(&stale), tier(2)),
        Some(ReplanReason::LimitViolation {
            kind: StructureKind::Extension,
            planned: 15,
            limit: 5,
        })
    );

    planner.set_plan(stale);
    let plan = planner.plan_room(&world, &zone(), 10).unwrap();
    assert_eq!(count(plan, StructureKind::Extension), 5);
    assert_eq!(plan.tier, tier(2));
}

#[test]
fn tier_advance_triggers_replan() {
    let mut world = world(2);
    let mut planner = planner();
    planner.run_tick(&mut world, &[zone()], 0, &mut Unlimited);
    world.set_tier(&zone(), 3);
    let summary = planner.run_tick(&mut world, &[zone()], 100, &mut Unlimited);
    assert_eq!(
        summary.zones[0].replan_reason.as_deref(),
        Some("tier advanced 2 -> 3")
    );
    assert_eq!(
        count(planner.plan(&zone()).unwrap(), StructureKind::Extension),
        10
    );
}

#[test]
fn planning_is_idempotent() {
    let world = world(5);
    let key = |plan: &ZonePlan| -> Vec<(Position, StructureKind, u32)> {
        let mut entries: Vec<_> = plan
            .buildings
            .iter()
            .map(|b| (b.position, b.kind, b.priority))
            .collect();
        entries.sort();
        entries
    };
    assert_eq!(key(&plan_at(&world, 5)), key(&plan_at(&world, 5)));
}

#[test]
fn plans_never_hold_duplicates_or_exceed_limits() {
    let world = world(8);
    for level in 1..=8 {
        let plan = plan_at(&world, level);
        let unique: BTreeSet<(Position, StructureKind)> =
            plan.buildings.iter().map(|b| (b.position, b.kind)).collect();
        assert_eq!(unique.len(), plan.buildings.len(), "tier {level}");
        for kind in StructureKind::ALL {
            let planned = u32::try_from(count(&plan, kind)).unwrap();
            assert!(planned <= catalog::limit(kind, tier(level)), "{kind:?} at tier {level}");
        }
    }
}

// =============================================================================
// Construction budget
// =============================================================================

#[test]
fn structure_placement_respects_budget() {
    let mut world = world(8);
    let mut planner = planner();
    planner.plan_room(&world, &zone(), 0).unwrap();
    let unplaced = planner
        .plan(&zone())
        .unwrap()
        .buildings
        .iter()
        .filter(|b| !b.placed)
        .count();
    assert!(unplaced > 10);

    let report = planner
        .place_construction_sites(&mut world, &zone(), 0)
        .unwrap();
    assert_eq!(report.placed, 10);
    assert_eq!(world.total_sites(), 10);

    // Ten sites are pending, so the next pass has no budget left.
    let report = planner
        .place_construction_sites(&mut world, &zone(), 1)
        .unwrap();
    assert_eq!(report.placed, 0);
}

#[test]
fn road_placement_builds_inside_out() {
    let mut world = world(3);
    let config = PlannerConfig {
        max_construction_sites: 2,
        ..PlannerConfig::default()
    };
    let mut planner = ColonyPlanner::new(config, GridPathfinder::new());
    planner.plan_room(&world, &zone(), 0).unwrap();

    let segment = |at: Position| PlannedRoadSegment {
        position: at,
        priority: 90,
        traffic_score: 0,
        placed: false,
        site_id: None,
        path_kind: PathKind::Controller,
        rebuild: false,
    };
    planner.plan_mut(&zone()).unwrap().roads =
        vec![segment(pos(45, 45)), segment(pos(31, 20)), segment(pos(38, 40))];

    let report = planner.place_road_sites(&mut world, &zone(), 0).unwrap();
    assert_eq!(report.placed, 1);
    let placed: Vec<Position> = world
        .placements()
        .iter()
        .filter(|(_, _, kind)| *kind == StructureKind::Road)
        .map(|(_, at, _)| *at)
        .collect();
    assert_eq!(placed, vec![pos(31, 20)]);
}

#[test]
fn step_budget_resumes_next_tick() {
    let mut world = world(2);
    let mut planner = planner();
    let first = planner.run_tick(&mut world, &[zone()], 0, &mut StepBudget::new(1));
    assert!(first.budget_exhausted);
    assert!(planner.plan(&zone()).is_some());
    assert_eq!(world.total_sites(), 0);

    let second = planner.run_tick(&mut world, &[zone()], 1, &mut Unlimited);
    assert!(!second.budget_exhausted);
    assert!(second.sites_placed() > 0);
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn destroyed_structure_is_rebuilt() {
    let mut world = world(2);
    let mut planner = planner();
    planner.run_tick(&mut world, &[zone()], 0, &mut Unlimited);
    world.complete_sites(&zone());

    let lost = planner
        .plan(&zone())
        .unwrap()
        .buildings
        .iter()
        .find(|b| b.kind == StructureKind::Extension && b.placed)
        .map(|b| b.position)
        .unwrap();
    assert!(world.remove_structure(&zone(), StructureKind::Extension, lost));

    let report = planner.reconcile(&world, &zone(), 1).unwrap();
    assert_eq!(report.missing_buildings, 1);
    let entry = planner
        .plan(&zone())
        .unwrap()
        .buildings
        .iter()
        .find(|b| b.position == lost && b.kind == StructureKind::Extension)
        .cloned()
        .unwrap();
    assert!(!entry.placed);
    assert!(entry.rebuild);

    world.clear_placements();
    planner
        .place_construction_sites(&mut world, &zone(), 2)
        .unwrap();
    assert!(
        world
            .placements()
            .iter()
            .any(|(_, at, kind)| *at == lost && *kind == StructureKind::Extension)
    );
}

#[test]
fn destroyed_dynamic_structure_is_rebuilt_after_refresh() {
    // A wall on a tier-2 template cell pushes one extension to the dynamic
    // search.
    let mut grid = TerrainGrid::filled(Terrain::Plain);
    grid.set(pos(24, 26), Terrain::Wall);
    let mut world = SandboxWorld::new();
    world.add_zone(zone(), grid, 2);
    world.set_sources(&zone(), vec![pos(25, 10), pos(40, 30)]);
    world.set_controller(&zone(), Some(pos(10, 30)));
    world.add_structure(&zone(), StructureKind::Spawn, pos(25, 25));

    let mut planner = planner();
    let dynamic = planner
        .plan_room(&world, &zone(), 0)
        .unwrap()
        .buildings
        .iter()
        .find(|b| b.kind == StructureKind::Extension && b.reason.starts_with("dynamic"))
        .map(|b| b.position)
        .unwrap();
    planner
        .place_construction_sites(&mut world, &zone(), 0)
        .unwrap();
    world.complete_sites(&zone());

    let plan = planner.plan_room(&world, &zone(), 100).unwrap();
    assert_eq!(count(plan, StructureKind::Extension), 5);

    assert!(world.remove_structure(&zone(), StructureKind::Extension, dynamic));
    let report = planner.reconcile(&world, &zone(), 101).unwrap();
    assert_eq!(report.missing_buildings, 1);

    let entry = planner
        .plan(&zone())
        .unwrap()
        .buildings
        .iter()
        .find(|b| b.position == dynamic && b.kind == StructureKind::Extension)
        .cloned()
        .unwrap();
    assert!(!entry.placed);
    assert!(entry.rebuild);

    world.clear_placements();
    planner
        .place_construction_sites(&mut world, &zone(), 102)
        .unwrap();
    assert!(
        world
            .placements()
            .iter()
            .any(|(_, at, kind)| *at == dynamic && *kind == StructureKind::Extension)
    );
}

// =============================================================================
// Failure isolation
// =============================================================================

#[test]
fn invisible_zone_is_skipped() {
    let mut world = world(2);
    let dark = ZoneId::new("W5N5");
    world.add_zone(dark.clone(), TerrainGrid::filled(Terrain::Plain), 2);
    world.set_visible(&dark, false);

    let mut planner = planner();
    let summary = planner.run_tick(&mut world, &[dark.clone(), zone()], 0, &mut Unlimited);
    assert_eq!(summary.failed(), 1);
    assert!(summary.zones[0].error.as_deref().unwrap().contains("W5N5"));
    assert!(summary.zones[1].sites_placed() > 0);
    assert!(planner.plan(&dark).is_none());
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn zone_state_round_trips_through_the_store() {
    let mut world = world(3);
    let mut planner = planner();
    planner.run_tick(&mut world, &[zone()], 0, &mut Unlimited);
    for _ in 0..3 {
        planner.record(&zone(), pos(26, 24), "harvester", 5);
    }

    let mut store = MemoryStore::new();
    planner.save_zone(&mut store, &zone()).unwrap();
    assert_eq!(store.len(), 3);

    let mut restored = ColonyPlanner::new(PlannerConfig::default(), GridPathfinder::new());
    restored.load_zone(&store, &zone()).unwrap();
    assert_eq!(restored.plan(&zone()), planner.plan(&zone()));
    assert_eq!(
        restored.traffic().get(&zone(), pos(26, 24)),
        planner.traffic().get(&zone(), pos(26, 24))
    );
    assert_eq!(
        restored.cached_analysis(&zone()),
        planner.cached_analysis(&zone())
    );
}

#[test]
fn malformed_layout_starts_fresh() {
    let world = world(2);
    let mut store = MemoryStore::new();
    store.save("layout:W1N1", "{\"tier\":".to_string());

    let mut planner = planner();
    let err = planner.load_zone(&store, &zone()).unwrap_err();
    assert!(matches!(err, PlannerError::Persistence { .. }));
    assert!(planner.plan(&zone()).is_none());

    let plan = planner.plan_room(&world, &zone(), 0).unwrap();
    assert!(!plan.buildings.is_empty());
}
