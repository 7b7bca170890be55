//! Per-tick orchestration across zones.
//!
//! [`ColonyPlanner`] owns everything the planner keeps between ticks: the
//! terrain and cost-grid caches, the traffic tracker, each zone's plan and
//! the cadence bookkeeping. The host drives it once per tick through
//! [`ColonyPlanner::run_tick`], which walks the zones in order and runs the
//! steps that are due:
//!
//! | Step                | Cadence                    |
//! |---------------------|----------------------------|
//! | plan / replan       | `replan_interval`          |
//! | reconcile           | `reconcile_interval`       |
//! | structure sites     | every tick                 |
//! | road network        | `road_plan_interval`       |
//! | road sites          | every tick                 |
//! | traffic pruning     | `traffic_prune_interval`   |
//!
//! The host's [`TickBudget`] is checked before every step. Once it reports
//! exhaustion the tick ends; the summary names the step that was cut and
//! the zones never reached. Every step is idempotent, so the next tick
//! simply picks up again.

use std::collections::{BTreeMap, BTreeSet};

use colony_types::{PlannedRoadSegment, Position, StructureKind, Tier, ZoneId, ZonePlan};
use colony_world::cost_grid::BLOCKED_COST;
use colony_world::terrain;
use colony_world::{
    CacheEntry, ConstructionExecutor, CostGrid, Occupancy, Pathfinder, TerrainAnalysis,
    TrafficRecord, TrafficTracker, TtlCache, WorldError, WorldQuery, ZoneController,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::layout::{self, LayoutInput, ReplanReason};
use crate::reconcile::{self, ReconcileReport};
use crate::roads::{self, RoadInput};
use crate::sites::PlacementReport;
use crate::store::{
    KeyedStore, LayoutRecord, decode, encode, layout_key, terrain_key, traffic_key,
};

// ---------------------------------------------------------------------------
// Host seams
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs from the host in one bound.
pub trait Host: WorldQuery + ZoneController + ConstructionExecutor {}

impl<T: WorldQuery + ZoneController + ConstructionExecutor> Host for T {}

/// Host-provided compute budget, checked before every step.
pub trait TickBudget {
    /// Whether the tick must stop now. Called once per step about to run.
    fn exhausted(&mut self) -> bool;
}

/// A budget that never runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl TickBudget for Unlimited {
    fn exhausted(&mut self) -> bool {
        false
    }
}

/// A budget of a fixed number of steps per tick.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    remaining: usize,
}

impl StepBudget {
    /// Allow `steps` steps.
    pub const fn new(steps: usize) -> Self {
        Self { remaining: steps }
    }

    /// Steps left.
    pub const fn remaining(&self) -> usize {
        self.remaining
    }
}

impl TickBudget for StepBudget {
    fn exhausted(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                false
            }
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One cadence-gated step of a zone pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create or refresh the layout plan.
    Plan,
    /// Diff placed entries against the world.
    Reconcile,
    /// Place structure construction sites.
    PlaceStructures,
    /// Recompute the road network.
    PlanRoads,
    /// Place road construction sites.
    PlaceRoads,
}

impl Step {
    /// Steps in execution order.
    pub const ORDER: [Self; 5] = [
        Self::Plan,
        Self::Reconcile,
        Self::PlaceStructures,
        Self::PlanRoads,
        Self::PlaceRoads,
    ];
}

/// What happened to one zone this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    /// The zone.
    pub zone: ZoneId,
    /// Steps that ran to completion.
    pub steps: Vec<Step>,
    /// Why the plan was rebuilt, if it was.
    pub replan_reason: Option<String>,
    /// Structure placement outcome.
    pub structures: Option<PlacementReport>,
    /// Road candidates computed.
    pub road_candidates: Option<usize>,
    /// Road placement outcome.
    pub roads: Option<PlacementReport>,
    /// Reconciliation outcome.
    pub reconcile: Option<ReconcileReport>,
    /// Step cut short by the tick budget.
    pub interrupted_at: Option<Step>,
    /// Error that ended the zone's pass.
    pub error: Option<String>,
}

impl ZoneReport {
    fn new(zone: &ZoneId) -> Self {
        Self {
            zone: zone.clone(),
            steps: Vec::new(),
            replan_reason: None,
            structures: None,
            road_candidates: None,
            roads: None,
            reconcile: None,
            interrupted_at: None,
            error: None,
        }
    }

    /// Sites placed this tick, structures and roads together.
    pub fn sites_placed(&self) -> usize {
        let structures = self.structures.map_or(0, |r| r.placed);
        let roads = self.roads.map_or(0, |r| r.placed);
        structures.saturating_add(roads)
    }
}

/// Outcome of one [`ColonyPlanner::run_tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Tick that ran.
    pub tick: u64,
    /// Zones visited, in order.
    pub zones: Vec<ZoneReport>,
    /// Zones the budget ran out before.
    pub not_reached: Vec<ZoneId>,
    /// Whether the budget ran out.
    pub budget_exhausted: bool,
    /// Traffic records pruned, when pruning was due.
    pub traffic_pruned: Option<usize>,
}

impl TickSummary {
    /// Zones whose pass ended in an error.
    pub fn failed(&self) -> usize {
        self.zones.iter().filter(|z| z.error.is_some()).count()
    }

    /// Sites placed across all zones.
    pub fn sites_placed(&self) -> usize {
        self.zones
            .iter()
            .map(ZoneReport::sites_placed)
            .fold(0, usize::saturating_add)
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Last tick each slow step ran for a zone.
#[derive(Debug, Clone, Copy, Default)]
struct Schedule {
    planned: Option<u64>,
    roads_planned: Option<u64>,
    reconciled: Option<u64>,
}

const fn due(last: Option<u64>, interval: u64, tick: u64) -> bool {
    match last {
        Some(last) => tick.saturating_sub(last) >= interval,
        None => true,
    }
}

/// The colony planner: layout, roads, reconciliation and their caches.
#[derive(Debug)]
pub struct ColonyPlanner<P> {
    config: PlannerConfig,
    pathfinder: P,
    terrain: TtlCache<TerrainAnalysis>,
    cost_grids: TtlCache<CostGrid>,
    traffic: TrafficTracker,
    plans: BTreeMap<ZoneId, ZonePlan>,
    schedules: BTreeMap<ZoneId, Schedule>,
    last_prune: Option<u64>,
}

impl<P: Pathfinder> ColonyPlanner<P> {
    /// Create a planner with empty caches.
    pub fn new(config: PlannerConfig, pathfinder: P) -> Self {
        Self {
            terrain: TtlCache::new(config.terrain_ttl),
            cost_grids: TtlCache::new(config.cost_grid_ttl),
            traffic: TrafficTracker::new(config.traffic_ttl),
            config,
            pathfinder,
            plans: BTreeMap::new(),
            schedules: BTreeMap::new(),
            last_prune: None,
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Current plan for a zone.
    pub fn plan(&self, zone: &ZoneId) -> Option<&ZonePlan> {
        self.plans.get(zone)
    }

    /// Mutable access to a zone's plan.
    pub fn plan_mut(&mut self, zone: &ZoneId) -> Option<&mut ZonePlan> {
        self.plans.get_mut(zone)
    }

    /// Replace a zone's plan, as when restoring an older snapshot.
    pub fn set_plan(&mut self, plan: ZonePlan) {
        self.plans.insert(plan.zone.clone(), plan);
    }

    /// Movement statistics.
    pub const fn traffic(&self) -> &TrafficTracker {
        &self.traffic
    }

    /// Cached terrain analysis for a zone, fresh or not.
    pub fn cached_analysis(&self, zone: &ZoneId) -> Option<&TerrainAnalysis> {
        self.terrain.entry(zone).map(|e| &e.value)
    }

    fn analysis(
        &mut self,
        world: &dyn WorldQuery,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<&TerrainAnalysis, PlannerError> {
        if self.terrain.get(zone, tick).is_none() {
            let analysis = terrain::analyze(world, zone, tick)?;
            self.terrain.insert(zone.clone(), analysis, tick);
            self.cost_grids.invalidate(zone);
        }
        self.terrain
            .get(zone, tick)
            .ok_or_else(|| WorldError::ZoneNotVisible(zone.clone()).into())
    }

    fn tier_of(host: &dyn ZoneController, zone: &ZoneId) -> Result<Tier, PlannerError> {
        host.tier(zone)
            .ok_or_else(|| PlannerError::NotOwned(zone.clone()))
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Create or refresh the zone's layout plan at its current tier.
    ///
    /// Entries matching the previous plan by (position, kind) keep their
    /// placement state; the road list carries over unchanged.
    pub fn plan_room<H: Host>(
        &mut self,
        host: &H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<&ZonePlan, PlannerError> {
        self.refresh_plan(host, zone, tick)?;
        self.plans
            .get(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))
    }

    fn refresh_plan<H: Host>(
        &mut self,
        host: &H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<Option<ReplanReason>, PlannerError> {
        let tier = Self::tier_of(host, zone)?;
        let occupancy = Occupancy::observe(host, zone);
        let reason = layout::replan_reason(self.plans.get(zone), tier);
        let analysis = self.analysis(host, zone, tick)?;

        let mut plan = layout::create_plan(
            &LayoutInput {
                zone,
                tier,
                analysis,
                occupancy: &occupancy,
            },
            tick,
        );
        if let Some(previous) = self.plans.remove(zone) {
            carry_state(&previous, &mut plan);
        }

        match &reason {
            Some(reason) => {
                info!(
                    %zone,
                    tick,
                    %tier,
                    %reason,
                    buildings = plan.buildings.len(),
                    "Zone replanned"
                );
                self.cost_grids.invalidate(zone);
            }
            None => debug!(%zone, tick, buildings = plan.buildings.len(), "Plan refreshed"),
        }
        self.plans.insert(zone.clone(), plan);
        self.schedules.entry(zone.clone()).or_default().planned = Some(tick);
        Ok(reason)
    }

    /// Place construction sites for the plan's best unplaced structures.
    pub fn place_construction_sites<H: Host>(
        &mut self,
        host: &mut H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<PlacementReport, PlannerError> {
        let tier = Self::tier_of(&*host, zone)?;
        let occupancy = Occupancy::observe(&*host, zone);
        let plan = self
            .plans
            .get_mut(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))?;
        Ok(layout::place_construction_sites(
            plan,
            tier,
            &occupancy,
            host,
            self.config.max_construction_sites,
            tick,
        ))
    }

    // -----------------------------------------------------------------------
    // Roads
    // -----------------------------------------------------------------------

    fn cost_grid(
        &mut self,
        zone: &ZoneId,
        occupancy: &Occupancy,
        reserved: &BTreeSet<Position>,
        tick: u64,
    ) -> Result<CostGrid, PlannerError> {
        if let Some(grid) = self.cost_grids.get(zone, tick) {
            return Ok(grid.clone());
        }
        let analysis = self
            .terrain
            .get(zone, tick)
            .ok_or_else(|| WorldError::ZoneNotVisible(zone.clone()))?;
        let mut grid = CostGrid::build(&analysis.terrain, occupancy);
        for position in reserved {
            grid.set(*position, BLOCKED_COST);
        }
        self.cost_grids.insert(zone.clone(), grid.clone(), tick);
        Ok(grid)
    }

    /// Recompute road candidates and merge them into the zone's plan.
    ///
    /// Returns the fresh candidates.
    pub fn plan_road_network<H: Host>(
        &mut self,
        host: &H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<Vec<PlannedRoadSegment>, PlannerError> {
        let occupancy = Occupancy::observe(host, zone);
        let reserved: BTreeSet<Position> = self
            .plans
            .get(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))?
            .buildings
            .iter()
            .filter(|b| !b.kind.is_walkable() && !occupancy.has_structure(b.position, b.kind))
            .map(|b| b.position)
            .collect();
        self.analysis(host, zone, tick)?;
        let costs = self.cost_grid(zone, &occupancy, &reserved, tick)?;
        let analysis = self
            .terrain
            .get(zone, tick)
            .ok_or_else(|| WorldError::ZoneNotVisible(zone.clone()))?;
        let spawns = layout::spawn_equivalents(&analysis.key_positions, &occupancy);

        let candidates = roads::plan_network(
            &RoadInput {
                zone,
                analysis,
                occupancy: &occupancy,
                costs: &costs,
                traffic: &self.traffic,
                spawns: &spawns,
                reserved: &reserved,
                now: tick,
            },
            &self.pathfinder,
            &self.config,
        );

        let plan = self
            .plans
            .get_mut(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))?;
        let merge = roads::merge_into_plan(plan, candidates.clone(), tick);
        layout::refresh_status(plan);
        debug!(
            %zone,
            tick,
            added = merge.added,
            updated = merge.updated,
            dropped = merge.dropped,
            total = plan.roads.len(),
            "Road plan merged"
        );
        self.schedules.entry(zone.clone()).or_default().roads_planned = Some(tick);
        Ok(candidates)
    }

    /// Place road sites for the plan's best eligible segments.
    pub fn place_road_sites<H: Host>(
        &mut self,
        host: &mut H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<PlacementReport, PlannerError> {
        let occupancy = Occupancy::observe(&*host, zone);
        let keys = self.analysis(&*host, zone, tick)?.key_positions.clone();
        let spawns = layout::spawn_equivalents(&keys, &occupancy);
        let plan = self
            .plans
            .get_mut(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))?;
        let report = roads::place_road_sites(
            zone,
            &mut plan.roads,
            &spawns,
            &occupancy,
            host,
            &self.config,
        );
        if report.placed > 0 || report.adopted > 0 {
            plan.last_updated = tick;
        }
        layout::refresh_status(plan);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Traffic and reconciliation
    // -----------------------------------------------------------------------

    /// Record a unit standing on `position`.
    pub fn record(&mut self, zone: &ZoneId, position: Position, role: &str, tick: u64) {
        self.traffic.record(zone, position, role, tick);
    }

    /// Diff the zone's placed entries against the world.
    pub fn reconcile<H: Host>(
        &mut self,
        host: &H,
        zone: &ZoneId,
        tick: u64,
    ) -> Result<ReconcileReport, PlannerError> {
        let occupancy = Occupancy::observe(host, zone);
        let plan = self
            .plans
            .get_mut(zone)
            .ok_or_else(|| PlannerError::NoPlan(zone.clone()))?;
        let report = reconcile::reconcile(plan, &occupancy);
        if report.missing() > 0 {
            plan.last_updated = tick;
        }
        self.schedules.entry(zone.clone()).or_default().reconciled = Some(tick);
        Ok(report)
    }

    /// Drop expired traffic records and cache entries. Returns the number of
    /// traffic records removed.
    pub fn prune(&mut self, tick: u64) -> usize {
        let traffic = self.traffic.prune(tick);
        let terrain = self.terrain.prune(tick);
        let grids = self.cost_grids.prune(tick);
        self.last_prune = Some(tick);
        debug!(tick, traffic, terrain, grids, "Pruned expired state");
        traffic
    }

    // -----------------------------------------------------------------------
    // Tick loop
    // -----------------------------------------------------------------------

    fn is_due(&self, step: Step, zone: &ZoneId, tick: u64) -> bool {
        let schedule = self.schedules.get(zone).copied().unwrap_or_default();
        match step {
            Step::Plan => {
                !self.plans.contains_key(zone)
                    || due(schedule.planned, self.config.replan_interval, tick)
            }
            Step::Reconcile => due(schedule.reconciled, self.config.reconcile_interval, tick),
            Step::PlanRoads => {
                due(schedule.roads_planned, self.config.road_plan_interval, tick)
            }
            Step::PlaceStructures | Step::PlaceRoads => true,
        }
    }

    fn run_step<H: Host>(
        &mut self,
        host: &mut H,
        zone: &ZoneId,
        step: Step,
        tick: u64,
        report: &mut ZoneReport,
    ) -> Result<(), PlannerError> {
        match step {
            Step::Plan => {
                report.replan_reason = self
                    .refresh_plan(&*host, zone, tick)?
                    .map(|reason| reason.to_string());
            }
            Step::Reconcile => {
                report.reconcile = Some(self.reconcile(&*host, zone, tick)?);
            }
            Step::PlaceStructures => {
                report.structures = Some(self.place_construction_sites(host, zone, tick)?);
            }
            Step::PlanRoads => {
                report.road_candidates =
                    Some(self.plan_road_network(&*host, zone, tick)?.len());
            }
            Step::PlaceRoads => {
                report.roads = Some(self.place_road_sites(host, zone, tick)?);
            }
        }
        report.steps.push(step);
        Ok(())
    }

    /// Run every due step for every zone, in order, until done or out of
    /// budget.
    ///
    /// A zone whose step fails is logged and skipped; the remaining zones
    /// still run.
    pub fn run_tick<H: Host>(
        &mut self,
        host: &mut H,
        zones: &[ZoneId],
        tick: u64,
        budget: &mut dyn TickBudget,
    ) -> TickSummary {
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        'zones: for (visited, zone) in zones.iter().enumerate() {
            let mut report = ZoneReport::new(zone);
            for step in Step::ORDER {
                if !self.is_due(step, zone, tick) {
                    continue;
                }
                if budget.exhausted() {
                    debug!(%zone, tick, ?step, "Tick budget exhausted");
                    report.interrupted_at = Some(step);
                    summary.zones.push(report);
                    summary.not_reached = zones
                        .iter()
                        .skip(visited.saturating_add(1))
                        .cloned()
                        .collect();
                    summary.budget_exhausted = true;
                    break 'zones;
                }
                if let Err(err) = self.run_step(host, zone, step, tick, &mut report) {
                    warn!(%zone, tick, ?step, %err, "Zone skipped this tick");
                    report.error = Some(err.to_string());
                    break;
                }
            }
            summary.zones.push(report);
        }

        if !summary.budget_exhausted
            && due(self.last_prune, self.config.traffic_prune_interval, tick)
        {
            summary.traffic_pruned = Some(self.prune(tick));
        }

        debug!(
            tick,
            zones = summary.zones.len(),
            failed = summary.failed(),
            sites = summary.sites_placed(),
            exhausted = summary.budget_exhausted,
            "Tick complete"
        );
        summary
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Restore a zone's plan, traffic and terrain analysis from the store.
    ///
    /// Missing blobs leave that piece empty. A malformed blob is discarded
    /// so the piece starts fresh, and the first such error is returned after
    /// the others have been loaded.
    pub fn load_zone(&mut self, store: &dyn KeyedStore, zone: &ZoneId) -> Result<(), PlannerError> {
        let mut first_error = None;

        let key = layout_key(zone);
        if let Some(blob) = store.load(&key) {
            match decode::<LayoutRecord>(&key, &blob) {
                Ok(record) => {
                    self.plans.insert(zone.clone(), record.into_plan(zone.clone()));
                }
                Err(err) => {
                    self.plans.remove(zone);
                    first_error.get_or_insert(err);
                }
            }
        }

        let key = traffic_key(zone);
        if let Some(blob) = store.load(&key) {
            match decode::<BTreeMap<String, TrafficRecord>>(&key, &blob) {
                Ok(snapshot) => {
                    self.traffic.restore(zone.clone(), snapshot);
                }
                Err(err) => {
                    self.traffic.restore(zone.clone(), BTreeMap::new());
                    first_error.get_or_insert(err);
                }
            }
        }

        let key = terrain_key(zone);
        if let Some(blob) = store.load(&key) {
            match decode::<TerrainAnalysis>(&key, &blob) {
                Ok(analysis) => {
                    let stored_at = analysis.last_analyzed;
                    self.terrain.restore(
                        zone.clone(),
                        CacheEntry {
                            value: analysis,
                            stored_at,
                        },
                    );
                    self.cost_grids.invalidate(zone);
                }
                Err(err) => {
                    self.terrain.invalidate(zone);
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Persist a zone's plan, traffic and terrain analysis.
    pub fn save_zone(&self, store: &mut dyn KeyedStore, zone: &ZoneId) -> Result<(), PlannerError> {
        if let Some(plan) = self.plans.get(zone) {
            let key = layout_key(zone);
            store.save(&key, encode(&key, &LayoutRecord::from_plan(plan))?);
        }

        let key = traffic_key(zone);
        store.save(&key, encode(&key, &self.traffic.export(zone))?);

        if let Some(entry) = self.terrain.entry(zone) {
            let key = terrain_key(zone);
            store.save(&key, encode(&key, &entry.value)?);
        }
        Ok(())
    }
}

/// Copy placement state from `previous` onto matching entries of `plan`,
/// and carry the road list over.
fn carry_state(previous: &ZonePlan, plan: &mut ZonePlan) {
    let state: BTreeMap<(Position, StructureKind), _> = previous
        .buildings
        .iter()
        .map(|b| ((b.position, b.kind), (b.placed, b.site_id.clone(), b.rebuild)))
        .collect();
    for building in &mut plan.buildings {
        if let Some((placed, site_id, rebuild)) = state.get(&(building.position, building.kind)) {
            building.placed = *placed;
            building.site_id.clone_from(site_id);
            building.rebuild = *rebuild;
        }
    }
    plan.roads.clone_from(&previous.roads);
    layout::refresh_status(plan);
}
