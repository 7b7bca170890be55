//! Layout planner: what to build where, and when to place it.
//!
//! A plan is created from two sources and merged:
//!
//! 1. **Template placement** -- every catalog template up to the zone's
//!    tier, resolved against the anchor (the first spawn, or the terrain's
//!    central anchor before one exists). Entries on unsuitable cells or on
//!    the ring around a key object are dropped.
//! 2. **Dynamic placement** -- for every kind still short of its ceiling,
//!    the best cells in a search radius, scored per [`PLACEMENT_RULES`].
//!    Containers use [`crate::containers`]; the extractor goes on the
//!    mineral.
//!
//! The merged list is deduplicated by (position, kind), truncated to the
//! current ceilings and sorted priority-descending.
//!
//! # Lifecycle
//!
//! A zone re-enters planning when it has no plan, when its tier has risen
//! above the plan's, or when the plan holds more of a kind than the current
//! limits allow ([`replan_reason`]). Otherwise the plan is only mutated in
//! place by [`place_construction_sites`] and the reconciler.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use colony_types::{
    KeyPositions, PlanStatus, PlannedStructure, Position, StructureKind, Tier, ZoneId, ZonePlan,
};
use colony_world::catalog;
use colony_world::terrain::{buildable_area, suitable_for};
use colony_world::{ConstructionExecutor, Occupancy, TerrainAnalysis};
use tracing::{debug, info, warn};

use crate::containers::source_containers;
use crate::sites::{Attempt, PlacementReport, attempt_all};

// ---------------------------------------------------------------------------
// Replanning
// ---------------------------------------------------------------------------

/// Why a zone needs a fresh plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanReason {
    /// The zone has never been planned.
    NoPlan,
    /// The zone's tier rose above the plan's.
    TierAdvanced {
        /// Tier recorded in the plan.
        from: Tier,
        /// Current zone tier.
        to: Tier,
    },
    /// The plan holds more of a kind than the current limits allow.
    LimitViolation {
        /// Offending kind.
        kind: StructureKind,
        /// Entries of that kind in the plan.
        planned: u32,
        /// Current ceiling.
        limit: u32,
    },
}

impl core::fmt::Display for ReplanReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoPlan => write!(f, "no plan"),
            Self::TierAdvanced { from, to } => write!(f, "tier advanced {from} -> {to}"),
            Self::LimitViolation {
                kind,
                planned,
                limit,
            } => write!(f, "{planned} {kind:?} planned, limit {limit}"),
        }
    }
}

/// Whether the zone must be replanned, and why.
pub fn replan_reason(plan: Option<&ZonePlan>, tier: Tier) -> Option<ReplanReason> {
    let Some(plan) = plan else {
        return Some(ReplanReason::NoPlan);
    };
    if tier > plan.tier {
        return Some(ReplanReason::TierAdvanced {
            from: plan.tier,
            to: tier,
        });
    }
    kind_counts(&plan.buildings)
        .into_iter()
        .find_map(|(kind, planned)| {
            let limit = catalog::limit(kind, tier);
            (planned > limit).then_some(ReplanReason::LimitViolation {
                kind,
                planned,
                limit,
            })
        })
}

fn kind_counts(buildings: &[PlannedStructure]) -> BTreeMap<StructureKind, u32> {
    let mut counts = BTreeMap::new();
    for b in buildings {
        let slot = counts.entry(b.kind).or_insert(0_u32);
        *slot = slot.saturating_add(1);
    }
    counts
}

/// Recompute `status` and `priority` from the entries.
///
/// No unplaced entries means complete; some placed and some not means
/// building; nothing placed means ready.
pub fn refresh_status(plan: &mut ZonePlan) {
    let placed = plan
        .buildings
        .iter()
        .map(|b| b.placed)
        .chain(plan.roads.iter().map(|r| r.placed));
    let (mut done, mut pending) = (0_usize, 0_usize);
    for p in placed {
        if p {
            done = done.saturating_add(1);
        } else {
            pending = pending.saturating_add(1);
        }
    }
    plan.status = match (done, pending) {
        (_, 0) => PlanStatus::Complete,
        (0, _) => PlanStatus::Ready,
        _ => PlanStatus::Building,
    };
    plan.priority = plan
        .buildings
        .iter()
        .filter(|b| !b.placed)
        .map(|b| b.priority)
        .max()
        .unwrap_or(0);
}

// ---------------------------------------------------------------------------
// Dynamic placement rules
// ---------------------------------------------------------------------------

/// Where a dynamic search is centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAnchor {
    /// The terrain analysis' central anchor.
    Central,
    /// The zone's geometric center.
    ZoneCenter,
    /// The first spawn-equivalent position, else the central anchor.
    FirstSpawn,
}

/// How candidate cells are ranked; higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// `-2 * dist(controller) - sum(dist(source))`.
    SpawnAccess,
    /// `-dist(zone center)`.
    CenterProximity,
    /// `-dist(first spawn)`.
    SpawnProximity,
}

/// Search parameters for one structure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRule {
    /// Kind the rule applies to.
    pub kind: StructureKind,
    /// Chebyshev search radius around the anchor.
    pub radius: u8,
    /// Search center.
    pub anchor: RuleAnchor,
    /// Ranking of candidate cells.
    pub scoring: Scoring,
}

const fn rule(
    kind: StructureKind,
    radius: u8,
    anchor: RuleAnchor,
    scoring: Scoring,
) -> PlacementRule {
    PlacementRule {
        kind,
        radius,
        anchor,
        scoring,
    }
}

/// Per-kind dynamic placement parameters. Kinds not listed use
/// [`DEFAULT_RADIUS`] around the first spawn, ranked by spawn proximity.
pub const PLACEMENT_RULES: &[PlacementRule] = &[
    rule(StructureKind::Spawn, 10, RuleAnchor::Central, Scoring::SpawnAccess),
    rule(StructureKind::Extension, 8, RuleAnchor::FirstSpawn, Scoring::SpawnProximity),
    rule(StructureKind::Tower, 15, RuleAnchor::ZoneCenter, Scoring::CenterProximity),
    rule(StructureKind::Storage, 5, RuleAnchor::Central, Scoring::SpawnProximity),
    rule(StructureKind::Terminal, 5, RuleAnchor::Central, Scoring::SpawnProximity),
    rule(StructureKind::Lab, 8, RuleAnchor::FirstSpawn, Scoring::SpawnProximity),
];

/// Search radius for kinds without an explicit rule.
pub const DEFAULT_RADIUS: u8 = 10;

/// The rule for `kind`.
pub fn rule_for(kind: StructureKind) -> PlacementRule {
    PLACEMENT_RULES
        .iter()
        .find(|r| r.kind == kind)
        .copied()
        .unwrap_or_else(|| {
            rule(
                kind,
                DEFAULT_RADIUS,
                RuleAnchor::FirstSpawn,
                Scoring::SpawnProximity,
            )
        })
}

/// Whether the dynamic search may place `kind`. Roads, ramparts and walls
/// never are; containers and the extractor have their own rules.
const fn is_dynamic(kind: StructureKind) -> bool {
    !matches!(
        kind,
        StructureKind::Road
            | StructureKind::Rampart
            | StructureKind::Wall
            | StructureKind::Container
            | StructureKind::Extractor
    )
}

/// Priority of a dynamically placed structure: kinds unlocked longer ago
/// grow more urgent.
pub fn dynamic_priority(kind: StructureKind, tier: Tier) -> u32 {
    let tiers_since = tier.level().saturating_sub(kind.min_tier().level());
    kind.base_priority()
        .saturating_add(u32::from(tiers_since).saturating_mul(2))
}

/// Lowest tier whose ceiling admits an `nth` structure of `kind`.
fn unlock_tier(kind: StructureKind, nth: u32) -> Tier {
    Tier::all()
        .find(|t| catalog::limit(kind, *t) >= nth)
        .unwrap_or(Tier::MAX)
}

// ---------------------------------------------------------------------------
// Plan creation
// ---------------------------------------------------------------------------

/// Built spawns, pending spawn sites and the analysis' spawns, row-major.
pub fn spawn_equivalents(keys: &KeyPositions, occupancy: &Occupancy) -> Vec<Position> {
    let mut spawns: BTreeSet<Position> = keys.spawns.iter().copied().collect();
    spawns.extend(occupancy.positions_of(StructureKind::Spawn));
    spawns.extend(occupancy.sites_of(StructureKind::Spawn));
    spawns.into_iter().collect()
}

/// Cells on or next to a source, the controller or the mineral.
fn reserved_cells(keys: &KeyPositions) -> BTreeSet<Position> {
    keys.objects().flat_map(|p| p.within(1)).collect()
}

/// Everything the layout planner reads about a zone for one pass.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    /// Zone being planned.
    pub zone: &'a ZoneId,
    /// Current zone tier.
    pub tier: Tier,
    /// Cached terrain analysis.
    pub analysis: &'a TerrainAnalysis,
    /// Structures and sites observed this pass.
    pub occupancy: &'a Occupancy,
}

impl LayoutInput<'_> {
    fn is_available(&self, position: Position, kind: StructureKind) -> bool {
        self.occupancy.has_structure(position, kind)
            || self.occupancy.has_site(position, kind)
            || suitable_for(&self.analysis.terrain, self.occupancy, position, kind)
    }
}

/// Build a fresh plan for the zone at its current tier.
pub fn create_plan(input: &LayoutInput<'_>, tick: u64) -> ZonePlan {
    let keys = &input.analysis.key_positions;
    let spawns = spawn_equivalents(keys, input.occupancy);
    let anchor = spawns.first().copied().unwrap_or(input.analysis.anchor);
    let reserved = reserved_cells(keys);

    let mut entries = template_entries(input, anchor, &reserved);
    let mut claimed: BTreeSet<Position> = entries.iter().map(|e| e.position).collect();

    let containers = source_containers(
        &input.analysis.terrain,
        input.occupancy,
        keys,
        input.tier,
        catalog::limit(StructureKind::Container, input.tier),
        &claimed,
    );
    claimed.extend(containers.iter().map(|c| c.position));
    entries.extend(containers);

    if let Some(extractor) = extractor_entry(input) {
        claimed.insert(extractor.position);
        entries.push(extractor);
    }

    for kind in StructureKind::ALL.into_iter().filter(|k| is_dynamic(*k)) {
        let extra = dynamic_entries(input, kind, anchor, &spawns, &entries, &reserved, &claimed);
        claimed.extend(extra.iter().map(|e| e.position));
        entries.extend(extra);
    }

    let mut plan = ZonePlan::new(input.zone.clone(), input.tier, tick);
    plan.buildings = merge(entries, input.tier);
    refresh_status(&mut plan);
    debug!(
        zone = %input.zone,
        tier = %input.tier,
        %anchor,
        buildings = plan.buildings.len(),
        "Layout created"
    );
    plan
}

fn template_entries(
    input: &LayoutInput<'_>,
    anchor: Position,
    reserved: &BTreeSet<Position>,
) -> Vec<PlannedStructure> {
    let mut entries = Vec::new();
    for tier in input.tier.up_to() {
        let template = catalog::template(tier);
        if let Err(err) = catalog::validate(&template) {
            warn!(zone = %input.zone, %tier, %err, "Skipping invalid template");
            continue;
        }
        for placement in catalog::apply(&template, anchor) {
            if reserved.contains(&placement.position)
                || !input.is_available(placement.position, placement.kind)
            {
                continue;
            }
            entries.push(PlannedStructure {
                kind: placement.kind,
                position: placement.position,
                priority: placement.priority,
                required_tier: placement.tier,
                placed: false,
                site_id: None,
                reason: format!("template tier {tier}"),
                rebuild: false,
            });
        }
    }
    entries
}

fn extractor_entry(input: &LayoutInput<'_>) -> Option<PlannedStructure> {
    let kind = StructureKind::Extractor;
    if catalog::limit(kind, input.tier) == 0 {
        return None;
    }
    let mineral = input.analysis.key_positions.mineral?;
    Some(PlannedStructure {
        kind,
        position: mineral,
        priority: dynamic_priority(kind, input.tier),
        required_tier: kind.min_tier(),
        placed: false,
        site_id: None,
        reason: String::from("extractor on mineral"),
        rebuild: false,
    })
}

fn dynamic_entries(
    input: &LayoutInput<'_>,
    kind: StructureKind,
    template_anchor: Position,
    spawns: &[Position],
    planned: &[PlannedStructure],
    reserved: &BTreeSet<Position>,
    claimed: &BTreeSet<Position>,
) -> Vec<PlannedStructure> {
    let limit = catalog::limit(kind, input.tier);
    let mut existing: BTreeSet<Position> = planned
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.position)
        .collect();
    let planned_count = u32::try_from(existing.len()).unwrap_or(u32::MAX);

    // Standing structures and sites outside the template stay in the plan
    // so the reconciler keeps watching them.
    let mut standing: BTreeSet<Position> =
        input.occupancy.positions_of(kind).into_iter().collect();
    standing.extend(input.occupancy.sites_of(kind));
    let mut entries: Vec<PlannedStructure> = standing
        .difference(&existing)
        .copied()
        .zip(planned_count.saturating_add(1)..)
        .map(|(position, nth)| adopted_entry(input, kind, position, nth))
        .collect();
    existing.extend(entries.iter().map(|e| e.position));

    let have = u32::try_from(existing.len()).unwrap_or(u32::MAX);
    let deficit = limit.saturating_sub(have);
    if deficit == 0 {
        return entries;
    }

    let rule = rule_for(kind);
    let keys = &input.analysis.key_positions;
    let first_spawn = spawns.first().copied().unwrap_or(input.analysis.anchor);
    let center = match rule.anchor {
        RuleAnchor::Central => input.analysis.anchor,
        RuleAnchor::ZoneCenter => Position::CENTER,
        RuleAnchor::FirstSpawn => first_spawn,
    };
    let parity = checker_parity(template_anchor);

    let area = buildable_area(&input.analysis.terrain, center, rule.radius);
    let mut candidates: Vec<(i32, Position)> = area
        .into_iter()
        .filter(|p| {
            p.is_interior()
                && checker_parity(*p) == parity
                && !claimed.contains(p)
                && !reserved.contains(p)
                && !existing.contains(p)
                && suitable_for(&input.analysis.terrain, input.occupancy, *p, kind)
        })
        .map(|p| (score(rule.scoring, p, keys, first_spawn), p))
        .collect();
    candidates.sort_by_key(|(score, p)| (Reverse(*score), *p));

    let wanted = usize::try_from(deficit).unwrap_or(usize::MAX);
    if candidates.len() < wanted {
        debug!(
            zone = %input.zone,
            ?kind,
            wanted,
            found = candidates.len(),
            "Not enough cells for dynamic placement"
        );
    }

    entries.extend(
        candidates
            .into_iter()
            .take(wanted)
            .zip(have.saturating_add(1)..)
            .map(|((_, position), nth)| PlannedStructure {
                kind,
                position,
                priority: dynamic_priority(kind, input.tier),
                required_tier: unlock_tier(kind, nth),
                placed: false,
                site_id: None,
                reason: format!("dynamic {kind:?}"),
                rebuild: false,
            }),
    );
    entries
}

/// Plan entry for a structure or site of `kind` already standing at
/// `position`, marked placed.
fn adopted_entry(
    input: &LayoutInput<'_>,
    kind: StructureKind,
    position: Position,
    nth: u32,
) -> PlannedStructure {
    let site_id = input
        .occupancy
        .site_at(position)
        .filter(|(site_kind, _)| *site_kind == kind)
        .map(|(_, id)| id.clone());
    PlannedStructure {
        kind,
        position,
        priority: dynamic_priority(kind, input.tier),
        required_tier: unlock_tier(kind, nth),
        placed: true,
        site_id,
        reason: format!("existing {kind:?}"),
        rebuild: false,
    }
}

/// Checkerboard colour of a cell; structures share the anchor's colour so
/// the other colour stays free for roads.
const fn checker_parity(position: Position) -> bool {
    ((position.x ^ position.y) & 1) == 0
}

fn score(scoring: Scoring, position: Position, keys: &KeyPositions, first_spawn: Position) -> i32 {
    let dist = |other: Position| i32::from(position.distance_to(other));
    match scoring {
        Scoring::SpawnAccess => {
            let controller = keys.controller.map_or(0, |c| dist(c).saturating_mul(2));
            let sources: i32 = keys.sources.iter().map(|s| dist(*s)).sum();
            controller.saturating_add(sources).saturating_neg()
        }
        Scoring::CenterProximity => dist(Position::CENTER).saturating_neg(),
        Scoring::SpawnProximity => dist(first_spawn).saturating_neg(),
    }
}

/// Deduplicate by (position, kind) keeping the higher priority, truncate
/// each kind to its ceiling and sort priority-descending with position and
/// kind as tie-breaks.
///
/// Truncation drops unplaced entries before placed ones, lowest priority
/// first.
pub fn merge(entries: Vec<PlannedStructure>, tier: Tier) -> Vec<PlannedStructure> {
    let mut unique: BTreeMap<(Position, StructureKind), PlannedStructure> = BTreeMap::new();
    for entry in entries {
        let key = (entry.position, entry.kind);
        match unique.get(&key) {
            Some(kept) if kept.priority >= entry.priority => {}
            _ => {
                unique.insert(key, entry);
            }
        }
    }

    let mut merged: Vec<PlannedStructure> = unique.into_values().collect();
    merged.sort_by_key(|e| (!e.placed, Reverse(e.priority), e.position, e.kind));

    let mut per_kind: BTreeMap<StructureKind, u32> = BTreeMap::new();
    merged.retain(|e| {
        let count = per_kind.entry(e.kind).or_insert(0);
        *count = count.saturating_add(1);
        *count <= catalog::limit(e.kind, tier)
    });
    merged.sort_by_key(|e| (Reverse(e.priority), e.position, e.kind));
    merged
}

// ---------------------------------------------------------------------------
// Construction budgeting
// ---------------------------------------------------------------------------

/// Place construction sites for the plan's highest-priority unplaced
/// entries.
///
/// Entries whose structure (or a site for it) already stands are adopted
/// without spending budget. The budget is `max_sites` minus the zone's
/// pending sites; at most that many placements are attempted, over
/// tier-eligible entries on unblocked cells, highest priority first.
pub fn place_construction_sites(
    plan: &mut ZonePlan,
    tier: Tier,
    occupancy: &Occupancy,
    executor: &mut dyn ConstructionExecutor,
    max_sites: u32,
    tick: u64,
) -> PlacementReport {
    let mut report = PlacementReport::default();

    for entry in plan.buildings.iter_mut().filter(|b| !b.placed) {
        let site = occupancy
            .site_at(entry.position)
            .filter(|(kind, _)| *kind == entry.kind)
            .map(|(_, id)| id.clone());
        if site.is_some() || occupancy.has_structure(entry.position, entry.kind) {
            entry.placed = true;
            entry.site_id = site;
            entry.rebuild = false;
            report.adopted = report.adopted.saturating_add(1);
        }
    }

    let pending = u32::try_from(occupancy.pending_sites()).unwrap_or(u32::MAX);
    let budget = usize::try_from(max_sites.saturating_sub(pending)).unwrap_or(0);

    let mut queue: Vec<Attempt> = plan
        .buildings
        .iter()
        .enumerate()
        .filter(|(_, b)| {
            !b.placed && b.required_tier <= tier && !occupancy.is_blocked(b.position)
        })
        .map(|(index, b)| Attempt {
            index,
            position: b.position,
            kind: b.kind,
        })
        .collect();
    queue.sort_by_key(|a| {
        let priority = plan.buildings.get(a.index).map_or(0, |b| b.priority);
        (Reverse(priority), a.position, a.kind)
    });

    let unplaced = plan.buildings.iter().filter(|b| !b.placed).count();
    report.skipped = unplaced.saturating_sub(queue.len());

    if budget == 0 {
        report.skipped = unplaced;
    } else {
        let buildings = &mut plan.buildings;
        attempt_all(&plan.zone, executor, &queue, budget, &mut report, |index, site| {
            if let Some(entry) = buildings.get_mut(index) {
                entry.placed = true;
                entry.site_id = site;
                entry.rebuild = false;
            }
        });
    }

    if report.placed > 0 || report.adopted > 0 {
        plan.last_updated = tick;
    }
    refresh_status(plan);
    if report.placed > 0 || report.failed > 0 {
        info!(
            zone = %plan.zone,
            placed = report.placed,
            adopted = report.adopted,
            failed = report.failed,
            skipped = report.skipped,
            "Structure sites placed"
        );
    }
    report
}
