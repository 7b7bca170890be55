//! The synthetic zone and the world-side rules of the simulation.
//!
//! The planner only places construction sites. Everything else a live host
//! would do happens here, once per tick and before the planner runs:
//!
//! - sites older than `build_ticks` turn into structures
//! - every standing structure except the spawn decays with probability
//!   `decay_chance`
//! - the zone's tier rises by one every `tier_interval` ticks, up to 8

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use anyhow::Context as _;
use colony_planner::SimulationConfig;
use colony_types::{Position, SiteId, StructureKind, Terrain, Tier, ZoneId};
use colony_world::{SandboxWorld, TerrainGrid, WorldQuery, ZoneController};
use rand::Rng;
use tracing::{debug, info};

/// Name of the simulated zone.
pub const ZONE_NAME: &str = "W7N3";

/// Random wall boulders scattered over open ground.
const BOULDERS: usize = 40;

/// Boulders keep this Chebyshev distance from every landmark.
const BOULDER_CLEARANCE: u8 = 3;

/// Fixed objects of the synthetic zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmarks {
    /// The colony's first spawn.
    pub spawn: Position,
    /// Energy sources.
    pub sources: Vec<Position>,
    /// Zone controller.
    pub controller: Position,
    /// Mineral deposit.
    pub mineral: Position,
}

impl Landmarks {
    fn standard() -> anyhow::Result<Self> {
        let at = |x, y| Position::new(x, y).context("landmark outside the zone");
        Ok(Self {
            spawn: at(26, 26)?,
            sources: vec![at(12, 8)?, at(40, 20)?],
            controller: at(22, 40)?,
            mineral: at(8, 22)?,
        })
    }

    fn all(&self) -> impl Iterator<Item = Position> + '_ {
        self.sources
            .iter()
            .copied()
            .chain([self.spawn, self.controller, self.mineral])
    }
}

/// A ready-to-run sandbox world with one owned zone.
#[derive(Debug)]
pub struct Colony {
    /// The world the planner acts on.
    pub world: SandboxWorld,
    /// The simulated zone.
    pub zone: ZoneId,
    /// Where things are.
    pub landmarks: Landmarks,
}

/// Build the synthetic zone: walled borders with four exits, a ridge, a
/// rock block, two swamps, seeded boulders, and the landmarks at tier 1.
pub fn build(rng: &mut impl Rng) -> anyhow::Result<Colony> {
    let landmarks = Landmarks::standard()?;
    let terrain = terrain(&landmarks, rng);
    let zone = ZoneId::new(ZONE_NAME);

    let mut world = SandboxWorld::new();
    world.add_zone(zone.clone(), terrain, 1);
    world.set_sources(&zone, landmarks.sources.clone());
    world.set_controller(&zone, Some(landmarks.controller));
    world.set_mineral(&zone, Some(landmarks.mineral));
    world
        .add_structure(&zone, StructureKind::Spawn, landmarks.spawn)
        .context("placing the first spawn")?;

    info!(
        %zone,
        spawn = %landmarks.spawn,
        sources = landmarks.sources.len(),
        "Synthetic zone built"
    );
    Ok(Colony {
        world,
        zone,
        landmarks,
    })
}

fn is_exit(position: Position) -> bool {
    let Position { x, y } = position;
    (y == 0 && (20..=28).contains(&x))
        || (x == 0 && (22..=28).contains(&y))
        || (x == 49 && (10..=15).contains(&y))
        || (y == 49 && (30..=36).contains(&x))
}

fn fill(grid: &mut TerrainGrid, xs: RangeInclusive<u8>, ys: RangeInclusive<u8>, terrain: Terrain) {
    for y in ys {
        for x in xs.clone() {
            if let Some(p) = Position::new(x, y) {
                grid.set(p, terrain);
            }
        }
    }
}

fn terrain(landmarks: &Landmarks, rng: &mut impl Rng) -> TerrainGrid {
    let mut grid = TerrainGrid::filled(Terrain::Plain);
    for p in Position::all().filter(|p| p.is_border() && !is_exit(*p)) {
        grid.set(p, Terrain::Wall);
    }

    fill(&mut grid, 15..=15, 5..=20, Terrain::Wall);
    fill(&mut grid, 35..=40, 35..=40, Terrain::Wall);
    fill(&mut grid, 8..=14, 35..=44, Terrain::Swamp);
    fill(&mut grid, 30..=34, 18..=22, Terrain::Swamp);

    for _ in 0..BOULDERS {
        let x = rng.random_range(2..48_u8);
        let y = rng.random_range(2..48_u8);
        let Some(p) = Position::new(x, y) else {
            continue;
        };
        if landmarks.all().all(|l| l.distance_to(p) > BOULDER_CLEARANCE) {
            grid.set(p, Terrain::Wall);
        }
    }
    for l in landmarks.all() {
        grid.set(l, Terrain::Plain);
    }
    grid
}

// ---------------------------------------------------------------------------
// World evolution
// ---------------------------------------------------------------------------

/// What the world did on its own this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldEvents {
    /// Sites that finished building.
    pub completed: usize,
    /// Structures lost to decay.
    pub decayed: usize,
    /// New tier, when it changed.
    pub tier_changed: Option<Tier>,
}

/// Host-side rules: construction time, decay and tier growth.
#[derive(Debug, Clone)]
pub struct Evolution {
    build_ticks: u64,
    decay_chance: f64,
    tier_interval: u64,
    first_seen: BTreeMap<SiteId, u64>,
}

impl Evolution {
    /// Rules from the simulation config.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            build_ticks: config.build_ticks,
            decay_chance: config.decay_chance.clamp(0.0, 1.0),
            tier_interval: config.tier_interval,
            first_seen: BTreeMap::new(),
        }
    }

    /// Tier the zone should hold at `tick`.
    pub fn tier_at(&self, tick: u64) -> Tier {
        let steps = tick.checked_div(self.tier_interval).unwrap_or(0);
        let level = u8::try_from(steps.saturating_add(1)).unwrap_or(u8::MAX);
        Tier::clamped(level)
    }

    /// Apply one tick of construction, decay and growth.
    pub fn advance(
        &mut self,
        world: &mut SandboxWorld,
        zone: &ZoneId,
        tick: u64,
        rng: &mut impl Rng,
    ) -> WorldEvents {
        let mut events = WorldEvents::default();

        let sites = world.construction_sites(zone);
        let live: BTreeSet<&SiteId> = sites.iter().map(|s| &s.id).collect();
        self.first_seen.retain(|id, _| live.contains(id));
        for site in &sites {
            let seen = *self.first_seen.entry(site.id.clone()).or_insert(tick);
            if tick.saturating_sub(seen) >= self.build_ticks
                && world.complete_site(zone, &site.id).is_some()
            {
                self.first_seen.remove(&site.id);
                events.completed = events.completed.saturating_add(1);
            }
        }

        for structure in world.structures(zone) {
            if structure.kind == StructureKind::Spawn || !rng.random_bool(self.decay_chance) {
                continue;
            }
            if world.remove_structure_by_id(zone, &structure.id) {
                debug!(
                    %zone,
                    tick,
                    kind = ?structure.kind,
                    position = %structure.position,
                    "Structure decayed"
                );
                events.decayed = events.decayed.saturating_add(1);
            }
        }

        let tier = self.tier_at(tick);
        if world.tier(zone) != Some(tier) {
            world.set_tier(zone, tier.level());
            info!(%zone, tick, %tier, "Zone tier advanced");
            events.tier_changed = Some(tier);
        }
        events
    }
}
