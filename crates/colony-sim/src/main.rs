//! Simulation harness for the colony planner.
//!
//! Builds a synthetic zone, then drives the planner tick by tick while the
//! world finishes construction, decays structures, advances the zone's
//! tier, and a crew of units walks between the spawn and its work sites.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `colony-config.yaml`
//! 3. Build the synthetic zone from the configured seed
//! 4. Restore any saved planner state
//! 5. Run the tick loop
//! 6. Check that a fresh planner restores the same plan

mod scenario;
mod units;

use std::path::Path;

use anyhow::Context as _;
use colony_planner::{ColonyConfig, ColonyPlanner, MemoryStore, Unlimited};
use colony_types::StructureKind;
use colony_world::GridPathfinder;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::Evolution;
use crate::units::Crew;

/// Ticks between progress lines at `info`.
const REPORT_INTERVAL: u64 = 100;

/// Config file looked up in the working directory.
const CONFIG_PATH: &str = "colony-config.yaml";

fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("colony-sim starting");

    let config = load_config()?;
    let sim = &config.simulation;
    info!(
        ticks = sim.ticks,
        seed = sim.seed,
        units = sim.units,
        max_sites = config.planner.max_construction_sites,
        "Configuration loaded"
    );

    let mut rng = StdRng::seed_from_u64(sim.seed);
    let mut colony = scenario::build(&mut rng)?;
    let zone = colony.zone.clone();
    let zones = [zone.clone()];

    let mut planner = ColonyPlanner::new(config.planner.clone(), GridPathfinder::new());
    let mut store = MemoryStore::new();
    if let Err(e) = planner.load_zone(&store, &zone) {
        warn!(%zone, error = %e, "Saved state discarded");
    }

    let mut evolution = Evolution::new(sim);
    let mut crew = Crew::new(sim.units, &colony.landmarks);
    info!(units = crew.len(), "Crew assembled");

    for tick in 0..sim.ticks {
        let events = evolution.advance(&mut colony.world, &zone, tick, &mut rng);
        let summary = planner.run_tick(&mut colony.world, &zones, tick, &mut Unlimited);
        let moved = crew.step(&colony.world, &zone, &mut planner, tick);

        if let Err(e) = planner.save_zone(&mut store, &zone) {
            warn!(%zone, tick, error = %e, "Failed to save planner state");
        }

        match serde_json::to_string(&summary) {
            Ok(json) => debug!(tick, summary = %json, "Tick complete"),
            Err(e) => warn!(tick, error = %e, "Failed to encode tick summary"),
        }

        if tick.checked_rem(REPORT_INTERVAL) == Some(0) {
            info!(
                tick,
                placed = summary.sites_placed(),
                completed = events.completed,
                decayed = events.decayed,
                failed = summary.failed(),
                moved,
                "Progress"
            );
        }
    }

    let mut restored = ColonyPlanner::new(config.planner.clone(), GridPathfinder::new());
    restored
        .load_zone(&store, &zone)
        .context("restoring planner state")?;
    let round_trip = restored.plan(&zone) == planner.plan(&zone);
    if !round_trip {
        warn!(%zone, "Restored plan differs from the live plan");
    }

    let status = planner.plan(&zone).map(|p| p.status);
    info!(
        %zone,
        status = ?status,
        spawns = colony.world.count(&zone, StructureKind::Spawn),
        extensions = colony.world.count(&zone, StructureKind::Extension),
        containers = colony.world.count(&zone, StructureKind::Container),
        towers = colony.world.count(&zone, StructureKind::Tower),
        roads = colony.world.count(&zone, StructureKind::Road),
        store_bytes = store.bytes(),
        round_trip,
        "colony-sim finished"
    );
    Ok(())
}

/// `RUST_LOG` picks the filter (default `info`); `COLONY_LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("COLONY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load configuration from `colony-config.yaml`, falling back to defaults
/// when the file does not exist.
fn load_config() -> anyhow::Result<ColonyConfig> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        ColonyConfig::from_file(path).with_context(|| format!("loading {CONFIG_PATH}"))
    } else {
        info!("Config file not found, using defaults");
        Ok(ColonyConfig::default())
    }
}
