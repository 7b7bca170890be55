//! Mobile units shuttling between the spawn and their work targets.
//!
//! Units exist only to generate traffic. Each one walks a grid path to its
//! target, walks back, and repeats, reporting every cell it stands on to
//! the planner's traffic tracker. Paths are recomputed at the start of each
//! leg so new roads and structures are taken into account.

use colony_planner::ColonyPlanner;
use colony_types::{Position, ZoneId};
use colony_world::{CostGrid, GridPathfinder, Occupancy, Pathfinder, SandboxWorld};

use crate::scenario::Landmarks;

/// One walking unit.
#[derive(Debug, Clone)]
struct Unit {
    role: &'static str,
    home: Position,
    target: Position,
    at: Position,
    outbound: bool,
    path: Vec<Position>,
    cursor: usize,
}

impl Unit {
    fn destination(&self) -> Position {
        if self.outbound { self.target } else { self.home }
    }
}

/// Every unit in the zone.
#[derive(Debug, Clone)]
pub struct Crew {
    units: Vec<Unit>,
    pathfinder: GridPathfinder,
}

impl Crew {
    /// `count` units starting at the spawn, assigned round-robin to the
    /// sources and then the controller.
    pub fn new(count: u32, landmarks: &Landmarks) -> Self {
        let targets: Vec<(&'static str, Position)> = landmarks
            .sources
            .iter()
            .map(|s| ("harvester", *s))
            .chain([("upgrader", landmarks.controller)])
            .collect();
        let units = targets
            .iter()
            .cycle()
            .take(usize::try_from(count).unwrap_or(0))
            .map(|&(role, target)| Unit {
                role,
                home: landmarks.spawn,
                target,
                at: landmarks.spawn,
                outbound: true,
                path: Vec::new(),
                cursor: 0,
            })
            .collect();
        Self {
            units,
            pathfinder: GridPathfinder::new(),
        }
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Move every unit one cell and record where it stands. Returns how
    /// many units moved.
    pub fn step<P: Pathfinder>(
        &mut self,
        world: &SandboxWorld,
        zone: &ZoneId,
        planner: &mut ColonyPlanner<P>,
        tick: u64,
    ) -> usize {
        let Some(terrain) = world.terrain(zone) else {
            return 0;
        };
        let mut costs: Option<CostGrid> = None;
        let mut moved = 0_usize;

        for unit in &mut self.units {
            if unit.cursor >= unit.path.len() {
                if unit.at.distance_to(unit.destination()) <= 1 {
                    unit.outbound = !unit.outbound;
                }
                let grid = costs.get_or_insert_with(|| {
                    CostGrid::build(terrain, &Occupancy::observe(world, zone))
                });
                unit.path = self
                    .pathfinder
                    .find_path(unit.at, unit.destination(), grid)
                    .path;
                unit.cursor = 0;
            }
            let Some(next) = unit.path.get(unit.cursor).copied() else {
                continue;
            };
            unit.at = next;
            unit.cursor = unit.cursor.saturating_add(1);
            planner.record(zone, next, unit.role, tick);
            moved = moved.saturating_add(1);
        }
        moved
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_planner::PlannerConfig;
    use colony_types::Terrain;
    use colony_world::TerrainGrid;

    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn landmarks() -> Landmarks {
        Landmarks {
            spawn: pos(25, 25),
            sources: vec![pos(25, 15)],
            controller: pos(35, 25),
            mineral: pos(10, 10),
        }
    }

    fn world() -> (SandboxWorld, ZoneId) {
        let zone = ZoneId::new("W1N1");
        let mut world = SandboxWorld::new();
        world.add_zone(zone.clone(), TerrainGrid::filled(Terrain::Plain), 1);
        (world, zone)
    }

    #[test]
    fn roles_cycle_over_targets() {
        let crew = Crew::new(3, &landmarks());
        let roles: Vec<&str> = crew.units.iter().map(|u| u.role).collect();
        assert_eq!(roles, vec!["harvester", "upgrader", "harvester"]);
        assert_eq!(crew.len(), 3);
    }

    #[test]
    fn walking_records_traffic() {
        let (world, zone) = world();
        let mut planner = ColonyPlanner::new(PlannerConfig::default(), GridPathfinder::new());
        let mut crew = Crew::new(1, &landmarks());
        for tick in 0..5 {
            assert_eq!(crew.step(&world, &zone, &mut planner, tick), 1);
        }
        assert_eq!(planner.traffic().len(&zone), 5);
        let at = crew.units.first().unwrap().at;
        let record = planner.traffic().get(&zone, at).unwrap();
        assert!(record.roles.contains("harvester"));
        assert_eq!(record.last_seen, 4);
    }

    #[test]
    fn units_turn_around_at_the_target() {
        let (world, zone) = world();
        let mut planner = ColonyPlanner::new(PlannerConfig::default(), GridPathfinder::new());
        let mut crew = Crew::new(1, &landmarks());
        // Nine steps out, then the walk home starts.
        for tick in 0..12 {
            crew.step(&world, &zone, &mut planner, tick);
        }
        let unit = crew.units.first().unwrap();
        assert!(!unit.outbound);
        assert!(unit.at.distance_to(pos(25, 15)) > 1);
    }
}
