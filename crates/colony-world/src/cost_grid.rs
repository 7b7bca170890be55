//! Per-cell traversal costs handed to the pathfinding service.
//!
//! Costs follow the host's movement model:
//!
//! | Cell                                   | Cost |
//! |----------------------------------------|------|
//! | Natural wall                           | 255  |
//! | Swamp                                  | 5    |
//! | Plain                                  | 1    |
//! | Road, container, owned rampart         | 1    |
//! | Any other structure                    | 255  |
//!
//! Structure costs override terrain, so a road over swamp (or a tunnel
//! through a wall) costs 1.

use colony_types::{CELL_COUNT, Position, StructureKind, Terrain};

use crate::occupancy::Occupancy;
use crate::terrain::TerrainGrid;

/// Cost of an impassable cell.
pub const BLOCKED_COST: u8 = 255;
/// Cost of swamp.
pub const SWAMP_COST: u8 = 5;
/// Cost of plain ground and walkable structures.
pub const PLAIN_COST: u8 = 1;

/// Traversal cost of every cell in a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostGrid {
    costs: Vec<u8>,
}

impl CostGrid {
    /// Build the grid from terrain and the structures currently standing.
    pub fn build(terrain: &TerrainGrid, occupancy: &Occupancy) -> Self {
        let mut grid = Self {
            costs: Position::all()
                .map(|p| terrain_cost(terrain.get(p)))
                .collect(),
        };
        for (position, structures) in occupancy.iter() {
            let blocking = structures
                .iter()
                .any(|s| !(matches!(s.kind, StructureKind::Road | StructureKind::Container)
                    || (s.kind == StructureKind::Rampart && s.owned)));
            grid.set(position, if blocking { BLOCKED_COST } else { PLAIN_COST });
        }
        grid
    }

    /// A grid with the same cost everywhere.
    pub fn uniform(cost: u8) -> Self {
        Self {
            costs: vec![cost; CELL_COUNT],
        }
    }

    /// Cost of a cell. Missing cells read as blocked.
    pub fn get(&self, position: Position) -> u8 {
        self.costs
            .get(position.index())
            .copied()
            .unwrap_or(BLOCKED_COST)
    }

    /// Overwrite the cost of a cell.
    pub fn set(&mut self, position: Position, cost: u8) {
        if let Some(slot) = self.costs.get_mut(position.index()) {
            *slot = cost;
        }
    }

    /// Whether the cell can be entered at all.
    pub fn is_passable(&self, position: Position) -> bool {
        self.get(position) < BLOCKED_COST
    }
}

const fn terrain_cost(terrain: Terrain) -> u8 {
    match terrain {
        Terrain::Plain => PLAIN_COST,
        Terrain::Swamp => SWAMP_COST,
        Terrain::Wall => BLOCKED_COST,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_types::{ObservedStructure, StructureId};

    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn built(kind: StructureKind, at: Position, owned: bool) -> ObservedStructure {
        ObservedStructure {
            id: StructureId::new(format!("{kind:?}")),
            kind,
            position: at,
            owned,
        }
    }

    #[test]
    fn terrain_costs() {
        let mut terrain = TerrainGrid::filled(Terrain::Plain);
        terrain.set(pos(1, 1), Terrain::Wall);
        terrain.set(pos(2, 1), Terrain::Swamp);
        let grid = CostGrid::build(&terrain, &Occupancy::default());
        assert_eq!(grid.get(pos(1, 1)), BLOCKED_COST);
        assert_eq!(grid.get(pos(2, 1)), SWAMP_COST);
        assert_eq!(grid.get(pos(3, 1)), PLAIN_COST);
        assert!(!grid.is_passable(pos(1, 1)));
    }

    #[test]
    fn road_over_swamp_costs_one() {
        let mut terrain = TerrainGrid::filled(Terrain::Plain);
        terrain.set(pos(5, 5), Terrain::Swamp);
        let occ = Occupancy::from_parts(&[built(StructureKind::Road, pos(5, 5), true)], &[]);
        assert_eq!(CostGrid::build(&terrain, &occ).get(pos(5, 5)), PLAIN_COST);
    }

    #[test]
    fn structures_block_except_walkable_ones() {
        let terrain = TerrainGrid::filled(Terrain::Plain);
        let occ = Occupancy::from_parts(
            &[
                built(StructureKind::Extension, pos(1, 5), true),
                built(StructureKind::Container, pos(2, 5), true),
                built(StructureKind::Rampart, pos(3, 5), true),
                built(StructureKind::Rampart, pos(4, 5), false),
            ],
            &[],
        );
        let grid = CostGrid::build(&terrain, &occ);
        assert_eq!(grid.get(pos(1, 5)), BLOCKED_COST);
        assert_eq!(grid.get(pos(2, 5)), PLAIN_COST);
        assert_eq!(grid.get(pos(3, 5)), PLAIN_COST);
        assert_eq!(grid.get(pos(4, 5)), BLOCKED_COST);
    }
}
