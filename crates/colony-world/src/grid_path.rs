//! 8-directional A* over a [`CostGrid`], for hosts without their own
//! pathfinding service.

use std::collections::HashMap;

use colony_types::Position;
use pathfinding::prelude::{astar, build_path, dijkstra_all};

use crate::cost_grid::CostGrid;
use crate::services::{PathResult, Pathfinder};

/// Grid pathfinder that stops on any cell within range 1 of the target.
///
/// Cells at [`crate::cost_grid::BLOCKED_COST`] are never entered. When the
/// target cannot be reached the result holds the path to the reachable cell
/// closest to it and is flagged incomplete.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPathfinder;

impl GridPathfinder {
    /// Create a pathfinder.
    pub const fn new() -> Self {
        Self
    }
}

impl Pathfinder for GridPathfinder {
    fn find_path(&self, from: Position, to: Position, costs: &CostGrid) -> PathResult {
        if from.distance_to(to) <= 1 {
            return PathResult::default();
        }

        let found = astar(
            &from,
            |p| successors(*p, costs),
            |p| u32::from(p.distance_to(to).saturating_sub(1)),
            |p| p.distance_to(to) <= 1,
        );
        if let Some((path, _cost)) = found {
            return PathResult {
                path: path.into_iter().skip(1).collect(),
                incomplete: false,
            };
        }

        // Unreachable: walk to the closest reachable cell instead.
        let parents = dijkstra_all(&from, |p| successors(*p, costs));
        let closest = closest_reached(&parents, to);
        let path = closest.map_or_else(Vec::new, |end| {
            build_path(&end, &parents).into_iter().skip(1).collect()
        });
        PathResult {
            path,
            incomplete: true,
        }
    }
}

fn successors(position: Position, costs: &CostGrid) -> Vec<(Position, u32)> {
    position
        .neighbors()
        .filter(|n| costs.is_passable(*n))
        .map(|n| (n, u32::from(costs.get(n))))
        .collect()
}

/// Reached cell nearest the target; ties go to the lowest path cost, then
/// row-major order.
fn closest_reached(parents: &HashMap<Position, (Position, u32)>, to: Position) -> Option<Position> {
    parents
        .iter()
        .min_by_key(|(p, (_, cost))| (p.distance_to(to), *cost, **p))
        .map(|(p, _)| *p)
}
