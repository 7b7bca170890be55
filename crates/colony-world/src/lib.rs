//! World model for the colony layout planner.
//!
//! Everything the planner knows about a zone comes through this crate:
//! terrain analysis, traversal costs, the structure catalog, traffic
//! statistics and the host service seams.
//!
//! # Modules
//!
//! - [`services`] -- Host service traits (world query, zone controller,
//!   construction executor, pathfinder)
//! - [`terrain`] -- Full-grid terrain scan, key positions, central anchor,
//!   cell suitability
//! - [`occupancy`] -- Per-pass snapshot of structures and pending sites
//! - [`cost_grid`] -- Traversal costs for path search
//! - [`cache`] -- Zone-keyed TTL cache for derived data
//! - [`catalog`] -- Per-tier templates and structure-count limits
//! - [`traffic`] -- Time-decayed per-cell movement statistics
//! - [`grid_path`] -- A* pathfinder over a cost grid
//! - [`sandbox`] -- In-memory world implementing every service trait
//! - [`error`] -- World, placement and catalog errors

pub mod cache;
pub mod catalog;
pub mod cost_grid;
pub mod error;
pub mod grid_path;
pub mod occupancy;
pub mod sandbox;
pub mod services;
pub mod terrain;
pub mod traffic;

pub use cache::{CacheEntry, TtlCache};
pub use catalog::{Template, TemplateEntry, TemplatePlacement};
pub use cost_grid::CostGrid;
pub use error::{CatalogError, PlacementError, WorldError};
pub use grid_path::GridPathfinder;
pub use occupancy::Occupancy;
pub use sandbox::SandboxWorld;
pub use services::{ConstructionExecutor, PathResult, Pathfinder, WorldQuery, ZoneController};
pub use terrain::{TerrainAnalysis, TerrainGrid};
pub use traffic::{TrafficRecord, TrafficTracker};
