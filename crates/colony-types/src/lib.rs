//! Shared type definitions for the colony layout planner.
//!
//! This crate is the single source of truth for the plain-data types that
//! flow between the world model, the planner, and the persistence boundary.
//!
//! # Modules
//!
//! - [`ids`] -- Newtype wrappers for zone, site and structure identifiers
//! - [`grid`] -- [`Position`] on the 50x50 zone grid and the [`Tier`] level
//! - [`enums`] -- Terrain, structure kinds, plan status, road path kinds
//! - [`structs`] -- Key positions, observed world records, plan records

pub mod enums;
pub mod grid;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{PathKind, PlanStatus, StructureKind, Terrain};
pub use grid::{CELL_COUNT, GRID_MAX, GRID_SIZE, NEIGHBOR_OFFSETS, Position, Tier};
pub use ids::{SiteId, StructureId, ZoneId};
pub use structs::{
    KeyPositions, ObservedSite, ObservedStructure, PlannedRoadSegment, PlannedStructure, ZonePlan,
};
