//! Layout and road planning for a colony's zones.
//!
//! Given a zone's terrain, its development tier and what already stands in
//! it, the planner decides which structures to build where, lays a road
//! network over observed traffic, and spends a small per-tick budget of
//! construction sites on the most valuable pending work. Plans persist
//! across ticks and are reconciled against the world on a slow cadence.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with per-field defaults
//! - [`layout`] -- Template and dynamic placement, replan detection,
//!   structure site budgeting
//! - [`containers`] -- Containers beside sources, controller and mineral
//! - [`roads`] -- Road network planning, merging and inside-out placement
//! - [`reconcile`] -- Diff of placed entries against the world
//! - [`planner`] -- Per-tick orchestrator with cadences and a tick budget
//! - [`store`] -- Keyed JSON persistence of plans, traffic and terrain
//! - [`error`] -- Planner errors

pub mod config;
pub mod containers;
pub mod error;
pub mod layout;
pub mod planner;
pub mod reconcile;
pub mod roads;
mod sites;
pub mod store;

pub use config::{ColonyConfig, ConfigError, PlannerConfig, SimulationConfig};
pub use error::PlannerError;
pub use layout::{LayoutInput, ReplanReason};
pub use planner::{
    ColonyPlanner, Host, Step, StepBudget, TickBudget, TickSummary, Unlimited, ZoneReport,
};
pub use reconcile::ReconcileReport;
pub use roads::{RoadInput, RoadMerge};
pub use sites::PlacementReport;
pub use store::{KeyedStore, LayoutRecord, MemoryStore};
