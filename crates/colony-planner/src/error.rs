//! Error types for the `colony-planner` crate.

use colony_types::ZoneId;
use colony_world::WorldError;

/// Errors a planner operation can report for one zone.
///
/// None of these are fatal to the tick: the orchestrator logs them and
/// moves on to the next zone.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Reading or analyzing the zone failed.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// The zone has no tier because the bot does not own it.
    #[error("zone {0} is not owned")]
    NotOwned(ZoneId),

    /// The zone has no plan yet.
    #[error("zone {0} has no plan")]
    NoPlan(ZoneId),

    /// A persisted blob did not decode, or state did not encode.
    #[error("persistence error for key {key}: {source}")]
    Persistence {
        /// Store key of the blob.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}
