//! Error types for the `colony-world` crate.
//!
//! Analysis failures surface as [`WorldError`]; construction attempts that
//! the host rejects surface as [`PlacementError`]. Catalog authoring
//! mistakes surface as [`CatalogError`].

use colony_types::{Position, StructureKind, Tier, ZoneId};

/// Errors that can occur while reading or analyzing a zone.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The zone is not visible to the host this tick.
    #[error("zone not visible: {0}")]
    ZoneNotVisible(ZoneId),

    /// Terrain could not be read for a cell.
    #[error("terrain unavailable in zone {zone} at {position}")]
    TerrainUnavailable {
        /// The zone being read.
        zone: ZoneId,
        /// The cell that failed.
        position: Position,
    },

    /// A serialized terrain grid did not decode.
    #[error("malformed terrain grid: {reason}")]
    MalformedTerrain {
        /// What was wrong with the encoding.
        reason: String,
    },
}

/// Reasons the construction executor refuses a placement.
///
/// Every variant is transient from the planner's point of view: the entry
/// stays unplaced and is retried on a later tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The zone's tier does not allow another structure of this kind.
    #[error("tier {tier} does not allow another {kind:?}")]
    TierTooLow {
        /// Requested kind.
        kind: StructureKind,
        /// Current zone tier.
        tier: Tier,
    },

    /// Something already stands or is pending at the cell.
    #[error("cell {0} is occupied")]
    Occupied(Position),

    /// The host-wide pending site cap is reached.
    #[error("construction site cap reached")]
    SiteCapReached,

    /// The cell cannot hold this kind (wall, out of bounds, ...).
    #[error("cannot place {kind:?} at {position}")]
    Invalid {
        /// Requested kind.
        kind: StructureKind,
        /// Requested cell.
        position: Position,
    },

    /// The zone is not owned by the bot.
    #[error("not authorized to build in zone {0}")]
    Unauthorized(ZoneId),
}

/// Authoring-time inconsistencies in the structure catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// A template places more of a kind than its tier allows.
    #[error("tier {tier} template places {count} {kind:?}, limit is {limit}")]
    LimitExceeded {
        /// Template tier.
        tier: Tier,
        /// Offending kind.
        kind: StructureKind,
        /// Count in the template.
        count: u32,
        /// Ceiling for that tier.
        limit: u32,
    },

    /// A template lists the same offset twice.
    #[error("tier {tier} template repeats offset ({dx}, {dy})")]
    DuplicateOffset {
        /// Template tier.
        tier: Tier,
        /// Horizontal offset.
        dx: i8,
        /// Vertical offset.
        dy: i8,
    },
}
