//! Plain-data records shared by the world model and the planner.
//!
//! Nothing here carries behavior beyond trivial accessors; all planning
//! logic lives in `colony-planner`. The records derive `Serialize` and
//! `Deserialize` so the persistence boundary can write them as-is.

use serde::{Deserialize, Serialize};

use crate::enums::{PathKind, PlanStatus, StructureKind};
use crate::grid::{Position, Tier};
use crate::ids::{SiteId, StructureId, ZoneId};

// ---------------------------------------------------------------------------
// Key positions
// ---------------------------------------------------------------------------

/// The fixed points of interest in a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPositions {
    /// Energy sources.
    pub sources: Vec<Position>,
    /// The zone controller, if any.
    pub controller: Option<Position>,
    /// The mineral deposit, if any.
    pub mineral: Option<Position>,
    /// Spawn-equivalent positions (built or planned spawns).
    pub spawns: Vec<Position>,
    /// Non-wall border cells.
    pub exits: Vec<Position>,
}

impl KeyPositions {
    /// Positions occupied by natural key objects (sources, controller,
    /// mineral). Nothing but an extractor may be planned on these.
    pub fn objects(&self) -> impl Iterator<Item = Position> + '_ {
        self.sources
            .iter()
            .copied()
            .chain(self.controller)
            .chain(self.mineral)
    }
}

// ---------------------------------------------------------------------------
// Observed world
// ---------------------------------------------------------------------------

/// A standing structure as reported by the world query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedStructure {
    /// Host-assigned identifier.
    pub id: StructureId,
    /// Structure kind.
    pub kind: StructureKind,
    /// Cell it stands on.
    pub position: Position,
    /// Whether the zone owner owns it.
    pub owned: bool,
}

/// A pending construction site as reported by the world query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedSite {
    /// Correlation id returned when the site was placed.
    pub id: SiteId,
    /// Kind under construction.
    pub kind: StructureKind,
    /// Cell of the site.
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// One intended structure in a zone plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStructure {
    /// Structure kind.
    pub kind: StructureKind,
    /// Target cell.
    pub position: Position,
    /// Construction priority; higher builds sooner.
    pub priority: u32,
    /// Tier the zone must reach before this may be placed.
    pub required_tier: Tier,
    /// Whether a site has been placed (or the structure adopted).
    pub placed: bool,
    /// Correlation id of the placed site, if the executor returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,
    /// Human-readable origin of the entry (template tier, dynamic rule).
    pub reason: String,
    /// Set when a previously placed entry vanished from the world.
    #[serde(default)]
    pub rebuild: bool,
}

/// One intended road cell in a zone plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoadSegment {
    /// Target cell.
    pub position: Position,
    /// Construction priority; higher builds sooner.
    pub priority: u32,
    /// Decayed traffic score at planning time.
    pub traffic_score: u32,
    /// Whether a site has been placed.
    pub placed: bool,
    /// Correlation id of the placed site, if the executor returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,
    /// Which kind of path produced this segment.
    pub path_kind: PathKind,
    /// Set when a previously placed segment vanished from the world.
    #[serde(default)]
    pub rebuild: bool,
}

/// The persisted set of intended structures and roads for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePlan {
    /// Zone this plan belongs to.
    pub zone: ZoneId,
    /// Tier the plan was created at.
    pub tier: Tier,
    /// Intended structures, priority-descending.
    pub buildings: Vec<PlannedStructure>,
    /// Intended road cells.
    pub roads: Vec<PlannedRoadSegment>,
    /// Lifecycle status.
    pub status: PlanStatus,
    /// Tick of the last mutation.
    pub last_updated: u64,
    /// Highest priority among unplaced buildings; 0 when nothing is pending.
    pub priority: u32,
}

impl ZonePlan {
    /// Create an empty plan in the `Planning` state.
    pub fn new(zone: ZoneId, tier: Tier, tick: u64) -> Self {
        Self {
            zone,
            tier,
            buildings: Vec::new(),
            roads: Vec::new(),
            status: PlanStatus::Planning,
            last_updated: tick,
            priority: 0,
        }
    }
}
