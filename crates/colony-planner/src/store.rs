//! Persistence boundary: per-zone JSON blobs in a keyed store.
//!
//! Each zone persists three blobs:
//!
//! | Key              | Contents                                       |
//! |------------------|------------------------------------------------|
//! | `layout:<zone>`  | [`LayoutRecord`]                               |
//! | `traffic:<zone>` | `"x,y"` -> [`TrafficRecord`]                   |
//! | `terrain:<zone>` | [`TerrainAnalysis`]                            |
//!
//! Plans and caches are plain data; JSON happens only here.

use std::collections::BTreeMap;

use colony_types::{PlanStatus, PlannedRoadSegment, PlannedStructure, Tier, ZoneId, ZonePlan};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// Host-provided string key-value storage.
pub trait KeyedStore {
    /// Blob stored under `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Store `blob` under `key`, replacing any previous value.
    fn save(&mut self, key: &str, blob: String);
}

/// In-memory [`KeyedStore`] for tests and the simulation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            blobs: BTreeMap::new(),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Total stored bytes.
    pub fn bytes(&self) -> usize {
        self.blobs
            .values()
            .map(String::len)
            .fold(0, usize::saturating_add)
    }
}

impl KeyedStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn save(&mut self, key: &str, blob: String) {
        self.blobs.insert(key.to_string(), blob);
    }
}

/// Key of a zone's layout blob.
pub fn layout_key(zone: &ZoneId) -> String {
    format!("layout:{zone}")
}

/// Key of a zone's traffic blob.
pub fn traffic_key(zone: &ZoneId) -> String {
    format!("traffic:{zone}")
}

/// Key of a zone's terrain blob.
pub fn terrain_key(zone: &ZoneId) -> String {
    format!("terrain:{zone}")
}

/// Persisted form of a [`ZonePlan`]; the zone lives in the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    /// Tier the plan was created at.
    pub tier: Tier,
    /// Intended structures.
    pub buildings: Vec<PlannedStructure>,
    /// Intended road cells.
    pub roads: Vec<PlannedRoadSegment>,
    /// Lifecycle status.
    pub status: PlanStatus,
    /// Tick of the last mutation.
    pub last_updated: u64,
    /// Highest priority among unplaced buildings.
    pub priority: u32,
}

impl LayoutRecord {
    /// Snapshot a plan.
    pub fn from_plan(plan: &ZonePlan) -> Self {
        Self {
            tier: plan.tier,
            buildings: plan.buildings.clone(),
            roads: plan.roads.clone(),
            status: plan.status,
            last_updated: plan.last_updated,
            priority: plan.priority,
        }
    }

    /// Rebuild the plan for `zone`.
    pub fn into_plan(self, zone: ZoneId) -> ZonePlan {
        ZonePlan {
            zone,
            tier: self.tier,
            buildings: self.buildings,
            roads: self.roads,
            status: self.status,
            last_updated: self.last_updated,
            priority: self.priority,
        }
    }
}

/// Serialize a value for `key`.
///
/// # Errors
///
/// Returns [`PlannerError::Persistence`] if serialization fails.
pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, PlannerError> {
    serde_json::to_string(value).map_err(|source| PlannerError::Persistence {
        key: key.to_string(),
        source,
    })
}

/// Deserialize the blob stored under `key`.
///
/// # Errors
///
/// Returns [`PlannerError::Persistence`] if the blob is malformed.
pub fn decode<T: DeserializeOwned>(key: &str, blob: &str) -> Result<T, PlannerError> {
    serde_json::from_str(blob).map_err(|source| PlannerError::Persistence {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use colony_types::{PathKind, Position, StructureKind};

    use super::*;

    fn plan() -> ZonePlan {
        let mut plan = ZonePlan::new(ZoneId::new("W1N1"), Tier::new(3).unwrap(), 10);
        plan.buildings.push(PlannedStructure {
            kind: StructureKind::Tower,
            position: Position::new(25, 27).unwrap(),
            priority: 95,
            required_tier: Tier::new(3).unwrap(),
            placed: true,
            site_id: None,
            reason: "template tier 3".to_string(),
            rebuild: false,
        });
        plan.roads.push(PlannedRoadSegment {
            position: Position::new(26, 25).unwrap(),
            priority: 100,
            traffic_score: 4,
            placed: false,
            site_id: None,
            path_kind: PathKind::Source,
            rebuild: true,
        });
        plan
    }

    #[test]
    fn keys_are_prefixed() {
        let zone = ZoneId::new("E3S7");
        assert_eq!(layout_key(&zone), "layout:E3S7");
        assert_eq!(traffic_key(&zone), "traffic:E3S7");
        assert_eq!(terrain_key(&zone), "terrain:E3S7");
    }

    #[test]
    fn layout_record_uses_camel_case() {
        let blob = encode("layout:W1N1", &LayoutRecord::from_plan(&plan())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(json["lastUpdated"], 10);
        assert_eq!(json["roads"][0]["pathKind"], "source");
        assert!(json.get("zone").is_none());
    }

    #[test]
    fn layout_record_restores_plan() {
        let original = plan();
        let blob = encode("layout:W1N1", &LayoutRecord::from_plan(&original)).unwrap();
        let record: LayoutRecord = decode("layout:W1N1", &blob).unwrap();
        assert_eq!(record.into_plan(ZoneId::new("W1N1")), original);
    }

    #[test]
    fn malformed_blob_names_the_key() {
        let err = decode::<LayoutRecord>("layout:W1N1", "{not json").unwrap_err();
        assert!(matches!(err, PlannerError::Persistence { ref key, .. } if key == "layout:W1N1"));
    }

    #[test]
    fn memory_store_overwrites() {
        let mut store = MemoryStore::new();
        store.save("a", "1".to_string());
        store.save("a", "22".to_string());
        assert_eq!(store.load("a").as_deref(), Some("22"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 2);
        assert!(store.load("b").is_none());
    }
}
