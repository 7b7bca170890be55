//! Per-cell movement statistics, decayed over time.
//!
//! Units report each cell they step on through [`TrafficTracker::record`].
//! The road planner reads the decayed score to promote busy cells to road
//! candidates. Records older than the TTL score zero and are dropped by the
//! next [`TrafficTracker::prune`].

use std::collections::{BTreeMap, BTreeSet};

use colony_types::{Position, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Visit statistics for one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    /// Number of recorded visits.
    pub count: u32,
    /// Tick of the latest visit.
    pub last_seen: u64,
    /// Unit roles observed on the cell.
    pub roles: BTreeSet<String>,
}

impl TrafficRecord {
    /// Visit count scaled by the remaining fraction of the TTL.
    ///
    /// `floor(count * (ttl - age) / ttl)`, zero once `age >= ttl`.
    pub fn score(&self, now: u64, ttl: u64) -> u32 {
        let age = now.saturating_sub(self.last_seen);
        let Some(remaining) = ttl.checked_sub(age).filter(|r| *r > 0) else {
            return 0;
        };
        let scaled = u64::from(self.count)
            .saturating_mul(remaining)
            .checked_div(ttl)
            .unwrap_or(0);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// Whether the record has outlived the TTL.
    pub const fn is_expired(&self, now: u64, ttl: u64) -> bool {
        now.saturating_sub(self.last_seen) > ttl
    }
}

/// Per-zone traffic maps.
#[derive(Debug, Clone)]
pub struct TrafficTracker {
    ttl: u64,
    zones: BTreeMap<ZoneId, BTreeMap<Position, TrafficRecord>>,
}

impl TrafficTracker {
    /// Create an empty tracker whose records decay over `ttl` ticks.
    pub const fn new(ttl: u64) -> Self {
        Self {
            ttl,
            zones: BTreeMap::new(),
        }
    }

    /// Configured decay window.
    pub const fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Count a visit by a unit with `role` at `position`.
    pub fn record(&mut self, zone: &ZoneId, position: Position, role: &str, now: u64) {
        let record = self
            .zones
            .entry(zone.clone())
            .or_default()
            .entry(position)
            .or_default();
        record.count = record.count.saturating_add(1);
        record.last_seen = now;
        if !record.roles.contains(role) {
            record.roles.insert(role.to_owned());
        }
    }

    /// Raw record for a cell.
    pub fn get(&self, zone: &ZoneId, position: Position) -> Option<&TrafficRecord> {
        self.zones.get(zone)?.get(&position)
    }

    /// Decayed score of a cell, zero when never visited.
    pub fn score(&self, zone: &ZoneId, position: Position, now: u64) -> u32 {
        self.get(zone, position)
            .map_or(0, |record| record.score(now, self.ttl))
    }

    /// Cells visited at least `min_count` times and not yet expired, with
    /// their decayed scores, row-major.
    pub fn high_traffic(&self, zone: &ZoneId, min_count: u32, now: u64) -> Vec<(Position, u32)> {
        let Some(cells) = self.zones.get(zone) else {
            return Vec::new();
        };
        cells
            .iter()
            .filter(|(_, r)| r.count >= min_count && !r.is_expired(now, self.ttl))
            .map(|(p, r)| (*p, r.score(now, self.ttl)))
            .collect()
    }

    /// Drop expired records and empty zones. Returns how many records were
    /// removed.
    pub fn prune(&mut self, now: u64) -> usize {
        let ttl = self.ttl;
        let mut removed: usize = 0;
        for (zone, cells) in &mut self.zones {
            let before = cells.len();
            cells.retain(|_, r| !r.is_expired(now, ttl));
            let dropped = before.saturating_sub(cells.len());
            if dropped > 0 {
                debug!(%zone, dropped, remaining = cells.len(), "Traffic pruned");
            }
            removed = removed.saturating_add(dropped);
        }
        self.zones.retain(|_, cells| !cells.is_empty());
        removed
    }

    /// Number of tracked cells in a zone.
    pub fn len(&self, zone: &ZoneId) -> usize {
        self.zones.get(zone).map_or(0, BTreeMap::len)
    }

    /// Snapshot of a zone's map keyed by `"x,y"` for persistence.
    pub fn export(&self, zone: &ZoneId) -> BTreeMap<String, TrafficRecord> {
        self.zones
            .get(zone)
            .map(|cells| {
                cells
                    .iter()
                    .map(|(p, r)| (p.key(), r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace a zone's map from a persisted snapshot. Keys that do not
    /// parse as positions are skipped. Returns how many records were
    /// restored.
    pub fn restore(&mut self, zone: ZoneId, snapshot: BTreeMap<String, TrafficRecord>) -> usize {
        let cells: BTreeMap<Position, TrafficRecord> = snapshot
            .into_iter()
            .filter_map(|(key, record)| Position::from_key(&key).map(|p| (p, record)))
            .collect();
        let restored = cells.len();
        if cells.is_empty() {
            self.zones.remove(&zone);
        } else {
            self.zones.insert(zone, cells);
        }
        restored
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn zone() -> ZoneId {
        ZoneId::new("W1N1")
    }

    #[test]
    fn record_accumulates_and_tags() {
        let mut tracker = TrafficTracker::new(100);
        tracker.record(&zone(), pos(5, 5), "harvester", 10);
        tracker.record(&zone(), pos(5, 5), "hauler", 12);
        tracker.record(&zone(), pos(5, 5), "hauler", 13);
        let record = tracker.get(&zone(), pos(5, 5)).unwrap();
        assert_eq!(record.count, 3);
        assert_eq!(record.last_seen, 13);
        assert_eq!(record.roles.len(), 2);
    }

    #[test]
    fn score_decays_linearly_to_zero() {
        let record = TrafficRecord {
            count: 40,
            last_seen: 100,
            roles: BTreeSet::new(),
        };
        assert_eq!(record.score(100, 100), 40);
        assert_eq!(record.score(150, 100), 20);
        assert_eq!(record.score(175, 100), 10);
        assert_eq!(record.score(199, 100), 0);
        assert_eq!(record.score(200, 100), 0);
        assert_eq!(record.score(500, 100), 0);
    }

    #[test]
    fn zero_ttl_scores_nothing() {
        let record = TrafficRecord {
            count: 5,
            last_seen: 0,
            roles: BTreeSet::new(),
        };
        assert_eq!(record.score(0, 0), 0);
    }

    #[test]
    fn high_traffic_filters_by_count() {
        let mut tracker = TrafficTracker::new(100);
        for _ in 0..12 {
            tracker.record(&zone(), pos(10, 10), "hauler", 50);
        }
        tracker.record(&zone(), pos(11, 10), "hauler", 50);
        let busy = tracker.high_traffic(&zone(), 10, 50);
        assert_eq!(busy, vec![(pos(10, 10), 12)]);
        assert!(tracker.high_traffic(&ZoneId::new("other"), 1, 50).is_empty());
    }

    #[test]
    fn prune_removes_expired_and_empty_zones() {
        let mut tracker = TrafficTracker::new(10);
        tracker.record(&zone(), pos(1, 1), "a", 0);
        tracker.record(&zone(), pos(2, 2), "a", 5);
        assert_eq!(tracker.prune(10), 0);
        assert_eq!(tracker.prune(11), 1);
        assert_eq!(tracker.len(&zone()), 1);
        assert_eq!(tracker.prune(16), 1);
        assert_eq!(tracker.len(&zone()), 0);
        assert!(tracker.export(&zone()).is_empty());
    }

    #[test]
    fn export_and_restore_use_position_keys() {
        let mut tracker = TrafficTracker::new(100);
        tracker.record(&zone(), pos(7, 3), "builder", 4);
        let snapshot = tracker.export(&zone());
        assert!(snapshot.contains_key("7,3"));

        let mut restored = TrafficTracker::new(100);
        let mut with_junk = snapshot.clone();
        with_junk.insert(String::from("nope"), TrafficRecord::default());
        assert_eq!(restored.restore(zone(), with_junk), 1);
        assert_eq!(restored.get(&zone(), pos(7, 3)).unwrap().count, 1);
    }
}
