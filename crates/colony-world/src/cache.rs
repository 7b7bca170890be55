//! Per-zone derived-data cache with tick-based expiry.
//!
//! Terrain analyses and cost grids are expensive to rebuild and tolerate
//! staleness, so they live in a [`TtlCache`] keyed by zone. The clock is the
//! `now` tick passed in by the caller; nothing here reads ambient time.
//!
//! An entry stored at tick `t` with TTL `ttl` is served for every
//! `now <= t + ttl` and treated as absent from `t + ttl + 1` on.

use std::collections::BTreeMap;

use colony_types::ZoneId;
use serde::{Deserialize, Serialize};

/// A cached value with the tick it was stored at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    /// The cached value.
    pub value: V,
    /// Tick the value was stored.
    pub stored_at: u64,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is still fresh at `now`.
    pub const fn is_fresh(&self, now: u64, ttl: u64) -> bool {
        now.saturating_sub(self.stored_at) <= ttl
    }
}

/// Zone-keyed cache whose entries expire after `ttl` ticks.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: u64,
    entries: BTreeMap<ZoneId, CacheEntry<V>>,
}

impl<V> TtlCache<V> {
    /// Create an empty cache.
    pub const fn new(ttl: u64) -> Self {
        Self {
            ttl,
            entries: BTreeMap::new(),
        }
    }

    /// Configured time-to-live in ticks.
    pub const fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Fresh value for the zone, if any.
    pub fn get(&self, zone: &ZoneId, now: u64) -> Option<&V> {
        self.entries
            .get(zone)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| &entry.value)
    }

    /// Store a value for the zone, replacing any previous one.
    pub fn insert(&mut self, zone: ZoneId, value: V, now: u64) {
        self.entries.insert(
            zone,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    /// Restore a previously persisted entry without touching its timestamp.
    pub fn restore(&mut self, zone: ZoneId, entry: CacheEntry<V>) {
        self.entries.insert(zone, entry);
    }

    /// Raw entry for the zone regardless of freshness.
    pub fn entry(&self, zone: &ZoneId) -> Option<&CacheEntry<V>> {
        self.entries.get(zone)
    }

    /// Drop the zone's entry so the next lookup recomputes.
    pub fn invalidate(&mut self, zone: &ZoneId) -> bool {
        self.entries.remove(zone).is_some()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune(&mut self, now: u64) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Number of entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
