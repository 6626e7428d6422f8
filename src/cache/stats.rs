//! Hit/miss/eviction counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed (lazily on read or via purge).
    pub expirations: u64,
}

impl TierStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Snapshot of one tier as reported to the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSnapshot {
    #[serde(flatten)]
    pub stats: TierStats,
    pub hit_ratio: f64,
    pub size: usize,
    pub capacity: usize,
}

/// Merged view of both tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub enabled: bool,
    pub backend: String,
    pub single: TierSnapshot,
    pub batch: TierSnapshot,
}

impl CacheStatsSnapshot {
    pub fn total(&self) -> TierStats {
        TierStats {
            hits: self.single.stats.hits + self.batch.stats.hits,
            misses: self.single.stats.misses + self.batch.stats.misses,
            evictions: self.single.stats.evictions + self.batch.stats.evictions,
            expirations: self.single.stats.expirations + self.batch.stats.expirations,
        }
    }

    /// Pretty-printed JSON, as served by a status endpoint.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Lock-free counters; read without taking the tier lock.
#[derive(Debug, Default)]
pub(crate) struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl AtomicStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self, n: u64) {
        self.expirations.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn to_stats(&self) -> TierStats {
        TierStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}
