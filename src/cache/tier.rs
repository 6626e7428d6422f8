//! Bounded LRU+TTL tier.
//!
//! Recency order and capacity come from [`lru::LruCache`]; each value is wrapped
//! in a [`CacheEntry`] that carries its own expiry. Expired entries are dropped
//! lazily on read or in bulk by [`CacheTier::purge_expired`].

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::key::CacheKey;
use super::stats::{AtomicStats, TierStats};

/// One capacity-bounded, TTL-aware cache tier.
///
/// All map and recency mutations happen under a single short `Mutex` critical
/// section; counters are atomics and can be read without the lock. If a holder
/// of the lock panics, the next caller discards the possibly half-updated
/// contents and carries on with an empty tier.
pub struct CacheTier<V> {
    name: &'static str,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    stats: AtomicStats,
}

impl<V: Clone> CacheTier<V> {
    /// A zero `capacity` yields a tier that accepts stores and retains nothing.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let bound = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: "tier",
            capacity,
            ttl,
            clock: Arc::new(SystemClock),
            inner: Mutex::new(LruCache::new(bound)),
            stats: AtomicStats::new(),
        }
    }

    /// Label used in log events.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Looks up `key`, removing it if expired and promoting it on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut cache = self.lock("get");

        let expired = match cache.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.miss();
                return None;
            }
        };
        if expired {
            cache.pop(key);
            self.stats.expired(1);
            self.stats.miss();
            debug!(tier = self.name, key = ?key, "expired entry dropped on read");
            return None;
        }

        let entry = cache.get_mut(key)?;
        entry.touch(now);
        self.stats.hit();
        Some(entry.value.clone())
    }

    /// Stores `value` with the tier's default TTL.
    pub fn put(&self, key: CacheKey, value: V) {
        self.put_with_ttl(key, value, self.ttl);
    }

    /// Upserts `value`. An existing key gets the new value, a fresh TTL, and MRU
    /// position; a new key at capacity first evicts the least recently used entry.
    pub fn put_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        if self.capacity == 0 {
            return;
        }
        let now = self.clock.now();
        let mut cache = self.lock("put");

        if let Some(entry) = cache.get_mut(&key) {
            entry.refresh(value, now, ttl);
            return;
        }
        if let Some((evicted, _)) = cache.push(key, CacheEntry::new(value, now, ttl)) {
            if evicted != key {
                self.stats.evicted();
                debug!(tier = self.name, key = ?evicted, "evicted least recently used entry");
            }
        }
    }

    /// Removes `key` without touching the counters.
    pub fn remove(&self, key: &CacheKey) -> Option<V> {
        self.lock("remove").pop(key).map(CacheEntry::into_value)
    }

    /// Whether a live entry exists for `key`. Neither promotes nor counts.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now();
        let cache = self.lock("contains");
        let live = cache.peek(key).is_some_and(|entry| !entry.is_expired(now));
        live
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut cache = self.lock("purge_expired");
        let expired: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        let count = expired.len();
        if count > 0 {
            self.stats.expired(count as u64);
            debug!(tier = self.name, count, "purged expired entries");
        }
        count
    }

    /// Empties the tier. Counters are left as they are; see [`Self::reset_stats`].
    pub fn clear(&self) {
        self.lock("clear").clear();
    }
}

impl<V> CacheTier<V> {
    pub fn stats(&self) -> TierStats {
        self.stats.to_stats()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Takes the tier lock, recovering from poisoning by starting over empty.
    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry<V>>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            let mut cache = poisoned.into_inner();
            warn!(
                tier = self.name,
                op,
                dropped = cache.len(),
                "cache tier lock poisoned, discarding contents"
            );
            cache.clear();
            self.inner.clear_poison();
            cache
        })
    }
}

impl<V> fmt::Debug for CacheTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTier")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
