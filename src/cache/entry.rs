//! Cached value with its timing metadata.

use std::time::{Duration, Instant};

/// A value held by a tier, plus creation, expiry, and last-access instants.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    /// `None` when `created_at + ttl` is not representable; such entries never expire.
    pub expires_at: Option<Instant>,
    pub last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now.checked_add(ttl),
            last_accessed: now,
        }
    }

    /// Expired once `expires_at <= now`, so a zero TTL is always expired.
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
    }

    /// Replaces the value and restarts the TTL from `now`.
    pub fn refresh(&mut self, value: V, now: Instant, ttl: Duration) {
        self.value = value;
        self.created_at = now;
        self.expires_at = now.checked_add(ttl);
        self.last_accessed = now;
    }

    pub fn into_value(self) -> V {
        self.value
    }
}
