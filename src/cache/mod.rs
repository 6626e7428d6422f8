//! # Result Cache Module
//!
//! Dual-tier, content-addressed LRU+TTL cache that sits between request
//! handlers and the inference backends, so repeated analysis requests are served
//! without recomputation.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResultCache`] | Facade: routes single vs batch lookups, no-ops when disabled, merges stats |
//! | [`CacheTier`] | One bounded, thread-safe LRU+TTL store |
//! | [`KeyBuilder`] | SHA-256 fingerprints of (model, task, threshold, text(s)) |
//! | [`CacheKey`] | 32-byte fingerprint |
//! | [`TierStats`] / [`CacheStatsSnapshot`] | Hit/miss/eviction counters |
//! | [`Clock`] | Time source; [`ManualClock`] for tests |
//!
//! ## Example
//!
//! ```rust
//! use sentiment_cache::cache::{LookupParams, ResultCache};
//! use sentiment_cache::config::CacheConfig;
//! use sentiment_cache::types::TaskType;
//!
//! let cache: ResultCache<String, Vec<String>> =
//!     ResultCache::from_config(&CacheConfig::memory()).unwrap();
//! let params = LookupParams::new("vader", TaskType::Sentiment);
//!
//! if cache.lookup_single(&params, "what a day").is_none() {
//!     let computed = "positive".to_string(); // call the backend here
//!     cache.store_single(&params, "what a day", computed);
//! }
//! assert_eq!(cache.stats_snapshot().single.stats.misses, 1);
//! ```
//!
//! ## Semantics
//!
//! - TTL is fixed from the most recent store of a key, not sliding on reads.
//! - An entry is expired once `expires_at <= now`, so a zero TTL never hits.
//! - Concurrent misses on the same key may both compute; the later store wins.

mod clock;
mod entry;
mod key;
mod manager;
mod stats;
mod tier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, KeyBuilder, KEY_LEN};
pub use manager::{LookupParams, ResultCache, SharedResultCache};
pub use stats::{CacheStatsSnapshot, TierSnapshot, TierStats};
pub use tier::CacheTier;
