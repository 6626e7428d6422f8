//! Cache facade.

use std::sync::Arc;

use tracing::info;

use super::clock::{Clock, SystemClock};
use super::key::KeyBuilder;
use super::stats::{CacheStatsSnapshot, TierSnapshot};
use super::tier::CacheTier;
use crate::config::CacheConfig;
use crate::types::{BatchSentimentResult, SentimentResult, TaskType};
use crate::Result;

/// Identity of a lookup apart from its text(s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupParams<'a> {
    /// Resolved backend identifier (already defaulted and lower-cased).
    pub model: &'a str,
    pub task_type: TaskType,
    pub threshold: Option<f64>,
}

impl<'a> LookupParams<'a> {
    pub fn new(model: &'a str, task_type: TaskType) -> Self {
        Self {
            model,
            task_type,
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }
}

struct Tiers<S, B> {
    keys: KeyBuilder,
    single: CacheTier<S>,
    batch: CacheTier<B>,
}

/// The only cache surface request handlers use.
///
/// Single-text lookups go to the single tier and batch lookups to the batch
/// tier; the two are never cross-consulted. When built from a `none` backend the
/// facade holds no tiers and every call returns immediately, without hashing,
/// locking, or touching counters.
pub struct ResultCache<S = SentimentResult, B = BatchSentimentResult> {
    inner: Option<Tiers<S, B>>,
}

pub type SharedResultCache = Arc<ResultCache>;

impl<S: Clone, B: Clone> ResultCache<S, B> {
    /// A facade that caches nothing.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds from `config`, using `clock` for all TTL decisions.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        if !config.is_enabled() {
            info!(backend = config.backend.as_str(), "result cache disabled");
            return Ok(Self::disabled());
        }

        let keys = match config.key_salt {
            Some(ref salt) => KeyBuilder::new().with_salt(salt.clone()),
            None => KeyBuilder::new(),
        };
        let ttl = config.ttl();
        let single = CacheTier::new(config.single_capacity(), ttl)
            .with_name("single")
            .with_clock(Arc::clone(&clock));
        let batch = CacheTier::new(config.batch_capacity(), ttl)
            .with_name("batch")
            .with_clock(clock);

        info!(
            backend = config.backend.as_str(),
            ttl_secs = ttl.as_secs(),
            single_capacity = single.capacity(),
            batch_capacity = batch.capacity(),
            "result cache initialised"
        );
        Ok(Self {
            inner: Some(Tiers {
                keys,
                single,
                batch,
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        if self.is_enabled() {
            "memory"
        } else {
            "none"
        }
    }

    pub fn lookup_single(&self, params: &LookupParams<'_>, text: &str) -> Option<S> {
        let tiers = self.inner.as_ref()?;
        let key = tiers.keys.single_key(
            params.model,
            params.task_type.as_str(),
            text,
            params.threshold,
        );
        tiers.single.get(&key)
    }

    pub fn store_single(&self, params: &LookupParams<'_>, text: &str, value: S) {
        let Some(tiers) = self.inner.as_ref() else {
            return;
        };
        let key = tiers.keys.single_key(
            params.model,
            params.task_type.as_str(),
            text,
            params.threshold,
        );
        tiers.single.put(key, value);
    }

    pub fn lookup_batch<T: AsRef<str>>(&self, params: &LookupParams<'_>, texts: &[T]) -> Option<B> {
        let tiers = self.inner.as_ref()?;
        let key = tiers.keys.batch_key(
            params.model,
            params.task_type.as_str(),
            texts,
            params.threshold,
        );
        tiers.batch.get(&key)
    }

    pub fn store_batch<T: AsRef<str>>(&self, params: &LookupParams<'_>, texts: &[T], value: B) {
        let Some(tiers) = self.inner.as_ref() else {
            return;
        };
        let key = tiers.keys.batch_key(
            params.model,
            params.task_type.as_str(),
            texts,
            params.threshold,
        );
        tiers.batch.put(key, value);
    }

    /// Empties both tiers; counters survive.
    pub fn clear(&self) {
        if let Some(tiers) = self.inner.as_ref() {
            tiers.single.clear();
            tiers.batch.clear();
        }
    }

    pub fn purge_expired(&self) -> usize {
        match self.inner.as_ref() {
            Some(tiers) => tiers.single.purge_expired() + tiers.batch.purge_expired(),
            None => 0,
        }
    }
}

impl<S, B> ResultCache<S, B> {
    pub fn reset_stats(&self) {
        if let Some(tiers) = self.inner.as_ref() {
            tiers.single.reset_stats();
            tiers.batch.reset_stats();
        }
    }

    pub fn stats_snapshot(&self) -> CacheStatsSnapshot {
        match self.inner.as_ref() {
            Some(tiers) => CacheStatsSnapshot {
                enabled: true,
                backend: "memory".to_string(),
                single: tier_snapshot(&tiers.single),
                batch: tier_snapshot(&tiers.batch),
            },
            None => CacheStatsSnapshot {
                enabled: false,
                backend: "none".to_string(),
                single: TierSnapshot::default(),
                batch: TierSnapshot::default(),
            },
        }
    }

    pub fn single_tier(&self) -> Option<&CacheTier<S>> {
        self.inner.as_ref().map(|t| &t.single)
    }

    pub fn batch_tier(&self) -> Option<&CacheTier<B>> {
        self.inner.as_ref().map(|t| &t.batch)
    }
}

impl<S, B> std::fmt::Debug for ResultCache<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.inner.is_some())
            .field("single", &self.single_tier())
            .field("batch", &self.batch_tier())
            .finish()
    }
}

fn tier_snapshot<V>(tier: &CacheTier<V>) -> TierSnapshot {
    let stats = tier.stats();
    TierSnapshot {
        stats,
        hit_ratio: stats.hit_ratio(),
        size: tier.len(),
        capacity: tier.capacity(),
    }
}
