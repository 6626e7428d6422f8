//! # sentiment-cache
//!
//! Result cache for a sentiment-analysis request service.
//!
//! Inference is the expensive part of serving an analysis request, and the same
//! texts are submitted over and over. This crate puts a dual-tier,
//! content-addressed LRU+TTL cache between request handlers and the inference
//! backends so that repeated requests are answered without recomputation, while
//! never mixing results across models, task types, thresholds, or single-vs-batch
//! call shapes.
//!
//! ## Key Features
//!
//! - **Content-addressed keys**: SHA-256 over a length-prefixed encoding of the
//!   full lookup identity ([`cache::KeyBuilder`])
//! - **Two isolated tiers**: single-text and batch lookups never see each other
//! - **Bounded and predictable**: O(1) LRU (`lru` crate) with fixed TTL per entry
//! - **Fail-open**: an internal cache fault is a miss, never a request error
//! - **Zero-cost when disabled**: the `none` backend skips hashing and locking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sentiment_cache::cache::ResultCache;
//! use sentiment_cache::config::Settings;
//!
//! fn main() -> sentiment_cache::Result<()> {
//!     let settings = Settings::from_env()?;
//!     sentiment_cache::logging::init_logging(&settings.logging);
//!
//!     let cache: Arc<ResultCache> = Arc::new(ResultCache::from_config(&settings.cache)?);
//!     // hand `cache` to every request-handling path, e.g. via CachedAnalyzer
//!     println!("{:?}", cache.stats_snapshot());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Keys, tiers, facade, and statistics |
//! | [`analyzer`] | Cache-aside request path over a pluggable inference backend |
//! | [`config`] | Settings from `QT_*` environment variables or YAML |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`types`] | Request and result types |

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod logging;
pub mod types;

pub use analyzer::{CachedAnalyzer, SentimentBackend};
pub use cache::{CacheStatsSnapshot, ResultCache};
pub use config::Settings;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
