//! Cache-aside request path.
//!
//! [`CachedAnalyzer`] is what a request handler calls: it validates the request,
//! resolves the model, consults the [`ResultCache`], and only on a miss calls the
//! [`SentimentBackend`], storing the fresh result before returning it.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheStatsSnapshot, LookupParams, ResultCache};
use crate::config::ServiceConfig;
use crate::types::{
    BatchSentimentRequest, BatchSentimentResult, SentimentRequest, SentimentResult, TaskType,
};
use crate::{Error, ErrorContext, Result};

/// Upper bound on concurrent per-item backend calls when a model has no native batch path.
pub const PER_ITEM_CONCURRENCY: usize = 8;

/// Model that single-text analyses fall back to when graceful degradation is on.
pub const FALLBACK_MODEL: &str = "vader";

/// An inference backend. Implementations live outside this crate.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    async fn analyze(
        &self,
        model: &str,
        text: &str,
        task_type: TaskType,
        threshold: Option<f64>,
    ) -> Result<SentimentResult>;

    /// Whether `model` has a native batch path. When false, batches are analyzed item by item.
    fn supports_batch(&self, _model: &str) -> bool {
        false
    }

    async fn analyze_batch(
        &self,
        model: &str,
        texts: &[String],
        task_type: TaskType,
        threshold: Option<f64>,
    ) -> Result<BatchSentimentResult> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.analyze(model, text, task_type, threshold).await?);
        }
        Ok(BatchSentimentResult::new(results, elapsed_ms(start)))
    }
}

pub struct CachedAnalyzer {
    backend: Arc<dyn SentimentBackend>,
    cache: Arc<ResultCache>,
    service: ServiceConfig,
}

impl CachedAnalyzer {
    pub fn new(
        backend: Arc<dyn SentimentBackend>,
        cache: Arc<ResultCache>,
        service: ServiceConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            service,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn stats_snapshot(&self) -> CacheStatsSnapshot {
        self.cache.stats_snapshot()
    }

    /// Request override if given, else the configured default; lower-cased.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.service.model_default.as_str())
            .to_lowercase()
    }

    pub async fn analyze(&self, req: &SentimentRequest) -> Result<SentimentResult> {
        self.check_text("text", &req.text)?;
        let model = self.resolve_model(req.model.as_deref());
        let params = LookupParams::new(&model, req.task_type).with_threshold(req.threshold);
        self.analyze_one(&params, &req.text).await
    }

    pub async fn analyze_batch(&self, req: &BatchSentimentRequest) -> Result<BatchSentimentResult> {
        if req.texts.is_empty() {
            return Err(Error::validation_with_context(
                "batch must contain at least one text",
                ErrorContext::new()
                    .with_field_path("texts")
                    .with_source("analyzer"),
            ));
        }
        if req.texts.len() > self.service.batch_size_limit {
            return Err(Error::validation_with_context(
                format!(
                    "batch size {} exceeds limit {}",
                    req.texts.len(),
                    self.service.batch_size_limit
                ),
                ErrorContext::new()
                    .with_field_path("texts")
                    .with_source("analyzer"),
            ));
        }
        for (i, text) in req.texts.iter().enumerate() {
            self.check_text(&format!("texts[{}]", i), text)?;
        }

        let model = self.resolve_model(req.model.as_deref());
        let params = LookupParams::new(&model, req.task_type).with_threshold(req.threshold);
        if let Some(hit) = self.cache.lookup_batch(&params, &req.texts) {
            debug!(model = %model, items = req.texts.len(), "batch cache hit");
            return Ok(hit);
        }

        let result = if self.backend.supports_batch(&model) {
            let result = self
                .backend
                .analyze_batch(&model, &req.texts, req.task_type, req.threshold)
                .await?;
            if result.results.len() != req.texts.len() {
                return Err(Error::backend(
                    model.as_str(),
                    format!(
                        "batch returned {} results for {} texts",
                        result.results.len(),
                        req.texts.len()
                    ),
                ));
            }
            result
        } else {
            let start = Instant::now();
            let results: Vec<SentimentResult> = stream::iter(req.texts.iter())
                .map(|text| self.analyze_one(&params, text))
                .buffered(PER_ITEM_CONCURRENCY)
                .try_collect()
                .await?;
            BatchSentimentResult::new(results, elapsed_ms(start))
        };

        self.cache.store_batch(&params, &req.texts, result.clone());
        Ok(result)
    }

    async fn analyze_one(&self, params: &LookupParams<'_>, text: &str) -> Result<SentimentResult> {
        match self.cached_call(params, text).await {
            Ok(result) => Ok(result),
            Err(err) if self.service.graceful_degradation && params.model != FALLBACK_MODEL => {
                warn!(
                    model = params.model,
                    fallback = FALLBACK_MODEL,
                    error = %err,
                    "analysis failed, degrading to fallback model"
                );
                let fallback = LookupParams::new(FALLBACK_MODEL, TaskType::Sentiment)
                    .with_threshold(params.threshold);
                self.cached_call(&fallback, text).await
            }
            Err(err) => Err(err),
        }
    }

    /// Cache-aside call for one text under exactly the identity in `params`.
    async fn cached_call(&self, params: &LookupParams<'_>, text: &str) -> Result<SentimentResult> {
        if let Some(hit) = self.cache.lookup_single(params, text) {
            debug!(model = params.model, "single cache hit");
            return Ok(hit);
        }
        let result = self
            .backend
            .analyze(params.model, text, params.task_type, params.threshold)
            .await?;
        self.cache.store_single(params, text, result.clone());
        Ok(result)
    }

    fn check_text(&self, field: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::validation_with_context(
                "text must not be empty",
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source("analyzer"),
            ));
        }
        let len = text.chars().count();
        if len > self.service.text_length_limit {
            return Err(Error::validation_with_context(
                "text too long",
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details(format!("{} > {}", len, self.service.text_length_limit))
                    .with_source("analyzer"),
            ));
        }
        Ok(())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
