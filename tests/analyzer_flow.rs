use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sentiment_cache::analyzer::{CachedAnalyzer, SentimentBackend};
use sentiment_cache::cache::{LookupParams, ResultCache};
use sentiment_cache::config::{CacheConfig, ServiceConfig};
use sentiment_cache::types::{
    BatchSentimentRequest, BatchSentimentResult, SentimentRequest, SentimentResult, TaskType,
};
use sentiment_cache::{Error, Result};

/// Fake transformer backend: native batch support, optional failure injection.
#[derive(Default)]
struct FakeBackend {
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    fail_on: Option<&'static str>,
    broken_model: Option<&'static str>,
    short_batches: bool,
}

fn result(model: &str, text: &str, task_type: TaskType, threshold: Option<f64>) -> SentimentResult {
    let cutoff = threshold.unwrap_or(0.5);
    let score = (text.len() % 10) as f64 / 10.0;
    SentimentResult {
        model: model.to_string(),
        sentiment: if score >= cutoff { "positive" } else { "negative" }.to_string(),
        confidence: score,
        processing_time_ms: 3,
        task_type,
        text: Some(text.to_string()),
    }
}

#[async_trait]
impl SentimentBackend for FakeBackend {
    async fn analyze(
        &self,
        model: &str,
        text: &str,
        task_type: TaskType,
        threshold: Option<f64>,
    ) -> Result<SentimentResult> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(text) || self.broken_model == Some(model) {
            return Err(Error::backend(model, "inference failed"));
        }
        tokio::task::yield_now().await;
        Ok(result(model, text, task_type, threshold))
    }

    fn supports_batch(&self, model: &str) -> bool {
        model.starts_with("distilbert")
    }

    async fn analyze_batch(
        &self,
        model: &str,
        texts: &[String],
        task_type: TaskType,
        threshold: Option<f64>,
    ) -> Result<BatchSentimentResult> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut results: Vec<_> = texts
            .iter()
            .map(|t| result(model, t, task_type, threshold))
            .collect();
        if self.short_batches {
            results.pop();
        }
        Ok(BatchSentimentResult::new(results, 12))
    }
}

fn setup(backend: FakeBackend) -> (Arc<CachedAnalyzer>, Arc<FakeBackend>) {
    setup_with(backend, ServiceConfig::default())
}

fn setup_with(
    backend: FakeBackend,
    service: ServiceConfig,
) -> (Arc<CachedAnalyzer>, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let cache = Arc::new(ResultCache::from_config(&CacheConfig::memory()).unwrap());
    let analyzer = CachedAnalyzer::new(backend.clone(), cache, service);
    (Arc::new(analyzer), backend)
}

#[tokio::test]
async fn native_batch_is_cached_as_a_whole() {
    let (analyzer, backend) = setup(FakeBackend::default());
    let req = BatchSentimentRequest::new(["one", "two", "three"]).with_model("distilbert");

    let first = analyzer.analyze_batch(&req).await.unwrap();
    let second = analyzer.analyze_batch(&req).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.items_processed, 3);
    assert_eq!(first.total_processing_time_ms, 12);
    assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 0);

    // Reordered batch is a different request.
    let reordered = BatchSentimentRequest::new(["three", "two", "one"]).with_model("distilbert");
    let out = analyzer.analyze_batch(&reordered).await.unwrap();
    assert_eq!(out.results[0].text.as_deref(), Some("three"));
    assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn threshold_override_is_part_of_the_identity() {
    let (analyzer, backend) = setup(FakeBackend::default());
    let base = SentimentRequest::new("abcd")
        .with_model("distilbert")
        .with_task_type(TaskType::Emotion);
    let low = analyzer.analyze(&base.clone().with_threshold(0.1)).await.unwrap();
    let high = analyzer.analyze(&base.clone().with_threshold(0.9)).await.unwrap();
    assert_eq!(low.sentiment, "positive");
    assert_eq!(high.sentiment, "negative");
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn backend_failures_propagate_and_are_not_cached() {
    let (analyzer, backend) = setup(FakeBackend {
        fail_on: Some("boom"),
        ..Default::default()
    });
    let req = SentimentRequest::new("boom");
    assert!(matches!(
        analyzer.analyze(&req).await,
        Err(Error::Backend { .. })
    ));
    assert!(analyzer.analyze(&req).await.is_err());
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 2);
    assert_eq!(analyzer.stats_snapshot().single.size, 0);

    // Per-item batch containing the failing text fails as a whole and stores nothing.
    let batch = BatchSentimentRequest::new(["fine", "boom"]);
    assert!(analyzer.analyze_batch(&batch).await.is_err());
    assert_eq!(analyzer.stats_snapshot().batch.size, 0);
}

#[tokio::test]
async fn misaligned_native_batch_is_rejected() {
    let (analyzer, _) = setup(FakeBackend {
        short_batches: true,
        ..Default::default()
    });
    let req = BatchSentimentRequest::new(["a", "b"]).with_model("distilbert-sst-2");
    let err = analyzer.analyze_batch(&req).await.unwrap_err();
    assert!(matches!(err, Error::Backend { .. }));
    assert_eq!(analyzer.stats_snapshot().batch.size, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_converge_on_cached_results() {
    let (analyzer, backend) = setup(FakeBackend::default());
    let mut handles = Vec::new();
    for worker in 0..8usize {
        let analyzer = Arc::clone(&analyzer);
        handles.push(tokio::spawn(async move {
            for i in 0..50usize {
                let text = format!("review {}", (worker + i) % 20);
                let out = analyzer.analyze(&SentimentRequest::new(text.clone())).await?;
                assert_eq!(out.text.as_deref(), Some(text.as_str()));
            }
            Ok::<_, Error>(())
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    // 20 distinct texts; races may compute a text more than once, never 400 times.
    let calls = backend.single_calls.load(Ordering::SeqCst);
    assert!(calls >= 20 && calls < 400, "calls = {}", calls);
    let snap = analyzer.stats_snapshot();
    assert_eq!(snap.single.stats.lookups(), 400);
    assert_eq!(snap.single.size, 20);
}

#[tokio::test]
async fn failed_model_degrades_to_vader_under_its_own_identity() {
    let (analyzer, backend) = setup(FakeBackend {
        broken_model: Some("distilbert"),
        ..Default::default()
    });
    let req = SentimentRequest::new("great")
        .with_model("distilbert")
        .with_task_type(TaskType::Emotion);

    let out = analyzer.analyze(&req).await.unwrap();
    assert_eq!(out.model, "vader");
    assert_eq!(out.task_type, TaskType::Sentiment);
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 2);

    let cache = analyzer.cache();
    let vader = LookupParams::new("vader", TaskType::Sentiment);
    let requested = LookupParams::new("distilbert", TaskType::Emotion);
    assert_eq!(cache.lookup_single(&vader, "great"), Some(out.clone()));
    assert_eq!(cache.lookup_single(&requested, "great"), None);

    // The requested model is tried again; the fallback comes from the cache.
    let again = analyzer.analyze(&req).await.unwrap();
    assert_eq!(again, out);
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn degradation_disabled_propagates_the_failure() {
    let service = ServiceConfig {
        graceful_degradation: false,
        ..Default::default()
    };
    let (analyzer, backend) = setup_with(
        FakeBackend {
            broken_model: Some("distilbert"),
            ..Default::default()
        },
        service,
    );
    let req = SentimentRequest::new("great").with_model("distilbert");
    let err = analyzer.analyze(&req).await.unwrap_err();
    assert!(matches!(err, Error::Backend { ref model, .. } if model == "distilbert"));
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 1);
    assert_eq!(analyzer.stats_snapshot().single.size, 0);
}

#[tokio::test]
async fn failing_fallback_model_is_not_retried() {
    let (analyzer, backend) = setup(FakeBackend {
        broken_model: Some("vader"),
        ..Default::default()
    });
    assert!(analyzer.analyze(&SentimentRequest::new("hi")).await.is_err());
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 1);
}
