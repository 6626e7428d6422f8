//! cache-probe: drive the result cache with a synthetic workload and print its stats.
//!
//! Usage:
//!   cache-probe [--config <path>] [--requests <n>] [--distinct <n>] [--batch-every <n>]
//!
//! Settings come from `QT_*` environment variables unless `--config` points at a
//! YAML settings file. Use `QT_CACHE_BACKEND=memory` to actually enable caching.

use anyhow::{bail, Context};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentiment_cache::analyzer::{CachedAnalyzer, SentimentBackend};
use sentiment_cache::cache::ResultCache;
use sentiment_cache::config::Settings;
use sentiment_cache::types::{BatchSentimentRequest, SentimentRequest, SentimentResult, TaskType};

/// Stand-in for a real model: keyword polarity plus a fixed inference delay.
struct SyntheticBackend {
    latency: Duration,
}

#[async_trait]
impl SentimentBackend for SyntheticBackend {
    async fn analyze(
        &self,
        model: &str,
        text: &str,
        task_type: TaskType,
        _threshold: Option<f64>,
    ) -> sentiment_cache::Result<SentimentResult> {
        tokio::time::sleep(self.latency).await;
        let sentiment = if text.contains("bad") {
            "negative"
        } else if text.contains("good") {
            "positive"
        } else {
            "neutral"
        };
        Ok(SentimentResult {
            model: model.to_string(),
            sentiment: sentiment.to_string(),
            confidence: 0.5,
            processing_time_ms: self.latency.as_millis() as u64,
            task_type,
            text: None,
        })
    }
}

struct Args {
    config: Option<String>,
    requests: usize,
    distinct: usize,
    batch_every: usize,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        requests: 500,
        distinct: 50,
        batch_every: 10,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("missing value for {}", flag));
        match flag.as_str() {
            "--config" => args.config = Some(value()?),
            "--requests" => args.requests = value()?.parse().context("--requests")?,
            "--distinct" => args.distinct = value()?.parse().context("--distinct")?,
            "--batch-every" => args.batch_every = value()?.parse().context("--batch-every")?,
            "--help" | "-h" => {
                println!("cache-probe [--config <path>] [--requests <n>] [--distinct <n>] [--batch-every <n>]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    if args.distinct == 0 || args.batch_every == 0 {
        bail!("--distinct and --batch-every must be positive");
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    let settings = match args.config {
        Some(ref path) => Settings::from_yaml_file(path)
            .with_context(|| format!("loading settings from {}", path))?,
        None => Settings::from_env().context("loading settings from environment")?,
    };
    sentiment_cache::logging::init_logging(&settings.logging);

    let cache = Arc::new(ResultCache::from_config(&settings.cache)?);
    let backend = Arc::new(SyntheticBackend {
        latency: Duration::from_millis(2),
    });
    let analyzer = CachedAnalyzer::new(backend, Arc::clone(&cache), settings.service.clone());

    let words = ["good", "bad", "meh"];
    let start = Instant::now();
    for i in 0..args.requests {
        let n = i % args.distinct;
        let text = format!("{} item {}", words[n % words.len()], n);
        if i % args.batch_every == 0 {
            let batch = BatchSentimentRequest::new([text.clone(), format!("{} follow-up", text)]);
            analyzer.analyze_batch(&batch).await?;
        } else {
            analyzer.analyze(&SentimentRequest::new(text)).await?;
        }
    }
    let elapsed = start.elapsed();

    tracing::info!(
        requests = args.requests,
        elapsed_ms = elapsed.as_millis() as u64,
        "workload finished"
    );
    println!("{}", cache.stats_snapshot().to_json()?);
    Ok(())
}
