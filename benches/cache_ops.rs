//! Benchmarks for cache hot paths
//!
//! This benchmark measures:
//! - Key derivation for single texts and batches
//! - Tier get/put including eviction at capacity
//! - Facade hit/miss cost, and the overhead of a disabled cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use sentiment_cache::cache::{CacheTier, KeyBuilder, LookupParams, ResultCache};
use sentiment_cache::config::CacheConfig;
use sentiment_cache::types::TaskType;

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");
    let kb = KeyBuilder::new();

    for len in [32usize, 512, 2500] {
        let text = "a".repeat(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("single", len), &text, |b, text| {
            b.iter(|| {
                kb.single_key(
                    black_box("vader"),
                    "sentiment",
                    black_box(text.as_str()),
                    Some(0.5),
                )
            })
        });
    }

    let batch: Vec<String> = (0..32).map(|i| format!("review number {}", i)).collect();
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("batch_32", |b| {
        b.iter(|| {
            kb.batch_key(
                black_box("distilbert"),
                "sentiment",
                black_box(batch.as_slice()),
                None,
            )
        })
    });

    group.finish();
}

fn bench_tier(c: &mut Criterion) {
    let mut group = c.benchmark_group("tier");
    let kb = KeyBuilder::new();
    let keys: Vec<_> = (0..4096)
        .map(|i| kb.single_key("vader", "sentiment", &i.to_string(), None))
        .collect();

    let tier: CacheTier<u64> = CacheTier::new(2048, Duration::from_secs(3600));
    for (i, k) in keys.iter().take(2048).enumerate() {
        tier.put(*k, i as u64);
    }
    group.bench_function("get_hit", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % 2048;
            black_box(tier.get(&keys[i]))
        })
    });

    let evicting: CacheTier<u64> = CacheTier::new(256, Duration::from_secs(3600));
    group.bench_function("put_evicting", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % keys.len();
            evicting.put(keys[i], i as u64)
        })
    });

    group.finish();
}

fn bench_facade(c: &mut Criterion) {
    let mut group = c.benchmark_group("facade");
    let params = LookupParams::new("vader", TaskType::Sentiment);
    let text = "the service was quick and the staff were friendly";

    let enabled: ResultCache<String, Vec<String>> = ResultCache::from_config(&CacheConfig::memory())
        .expect("memory cache config is valid");
    enabled.store_single(&params, text, "positive".to_string());
    group.bench_function("lookup_hit", |b| {
        b.iter(|| black_box(enabled.lookup_single(&params, black_box(text))))
    });
    group.bench_function("lookup_miss", |b| {
        b.iter(|| black_box(enabled.lookup_single(&params, black_box("never stored"))))
    });

    let disabled: ResultCache<String, Vec<String>> = ResultCache::disabled();
    group.bench_function("lookup_disabled", |b| {
        b.iter(|| black_box(disabled.lookup_single(&params, black_box(text))))
    });

    group.finish();
}

criterion_group!(benches, bench_key_derivation, bench_tier, bench_facade);
criterion_main!(benches);
