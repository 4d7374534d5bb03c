use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use summary_cache::cache::{jittered_ttl_seconds, Cache, CacheOutcome};
use summary_cache::config::SingleFlightConfig;
use summary_cache::metrics::NoopMetrics;
use summary_cache::resilience::{StorePolicy, StorePolicyConfig};
use summary_cache::single_flight::{ResultEnvelope, SingleFlightCoordinator};
use summary_cache::store::{GuardedStore, InMemoryStore, KeyValueStore};
use tokio::runtime::Runtime;

fn guarded_memory_store() -> Arc<dyn KeyValueStore> {
    let policy = Arc::new(StorePolicy::new("bench", StorePolicyConfig::default()));
    Arc::new(GuardedStore::new(Arc::new(InMemoryStore::new()), policy))
}

fn benchmark_ttl_jitter(c: &mut Criterion) {
    c.bench_function("ttl_jitter", |b| b.iter(|| jittered_ttl_seconds(black_box(3600))));
}

fn benchmark_envelope_decode(c: &mut Criterion) {
    let raw = ResultEnvelope::success(r#"{"content":"A short summary."}"#.to_string())
        .encode()
        .unwrap_or_default();
    c.bench_function("envelope_decode", |b| {
        b.iter(|| ResultEnvelope::decode(black_box(&raw), "sf:summary:1"))
    });
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = Cache::new(guarded_memory_store(), Arc::new(NoopMetrics));
    rt.block_on(cache.put("summary:1", &"A short summary.", 3600));

    c.bench_function("guarded_cache_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let outcome: CacheOutcome<String> = cache.get(black_box("summary:1")).await;
            outcome
        })
    });
}

fn benchmark_single_flight_fast_path(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = SingleFlightCoordinator::new(
        guarded_memory_store(),
        SingleFlightConfig::default(),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    // publish once so every iteration replays the envelope
    rt.block_on(coordinator.execute("sf:summary:1", || async {
        Ok::<_, anyhow::Error>("A short summary.".to_string())
    }))
    .unwrap();

    c.bench_function("single_flight_fast_path", |b| {
        b.to_async(&rt).iter(|| async {
            coordinator
                .execute("sf:summary:1", || async {
                    Ok::<_, anyhow::Error>(String::new())
                })
                .await
        })
    });
}

criterion_group!(
    benches,
    benchmark_ttl_jitter,
    benchmark_envelope_decode,
    benchmark_cache_hit,
    benchmark_single_flight_fast_path
);
criterion_main!(benches);
