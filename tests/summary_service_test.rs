//! End-to-end summary requests across several instances sharing one store

mod common;

use common::{article, memory_config, shared_systems, ScriptedGenerator};
use std::sync::Arc;
use std::time::Duration;
use summary_cache::config::CacheConfig;
use summary_cache::metrics::{CacheEvent, FlightEvent, InMemoryMetrics, MetricsSink};
use summary_cache::service::{ErrorKind, SummaryError, SummaryInput, SummaryService};
use summary_cache::store::testing::{FaultInjectingStore, StoreOp};
use summary_cache::store::{InMemoryStore, KeyValueStore};
use summary_cache::SummaryCacheSystem;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_stampede_across_instances_generates_once() {
    common::init_test_logging();
    let backend = Arc::new(InMemoryStore::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let generator = ScriptedGenerator::succeeding("A short summary.", Duration::from_secs(2));

    let services: Vec<Arc<SummaryService>> = shared_systems(3, backend.clone(), metrics.clone())
        .iter()
        .map(|system| Arc::new(system.summary_service(generator.clone())))
        .collect();

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..12 {
        let service = services[i % services.len()].clone();
        handles.push(tokio::spawn(async move {
            service.get("article-1", &article("article-1")).await
        }));
    }
    let mut summaries = Vec::new();
    for handle in handles {
        summaries.push(handle.await.unwrap().unwrap());
    }
    let elapsed = start.elapsed();

    assert_eq!(generator.calls(), 1);
    assert!(summaries.iter().all(|s| s.content == "A short summary."));
    assert!(summaries.iter().all(|s| s.generated_at == summaries[0].generated_at));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert_eq!(metrics.flight_events(FlightEvent::Leader), 1);

    // later requests are plain cache hits
    let again = services[2].get("article-1", &article("article-1")).await.unwrap();
    assert!(again.served_from_cache);
    assert_eq!(generator.calls(), 1);
    assert!(backend.ttl_of("summary:article-1").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_generator_failure_reaches_every_instance() {
    let backend = Arc::new(InMemoryStore::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let generator = ScriptedGenerator::failing("upstream quota exhausted", Duration::from_millis(800));

    let systems = shared_systems(2, backend.clone(), metrics.clone());
    let first = Arc::new(systems[0].summary_service(generator.clone()));
    let second = Arc::new(systems[1].summary_service(generator.clone()));

    let leader = {
        let first = first.clone();
        tokio::spawn(async move { first.get("9", &article("9")).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let follower = second.get("9", &article("9")).await;
    let led = leader.await.unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(follower, led);
    let err = follower.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failure);
    assert!(matches!(
        &err,
        SummaryError::GenerationFailed { code, message }
            if code == "GENERATION_FAILED" && message.contains("upstream quota exhausted")
    ));
    assert_eq!(backend.get("summary:9").await.unwrap(), None);
    assert_eq!(metrics.generator_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_generator_replayed_to_followers() {
    let backend = Arc::new(InMemoryStore::new());
    let generator = ScriptedGenerator::succeeding("unused", Duration::from_millis(100));
    generator.set_available(false);

    let systems = shared_systems(2, backend, Arc::new(InMemoryMetrics::new()));
    let first = systems[0].summary_service(generator.clone());
    let second = systems[1].summary_service(generator.clone());

    let (article_a, article_b) = (article("3"), article("3"));
    let (a, b) = tokio::join!(first.get("3", &article_a), second.get("3", &article_b));

    for result in [a, b] {
        let err = result.unwrap_err();
        assert_eq!(
            err,
            SummaryError::GeneratorUnavailable {
                generator: "scripted".to_string()
            }
        );
        assert_eq!(err.kind(), ErrorKind::TemporarilyUnavailable);
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_ttl_hours_uses_a_day() {
    let backend = Arc::new(InMemoryStore::new());
    let mut config = memory_config();
    config.cache = CacheConfig {
        ttl_hours: 0,
        ..CacheConfig::default()
    };
    let backend_dyn: Arc<dyn KeyValueStore> = backend.clone();
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    let system = SummaryCacheSystem::with_backend(config, backend_dyn, metrics).unwrap();
    let service = system.summary_service(ScriptedGenerator::succeeding("s", Duration::ZERO));

    assert_eq!(service.ttl_hours(), 24);
    service.get("5", &article("5")).await.unwrap();

    let ttl = backend.ttl_of("summary:5").await.unwrap();
    let day = Duration::from_secs(24 * 3600);
    assert!(ttl >= day.mul_f64(0.9) && ttl <= day.mul_f64(1.1), "ttl {ttl:?}");
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_id_rejected_before_any_io() {
    let store = Arc::new(FaultInjectingStore::new(Arc::new(InMemoryStore::new())));
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    let system = SummaryCacheSystem::with_backend(memory_config(), store.clone(), metrics).unwrap();
    let generator = ScriptedGenerator::succeeding("s", Duration::ZERO);
    let service = system.summary_service(generator.clone());

    let input = SummaryInput::new("text").with_article_id("other");
    let err = service.get("5", &input).await.unwrap_err();

    assert!(matches!(err, SummaryError::InvalidInput(_)));
    assert_eq!(err.kind(), ErrorKind::BadInput);
    assert!(store.calls().is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_fails_fast_without_generating() {
    let store = Arc::new(FaultInjectingStore::new(Arc::new(InMemoryStore::new())));
    let metrics = Arc::new(InMemoryMetrics::new());
    let metrics_dyn: Arc<dyn MetricsSink> = metrics.clone();
    let system = SummaryCacheSystem::with_backend(memory_config(), store.clone(), metrics_dyn).unwrap();
    let generator = ScriptedGenerator::succeeding("s", Duration::ZERO);
    let service = system.summary_service(generator.clone());

    store.fail_op(StoreOp::Get);
    for _ in 0..8 {
        let err = service.get("5", &article("5")).await.unwrap_err();
        assert!(matches!(err, SummaryError::CacheUnavailable(_)));
        assert_eq!(err.kind(), ErrorKind::TemporarilyUnavailable);
    }

    assert_eq!(generator.calls(), 0);
    // five store failures open the breaker; the rest never reach the store
    assert_eq!(store.call_count(StoreOp::Get), 5);
    assert_eq!(metrics.cache_events(CacheEvent::Error), 5);
    assert_eq!(metrics.cache_events(CacheEvent::Unavailable), 3);

    let health = service.health().await;
    assert!(!health.store_healthy);
    assert!(!health.is_healthy());
}
