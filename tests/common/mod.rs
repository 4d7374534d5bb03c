//! Shared fixtures for integration tests: a scripted generator and helpers
//! that stand up several "processes" over one shared store.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use summary_cache::config::{StoreBackend, SummaryCacheConfig};
use summary_cache::metrics::{InMemoryMetrics, MetricsSink};
use summary_cache::service::{SummaryGenerator, SummaryInput};
use summary_cache::store::{InMemoryStore, KeyValueStore};
use summary_cache::SummaryCacheSystem;

/// Generator with fixed latency and a programmable outcome
#[derive(Debug)]
pub struct ScriptedGenerator {
    latency: Duration,
    outcome: Mutex<Result<String, String>>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn succeeding(summary: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            outcome: Mutex::new(Ok(summary.to_string())),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str, latency: Duration) -> Arc<Self> {
        let generator = Self::succeeding("", latency);
        *generator.outcome.lock() = Err(message.to_string());
        generator
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(&self, _input: &SummaryInput) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        let outcome = self.outcome.lock().clone();
        outcome.map_err(|message| anyhow::anyhow!(message))
    }
}

/// Default configuration pointed at the in-memory backend
pub fn memory_config() -> SummaryCacheConfig {
    let mut config = SummaryCacheConfig::default();
    config.store.backend = StoreBackend::Memory;
    config
}

/// `count` independently wired systems over one shared backend
pub fn shared_systems(
    count: usize,
    backend: Arc<InMemoryStore>,
    metrics: Arc<InMemoryMetrics>,
) -> Vec<SummaryCacheSystem> {
    (0..count)
        .map(|_| {
            let backend: Arc<dyn KeyValueStore> = backend.clone();
            let metrics: Arc<dyn MetricsSink> = metrics.clone();
            SummaryCacheSystem::with_backend(memory_config(), backend, metrics)
                .expect("default memory config is valid")
        })
        .collect()
}

pub fn article(id: &str) -> SummaryInput {
    SummaryInput::new(format!("Body of article {id}. It is long and worth summarizing."))
        .with_article_id(id)
        .with_title(format!("Article {id}"))
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("summary_cache=debug")
        .with_test_writer()
        .try_init();
}
