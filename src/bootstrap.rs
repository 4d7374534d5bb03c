//! # Summary Cache Bootstrap
//!
//! Builds the full stack from [`SummaryCacheConfig`]:
//!
//! ```text
//! store backend → GuardedStore(StorePolicy) → Cache
//!                                          └→ SingleFlightCoordinator
//! ```
//!
//! Both the cache and the coordinator share the same guarded store, so one
//! circuit breaker reflects the health of the shared store for the process.

use crate::cache::Cache;
use crate::config::{ConfigManager, StoreBackend, SummaryCacheConfig};
use crate::error::Result;
use crate::metrics::{MetricsSink, NoopMetrics, OtelMetrics};
use crate::resilience::StorePolicy;
use crate::service::{SummaryGenerator, SummaryService};
use crate::single_flight::SingleFlightCoordinator;
use crate::store::{GuardedStore, InMemoryStore, KeyValueStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the OpenTelemetry meter instruments are registered on
pub const METER_NAME: &str = "summary_cache";

/// Name of the store policy, as it appears in logs and breaker metrics
pub const STORE_COMPONENT: &str = "summary_store";

/// Wired components, ready to serve
#[derive(Debug, Clone)]
pub struct SummaryCacheSystem {
    pub config: SummaryCacheConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub policy: Arc<StorePolicy>,
    pub metrics: Arc<dyn MetricsSink>,
    pub cache: Cache,
    pub coordinator: Arc<SingleFlightCoordinator>,
}

impl SummaryCacheSystem {
    /// Bootstrap from a loaded [`ConfigManager`]
    pub async fn from_manager(manager: &ConfigManager) -> Result<Self> {
        Self::bootstrap(manager.config().clone()).await
    }

    /// Validate `config`, connect the configured backend and wire everything
    ///
    /// Unlike an optional cache, the shared store carries the coordination
    /// protocol: a Redis backend that cannot be reached fails startup.
    pub async fn bootstrap(config: SummaryCacheConfig) -> Result<Self> {
        config.validate()?;
        let backend = connect_backend(&config).await?;
        let metrics = metrics_sink(&config);
        Self::with_backend(config, backend, metrics)
    }

    /// Wire a caller-supplied backend, e.g. a shared `InMemoryStore` in tests
    pub fn with_backend(
        config: SummaryCacheConfig,
        backend: Arc<dyn KeyValueStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = Arc::new(StorePolicy::new(
            STORE_COMPONENT,
            config.resilience.to_resilience_config(),
        ));
        let store: Arc<dyn KeyValueStore> = Arc::new(GuardedStore::new(backend, policy.clone()));
        let cache = Cache::new(store.clone(), metrics.clone());
        let coordinator = Arc::new(SingleFlightCoordinator::new(
            store.clone(),
            config.single_flight.clone(),
            metrics.clone(),
        )?);

        info!(
            store_provider = store.provider_name(),
            distributed = store.is_distributed(),
            call_timeout_ms = config.resilience.call_timeout_ms,
            "Summary cache system bootstrapped"
        );
        if !store.is_distributed() {
            warn!("Store is process-local; single-flight coalescing covers this process only");
        }

        Ok(Self {
            config,
            store,
            policy,
            metrics,
            cache,
            coordinator,
        })
    }

    /// Summary service over this system with the given generator
    pub fn summary_service(&self, generator: Arc<dyn SummaryGenerator>) -> SummaryService {
        SummaryService::new(
            self.cache.clone(),
            self.coordinator.clone(),
            generator,
            self.metrics.clone(),
            &self.config.cache,
        )
        .with_policy(self.policy.clone())
    }
}

async fn connect_backend(config: &SummaryCacheConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!(
                max_capacity = config.store.memory_max_capacity,
                "Using in-memory store"
            );
            Ok(Arc::new(InMemoryStore::with_capacity(
                config.store.memory_max_capacity,
            )))
        }
        #[cfg(feature = "cache-redis")]
        StoreBackend::Redis => {
            let store = crate::store::RedisStore::from_config(&config.store).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "cache-redis"))]
        StoreBackend::Redis => Err(crate::config::ConfigurationError::invalid_value(
            "store.backend",
            "redis",
            "crate built without the cache-redis feature",
        )
        .into()),
    }
}

fn metrics_sink(config: &SummaryCacheConfig) -> Arc<dyn MetricsSink> {
    if config.telemetry.metrics_enabled {
        Arc::new(OtelMetrics::new(METER_NAME))
    } else {
        Arc::new(NoopMetrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InMemoryMetrics;
    use crate::resilience::CircuitState;

    fn memory_config() -> SummaryCacheConfig {
        let mut config = SummaryCacheConfig::default();
        config.store.backend = StoreBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_bootstrap_memory_backend() {
        let system = SummaryCacheSystem::bootstrap(memory_config()).await.unwrap();

        assert_eq!(system.store.provider_name(), "memory");
        assert_eq!(system.policy.circuit_state(), CircuitState::Closed);
        assert_eq!(system.policy.name(), STORE_COMPONENT);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_bootstrap() {
        let mut config = memory_config();
        config.single_flight.lock_timeout_seconds = 5;

        let result = SummaryCacheSystem::bootstrap(config).await;
        assert!(matches!(
            result,
            Err(crate::error::SummaryCacheError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_systems_share_a_backend() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());

        let a = SummaryCacheSystem::with_backend(memory_config(), backend.clone(), metrics.clone())
            .unwrap();
        let b = SummaryCacheSystem::with_backend(memory_config(), backend, metrics).unwrap();

        a.cache.put("summary:1", &"text", 60).await;
        let seen: Option<String> = b.cache.get("summary:1").await.into_hit();
        assert_eq!(seen.as_deref(), Some("text"));
    }
}
