use super::errors::SummaryError;
use super::generator::{SummaryGenerator, SummaryInput, SummaryResult};
use crate::cache::{Cache, CacheOutcome};
use crate::config::{CacheConfig, DEFAULT_CACHE_TTL_HOURS, MAX_CACHE_TTL_HOURS};
use crate::metrics::MetricsSink;
use crate::resilience::{CircuitState, StorePolicy};
use crate::single_flight::SingleFlightCoordinator;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Seconds per hour of configured cache TTL
const SECONDS_PER_HOUR: i64 = 3600;

/// Point-in-time view of the service's dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store_provider: String,
    pub store_healthy: bool,
    /// Store circuit breaker, when the store is guarded
    pub circuit_state: Option<CircuitState>,
    pub generator: String,
    pub generator_available: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.store_healthy && self.generator_available
    }
}

/// Read-through summaries with fleet-wide stampede protection
///
/// A cached summary is served directly. On a miss exactly one caller across
/// all instances generates it; everyone else waits for that result. A cache
/// that cannot be read refuses generation instead of stampeding the
/// generator.
#[derive(Debug)]
pub struct SummaryService {
    cache: Cache,
    coordinator: Arc<SingleFlightCoordinator>,
    generator: Arc<dyn SummaryGenerator>,
    metrics: Arc<dyn MetricsSink>,
    policy: Option<Arc<StorePolicy>>,
    key_prefix: String,
    ttl_hours: i64,
}

impl SummaryService {
    pub fn new(
        cache: Cache,
        coordinator: Arc<SingleFlightCoordinator>,
        generator: Arc<dyn SummaryGenerator>,
        metrics: Arc<dyn MetricsSink>,
        config: &CacheConfig,
    ) -> Self {
        if config.ttl_hours < 1 {
            warn!(
                configured_ttl_hours = config.ttl_hours,
                fallback_ttl_hours = DEFAULT_CACHE_TTL_HOURS,
                "Invalid summary cache TTL; using default"
            );
        } else if config.ttl_hours > MAX_CACHE_TTL_HOURS {
            warn!(
                configured_ttl_hours = config.ttl_hours,
                capped_ttl_hours = MAX_CACHE_TTL_HOURS,
                "Summary cache TTL too long; capping"
            );
        }
        let ttl_hours = config.normalized_ttl_hours();

        info!(
            generator = generator.name(),
            store_provider = cache.provider_name(),
            ttl_hours = ttl_hours,
            "Summary service initialized"
        );

        Self {
            cache,
            coordinator,
            generator,
            metrics,
            policy: None,
            key_prefix: config.key_prefix.clone(),
            ttl_hours,
        }
    }

    /// Report the state of this store policy in [`health`](Self::health)
    pub fn with_policy(mut self, policy: Arc<StorePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Effective cache TTL in hours, never below one
    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours.max(1)
    }

    pub fn cache_key(&self, id: &str) -> String {
        format!("{}:{}", self.key_prefix, id)
    }

    pub fn flight_key(&self, id: &str) -> String {
        format!("sf:{}", self.cache_key(id))
    }

    /// Summary for article `id`, generating it at most once fleet-wide
    pub async fn get(&self, id: &str, input: &SummaryInput) -> Result<SummaryResult, SummaryError> {
        validate(id, input)?;

        let cache_key = self.cache_key(id);
        match self.cache.get::<SummaryResult>(&cache_key).await {
            CacheOutcome::Hit(summary) => return Ok(summary.from_cache()),
            CacheOutcome::Error(e) => {
                warn!(
                    article_id = id,
                    error = %e,
                    "Summary cache unreadable; refusing to generate"
                );
                return Err(SummaryError::CacheUnavailable(e));
            }
            CacheOutcome::Miss => {}
        }

        let flight_key = self.flight_key(id);
        self.coordinator
            .execute(&flight_key, || self.generate_and_store(id, &cache_key, input))
            .await
            .map_err(|e| SummaryError::from_flight(e, self.generator.name()))
    }

    /// Leader path: double-check, generate once, cache best-effort
    async fn generate_and_store(
        &self,
        id: &str,
        cache_key: &str,
        input: &SummaryInput,
    ) -> Result<SummaryResult, SummaryError> {
        match self.cache.get::<SummaryResult>(cache_key).await {
            CacheOutcome::Hit(summary) => {
                debug!(article_id = id, "Summary cached while acquiring leadership");
                return Ok(summary.from_cache());
            }
            CacheOutcome::Error(e) => {
                debug!(article_id = id, error = %e, "Double-check read failed; generating");
            }
            CacheOutcome::Miss => {}
        }

        let generator = self.generator.name();
        if !self.generator.is_available().await {
            warn!(article_id = id, generator = generator, "Summary generator unavailable");
            return Err(SummaryError::GeneratorUnavailable {
                generator: generator.to_string(),
            });
        }

        info!(article_id = id, generator = generator, "Generating summary");
        let generated = self.generator.generate(input).await;
        self.metrics
            .record_generator_invocation(generator, generated.is_ok());

        let content = generated.map_err(|e| {
            warn!(article_id = id, generator = generator, error = %e, "Summary generation failed");
            SummaryError::generation_failed(format!("generator '{generator}' failed: {e:#}"))
        })?;

        if content.trim().is_empty() {
            warn!(article_id = id, generator = generator, "Generator returned an empty summary");
            return Err(SummaryError::EmptySummary);
        }

        let summary = SummaryResult {
            article_id: id.to_string(),
            content,
            generator: generator.to_string(),
            generated_at: Utc::now(),
            served_from_cache: false,
        };

        self.cache
            .put(
                cache_key,
                &summary,
                self.ttl_hours().saturating_mul(SECONDS_PER_HOUR),
            )
            .await;
        Ok(summary)
    }

    /// Probe the store and the generator
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            store_provider: self.cache.provider_name().to_string(),
            store_healthy: self.cache.health_check().await,
            circuit_state: self.policy.as_ref().map(|p| p.circuit_state()),
            generator: self.generator.name().to_string(),
            generator_available: self.generator.is_available().await,
        }
    }
}

fn validate(id: &str, input: &SummaryInput) -> Result<(), SummaryError> {
    if id.trim().is_empty() {
        return Err(SummaryError::InvalidInput("article id is blank".to_string()));
    }
    if input.content.trim().is_empty() {
        return Err(SummaryError::InvalidInput(format!(
            "article '{id}' has no content to summarize"
        )));
    }
    if let Some(article_id) = input.article_id.as_deref() {
        if article_id != id {
            return Err(SummaryError::InvalidInput(format!(
                "input belongs to article '{article_id}', not '{id}'"
            )));
        }
    }
    Ok(())
}
