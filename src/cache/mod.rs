//! # Cache-Aside Layer
//!
//! JSON values over the shared store, with TTL jitter and a closed
//! [`CacheOutcome`] so a miss can never be mistaken for a failing store.
//!
//! `get` never fails: store and decoding problems become
//! [`CacheOutcome::Error`]. `put` and `delete` are fire-and-forget and only
//! log when they fail. The store handed to [`Cache::new`] is normally a
//! [`GuardedStore`](crate::store::GuardedStore), so a tripped policy turns
//! into an immediate `Error` without a round trip.

pub mod jitter;

use crate::metrics::{CacheEvent, CacheOperation, MetricsSink};
use crate::store::{KeyValueStore, RejectionReason, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use jitter::jittered_ttl_seconds;

/// Why a cache call could not produce a hit or a miss
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Stored bytes could not be decoded, or the value could not be encoded
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// Store reachable but the call failed
    #[error("Cache store error: {0}")]
    Store(StoreError),

    /// Store policy shed the call
    #[error("Cache unavailable ({reason}) for {component}")]
    Unavailable {
        component: String,
        reason: RejectionReason,
    },
}

impl From<StoreError> for CacheError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable { component, reason } => {
                CacheError::Unavailable { component, reason }
            }
            other => CacheError::Store(other),
        }
    }
}

impl CacheError {
    fn event(&self) -> CacheEvent {
        match self {
            CacheError::Unavailable { .. } => CacheEvent::Unavailable,
            _ => CacheEvent::Error,
        }
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<T> {
    /// Value present and decoded
    Hit(T),
    /// Key absent
    Miss,
    /// Store failing or unreachable; distinct from `Miss`
    Error(CacheError),
}

impl<T> CacheOutcome<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheOutcome::Miss)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CacheOutcome::Error(_))
    }

    /// The hit value, if any
    pub fn into_hit(self) -> Option<T> {
        match self {
            CacheOutcome::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Cache-aside access to the shared store
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl Cache {
    pub fn new(store: Arc<dyn KeyValueStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { store, metrics }
    }

    /// Look up and decode `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheOutcome<T> {
        if key.trim().is_empty() {
            return CacheOutcome::Miss;
        }

        let start = Instant::now();
        let result = self.store.get(key).await;
        self.metrics
            .record_cache_latency(CacheOperation::Get, start.elapsed());

        let outcome = match result {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => CacheOutcome::Hit(value),
                Err(e) => CacheOutcome::Error(CacheError::Serialization(format!(
                    "failed to decode '{}': {}",
                    key, e
                ))),
            },
            Ok(None) => CacheOutcome::Miss,
            Err(e) => CacheOutcome::Error(e.into()),
        };

        match &outcome {
            CacheOutcome::Hit(_) => {
                debug!(key = key, "Cache HIT");
                self.metrics.record_cache_event(CacheEvent::Hit);
            }
            CacheOutcome::Miss => {
                debug!(key = key, "Cache MISS");
                self.metrics.record_cache_event(CacheEvent::Miss);
            }
            CacheOutcome::Error(e) => {
                warn!(key = key, error = %e, "Cache get failed");
                self.metrics.record_cache_event(e.event());
            }
        }
        outcome
    }

    /// Encode and store `value` under `key` for roughly `ttl_seconds`
    ///
    /// No-op for a blank key, a `null`/empty value or a non-positive TTL.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: i64) {
        if key.trim().is_empty() || ttl_seconds <= 0 {
            return;
        }

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = key, error = %e, "Cache put dropped: value failed to serialize");
                self.metrics.record_cache_event(CacheEvent::PutFailed);
                return;
            }
        };
        if encoded == "null" || encoded == "\"\"" {
            return;
        }

        let ttl = jittered_ttl_seconds(ttl_seconds as u64);
        let start = Instant::now();
        let result = self.store.set(key, &encoded, Duration::from_secs(ttl)).await;
        self.metrics
            .record_cache_latency(CacheOperation::Put, start.elapsed());

        match result {
            Ok(()) => {
                debug!(key = key, ttl_seconds = ttl, "Cache SET");
                self.metrics.record_cache_event(CacheEvent::Put);
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache put dropped");
                self.metrics.record_cache_event(CacheEvent::PutFailed);
            }
        }
    }

    /// Remove `key`; failures are logged only
    pub async fn delete(&self, key: &str) {
        if key.trim().is_empty() {
            return;
        }
        if let Err(e) = self.store.delete(key).await {
            warn!(key = key, error = %e, "Cache delete failed");
        }
    }

    /// Whether the store passes a health check through the policy
    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                debug!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }
}
