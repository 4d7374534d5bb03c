//! Fleet-wide single-flight coordination
//!
//! Protocol for one call to [`SingleFlightCoordinator::execute`]:
//!
//! 1. Read `result:<flight key>`. A published envelope is replayed as is. If
//!    the read itself fails the call is coalesced in-process only.
//! 2. `SET NX` on `lock:<flight key>` with a random token and the lock TTL.
//! 3. The winner runs the operation, publishes an envelope with the result
//!    TTL and releases the lock by compare-and-delete on its token.
//! 4. Everyone else polls the result slot with exponential backoff until an
//!    envelope appears or the wait budget runs out.

use super::envelope::{settle, ResultEnvelope};
use super::errors::{FailureCode, FlightError};
use super::local::LocalFlights;
use crate::config::{ConfigResult, SingleFlightConfig};
use crate::metrics::{FlightEvent, MetricsSink};
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Store key holding the published envelope for a flight
pub fn result_key(flight_key: &str) -> String {
    format!("result:{flight_key}")
}

/// Store key holding the leader lock for a flight
pub fn lock_key(flight_key: &str) -> String {
    format!("lock:{flight_key}")
}

/// Leader lock; released by token on success, or from `Drop` if the leader
/// future is abandoned
struct LeaderLock {
    store: Arc<dyn KeyValueStore>,
    key: String,
    token: String,
    released: bool,
}

impl LeaderLock {
    async fn release(mut self) {
        self.released = true;
        match self.store.compare_and_delete(&self.key, &self.token).await {
            Ok(0) => warn!(
                lock_key = %self.key,
                "Leader lock already expired or re-acquired; left untouched"
            ),
            Ok(_) => debug!(lock_key = %self.key, "Leader lock released"),
            Err(e) => warn!(
                lock_key = %self.key,
                error = %e,
                "Failed to release leader lock; it will expire by TTL"
            ),
        }
    }
}

impl Drop for LeaderLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        handle.spawn(async move {
            if let Err(e) = store.compare_and_delete(&key, &token).await {
                warn!(lock_key = %key, error = %e, "Failed to release abandoned leader lock");
            }
        });
    }
}

/// Coordinates at most one execution per flight key across processes
#[derive(Debug)]
pub struct SingleFlightCoordinator {
    store: Arc<dyn KeyValueStore>,
    local: LocalFlights,
    config: SingleFlightConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl SingleFlightCoordinator {
    /// Build a coordinator; fails if the timing configuration is inconsistent
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        config: SingleFlightConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            local: LocalFlights::new(),
            config,
            metrics,
        })
    }

    pub fn config(&self) -> &SingleFlightConfig {
        &self.config
    }

    /// Flights currently coalesced in-process because the store was unreadable
    pub fn local_in_flight(&self) -> usize {
        self.local.in_flight()
    }

    /// Run `operation` at most once fleet-wide for `flight_key`
    ///
    /// Every concurrent caller receives the leader's value or the leader's
    /// failure. Followers give up with [`FlightError::Timeout`] once the
    /// in-flight budget elapses.
    pub async fn execute<T, E, F, Fut>(&self, flight_key: &str, operation: F) -> Result<T, FlightError>
    where
        T: Serialize + DeserializeOwned,
        E: Display + FailureCode,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result_key = result_key(flight_key);

        match self.read_envelope(flight_key, &result_key).await {
            Ok(Some(envelope)) => {
                debug!(flight_key = flight_key, "Flight result already published");
                self.metrics.record_flight_event(FlightEvent::FastPathHit);
                return envelope.into_result(flight_key);
            }
            Ok(None) => {}
            Err(FlightError::Store { source, .. }) => {
                warn!(
                    flight_key = flight_key,
                    error = %source,
                    "Shared store unreadable; coalescing within this process only"
                );
                self.metrics.record_flight_event(FlightEvent::LocalFallback);
                return self
                    .local
                    .execute(flight_key, self.config.in_flight_timeout(), operation)
                    .await;
            }
            Err(other) => return Err(other),
        }

        let lock_key = lock_key(flight_key);
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set_if_absent(&lock_key, &token, self.config.lock_timeout())
            .await
            .map_err(|source| FlightError::Store {
                flight_key: flight_key.to_string(),
                source,
            })?;

        if acquired {
            let lock = LeaderLock {
                store: self.store.clone(),
                key: lock_key,
                token,
                released: false,
            };
            self.lead(flight_key, &result_key, lock, operation).await
        } else {
            self.follow(flight_key, &result_key).await
        }
    }

    async fn lead<T, E, F, Fut>(
        &self,
        flight_key: &str,
        result_key: &str,
        lock: LeaderLock,
        operation: F,
    ) -> Result<T, FlightError>
    where
        T: Serialize,
        E: Display + FailureCode,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        info!(flight_key = flight_key, "Elected flight leader");
        self.metrics.record_flight_event(FlightEvent::Leader);

        let result = operation().await;
        let (result, envelope) = settle(flight_key, result);

        self.publish(flight_key, result_key, &envelope).await;
        lock.release().await;
        result
    }

    /// Write the envelope; a failed write is logged and followers may time out
    async fn publish(&self, flight_key: &str, result_key: &str, envelope: &ResultEnvelope) {
        let encoded = match envelope.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(flight_key = flight_key, error = %e, "Failed to encode flight envelope");
                self.metrics.record_flight_event(FlightEvent::PublishFailed);
                return;
            }
        };

        if let Err(e) = self
            .store
            .set(result_key, &encoded, self.config.result_ttl())
            .await
        {
            warn!(
                flight_key = flight_key,
                error = %e,
                "Failed to publish flight result; followers may time out"
            );
            self.metrics.record_flight_event(FlightEvent::PublishFailed);
        } else {
            debug!(
                flight_key = flight_key,
                success = envelope.success,
                "Flight result published"
            );
        }
    }

    async fn follow<T: DeserializeOwned>(
        &self,
        flight_key: &str,
        result_key: &str,
    ) -> Result<T, FlightError> {
        debug!(flight_key = flight_key, "Following in-progress flight");
        self.metrics.record_flight_event(FlightEvent::Follower);

        let start = Instant::now();
        let deadline = start + self.config.in_flight_timeout();
        let poll_max = self.config.poll_max();
        let mut delay = self.config.poll_initial();

        loop {
            if let Some(envelope) = self.read_envelope(flight_key, result_key).await? {
                return envelope.into_result(flight_key);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = now - start;
                warn!(
                    flight_key = flight_key,
                    waited_ms = waited.as_millis(),
                    "Gave up waiting for flight leader"
                );
                self.metrics.record_flight_event(FlightEvent::Timeout);
                return Err(FlightError::Timeout {
                    flight_key: flight_key.to_string(),
                    waited,
                });
            }

            tokio::time::sleep(delay.min(deadline - now)).await;
            delay = (delay * self.config.poll_multiplier).min(poll_max);
        }
    }

    async fn read_envelope(
        &self,
        flight_key: &str,
        result_key: &str,
    ) -> Result<Option<ResultEnvelope>, FlightError> {
        let raw = self
            .store
            .get(result_key)
            .await
            .map_err(|source| FlightError::Store {
                flight_key: flight_key.to_string(),
                source,
            })?;

        raw.map(|raw| ResultEnvelope::decode(&raw, flight_key))
            .transpose()
    }
}
