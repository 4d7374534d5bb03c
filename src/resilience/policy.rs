//! # Store Policy
//!
//! Circuit breaker, bulkhead and per-call timeout composed around a single
//! store call. A tripped breaker or saturated bulkhead turns the call into
//! [`StoreError::Unavailable`] without touching the backend.

use crate::resilience::{Bulkhead, CircuitBreaker, CircuitState, StorePolicyConfig};
use crate::store::{RejectionReason, StoreError, StoreResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Policy applied to every guarded store call
#[derive(Debug)]
pub struct StorePolicy {
    name: String,
    circuit_breaker: CircuitBreaker,
    bulkhead: Bulkhead,
    call_timeout: Duration,
}

impl StorePolicy {
    pub fn new(name: impl Into<String>, config: StorePolicyConfig) -> Self {
        let name = name.into();
        Self {
            circuit_breaker: CircuitBreaker::new(name.clone(), config.circuit_breaker),
            bulkhead: Bulkhead::new(name.clone(), config.bulkhead),
            call_timeout: config.call_timeout,
            name,
        }
    }

    /// Run `operation` under the breaker, the bulkhead and the call timeout
    pub async fn call<T, F, Fut>(&self, operation: F) -> StoreResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        if !self.circuit_breaker.should_allow() {
            return Err(self.rejected(RejectionReason::CircuitOpen));
        }

        let Some(_permit) = self.bulkhead.acquire().await else {
            return Err(self.rejected(RejectionReason::BulkheadFull));
        };

        let start = Instant::now();
        let result = match tokio::time::timeout(self.call_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(format!(
                "{} call exceeded {}ms",
                self.name,
                self.call_timeout.as_millis()
            ))),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => self.circuit_breaker.record_success(elapsed),
            Err(_) => self.circuit_breaker.record_failure(elapsed),
        }
        result
    }

    fn rejected(&self, reason: RejectionReason) -> StoreError {
        StoreError::Unavailable {
            component: self.name.clone(),
            reason,
        }
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
