//! # Resilience Policy Configuration
//!
//! Runtime configuration for the circuit breaker and bulkhead that guard
//! store calls. The file/env-facing shapes live in `crate::config` and are
//! converted into these with `to_resilience_config()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Time to wait in open state before attempting recovery
    pub timeout: Duration,

    /// Number of successful calls in half-open state to close circuit
    pub success_threshold: u32,
}

impl CircuitBreakerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.timeout > Duration::from_secs(300) {
            return Err("timeout should not exceed 300 seconds".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.success_threshold > 50 {
            return Err("success_threshold should not exceed 50".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Configuration for a bulkhead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkheadConfig {
    /// Maximum calls allowed in flight at once
    pub max_concurrent_calls: usize,

    /// How long a call may wait for a free slot before being shed
    pub max_wait: Duration,
}

impl BulkheadConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_calls == 0 {
            return Err("max_concurrent_calls must be greater than 0".to_string());
        }

        if self.max_wait > Duration::from_secs(10) {
            return Err("max_wait should not exceed 10 seconds".to_string());
        }

        Ok(())
    }
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 64,
            max_wait: Duration::from_millis(50),
        }
    }
}

/// Combined policy applied to every store call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePolicyConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub bulkhead: BulkheadConfig,
    /// Upper bound for a single store round trip
    pub call_timeout: Duration,
}

impl Default for StorePolicyConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerConfig::default(),
            bulkhead: BulkheadConfig::default(),
            call_timeout: Duration::from_millis(500),
        }
    }
}

impl StorePolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.circuit_breaker.validate()?;
        self.bulkhead.validate()?;
        if self.call_timeout.is_zero() {
            return Err("call_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
