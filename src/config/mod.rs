//! # Summary Cache Configuration
//!
//! Typed, validated configuration for the store, the cache, single-flight
//! coordination, the store resilience policy and telemetry.
//!
//! Values are layered by [`ConfigManager`]: built-in defaults, then an
//! optional TOML/YAML/JSON file, then `SUMMARY_CACHE_*` environment variables
//! (nested keys separated by `__`, e.g.
//! `SUMMARY_CACHE_SINGLE_FLIGHT__LOCK_TIMEOUT_SECONDS=45`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use summary_cache::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let lock_ttl = manager.config().single_flight.lock_timeout();
//! let ttl_hours = manager.config().cache.ttl_hours;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::resilience::{BulkheadConfig, CircuitBreakerConfig, StorePolicyConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Minimum gap between the lock TTL and the follower wait budget
pub const LOCK_SAFETY_MARGIN_SECONDS: u64 = 5;

/// TTL used when `cache.ttl_hours` is not a positive number of hours
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Longest accepted summary lifetime (one year)
pub const MAX_CACHE_TTL_HOURS: i64 = 24 * 365;

/// Upper bound for every single-flight duration in seconds (one day)
pub const MAX_FLIGHT_SECONDS: u64 = 24 * 3600;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryCacheConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub single_flight: SingleFlightConfig,
    pub resilience: ResilienceConfig,
    pub telemetry: TelemetryConfig,
}

impl SummaryCacheConfig {
    /// Validate every section and the constraints that span sections
    pub fn validate(&self) -> ConfigResult<()> {
        self.store.validate()?;
        self.cache.validate()?;
        self.single_flight.validate()?;
        self.resilience.validate()?;

        let call_timeout = self.resilience.call_timeout();
        if call_timeout >= self.single_flight.in_flight_timeout() {
            return Err(ConfigurationError::invalid_value(
                "resilience.call_timeout_ms",
                self.resilience.call_timeout_ms,
                format!(
                    "must be shorter than single_flight.in_flight_timeout_seconds ({}s)",
                    self.single_flight.in_flight_timeout_seconds
                ),
            ));
        }

        Ok(())
    }
}

/// Which store backend to connect to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub connection_timeout_seconds: u64,
    /// Entry bound for the memory backend
    pub memory_max_capacity: u64,
}

impl StoreConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.backend == StoreBackend::Redis && self.redis_url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "redis_url",
                "store (backend = redis)",
            ));
        }
        if self.connection_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "store.connection_timeout_seconds",
                self.connection_timeout_seconds,
                "must be at least 1",
            ));
        }
        if self.memory_max_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "store.memory_max_capacity",
                self.memory_max_capacity,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            connection_timeout_seconds: 5,
            memory_max_capacity: crate::store::memory::DEFAULT_MAX_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Summary lifetime in hours; non-positive values fall back to 24
    pub ttl_hours: i64,
    pub key_prefix: String,
}

impl CacheConfig {
    /// Configured TTL with non-positive values replaced by the default,
    /// capped at [`MAX_CACHE_TTL_HOURS`]
    pub fn normalized_ttl_hours(&self) -> i64 {
        if self.ttl_hours >= 1 {
            self.ttl_hours.min(MAX_CACHE_TTL_HOURS)
        } else {
            DEFAULT_CACHE_TTL_HOURS
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.ttl_hours > MAX_CACHE_TTL_HOURS {
            return Err(ConfigurationError::invalid_value(
                "cache.ttl_hours",
                self.ttl_hours,
                format!("must not exceed {MAX_CACHE_TTL_HOURS}"),
            ));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "key_prefix",
                "cache",
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            key_prefix: "summary".to_string(),
        }
    }
}

/// Single-flight coordination timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleFlightConfig {
    /// TTL of the leader lock
    pub lock_timeout_seconds: u64,
    /// Total time a follower waits for the leader's envelope
    pub in_flight_timeout_seconds: u64,
    /// TTL of the published result envelope
    pub result_ttl_seconds: u64,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub poll_multiplier: u32,
}

impl SingleFlightConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }

    pub fn in_flight_timeout(&self) -> Duration {
        Duration::from_secs(self.in_flight_timeout_seconds)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_seconds)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let at_least_one = [
            ("lock_timeout_seconds", self.lock_timeout_seconds),
            ("in_flight_timeout_seconds", self.in_flight_timeout_seconds),
            ("result_ttl_seconds", self.result_ttl_seconds),
            ("poll_initial_ms", self.poll_initial_ms),
            ("poll_max_ms", self.poll_max_ms),
            ("poll_multiplier", u64::from(self.poll_multiplier)),
        ];
        for (field, value) in at_least_one {
            if value < 1 {
                return Err(ConfigurationError::invalid_value(
                    format!("single_flight.{field}"),
                    value,
                    "must be at least 1",
                ));
            }
        }

        let durations = [
            ("lock_timeout_seconds", self.lock_timeout_seconds),
            ("in_flight_timeout_seconds", self.in_flight_timeout_seconds),
            ("result_ttl_seconds", self.result_ttl_seconds),
            ("poll_max_ms", self.poll_max_ms / 1000),
        ];
        for (field, seconds) in durations {
            if seconds > MAX_FLIGHT_SECONDS {
                return Err(ConfigurationError::invalid_value(
                    format!("single_flight.{field}"),
                    seconds,
                    format!("must not exceed {MAX_FLIGHT_SECONDS} seconds"),
                ));
            }
        }

        let required_lock = self
            .in_flight_timeout_seconds
            .checked_add(LOCK_SAFETY_MARGIN_SECONDS)
            .ok_or_else(|| {
                ConfigurationError::invalid_value(
                    "single_flight.in_flight_timeout_seconds",
                    self.in_flight_timeout_seconds,
                    "is out of range",
                )
            })?;
        if self.lock_timeout_seconds < required_lock {
            return Err(ConfigurationError::invalid_value(
                "single_flight.lock_timeout_seconds",
                self.lock_timeout_seconds,
                format!(
                    "must be at least in_flight_timeout_seconds + {LOCK_SAFETY_MARGIN_SECONDS} ({required_lock})"
                ),
            ));
        }

        if self.poll_initial_ms > self.poll_max_ms {
            return Err(ConfigurationError::invalid_value(
                "single_flight.poll_initial_ms",
                self.poll_initial_ms,
                format!("must not exceed poll_max_ms ({})", self.poll_max_ms),
            ));
        }

        Ok(())
    }
}

impl Default for SingleFlightConfig {
    fn default() -> Self {
        Self {
            lock_timeout_seconds: 30,
            in_flight_timeout_seconds: 10,
            result_ttl_seconds: 30,
            poll_initial_ms: 20,
            poll_max_ms: 200,
            poll_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 30,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadSettings {
    pub max_concurrent_calls: usize,
    pub max_wait_ms: u64,
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 64,
            max_wait_ms: 50,
        }
    }
}

/// Policy applied to every store call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub call_timeout_ms: u64,
    pub circuit_breaker: CircuitBreakerSettings,
    pub bulkhead: BulkheadSettings,
}

impl ResilienceConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Convert to the runtime policy configuration
    pub fn to_resilience_config(&self) -> StorePolicyConfig {
        StorePolicyConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: self.circuit_breaker.failure_threshold,
                timeout: Duration::from_secs(self.circuit_breaker.timeout_seconds),
                success_threshold: self.circuit_breaker.success_threshold,
            },
            bulkhead: BulkheadConfig {
                max_concurrent_calls: self.bulkhead.max_concurrent_calls,
                max_wait: Duration::from_millis(self.bulkhead.max_wait_ms),
            },
            call_timeout: self.call_timeout(),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        self.to_resilience_config()
            .validate()
            .map_err(|e| ConfigurationError::validation_error(format!("resilience: {e}")))
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 500,
            circuit_breaker: CircuitBreakerSettings::default(),
            bulkhead: BulkheadSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_enabled: bool,
    /// Service name attached to startup logs
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            service_name: "summary-cache".to_string(),
        }
    }
}
