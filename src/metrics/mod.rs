//! # Metrics
//!
//! Counters and timers emitted by the cache, the single-flight coordinator
//! and the summary service. Components receive an injected [`MetricsSink`];
//! production wiring binds it to OpenTelemetry ([`OtelMetrics`]), tests bind
//! it to [`InMemoryMetrics`].

pub mod memory;
pub mod otel;

use std::fmt::Debug;
use std::time::Duration;

pub use memory::{InMemoryMetrics, NoopMetrics};
pub use otel::OtelMetrics;

/// Outcome of a cache call as seen by observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    Hit,
    Miss,
    /// Store reachable but the call failed
    Error,
    /// Call shed by the store policy
    Unavailable,
    Put,
    PutFailed,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Error => "cache.error",
            Self::Unavailable => "cache.unavailable",
            Self::Put => "cache.put",
            Self::PutFailed => "cache.put_failed",
        }
    }
}

/// Timed cache operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Put,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
        }
    }
}

/// Single-flight protocol milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightEvent {
    /// Result envelope already published
    FastPathHit,
    Leader,
    Follower,
    /// Shared store unreachable, coalescing within this process only
    LocalFallback,
    Timeout,
    PublishFailed,
}

impl FlightEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastPathHit => "fast_path_hit",
            Self::Leader => "leader",
            Self::Follower => "follower",
            Self::LocalFallback => "local_fallback",
            Self::Timeout => "timeout",
            Self::PublishFailed => "publish_failed",
        }
    }
}

/// Destination for metrics emitted by this crate
pub trait MetricsSink: Send + Sync + Debug {
    fn record_cache_event(&self, event: CacheEvent);

    fn record_cache_latency(&self, operation: CacheOperation, elapsed: Duration);

    /// One generator call, `success` reflecting its outcome
    fn record_generator_invocation(&self, generator: &str, success: bool);

    fn record_flight_event(&self, event: FlightEvent);
}
