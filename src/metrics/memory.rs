//! In-process metrics sinks

use super::{CacheEvent, CacheOperation, FlightEvent, MetricsSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_cache_event(&self, _event: CacheEvent) {}

    fn record_cache_latency(&self, _operation: CacheOperation, _elapsed: Duration) {}

    fn record_generator_invocation(&self, _generator: &str, _success: bool) {}

    fn record_flight_event(&self, _event: FlightEvent) {}
}

#[derive(Debug, Default)]
struct Recorded {
    cache_events: HashMap<CacheEvent, u64>,
    latencies: HashMap<CacheOperation, Vec<Duration>>,
    generator_invocations: HashMap<String, (u64, u64)>,
    flight_events: HashMap<FlightEvent, u64>,
}

/// Recorder that keeps every emitted metric for later assertions
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    recorded: Mutex<Recorded>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_events(&self, event: CacheEvent) -> u64 {
        self.recorded
            .lock()
            .cache_events
            .get(&event)
            .copied()
            .unwrap_or(0)
    }

    pub fn latency_samples(&self, operation: CacheOperation) -> usize {
        self.recorded
            .lock()
            .latencies
            .get(&operation)
            .map_or(0, Vec::len)
    }

    /// Total generator calls across all generators
    pub fn generator_invocations(&self) -> u64 {
        self.recorded
            .lock()
            .generator_invocations
            .values()
            .map(|(ok, failed)| ok + failed)
            .sum()
    }

    /// Failed generator calls across all generators
    pub fn generator_failures(&self) -> u64 {
        self.recorded
            .lock()
            .generator_invocations
            .values()
            .map(|(_, failed)| failed)
            .sum()
    }

    pub fn flight_events(&self, event: FlightEvent) -> u64 {
        self.recorded
            .lock()
            .flight_events
            .get(&event)
            .copied()
            .unwrap_or(0)
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_cache_event(&self, event: CacheEvent) {
        *self.recorded.lock().cache_events.entry(event).or_default() += 1;
    }

    fn record_cache_latency(&self, operation: CacheOperation, elapsed: Duration) {
        self.recorded
            .lock()
            .latencies
            .entry(operation)
            .or_default()
            .push(elapsed);
    }

    fn record_generator_invocation(&self, generator: &str, success: bool) {
        let mut recorded = self.recorded.lock();
        let counts = recorded
            .generator_invocations
            .entry(generator.to_string())
            .or_default();
        if success {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
    }

    fn record_flight_event(&self, event: FlightEvent) {
        *self.recorded.lock().flight_events.entry(event).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_counts_by_kind() {
        let metrics = InMemoryMetrics::new();
        metrics.record_cache_event(CacheEvent::Hit);
        metrics.record_cache_event(CacheEvent::Hit);
        metrics.record_cache_event(CacheEvent::Error);
        metrics.record_cache_latency(CacheOperation::Get, Duration::from_millis(3));
        metrics.record_generator_invocation("stub", true);
        metrics.record_generator_invocation("stub", false);

        assert_eq!(metrics.cache_events(CacheEvent::Hit), 2);
        assert_eq!(metrics.cache_events(CacheEvent::Error), 1);
        assert_eq!(metrics.cache_events(CacheEvent::Unavailable), 0);
        assert_eq!(metrics.latency_samples(CacheOperation::Get), 1);
        assert_eq!(metrics.generator_invocations(), 2);
        assert_eq!(metrics.generator_failures(), 1);
    }
}
