//! # OpenTelemetry Metrics
//!
//! Binds [`MetricsSink`] to the global OpenTelemetry meter. Exporter setup is
//! left to the host application; without one the global no-op provider
//! absorbs everything.
//!
//! Instruments:
//! - `summary_cache.cache.{hit,miss,error,unavailable,put,put_failed}` counters
//! - `summary_cache.cache.get.duration` / `summary_cache.cache.put.duration`
//!   histograms (seconds)
//! - `summary_cache.generator.invocations` counter (labels: generator, result)
//! - `summary_cache.flight.events` counter (label: event)

use super::{CacheEvent, CacheOperation, FlightEvent, MetricsSink};
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use std::time::Duration;

const CACHE_EVENTS: [CacheEvent; 6] = [
    CacheEvent::Hit,
    CacheEvent::Miss,
    CacheEvent::Error,
    CacheEvent::Unavailable,
    CacheEvent::Put,
    CacheEvent::PutFailed,
];

/// OpenTelemetry-backed metrics sink
pub struct OtelMetrics {
    cache_counters: Vec<(CacheEvent, Counter<u64>)>,
    get_duration: Histogram<f64>,
    put_duration: Histogram<f64>,
    generator_invocations: Counter<u64>,
    flight_events: Counter<u64>,
}

impl std::fmt::Debug for OtelMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelMetrics")
            .field("cache_counters", &self.cache_counters.len())
            .finish()
    }
}

impl OtelMetrics {
    /// Instruments registered on the global meter named `meter_name`
    pub fn new(meter_name: &'static str) -> Self {
        Self::from_meter(&opentelemetry::global::meter(meter_name))
    }

    pub fn from_meter(meter: &Meter) -> Self {
        let cache_counters = CACHE_EVENTS
            .iter()
            .map(|event| {
                let counter = meter
                    .u64_counter(format!("summary_cache.{}", event.as_str()))
                    .with_description("Cache calls by outcome")
                    .build();
                (*event, counter)
            })
            .collect();

        Self {
            cache_counters,
            get_duration: meter
                .f64_histogram("summary_cache.cache.get.duration")
                .with_description("Cache get latency")
                .with_unit("s")
                .build(),
            put_duration: meter
                .f64_histogram("summary_cache.cache.put.duration")
                .with_description("Cache put latency")
                .with_unit("s")
                .build(),
            generator_invocations: meter
                .u64_counter("summary_cache.generator.invocations")
                .with_description("Summary generator calls")
                .build(),
            flight_events: meter
                .u64_counter("summary_cache.flight.events")
                .with_description("Single-flight protocol events")
                .build(),
        }
    }
}

impl MetricsSink for OtelMetrics {
    fn record_cache_event(&self, event: CacheEvent) {
        if let Some((_, counter)) = self.cache_counters.iter().find(|(e, _)| *e == event) {
            counter.add(1, &[]);
        }
    }

    fn record_cache_latency(&self, operation: CacheOperation, elapsed: Duration) {
        let histogram = match operation {
            CacheOperation::Get => &self.get_duration,
            CacheOperation::Put => &self.put_duration,
        };
        histogram.record(elapsed.as_secs_f64(), &[]);
    }

    fn record_generator_invocation(&self, generator: &str, success: bool) {
        self.generator_invocations.add(
            1,
            &[
                KeyValue::new("generator", generator.to_string()),
                KeyValue::new("result", if success { "success" } else { "failure" }),
            ],
        );
    }

    fn record_flight_event(&self, event: FlightEvent) {
        self.flight_events
            .add(1, &[KeyValue::new("event", event.as_str())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_against_global_noop_provider() {
        let metrics = OtelMetrics::new("summary-cache-test");
        metrics.record_cache_event(CacheEvent::Miss);
        metrics.record_cache_latency(CacheOperation::Get, Duration::from_millis(2));
        metrics.record_generator_invocation("stub", true);
        metrics.record_flight_event(FlightEvent::Leader);
        assert_eq!(metrics.cache_counters.len(), CACHE_EVENTS.len());
    }
}
