//! # Structured Logging Module
//!
//! Environment-aware structured logging for the cache and coordination paths.
//! Human-readable output by default, JSON lines when `telemetry.json_logs` is
//! set.

use crate::config::TelemetryConfig;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
///
/// `RUST_LOG` wins over `telemetry.log_level`; an empty configured level falls
/// back to a per-environment default. A subscriber installed by someone else
/// is left in place.
pub fn init_structured_logging(telemetry: &TelemetryConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = build_filter(telemetry, &environment);

        let fmt_layer = if telemetry.json_logs {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            service = %telemetry.service_name,
            json = telemetry.json_logs,
            "Structured logging initialized"
        );
    });
}

fn build_filter(telemetry: &TelemetryConfig, environment: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if telemetry.log_level.trim().is_empty() {
        get_log_level(environment)
    } else {
        telemetry.log_level.as_str()
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(get_log_level(environment)))
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("SUMMARY_CACHE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
