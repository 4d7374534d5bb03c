#![allow(clippy::doc_markdown)] // Allow technical terms like OpenTelemetry, Redis in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Summary Cache
//!
//! Distributed cache-aside with fleet-wide single-flight coalescing, built to
//! shield a slow, rate-limited summary generator from duplicate work.
//!
//! ## Overview
//!
//! Every instance of a service shares one remote key-value store and nothing
//! else. For a given key the crate decides whether to serve the cached value,
//! wait for a computation already running somewhere in the fleet, or become
//! the single process that performs it. Coordination uses only primitive
//! atomic store operations: set-if-absent, compare-and-delete and get/set
//! with TTL.
//!
//! ## Guarantees
//!
//! - **At most one computation** per key across all processes
//! - **Bounded waits** for followers of an in-progress computation
//! - **Safe degradation**: a failing store stops generation at the cache
//!   pre-check and falls back to in-process coalescing during coordination
//!
//! ## Module Organization
//!
//! - [`store`] - Key-value store trait with Redis and in-memory providers
//! - [`resilience`] - Circuit breaker, bulkhead and call timeout for store calls
//! - [`cache`] - Cache-aside with TTL jitter and a closed lookup outcome
//! - [`single_flight`] - Leader election, result envelopes and follower polling
//! - [`service`] - Read-through summaries over a pluggable generator
//! - [`config`] - Layered, validated configuration
//! - [`metrics`] - Injected metrics sinks (OpenTelemetry, in-memory, no-op)
//! - [`logging`] - Structured logging setup
//! - [`bootstrap`] - Wiring from configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use summary_cache::bootstrap::SummaryCacheSystem;
//! use summary_cache::config::ConfigManager;
//! use summary_cache::service::{SummaryGenerator, SummaryInput};
//!
//! # async fn example(generator: Arc<dyn SummaryGenerator>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! summary_cache::logging::init_structured_logging(&manager.config().telemetry);
//!
//! let system = SummaryCacheSystem::from_manager(&manager).await?;
//! let summaries = system.summary_service(generator);
//!
//! let input = SummaryInput::new("Article body ...").with_article_id("42");
//! let summary = summaries.get("42", &input).await?;
//! println!("{} (cached: {})", summary.content, summary.served_from_cache);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod resilience;
pub mod service;
pub mod single_flight;
pub mod store;

pub use bootstrap::SummaryCacheSystem;
pub use cache::{Cache, CacheError, CacheOutcome};
pub use config::{ConfigManager, ConfigurationError, SummaryCacheConfig};
pub use error::{Result, SummaryCacheError};
pub use service::{
    ErrorKind, HealthReport, SummaryError, SummaryGenerator, SummaryInput, SummaryResult,
    SummaryService,
};
pub use single_flight::{FailureCode, FlightError, SingleFlightCoordinator};
pub use store::{KeyValueStore, StoreError};
