//! # Resilience Module
//!
//! Fault isolation for calls to the shared store.
//!
//! - **Circuit Breaker**: fails fast once consecutive failures cross a threshold
//! - **Bulkhead**: bounds concurrent calls and sheds the overflow
//! - **Store Policy**: both of the above plus a per-call timeout, injected
//!   into [`GuardedStore`](crate::store::GuardedStore)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use summary_cache::resilience::{StorePolicy, StorePolicyConfig};
//! use summary_cache::store::StoreError;
//!
//! # async fn example() -> Result<(), StoreError> {
//! let policy = StorePolicy::new("summary_store", StorePolicyConfig::default());
//!
//! let value = policy.call(|| async {
//!     // store round trip here
//!     Ok::<_, StoreError>(Some("cached".to_string()))
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod bulkhead;
pub mod circuit_breaker;
pub mod config;
pub mod policy;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::{BulkheadConfig, CircuitBreakerConfig, StorePolicyConfig};
pub use policy::StorePolicy;
