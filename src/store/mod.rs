//! # Key-Value Store
//!
//! Async abstraction over the shared, TTL-capable store that backs both the
//! cache and single-flight coordination.
//!
//! ## Providers
//!
//! - **Redis** (`cache-redis` feature): `redis::aio::ConnectionManager` with a
//!   Lua compare-and-delete script
//! - **Memory**: process-local, for single-instance deployments and tests
//!
//! [`GuardedStore`] layers the resilience policy over any provider. With the
//! `test-utils` feature, `testing::FaultInjectingStore` forces failures in
//! tests.

pub mod errors;
pub mod guarded;
pub mod memory;
#[cfg(feature = "cache-redis")]
pub mod redis;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod traits;

pub use errors::{RejectionReason, StoreError, StoreResult};
pub use guarded::GuardedStore;
pub use memory::InMemoryStore;
#[cfg(feature = "cache-redis")]
pub use self::redis::RedisStore;
pub use traits::KeyValueStore;
