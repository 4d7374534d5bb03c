//! Key-value store trait definition

use super::errors::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Remote, shared, TTL-capable key-value store
///
/// Every service instance talks to the same store; it is the only medium the
/// single-flight protocol uses to coordinate across processes. Implementations
/// must make `set_if_absent` and `compare_and_delete` atomic on the backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Get a value by key
    ///
    /// Returns `Ok(Some(value))` when present, `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a value with a TTL, overwriting any existing value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Delete a key; absent keys are not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Set a value only if the key is absent
    ///
    /// Returns `true` when this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete the key only if its current value equals `expected`
    ///
    /// Returns the number of keys removed (0 or 1).
    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<u64>;

    /// Check if the store backend is healthy
    async fn health_check(&self) -> StoreResult<bool>;

    /// Get the name of the store provider
    fn provider_name(&self) -> &'static str;

    /// Whether state is shared across service instances
    fn is_distributed(&self) -> bool;
}
