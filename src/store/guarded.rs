//! Policy-guarded store decorator
//!
//! Wraps any [`KeyValueStore`] so every call passes through a shared
//! [`StorePolicy`]. Both the cache and the single-flight coordinator talk to
//! the store through this wrapper.

use crate::resilience::StorePolicy;
use crate::store::errors::StoreResult;
use crate::store::traits::KeyValueStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Store decorator applying circuit breaker, bulkhead and call timeout
#[derive(Debug, Clone)]
pub struct GuardedStore {
    inner: Arc<dyn KeyValueStore>,
    policy: Arc<StorePolicy>,
}

impl GuardedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, policy: Arc<StorePolicy>) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &Arc<StorePolicy> {
        &self.policy
    }

    pub fn inner(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner
    }
}

#[async_trait]
impl KeyValueStore for GuardedStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.policy.call(|| self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.policy.call(|| self.inner.set(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.policy.call(|| self.inner.delete(key)).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.policy
            .call(|| self.inner.set_if_absent(key, value, ttl))
            .await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<u64> {
        self.policy
            .call(|| self.inner.compare_and_delete(key, expected))
            .await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.policy.call(|| self.inner.health_check()).await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn is_distributed(&self) -> bool {
        self.inner.is_distributed()
    }
}
