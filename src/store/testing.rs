//! Test doubles for exercising store failure paths
//!
//! [`FaultInjectingStore`] wraps any [`KeyValueStore`], records every call and
//! fails the ones matched by a predicate. It lets tests force "store reachable
//! but failing" without a real outage.

use crate::store::errors::{StoreError, StoreResult};
use crate::store::traits::KeyValueStore;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// Store operation kinds, used for fault predicates and call recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Set,
    Delete,
    SetIfAbsent,
    CompareAndDelete,
    HealthCheck,
}

type FaultPredicate = Arc<dyn Fn(StoreOp, &str) -> bool + Send + Sync>;

/// Store decorator that injects failures and latency
pub struct FaultInjectingStore {
    inner: Arc<dyn KeyValueStore>,
    fail_when: RwLock<Option<FaultPredicate>>,
    latency: RwLock<Option<Duration>>,
    calls: Mutex<Vec<(StoreOp, String)>>,
}

impl std::fmt::Debug for FaultInjectingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjectingStore")
            .field("inner", &self.inner)
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl FaultInjectingStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            fail_when: RwLock::new(None),
            latency: RwLock::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call for which `predicate(op, key)` returns true
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(StoreOp, &str) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.write() = Some(Arc::new(predicate));
    }

    /// Fail every call of the given kind
    pub fn fail_op(&self, op: StoreOp) {
        self.fail_when(move |candidate, _| candidate == op);
    }

    /// Fail every call
    pub fn fail_all(&self) {
        self.fail_when(|_, _| true);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        *self.fail_when.write() = None;
    }

    /// Delay every call by `latency` before it reaches the inner store
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Every call seen so far, in order
    pub fn calls(&self) -> Vec<(StoreOp, String)> {
        self.calls.lock().clone()
    }

    /// Number of calls of the given kind
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|(o, _)| *o == op).count()
    }

    async fn before(&self, op: StoreOp, key: &str) -> StoreResult<()> {
        self.calls.lock().push((op, key.to_string()));

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let predicate = self.fail_when.read().clone();
        match predicate {
            Some(p) if p(op, key) => Err(StoreError::BackendError(format!(
                "injected failure for {:?} on '{}'",
                op, key
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FaultInjectingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.before(StoreOp::Get, key).await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.before(StoreOp::Set, key).await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.before(StoreOp::Delete, key).await?;
        self.inner.delete(key).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.before(StoreOp::SetIfAbsent, key).await?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<u64> {
        self.before(StoreOp::CompareAndDelete, key).await?;
        self.inner.compare_and_delete(key, expected).await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.before(StoreOp::HealthCheck, "").await?;
        self.inner.health_check().await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn is_distributed(&self) -> bool {
        self.inner.is_distributed()
    }
}
