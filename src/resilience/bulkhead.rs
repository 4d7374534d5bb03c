//! # Bulkhead
//!
//! Caps the number of concurrent calls to a dependency. Callers that cannot
//! get a slot within `max_wait` are shed instead of queueing indefinitely.

use crate::resilience::BulkheadConfig;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Concurrency limiter backed by a tokio semaphore
#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    semaphore: Arc<Semaphore>,
    config: BulkheadConfig,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Self {
        Self {
            name: name.into(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            config,
        }
    }

    /// Acquire a slot, waiting at most `max_wait`
    ///
    /// Returns `None` when the bulkhead is saturated for the whole wait.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Some(permit);
        }
        if self.config.max_wait.is_zero() {
            debug!(component = %self.name, "Bulkhead full, shedding call");
            return None;
        }

        match tokio::time::timeout(self.config.max_wait, self.semaphore.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => Some(permit),
            _ => {
                debug!(
                    component = %self.name,
                    max_wait_ms = self.config.max_wait.as_millis(),
                    "Bulkhead full after waiting, shedding call"
                );
                None
            }
        }
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.config.max_concurrent_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bulkhead_sheds_when_saturated() {
        let bulkhead = Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent_calls: 2,
                max_wait: Duration::ZERO,
            },
        );

        let first = bulkhead.acquire().await;
        let second = bulkhead.acquire().await;
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(bulkhead.available(), 0);

        assert!(bulkhead.acquire().await.is_none());

        drop(first);
        assert!(bulkhead.acquire().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulkhead_waits_for_release() {
        let bulkhead = Arc::new(Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent_calls: 1,
                max_wait: Duration::from_millis(100),
            },
        ));

        let held = bulkhead.acquire().await;
        assert!(held.is_some());

        let waiter = {
            let bulkhead = bulkhead.clone();
            tokio::spawn(async move { bulkhead.acquire().await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }
}
