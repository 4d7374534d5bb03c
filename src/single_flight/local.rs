//! Process-local coalescing
//!
//! Used when the shared store cannot be read. Concurrent callers for the same
//! flight key inside this process share one execution: the first caller runs
//! the operation, the rest wait on a watch channel for its envelope. The
//! record is removed as soon as the leader settles or goes away, so the next
//! call for that key starts fresh.

use super::envelope::{settle, ResultEnvelope};
use super::errors::{FailureCode, FlightError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct LocalFlight {
    id: u64,
    outcome: watch::Receiver<Option<ResultEnvelope>>,
}

enum Role {
    Leader {
        id: u64,
        outcome: watch::Sender<Option<ResultEnvelope>>,
    },
    Follower(watch::Receiver<Option<ResultEnvelope>>),
}

/// In-memory flight registry for one process
#[derive(Debug, Default)]
pub struct LocalFlights {
    flights: DashMap<String, LocalFlight>,
    next_id: AtomicU64,
}

/// Removes the leader's record on drop, unless a newer flight replaced it
struct Registration<'a> {
    flights: &'a DashMap<String, LocalFlight>,
    key: &'a str,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.flights.remove_if(self.key, |_, flight| flight.id == self.id);
    }
}

impl LocalFlights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flights currently in progress
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Run `operation` once per key among concurrent local callers
    ///
    /// Followers wait at most `wait_budget` for the leader.
    pub async fn execute<T, E, F, Fut>(
        &self,
        flight_key: &str,
        wait_budget: Duration,
        operation: F,
    ) -> Result<T, FlightError>
    where
        T: Serialize + DeserializeOwned,
        E: Display + FailureCode,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let role = match self.flights.entry(flight_key.to_string()) {
            Entry::Occupied(existing) => Role::Follower(existing.get().outcome.clone()),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                slot.insert(LocalFlight { id, outcome: rx });
                Role::Leader { id, outcome: tx }
            }
        };

        match role {
            Role::Leader { id, outcome } => {
                debug!(flight_key = flight_key, "Local flight leader");
                let registration = Registration {
                    flights: &self.flights,
                    key: flight_key,
                    id,
                };

                let result = operation().await;
                let (result, envelope) = settle(flight_key, result);

                drop(registration);
                // no followers left is fine
                let _ = outcome.send(Some(envelope));
                result
            }
            Role::Follower(outcome) => {
                debug!(flight_key = flight_key, "Local flight follower");
                Self::wait(flight_key, wait_budget, outcome).await
            }
        }
    }

    async fn wait<T: DeserializeOwned>(
        flight_key: &str,
        wait_budget: Duration,
        mut outcome: watch::Receiver<Option<ResultEnvelope>>,
    ) -> Result<T, FlightError> {
        let start = Instant::now();
        let settled = tokio::time::timeout(wait_budget, outcome.wait_for(Option::is_some)).await;

        let envelope = match settled {
            Ok(Ok(published)) => published.clone(),
            Ok(Err(_)) => None,
            Err(_) => {
                return Err(FlightError::Timeout {
                    flight_key: flight_key.to_string(),
                    waited: start.elapsed(),
                })
            }
        };

        match envelope {
            Some(envelope) => envelope.into_result(flight_key),
            None => Err(FlightError::Cancelled {
                flight_key: flight_key.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_execution() {
        let flights = LocalFlights::new();
        let counter = AtomicUsize::new(0);
        let runs = &counter;

        let calls = (0..5).map(|_| {
            flights.execute("k", Duration::from_secs(10), move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, anyhow::Error>("value".to_string())
            })
        });
        let results = join_all(calls).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_deref() == Ok("value")));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_replayed_to_waiters() {
        let flights = LocalFlights::new();

        let calls = (0..3).map(|_| {
            flights.execute("k", Duration::from_secs(10), || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<String, _>(anyhow::anyhow!("generator exploded"))
            })
        });
        let results = join_all(calls).await;

        let first = results[0].clone().unwrap_err();
        assert!(matches!(first, FlightError::Failed { ref code, .. } if code == "OPERATION_FAILED"));
        assert!(results.iter().all(|r| r.as_ref().unwrap_err() == &first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_removed_after_settle() {
        let flights = LocalFlights::new();
        let counter = AtomicUsize::new(0);
        let runs = &counter;

        for _ in 0..2 {
            let _ = flights
                .execute("k", Duration::from_secs(1), move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(1u32)
                })
                .await;
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_times_out() {
        let flights = Arc::new(LocalFlights::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .execute("k", Duration::from_secs(1), || async move {
                        let _ = release_rx.await;
                        Ok::<_, anyhow::Error>(0u8)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let start = Instant::now();
        let result = flights
            .execute("k", Duration::from_secs(1), || async { Ok::<_, anyhow::Error>(9u8) })
            .await;

        assert!(matches!(result, Err(FlightError::Timeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(1));

        release_tx.send(()).unwrap();
        assert_eq!(leader.await.unwrap(), Ok(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_leader_cancels_waiters() {
        let flights = Arc::new(LocalFlights::new());

        let leader = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .execute("k", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok::<_, anyhow::Error>(0u8)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let follower = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .execute("k", Duration::from_secs(5), || async { Ok::<_, anyhow::Error>(1u8) })
                    .await
            })
        };
        tokio::task::yield_now().await;

        leader.abort();
        let result = follower.await.unwrap();

        assert!(matches!(result, Err(FlightError::Cancelled { .. })));
        assert_eq!(flights.in_flight(), 0);
    }
}
