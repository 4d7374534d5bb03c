//! # Circuit Breaker
//!
//! Stops sending calls to a store that keeps failing. Closed passes every
//! call; after `failure_threshold` consecutive failures the breaker opens and
//! rejects calls until `timeout` has passed, then half-opens and lets trial
//! calls through. `success_threshold` successes close it, a single failure
//! reopens it.
//!
//! The breaker only decides and records; [`StorePolicy`](super::StorePolicy)
//! runs the call. Time is read from `tokio::time` so the open timeout follows
//! paused clocks in tests.

use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            2 => Self::HalfOpen,
            _ => Self::Open,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    consecutive_failures: AtomicU64,
    /// Successes recorded since the breaker half-opened
    trial_successes: AtomicU64,
    epoch: Instant,
    /// Nanos since `epoch` when the breaker opened, plus one; 0 while closed
    opened_at: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            timeout_seconds = config.timeout.as_secs(),
            success_threshold = config.success_threshold,
            "Store circuit breaker ready"
        );

        Self {
            name,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU64::new(0),
            trial_successes: AtomicU64::new(0),
            epoch: Instant::now(),
            opened_at: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Whether the next store call may go out
    pub fn should_allow(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened = self.opened_at.load(Ordering::Acquire);
                let open_for = self.now_nanos().saturating_sub(opened.saturating_sub(1));
                if open_for < self.config.timeout.as_nanos() as u64 {
                    return false;
                }
                self.half_open();
                true
            }
            CircuitState::HalfOpen => {
                self.trial_successes.load(Ordering::Acquire)
                    < u64::from(self.config.success_threshold)
            }
        }
    }

    pub fn record_success(&self, duration: Duration) {
        match self.state() {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                let successes = self.trial_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= u64::from(self.config.success_threshold) {
                    self.close();
                }
            }
            CircuitState::Open => {
                debug!(
                    component = %self.name,
                    duration_ms = duration.as_millis(),
                    "Late success while circuit is open"
                );
            }
        }
    }

    pub fn record_failure(&self, duration: Duration) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(
                    component = %self.name,
                    consecutive_failures = failures,
                    duration_ms = duration.as_millis(),
                    "Store call failed"
                );
                if failures >= u64::from(self.config.failure_threshold) {
                    self.open();
                }
            }
            CircuitState::HalfOpen => self.open(),
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit forced open");
        self.open();
    }

    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit forced closed");
        self.close();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    fn open(&self) {
        self.opened_at.store(self.now_nanos() + 1, Ordering::Release);
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        error!(
            component = %self.name,
            consecutive_failures = self.consecutive_failures(),
            retry_after_seconds = self.config.timeout.as_secs(),
            "Store circuit opened"
        );
    }

    fn half_open(&self) {
        self.trial_successes.store(0, Ordering::Relaxed);
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);
        info!(component = %self.name, "Store circuit half-open");
    }

    fn close(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.opened_at.store(0, Ordering::Release);
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        info!(component = %self.name, "Store circuit closed");
    }
}
