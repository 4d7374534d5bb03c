//! In-memory store provider using Moka
//!
//! Process-local store with per-entry TTL and a bounded capacity. Suitable for
//! single-instance deployments and tests; coordination only spans the current
//! process.
//!
//! Liveness is judged with `tokio::time::Instant` so paused-time tests can
//! advance past an expiry. Moka evicts on its own wall clock as well, and a
//! periodic sweep drops entries that expired on the tokio clock but are still
//! resident.

use crate::store::errors::StoreResult;
use crate::store::traits::KeyValueStore;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use moka::Expiry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Entry bound used by [`InMemoryStore::new`]
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Minimum time between sweeps of expired entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Longest TTL handed to Moka; logical expiry still uses the full TTL
const MAX_EVICTION_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    ttl: Duration,
    /// `None` when the TTL runs past the end of the clock
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: &str, ttl: Duration, now: Instant) -> Self {
        let ttl = ttl.max(Duration::from_secs(1));
        Self {
            value: value.to_string(),
            ttl,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Per-entry TTL for Moka's own eviction
struct EntryTtl;

impl Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl.min(MAX_EVICTION_TTL))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl.min(MAX_EVICTION_TTL))
    }
}

/// In-memory key-value store with per-entry TTL
pub struct InMemoryStore {
    cache: Cache<String, MemoryEntry>,
    last_sweep: Mutex<Instant>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Store holding at most `max_capacity` entries, least recently used first out
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryTtl)
            .build();

        debug!(max_capacity = max_capacity, "Memory store created");

        Self {
            cache,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// TTL most recently written for a live key
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.cache
            .get(key)
            .await
            .filter(|e| e.is_live(now))
            .map(|e| e.ttl)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.cache.iter().filter(|(_, e)| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every resident entry that has expired; returns how many went
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, e)| !e.is_live(now))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in expired {
            if self.remove_if_expired(&key, now).await {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed = removed, "Purged expired memory store entries");
        }
        removed
    }

    async fn purge_expired_if_due(&self) {
        let now = Instant::now();
        {
            let mut last = self.last_sweep.lock();
            if now.duration_since(*last) < SWEEP_INTERVAL {
                return;
            }
            *last = now;
        }
        self.purge_expired().await;
    }

    async fn remove_if_expired(&self, key: &str, now: Instant) -> bool {
        let outcome = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| async move {
                match current {
                    Some(entry) if !entry.value().is_live(now) => Op::Remove,
                    _ => Op::Nop,
                }
            })
            .await;
        matches!(outcome, CompResult::Removed(_))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        match self.cache.get(key).await {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value)),
            Some(_) => {
                self.remove_if_expired(key, now).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.purge_expired_if_due().await;
        let entry = MemoryEntry::new(value, ttl, Instant::now());
        self.cache.insert(key.to_string(), entry).await;
        debug!(key = key, ttl_seconds = ttl.as_secs(), "Memory store SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.purge_expired_if_due().await;
        let now = Instant::now();
        let fresh = MemoryEntry::new(value, ttl, now);
        let outcome = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|current| async move {
                match current {
                    Some(entry) if entry.value().is_live(now) => Op::Nop,
                    _ => Op::Put(fresh),
                }
            })
            .await;
        Ok(matches!(
            outcome,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<u64> {
        let now = Instant::now();
        let expected = expected.to_string();
        let outcome = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| async move {
                match current {
                    Some(entry) if entry.value().is_live(now) && entry.value().value == expected => {
                        Op::Remove
                    }
                    _ => Op::Nop,
                }
            })
            .await;
        Ok(u64::from(matches!(outcome, CompResult::Removed(_))))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}
