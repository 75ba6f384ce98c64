//! Shared (durable) tier abstraction and the in-process backend

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::{CacheError, CacheResult};
use crate::time::{Clock, SystemClock};

/// A payload read from the shared tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Serialized JSON payload
    pub payload: String,
    /// Remaining lifetime, if the store reports one
    pub expires_in: Option<Duration>,
}

/// The authoritative, expiring key/value tier behind [`super::TieredCache`]
///
/// Implementations must treat a missing or expired key as `Ok(None)` and
/// reserve errors for an unreachable backend.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read `key` and its remaining TTL
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>>;

    /// Atomically write `key` with an expiry
    async fn set_with_expiry(&self, key: &str, payload: String, ttl: Duration) -> CacheResult<()>;

    /// Delete `key`; returns whether it existed
    async fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str {
        "shared"
    }
}

#[async_trait]
impl<T: SharedStore + ?Sized> SharedStore for Arc<T> {
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>> {
        (**self).get(key).await
    }

    async fn set_with_expiry(&self, key: &str, payload: String, ttl: Duration) -> CacheResult<()> {
        (**self).set_with_expiry(key, payload, ttl).await
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        (**self).remove(key).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: String,
    /// `None` when the TTL lies beyond what `Instant` can represent
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        !self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process [`SharedStore`]
///
/// Used when no Redis URL is configured and in tests. Counts reads and writes
/// and can be switched unavailable to simulate an outage.
pub struct MemoryStore<C: Clock = SystemClock> {
    entries: DashMap<String, MemoryEntry>,
    available: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
    clock: C,
}

impl<C: Clock> std::fmt::Debug for MemoryStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.len())
            .field("available", &self.is_available())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}

impl MemoryStore<SystemClock> {
    /// Create an empty store on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    /// Create an empty store with a custom clock
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            clock,
        }
    }

    /// Simulate the backend going down (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the store currently accepts operations
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of `get` calls served
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set_with_expiry` calls served
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Live entries, without touching the read counter
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries.get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CacheError::unavailable("memory store is offline"))
        }
    }
}

#[async_trait]
impl<C: Clock> SharedStore for MemoryStore<C> {
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>> {
        self.ensure_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let now = self.clock.now();
        let found = self.entries.get(key).map(|entry| (entry.payload.clone(), entry.expires_at));

        match found {
            Some((payload, None)) => Ok(Some(StoredValue { payload, expires_in: None })),
            Some((payload, Some(expires_at))) if expires_at > now => {
                Ok(Some(StoredValue { payload, expires_in: Some(expires_at - now) }))
            }
            Some(_) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(&self, key: &str, payload: String, ttl: Duration) -> CacheResult<()> {
        self.ensure_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let expires_at = self.clock.now().checked_add(ttl);
        self.entries.insert(key.to_owned(), MemoryEntry { payload, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        self.ensure_available()?;
        Ok(self.entries.remove(key).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
