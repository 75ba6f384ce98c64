//! Process-local tier

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Value,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Result of a local lookup
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lookup {
    Hit(Value),
    Expired,
    Miss,
}

/// In-memory map of decoded values with optional per-entry expiry and an
/// optional LRU bound. Time is passed in by the caller.
#[derive(Debug)]
pub(crate) struct LocalTier {
    entries: RwLock<HashMap<String, LocalEntry>>,
    max_entries: Option<usize>,
}

impl LocalTier {
    pub(crate) fn new(max_entries: Option<usize>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), max_entries }
    }

    pub(crate) fn get(&self, key: &str, now: Instant) -> Lookup {
        let mut entries = self.entries.write();
        let expired = match entries.get(key) {
            None => return Lookup::Miss,
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            entries.remove(key);
            return Lookup::Expired;
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                Lookup::Hit(entry.value.clone())
            }
            None => Lookup::Miss,
        }
    }

    /// Insert or replace `key`; returns whether another entry was evicted
    pub(crate) fn insert(&self, key: &str, value: Value, ttl: Option<Duration>, now: Instant) -> bool {
        let mut entries = self.entries.write();

        let mut evicted = false;
        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_accessed)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    evicted = true;
                }
            }
        }

        let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        entries.insert(key.to_owned(), LocalEntry { value, expires_at, last_accessed: now });
        evicted
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    pub(crate) fn contains(&self, key: &str, now: Instant) -> bool {
        self.entries.read().get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop expired entries; returns how many were removed
    pub(crate) fn cleanup_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}
