//! Point-in-time view of the registry for status endpoints

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of a [`super::ResilienceRegistry`]
///
/// Serializes with the camelCase field names the admin status endpoint has
/// always exposed (`activeRetries`, `circuitBreakers`, `errorCounts`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResilienceStatus {
    /// Keys with a retry sequence in flight, and how many retries it has used
    pub active_retries: BTreeMap<String, u32>,
    /// Breaker state per tracked key (`true` = open)
    pub circuit_breakers: BTreeMap<String, bool>,
    /// Current error count per tracked key
    pub error_counts: BTreeMap<String, u64>,
    /// When each currently open breaker opened
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub open_since: BTreeMap<String, DateTime<Utc>>,
}

impl ResilienceStatus {
    /// Whether the breaker for `key` was open when the snapshot was taken
    pub fn is_open(&self, key: &str) -> bool {
        self.circuit_breakers.get(key).copied().unwrap_or(false)
    }

    /// Error count for `key` (0 when untracked)
    pub fn error_count(&self, key: &str) -> u64 {
        self.error_counts.get(key).copied().unwrap_or(0)
    }

    /// Whether `key` has a retry sequence in flight
    pub fn is_retrying(&self, key: &str) -> bool {
        self.active_retries.contains_key(key)
    }

    /// Keys whose breaker is open
    pub fn open_breakers(&self) -> impl Iterator<Item = &str> {
        self.circuit_breakers.iter().filter(|(_, open)| **open).map(|(key, _)| key.as_str())
    }
}
