//! Tiered cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of [`super::TieredCache`] activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TieredCacheStats {
    /// Reads served by the local tier
    pub local_hits: u64,
    /// Reads served by the shared tier (and promoted locally)
    pub shared_hits: u64,
    /// Reads that found nothing in either tier
    pub misses: u64,
    /// Successful writes
    pub writes: u64,
    /// Shared tier operations that failed
    pub shared_errors: u64,
    /// Local entries dropped by the LRU bound
    pub local_evictions: u64,
    /// Local entries dropped because they expired
    pub local_expirations: u64,
    /// Entries currently held in the local tier
    pub local_size: usize,
}

impl TieredCacheStats {
    /// Fraction of reads answered by either tier
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.shared_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Total reads
    pub fn total_reads(&self) -> u64 {
        self.local_hits + self.shared_hits + self.misses
    }
}

/// Lock-free counters behind [`TieredCacheStats`]
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    shared_errors: AtomicU64,
    local_evictions: AtomicU64,
    local_expirations: AtomicU64,
}

impl MetricsCollector {
    pub(crate) fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shared_hit(&self) {
        self.shared_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shared_error(&self) {
        self.shared_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.local_evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.local_expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, local_size: usize) -> TieredCacheStats {
        TieredCacheStats {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            shared_hits: self.shared_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            shared_errors: self.shared_errors.load(Ordering::Relaxed),
            local_evictions: self.local_evictions.load(Ordering::Relaxed),
            local_expirations: self.local_expirations.load(Ordering::Relaxed),
            local_size,
        }
    }
}
