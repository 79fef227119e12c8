//! Cache Statistics Module
//!
//! Process-wide counters for local hits, remote calls and batched writes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Monotonic counters shared by the cache client and its write coalescer.
///
/// Only `reset` (driven by a local cache clear) ever moves them backwards.
#[derive(Debug, Default)]
pub struct StatsCounters {
    local_hits: AtomicU64,
    remote_calls: AtomicU64,
    batched_writes: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_local_hit(&self) {
        self.record_local_hits(1);
    }

    pub fn record_local_hits(&self, count: u64) {
        self.local_hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batched_writes(&self, count: u64) {
        self.batched_writes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn local_hits(&self) -> u64 {
        self.local_hits.load(Ordering::Relaxed)
    }

    pub fn remote_calls(&self) -> u64 {
        self.remote_calls.load(Ordering::Relaxed)
    }

    pub fn batched_writes(&self) -> u64 {
        self.batched_writes.load(Ordering::Relaxed)
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&self) {
        self.local_hits.store(0, Ordering::Relaxed);
        self.remote_calls.store(0, Ordering::Relaxed);
        self.batched_writes.store(0, Ordering::Relaxed);
    }
}

// == Cache Statistics ==
/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatistics {
    pub local_hits: u64,
    pub remote_calls: u64,
    pub batched_writes: u64,
    /// Local hits as a rounded percentage of all lookups
    pub hit_rate: u64,
    pub local_cache_size: usize,
    pub pending_writes: usize,
    /// Configured remote backend ("none", "rest", "socket", "memory")
    pub backend: String,
}

impl CacheStatistics {
    // == Hit Rate ==
    /// Calculates `round(100 * hits / (hits + remote_calls))`, or 0 with no traffic.
    pub fn hit_rate(local_hits: u64, remote_calls: u64) -> u64 {
        let total = local_hits + remote_calls;
        if total == 0 {
            0
        } else {
            ((local_hits as f64 * 100.0) / total as f64).round() as u64
        }
    }
}
