//! Local Entry Cache Module
//!
//! In-process bounded map combining TTL expiry with LRU size capping.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::lru::oldest_keys;
use crate::cache::{CacheEntry, Clock};

// == Sweep Report ==
/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed because their TTL elapsed
    pub expired: usize,
    /// Entries removed by LRU eviction
    pub evicted: usize,
}

// == Local Cache ==
/// Bounded in-process map of key -> (value, expiry, last access).
///
/// Performs no I/O. Expired entries are invisible to readers immediately and
/// physically removed either on read or by `sweep`. The size bound is enforced
/// by `sweep` through `evict_if_over_capacity`.
#[derive(Debug)]
pub struct LocalCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Maximum number of entries kept after a sweep
    max_entries: usize,
    /// Monotonic access counter for LRU tie-breaking
    access_seq: u64,
    clock: Arc<dyn Clock>,
}

impl LocalCache {
    // == Constructor ==
    /// Creates an empty cache bounded at `max_entries`.
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            access_seq: 0,
            clock,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }

    // == Get ==
    /// Returns the value if present and not expired.
    ///
    /// A hit refreshes the entry's last-access time. An expired entry is
    /// removed on the spot and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let seq = self.next_seq();

        let entry = self.entries.get_mut(key)?;
        if !entry.is_expired(now) {
            entry.touch(now, seq);
            return Some(entry.value.clone());
        }

        self.entries.remove(key);
        None
    }

    // == Contains ==
    /// Checks liveness without counting as an access.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    // == Put ==
    /// Stores `value` for `ttl_seconds`, replacing any existing entry.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>, ttl_seconds: u64) {
        let now = self.clock.now_ms();
        let seq = self.next_seq();
        self.entries
            .insert(key.into(), CacheEntry::new(value.into(), ttl_seconds, now, seq));
    }

    // == Delete ==
    /// Removes the given keys, returning how many were present.
    pub fn delete<S: AsRef<str>>(&mut self, keys: &[S]) -> usize {
        keys.iter()
            .filter(|key| self.entries.remove(key.as_ref()).is_some())
            .count()
    }

    // == Sweep ==
    /// Purges expired entries, then enforces the size bound.
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let expired = before - self.entries.len();

        SweepReport {
            expired,
            evicted: self.evict_if_over_capacity(),
        }
    }

    // == Evict If Over Capacity ==
    /// Drops the least recently accessed entries until the map fits.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_if_over_capacity(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return 0;
        }

        for key in oldest_keys(&self.entries, excess) {
            self.entries.remove(&key);
        }
        excess
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Length ==
    /// Returns the number of stored entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
