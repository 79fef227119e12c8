//! Cache Entry Module
//!
//! Defines the structure for individual local cache entries with TTL and
//! last-access tracking.

// == Cache Entry ==
/// Represents a single locally cached value with expiry and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload (caller-owned encoding)
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Last read or write timestamp (Unix milliseconds)
    pub last_access_at: u64,
    /// Monotonic access sequence, breaks ties between equal timestamps
    pub access_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry written at `now_ms` that lives for `ttl_seconds`.
    pub fn new(value: String, ttl_seconds: u64, now_ms: u64, access_seq: u64) -> Self {
        Self {
            value,
            expires_at: now_ms.saturating_add(ttl_seconds.saturating_mul(1000)),
            last_access_at: now_ms,
            access_seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is visible only while `expires_at > now`,
    /// so it is expired from the exact millisecond its TTL elapses.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Touch ==
    /// Records a read hit.
    pub fn touch(&mut self, now_ms: u64, access_seq: u64) {
        self.last_access_at = now_ms;
        self.access_seq = access_seq;
    }

    /// Sort key for LRU ranking (oldest first).
    pub(crate) fn lru_rank(&self) -> (u64, u64) {
        (self.last_access_at, self.access_seq)
    }
}
