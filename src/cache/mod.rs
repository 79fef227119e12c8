//! Cache Module
//!
//! Local entry cache with TTL expiration and LRU size capping, plus the
//! statistics counters shared across the cache client.

mod clock;
mod entry;
mod local;
mod lru;
mod stats;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use local::{LocalCache, SweepReport};
pub use lru::oldest_keys;
pub use stats::{CacheStatistics, StatsCounters};
