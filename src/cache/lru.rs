//! LRU Ranking Module
//!
//! Picks eviction victims by last-access time.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Oldest Keys ==
/// Returns the `count` least recently accessed keys, oldest first.
///
/// Ranks by `last_access_at` ascending and breaks ties with the access
/// sequence, so the order is strict even when accesses share a millisecond.
pub fn oldest_keys(entries: &HashMap<String, CacheEntry>, count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&String, (u64, u64))> = entries
        .iter()
        .map(|(key, entry)| (key, entry.lru_rank()))
        .collect();
    ranked.sort_unstable_by_key(|(_, rank)| *rank);

    ranked
        .into_iter()
        .take(count)
        .map(|(key, _)| key.clone())
        .collect()
}
