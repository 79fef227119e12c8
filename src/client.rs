//! Cache Client Module
//!
//! Two-tier read/write orchestration: the local entry cache answers first, the
//! remote store fills misses, and writes reach the remote store through the
//! write coalescer.
//!
//! Remote failures never reach the caller. They are logged and turned into a
//! miss, `false`, `0` or a local-only result, so a remote outage degrades the
//! cache to in-process caching instead of failing requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStatistics, Clock, LocalCache, StatsCounters, SweepReport, SystemClock};
use crate::coalescer::WriteCoalescer;
use crate::config::Config;
use crate::remote::RemoteStore;

// == Client Settings ==
/// Tuning knobs for a cache client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Local cache capacity bound
    pub max_entries: usize,
    /// Interval of the background sweep
    pub sweep_interval: Duration,
    /// Write coalescing window
    pub flush_debounce: Duration,
    /// Local lifetime in seconds of values filled from the remote store
    pub local_freshness_ttl: u64,
    /// TTL in seconds for writes that do not carry one
    pub default_ttl: u64,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_entries: config.max_entries,
            sweep_interval: config.sweep_interval(),
            flush_debounce: config.flush_debounce(),
            local_freshness_ttl: config.local_freshness_ttl,
            default_ttl: config.default_ttl,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// == Cache Client ==
/// Owns one local cache and one write coalescer; neither is shared.
#[derive(Debug)]
pub struct CacheClient {
    local: Arc<Mutex<LocalCache>>,
    coalescer: WriteCoalescer,
    remote: Option<Arc<dyn RemoteStore>>,
    stats: Arc<StatsCounters>,
    settings: ClientSettings,
    /// Bumped under the local lock by every local mutation; a remote fill
    /// only lands if it is unchanged since the local lookup missed
    write_epoch: AtomicU64,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl CacheClient {
    // == Constructor ==
    /// Creates a client; `remote: None` selects local-only mode.
    pub fn new(settings: ClientSettings, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self::with_clock(settings, remote, Arc::new(SystemClock))
    }

    /// Creates a client reading time from `clock`.
    pub fn with_clock(
        settings: ClientSettings,
        remote: Option<Arc<dyn RemoteStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stats = Arc::new(StatsCounters::new());
        let local = LocalCache::new(settings.max_entries, clock);
        let coalescer = WriteCoalescer::new(remote.clone(), stats.clone(), settings.flush_debounce);

        Self {
            local: Arc::new(Mutex::new(local)),
            coalescer,
            remote,
            stats,
            settings,
            write_epoch: AtomicU64::new(0),
            sweep_task: Mutex::new(None),
        }
    }

    // == Lifecycle ==
    /// Starts the background sweep. Calling it again is a no-op.
    pub fn start(&self) {
        let mut task = self.sweep_task.lock();
        if task.is_none() {
            *task = Some(crate::tasks::spawn_sweep_task(
                self.local.clone(),
                self.settings.sweep_interval,
            ));
        }
    }

    /// Stops the background sweep and makes a best-effort final flush.
    pub async fn shutdown(&self) {
        if let Some(task) = self.sweep_task.lock().take() {
            task.abort();
        }
        let flushed = self.coalescer.flush().await;
        info!(flushed, "Cache client shut down");
    }

    pub fn backend_kind(&self) -> &'static str {
        self.remote.as_ref().map(|r| r.kind()).unwrap_or("none")
    }

    // == Get ==
    /// Looks the key up locally, then remotely.
    ///
    /// A remote hit is copied into the local cache for the freshness window,
    /// independent of the value's own TTL.
    pub async fn get(&self, key: &str) -> Option<String> {
        let (local_hit, epoch) = {
            let mut local = self.local.lock();
            (local.get(key), self.write_epoch.load(Ordering::SeqCst))
        };
        if let Some(value) = local_hit {
            self.stats.record_local_hit();
            debug!(key = %key, "cache hit (local)");
            return Some(value);
        }

        let remote = self.remote.as_ref()?;
        self.stats.record_remote_call();

        match remote.get(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "cache hit (remote)");
                self.fill_local(key, &value, epoch);
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Remote GET failed, treating as miss");
                None
            }
        }
    }

    /// Copies a remote value locally unless a local write happened since
    /// `epoch` was read or a newer write is still pending.
    fn fill_local(&self, key: &str, value: &str, epoch: u64) {
        let mut local = self.local.lock();
        if self.write_epoch.load(Ordering::SeqCst) != epoch || self.coalescer.has_pending(key) {
            debug!(key = %key, "Skipping remote fill older than a local write");
            return;
        }
        local.put(key, value, self.settings.local_freshness_ttl);
    }

    /// Runs a local mutation and marks it for in-flight remote fills.
    fn mutate_local<R>(&self, f: impl FnOnce(&mut LocalCache) -> R) -> R {
        let mut local = self.local.lock();
        let result = f(&mut local);
        self.write_epoch.fetch_add(1, Ordering::SeqCst);
        result
    }

    // == Set ==
    /// Writes locally and queues the remote write.
    ///
    /// Completes without waiting on the remote store; a later `get` in this
    /// process observes `value` immediately. `ttl_seconds: None` uses the
    /// configured default locally and writes without expiry remotely.
    /// A zero TTL is rejected.
    pub async fn set(&self, key: &str, value: impl Into<String>, ttl_seconds: Option<u64>) -> bool {
        if ttl_seconds == Some(0) {
            warn!(key = %key, "Rejecting cache write with zero TTL");
            return false;
        }

        let value = value.into();
        let local_ttl = ttl_seconds.unwrap_or(self.settings.default_ttl);
        self.mutate_local(|local| local.put(key, value.clone(), local_ttl));

        if self.remote.is_some() {
            self.coalescer.enqueue(key, value, ttl_seconds);
        }
        true
    }

    // == Delete ==
    /// Removes keys locally, drops their pending writes, and deletes them
    /// remotely right away.
    ///
    /// Returns the remote count, or the local count in local-only mode or when
    /// the remote delete fails.
    pub async fn del<S: AsRef<str>>(&self, keys: &[S]) -> u64 {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        if keys.is_empty() {
            return 0;
        }

        let local_removed = self.mutate_local(|local| local.delete(&keys)) as u64;
        self.coalescer.discard(&keys).await;

        let remote = match &self.remote {
            Some(remote) => remote,
            None => return local_removed,
        };
        self.stats.record_remote_call();

        match remote.del(&keys).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(keys = ?keys, error = %e, "Remote DEL failed");
                local_removed
            }
        }
    }

    // == Exists ==
    /// Checks the local cache, then pending writes, then the remote store.
    pub async fn exists(&self, key: &str) -> bool {
        if self.local.lock().contains(key) || self.coalescer.has_pending(key) {
            return true;
        }

        let remote = match &self.remote {
            Some(remote) => remote,
            None => return false,
        };
        self.stats.record_remote_call();

        match remote.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, error = %e, "Remote EXISTS failed, treating as absent");
                false
            }
        }
    }

    // == Increment ==
    /// Increments an integer counter by one and returns the new value.
    ///
    /// Never coalesced. The local copy is invalidated and every queued or
    /// in-flight batch is allowed to land before the remote call; the local
    /// copy is then repopulated with the result. Returns 0 when the remote
    /// call fails.
    /// In local-only mode the local value is incremented, with an absent or
    /// non-integer value counting as 0.
    pub async fn incr(&self, key: &str) -> i64 {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return self.incr_local(key),
        };

        self.mutate_local(|local| local.delete(&[key]));
        // Waits out a batch already on the wire, not just queued writes
        self.coalescer.flush().await;
        self.stats.record_remote_call();

        match remote.incr(key).await {
            Ok(value) => {
                let ttl = self.settings.local_freshness_ttl;
                self.mutate_local(|local| local.put(key, value.to_string(), ttl));
                value
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Remote INCR failed");
                0
            }
        }
    }

    fn incr_local(&self, key: &str) -> i64 {
        let ttl = self.settings.default_ttl;
        self.mutate_local(|local| {
            let current = local
                .get(key)
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(0);
            let next = current.saturating_add(1);
            local.put(key, next.to_string(), ttl);
            next
        })
    }

    // == Multi Get ==
    /// Fetches several keys, answering locally where possible and issuing a
    /// single remote `mget` for the rest.
    ///
    /// Results keep the order of `keys`.
    pub async fn mget<S: AsRef<str>>(&self, keys: &[S]) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(keys.len());
        let mut missing: Vec<(usize, String)> = Vec::new();

        let epoch = {
            let mut local = self.local.lock();
            for (index, key) in keys.iter().enumerate() {
                let value = local.get(key.as_ref());
                if value.is_none() {
                    missing.push((index, key.as_ref().to_string()));
                }
                results.push(value);
            }
            self.write_epoch.load(Ordering::SeqCst)
        };

        let local_hits = (keys.len() - missing.len()) as u64;
        self.stats.record_local_hits(local_hits);

        if missing.is_empty() {
            return results;
        }
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return results,
        };
        self.stats.record_remote_call();

        let missing_keys: Vec<String> = missing.iter().map(|(_, key)| key.clone()).collect();
        match remote.mget(&missing_keys).await {
            Ok(values) => {
                for ((index, key), value) in missing.into_iter().zip(values) {
                    if let Some(value) = value {
                        self.fill_local(&key, &value, epoch);
                        results[index] = Some(value);
                    }
                }
            }
            Err(e) => {
                warn!(count = missing_keys.len(), error = %e, "Remote MGET failed, treating as misses");
            }
        }

        results
    }

    // == Sweep ==
    /// Runs one expiry and eviction pass over the local cache.
    pub fn sweep(&self) -> SweepReport {
        self.local.lock().sweep()
    }

    // == Flush ==
    /// Sends all pending writes now. Returns the number accepted remotely.
    pub async fn flush(&self) -> usize {
        self.coalescer.flush().await
    }

    pub fn has_pending(&self, key: &str) -> bool {
        self.coalescer.has_pending(key)
    }

    // == Statistics ==
    pub fn statistics(&self) -> CacheStatistics {
        let local_hits = self.stats.local_hits();
        let remote_calls = self.stats.remote_calls();

        CacheStatistics {
            local_hits,
            remote_calls,
            batched_writes: self.stats.batched_writes(),
            hit_rate: CacheStatistics::hit_rate(local_hits, remote_calls),
            local_cache_size: self.local.lock().len(),
            pending_writes: self.coalescer.pending_len(),
            backend: self.backend_kind().to_string(),
        }
    }

    // == Clear Local Cache ==
    /// Empties the local cache and resets the counters.
    ///
    /// The remote store and pending writes are left alone.
    pub fn clear_local_cache(&self) {
        let cleared = {
            let mut local = self.local.lock();
            let count = local.len();
            local.clear();
            count
        };
        self.stats.reset();
        info!(cleared, "Local cache cleared");
    }
}

impl Drop for CacheClient {
    fn drop(&mut self) {
        if let Some(task) = self.sweep_task.get_mut().take() {
            task.abort();
        }
    }
}
