//! Write Coalescer Module
//!
//! Buffers writes per key for a short debounce window and sends them to the
//! remote store as one pipelined batch.
//!
//! Delivery is at-most-once: a batch the remote store rejects is logged and
//! dropped. Cache entries are never the source of truth, so the next write or
//! recomputation repairs the remote value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cache::StatsCounters;
use crate::remote::{PipelineOp, RemoteStore};

// == Pending Write ==
/// A write accepted locally but not yet committed to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub value: String,
    pub ttl_seconds: Option<u64>,
}

struct Inner {
    /// At most one pending write per key, last writer wins
    pending: Mutex<HashMap<String, PendingWrite>>,
    /// Set while a debounce timer is armed
    flush_scheduled: AtomicBool,
    /// Held for drain + send so batches never overlap on the wire
    flush_lock: tokio::sync::Mutex<()>,
    remote: Option<Arc<dyn RemoteStore>>,
    stats: Arc<StatsCounters>,
    debounce: Duration,
}

// == Write Coalescer ==
/// Cheaply cloneable handle; clones share one pending map.
#[derive(Clone)]
pub struct WriteCoalescer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WriteCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoalescer")
            .field("pending", &self.pending_len())
            .field("debounce", &self.inner.debounce)
            .finish()
    }
}

impl WriteCoalescer {
    pub fn new(
        remote: Option<Arc<dyn RemoteStore>>,
        stats: Arc<StatsCounters>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                flush_scheduled: AtomicBool::new(false),
                flush_lock: tokio::sync::Mutex::new(()),
                remote,
                stats,
                debounce,
            }),
        }
    }

    // == Enqueue ==
    /// Records a write for `key`, replacing any pending one, and arms the
    /// debounce timer if it is not already running.
    pub fn enqueue(&self, key: impl Into<String>, value: impl Into<String>, ttl_seconds: Option<u64>) {
        self.inner.pending.lock().insert(
            key.into(),
            PendingWrite {
                value: value.into(),
                ttl_seconds,
            },
        );
        self.schedule_flush();
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // Outside a runtime the owner has to call flush() itself
                self.inner.flush_scheduled.store(false, Ordering::SeqCst);
                debug!("No async runtime, write flush left to the caller");
                return;
            }
        };

        let coalescer = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(coalescer.inner.debounce).await;
            // Re-arm before draining so writes landing during the send get a timer
            coalescer.inner.flush_scheduled.store(false, Ordering::SeqCst);
            coalescer.flush().await;
        });
    }

    // == Flush ==
    /// Drains every pending write and sends them as one pipelined batch.
    ///
    /// Returns the number of writes the remote store accepted. Without a
    /// remote store this drains and returns 0.
    pub async fn flush(&self) -> usize {
        let _guard = self.inner.flush_lock.lock().await;

        let drained = std::mem::take(&mut *self.inner.pending.lock());
        if drained.is_empty() {
            return 0;
        }

        let remote = match &self.inner.remote {
            Some(remote) => remote,
            None => {
                debug!(count = drained.len(), "Local-only mode, discarding pending writes");
                return 0;
            }
        };

        let mut ops: Vec<PipelineOp> = drained
            .into_iter()
            .map(|(key, write)| PipelineOp::set(key, write.value, write.ttl_seconds))
            .collect();
        ops.sort_by(|a, b| a.key.cmp(&b.key));
        let count = ops.len();

        match remote.exec_pipeline(ops).await {
            Ok(()) => {
                self.inner.stats.record_batched_writes(count as u64);
                debug!(count, "Flushed pending writes");
                count
            }
            Err(e) => {
                warn!(count, error = %e, "Remote batch write failed, dropping pending writes");
                0
            }
        }
    }

    // == Has Pending ==
    pub fn has_pending(&self, key: &str) -> bool {
        self.inner.pending.lock().contains_key(key)
    }

    // == Discard ==
    /// Drops pending writes for `keys`.
    ///
    /// Waits for an in-flight batch to finish first, so a remote delete issued
    /// afterwards cannot be overtaken by a stale write.
    pub async fn discard<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        let _guard = self.inner.flush_lock.lock().await;
        let mut pending = self.inner.pending.lock();
        keys.iter()
            .filter(|key| pending.remove(key.as_ref()).is_some())
            .count()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn pending(&self, key: &str) -> Option<PendingWrite> {
        self.inner.pending.lock().get(key).cloned()
    }
}
