//! Local Cache Sweep Task
//!
//! Background task that periodically purges expired entries and enforces the
//! local cache size bound.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::LocalCache;

/// Spawns a background task that sweeps the local cache every `interval`.
///
/// The task runs until aborted; the returned handle is owned by the cache
/// client and aborted on shutdown.
///
/// # Example
/// ```ignore
/// let local = Arc::new(Mutex::new(LocalCache::new(1000, Arc::new(SystemClock))));
/// let sweep_handle = spawn_sweep_task(local.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(local: Arc<Mutex<LocalCache>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting local cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let report = local.lock().sweep();

            if report.expired > 0 || report.evicted > 0 {
                info!(
                    expired = report.expired,
                    evicted = report.evicted,
                    "Local cache sweep removed entries"
                );
            } else {
                debug!("Local cache sweep: nothing to remove");
            }
        }
    })
}
