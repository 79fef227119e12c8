//! In-Memory Store Adapter
//!
//! Process-local stand-in for a remote store. Records how often each
//! operation was called and can be switched into a failing state, which makes
//! it the backend of choice for tests and local development. Reads and
//! pipelined batches can also be held open to reproduce in-flight requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::{PipelineOp, RemoteStore};
use crate::error::{CacheError, Result};

// == Call Counts ==
/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: u64,
    pub mget: u64,
    pub set: u64,
    pub del: u64,
    pub exists: u64,
    pub incr: u64,
    pub pipeline: u64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.get + self.mget + self.set + self.del + self.exists + self.incr + self.pipeline
    }
}

/// Open/closed switch that in-flight calls wait on.
#[derive(Debug)]
struct Gate(watch::Sender<bool>);

impl Default for Gate {
    fn default() -> Self {
        Self(watch::channel(true).0)
    }
}

impl Gate {
    fn set_open(&self, open: bool) {
        self.0.send_replace(open);
    }

    async fn pass(&self) {
        let mut rx = self.0.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, (String, Option<u64>)>,
    calls: CallCounts,
    batches: Vec<Vec<PipelineOp>>,
    mget_requests: Vec<Vec<String>>,
}

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing: AtomicBool,
    read_gate: Gate,
    pipeline_gate: Gate,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Holds `get`/`mget` replies until `release_reads`. The value is read
    /// when the call arrives, so a held reply can go stale.
    pub fn hold_reads(&self) {
        self.read_gate.set_open(false);
    }

    pub fn release_reads(&self) {
        self.read_gate.set_open(true);
    }

    /// Holds pipelined batches, before they are applied, until
    /// `release_pipelines`.
    pub fn hold_pipelines(&self) {
        self.pipeline_gate.set_open(false);
    }

    pub fn release_pipelines(&self) {
        self.pipeline_gate.set_open(true);
    }

    /// Stores a value without recording a call.
    pub fn seed(&self, key: &str, value: &str) {
        self.state
            .lock()
            .values
            .insert(key.to_string(), (value.to_string(), None));
    }

    /// Current stored value, without recording a call.
    pub fn stored(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).map(|(v, _)| v.clone())
    }

    /// TTL the value was last written with.
    pub fn stored_ttl(&self, key: &str) -> Option<u64> {
        self.state.lock().values.get(key).and_then(|(_, ttl)| *ttl)
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Every pipelined batch received, in arrival order.
    pub fn batches(&self) -> Vec<Vec<PipelineOp>> {
        self.state.lock().batches.clone()
    }

    /// Key lists of every `mget` received, in arrival order.
    pub fn mget_requests(&self) -> Vec<Vec<String>> {
        self.state.lock().mget_requests.clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Remote("memory store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let reply = {
            let mut state = self.state.lock();
            state.calls.get += 1;
            self.check()
                .map(|()| state.values.get(key).map(|(v, _)| v.clone()))
        };
        self.read_gate.pass().await;
        reply
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let reply = {
            let mut state = self.state.lock();
            state.calls.mget += 1;
            state.mget_requests.push(keys.to_vec());
            self.check().map(|()| {
                keys.iter()
                    .map(|key| state.values.get(key).map(|(v, _)| v.clone()))
                    .collect()
            })
        };
        self.read_gate.pass().await;
        reply
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.set += 1;
        self.check()?;
        state
            .values
            .insert(key.to_string(), (value.to_string(), ttl_seconds));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut state = self.state.lock();
        state.calls.del += 1;
        self.check()?;
        Ok(keys
            .iter()
            .filter(|key| state.values.remove(key.as_str()).is_some())
            .count() as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.exists += 1;
        self.check()?;
        Ok(state.values.contains_key(key))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut state = self.state.lock();
        state.calls.incr += 1;
        self.check()?;

        let current = match state.values.get(key) {
            Some((value, _)) => value.parse::<i64>().map_err(|_| {
                CacheError::Remote("value is not an integer or out of range".to_string())
            })?,
            None => 0,
        };
        let next = current + 1;
        let ttl = state.values.get(key).and_then(|(_, ttl)| *ttl);
        state.values.insert(key.to_string(), (next.to_string(), ttl));
        Ok(next)
    }

    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.calls.pipeline += 1;
            state.batches.push(ops.clone());
        }
        self.pipeline_gate.pass().await;

        let mut state = self.state.lock();
        self.check()?;
        for op in ops {
            state.values.insert(op.key, (op.value, op.ttl_seconds));
        }
        Ok(())
    }
}
