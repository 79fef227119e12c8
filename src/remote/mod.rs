//! Remote Store Module
//!
//! Thin adapters over the configured key-value backend. Adapters hold no cache
//! state; they translate the store operations into the backend's protocol and
//! report failures as `CacheError::Remote`.

mod memory;
mod rest;
mod socket;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::RemoteSettings;
use crate::error::Result;

pub use memory::{CallCounts, MemoryStore};
pub use rest::RestStore;
pub use socket::SocketStore;

// == Pipeline Op ==
/// One write carried inside a pipelined batch: `SET key value [EX ttl]`.
///
/// Deletes are never batched; they go out immediately through `del`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOp {
    pub key: String,
    pub value: String,
    pub ttl_seconds: Option<u64>,
}

impl PipelineOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl_seconds: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl_seconds,
        }
    }
}

// == Remote Store Trait ==
/// Operations every remote key-value backend provides.
#[async_trait]
pub trait RemoteStore: Send + Sync + Debug {
    /// Short backend name used in logs and statistics.
    fn kind(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Fetches several keys in one round trip, preserving request order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Writes a value, expiring after `ttl_seconds` when given.
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;

    /// Deletes keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically increments an integer value by one.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Executes all operations in a single round trip.
    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()>;
}

// == Backend ==
/// Closed set of backends, chosen once at startup.
#[derive(Debug)]
pub enum Backend {
    NoBackend,
    Rest(RestStore),
    Socket(SocketStore),
}

impl Backend {
    // == Connect ==
    /// Builds the backend selected by the configuration.
    pub async fn connect(settings: &RemoteSettings) -> Result<Self> {
        let backend = match settings {
            RemoteSettings::None => Backend::NoBackend,
            RemoteSettings::Rest { url, token } => Backend::Rest(RestStore::new(url, token)?),
            RemoteSettings::Socket { url } => Backend::Socket(SocketStore::connect(url).await?),
        };
        info!(backend = backend.kind(), "Remote store backend selected");
        Ok(backend)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::NoBackend => "none",
            Backend::Rest(store) => store.kind(),
            Backend::Socket(store) => store.kind(),
        }
    }

    /// Returns the adapter, or `None` for local-only mode.
    pub fn into_store(self) -> Option<Arc<dyn RemoteStore>> {
        match self {
            Backend::NoBackend => None,
            Backend::Rest(store) => Some(Arc::new(store)),
            Backend::Socket(store) => Some(Arc::new(store)),
        }
    }
}
