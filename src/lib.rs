//! Tiercache - two-tier cache over a remote key-value store
//!
//! A bounded in-process cache in front of a metered remote store, with
//! debounced write coalescing into pipelined batches and a category-aware
//! manager for domain callers.

pub mod api;
pub mod cache;
pub mod client;
pub mod coalescer;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheStatistics;
pub use client::{CacheClient, ClientSettings};
pub use coalescer::WriteCoalescer;
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::{AsideOptions, BatchEntry, CacheCategory, DomainCacheManager};
pub use remote::{Backend, RemoteStore};
