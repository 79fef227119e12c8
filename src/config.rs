//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Category TTLs ==
/// Default TTL in seconds for each domain category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTtls {
    pub schedule: u64,
    pub session: u64,
    pub computation: u64,
    pub api: u64,
    pub user: u64,
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            schedule: 3600,
            session: 86400,
            computation: 7200,
            api: 300,
            user: 1800,
        }
    }
}

// == Remote Settings ==
/// Which remote store the configuration points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSettings {
    /// No remote store, local-only caching
    None,
    /// REST-style managed store
    Rest { url: String, token: String },
    /// Direct socket connection
    Socket { url: String },
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST endpoint of the managed store
    pub rest_url: Option<String>,
    /// Bearer credential for the REST endpoint
    pub rest_token: Option<String>,
    /// Direct socket URL (`redis://...`)
    pub redis_url: Option<String>,
    /// Maximum number of entries kept in the local cache
    pub max_entries: usize,
    /// Expiry/eviction sweep interval in seconds
    pub sweep_interval: u64,
    /// Write coalescing window in milliseconds
    pub flush_debounce_ms: u64,
    /// Local freshness window in seconds for values filled from the remote store
    pub local_freshness_ttl: u64,
    /// TTL in seconds for writes without an explicit TTL
    pub default_ttl: u64,
    /// Number of writes issued concurrently by batch helpers
    pub batch_chunk_size: usize,
    /// Per-category default TTLs
    pub category_ttls: CategoryTtls,
    /// Admin HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REMOTE_REST_URL` / `REMOTE_REST_TOKEN` - REST store endpoint and credential
    /// - `REDIS_URL` - Direct socket URL
    /// - `LOCAL_MAX_ENTRIES` - Local cache capacity (default: 1000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `FLUSH_DEBOUNCE_MS` - Write coalescing window (default: 100)
    /// - `LOCAL_FRESHNESS_TTL` - Local lifetime of remote fills (default: 60)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `BATCH_CHUNK_SIZE` - Batch helper chunk size (default: 10)
    /// - `SCHEDULE_TTL`, `SESSION_TTL`, `COMPUTATION_TTL`, `API_TTL`, `USER_TTL`
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttls = defaults.category_ttls;

        Self {
            rest_url: non_empty_var("REMOTE_REST_URL"),
            rest_token: non_empty_var("REMOTE_REST_TOKEN"),
            redis_url: non_empty_var("REDIS_URL"),
            max_entries: parse_var("LOCAL_MAX_ENTRIES", defaults.max_entries),
            sweep_interval: parse_var("SWEEP_INTERVAL", defaults.sweep_interval),
            flush_debounce_ms: parse_var("FLUSH_DEBOUNCE_MS", defaults.flush_debounce_ms),
            local_freshness_ttl: parse_var("LOCAL_FRESHNESS_TTL", defaults.local_freshness_ttl),
            default_ttl: parse_var("DEFAULT_TTL", defaults.default_ttl),
            batch_chunk_size: parse_var("BATCH_CHUNK_SIZE", defaults.batch_chunk_size).max(1),
            category_ttls: CategoryTtls {
                schedule: parse_var("SCHEDULE_TTL", ttls.schedule),
                session: parse_var("SESSION_TTL", ttls.session),
                computation: parse_var("COMPUTATION_TTL", ttls.computation),
                api: parse_var("API_TTL", ttls.api),
                user: parse_var("USER_TTL", ttls.user),
            },
            server_port: parse_var("SERVER_PORT", defaults.server_port),
        }
    }

    // == Remote Settings ==
    /// Selects the remote store: REST when both REST variables are present,
    /// otherwise socket when a socket URL is present, otherwise none.
    pub fn remote(&self) -> RemoteSettings {
        match (&self.rest_url, &self.rest_token, &self.redis_url) {
            (Some(url), Some(token), _) => RemoteSettings::Rest {
                url: url.clone(),
                token: token.clone(),
            },
            (_, _, Some(url)) => RemoteSettings::Socket { url: url.clone() },
            _ => RemoteSettings::None,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn flush_debounce(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rest_url: None,
            rest_token: None,
            redis_url: None,
            max_entries: 1000,
            sweep_interval: 30,
            flush_debounce_ms: 100,
            local_freshness_ttl: 60,
            default_ttl: 3600,
            batch_chunk_size: 10,
            category_ttls: CategoryTtls::default(),
            server_port: 3000,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
