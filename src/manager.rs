//! Domain Cache Manager Module
//!
//! Category-aware front end over the cache client: namespaced keys,
//! per-category TTLs, JSON encoding, cache-aside, and chunked batch writes.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::CacheStatistics;
use crate::client::CacheClient;
use crate::config::{CategoryTtls, Config};
use crate::error::CacheError;

/// Hex characters kept from the parameter digest.
const PARAM_HASH_LEN: usize = 16;

// == Cache Category ==
/// Logical data categories, each with its own key prefix and default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Schedule,
    Session,
    Computation,
    Api,
    User,
}

impl CacheCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheCategory::Schedule => "schedule",
            CacheCategory::Session => "session",
            CacheCategory::Computation => "computation",
            CacheCategory::Api => "api",
            CacheCategory::User => "user",
        }
    }

    pub fn default_ttl(&self, ttls: &CategoryTtls) -> u64 {
        match self {
            CacheCategory::Schedule => ttls.schedule,
            CacheCategory::Session => ttls.session,
            CacheCategory::Computation => ttls.computation,
            CacheCategory::Api => ttls.api,
            CacheCategory::User => ttls.user,
        }
    }

    /// Builds `<prefix>:<id>`.
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix(), id)
    }
}

// == Aside Options ==
/// Options for `cache_aside`.
#[derive(Debug, Clone, Default)]
pub struct AsideOptions {
    /// TTL in seconds, falls back to the configured default
    pub ttl: Option<u64>,
    /// Namespace prepended as `<prefix>:<key>`
    pub prefix: Option<String>,
}

// == Batch Entry ==
/// One write for `batch_set` / `warm_up_cache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl BatchEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }
}

// == Key Helpers ==
/// Deterministic fixed-length digest of arbitrary request parameters.
///
/// Parameters are encoded as a JSON value first. serde_json's default map is
/// a `BTreeMap`, so object keys come out sorted and the field order of the
/// caller's map does not change the hash; enabling serde_json's
/// `preserve_order` feature would change every key. Not collision-proof,
/// which is acceptable for a non-authoritative cache.
///
/// Parameters JSON cannot represent (maps with non-string keys, failing
/// `Serialize` impls) are an error rather than a shared fallback key.
pub fn hash_params<P: Serialize + ?Sized>(params: &P) -> Result<String, CacheError> {
    let canonical = serde_json::to_value(params)?.to_string();

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hashed = hex::encode(digest);
    hashed.truncate(PARAM_HASH_LEN);
    Ok(hashed)
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CacheError> {
    Ok(serde_json::from_str(raw)?)
}

/// True when `key` contains glob metacharacters.
pub fn is_pattern(key: &str) -> bool {
    key.contains(['*', '?', '['])
}

// == Domain Cache Manager ==
/// Single process-wide façade handed to domain callers by the composition root.
#[derive(Debug, Clone)]
pub struct DomainCacheManager {
    client: Arc<CacheClient>,
    ttls: CategoryTtls,
    default_ttl: u64,
    chunk_size: usize,
}

impl DomainCacheManager {
    pub fn new(client: Arc<CacheClient>, config: &Config) -> Self {
        Self {
            client,
            ttls: config.category_ttls,
            default_ttl: config.default_ttl,
            chunk_size: config.batch_chunk_size.max(1),
        }
    }

    pub fn client(&self) -> &Arc<CacheClient> {
        &self.client
    }

    pub fn ttl_for(&self, category: CacheCategory) -> u64 {
        category.default_ttl(&self.ttls)
    }

    // == Encoding ==
    async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: u64) -> bool {
        match encode(value) {
            Ok(encoded) => self.client.set(key, encoded, Some(ttl)).await,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache value");
                false
            }
        }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.client.get(key).await?;
        match decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed cached payload, treating as miss");
                None
            }
        }
    }

    async fn cache_in<T: Serialize + ?Sized>(
        &self,
        category: CacheCategory,
        id: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(category));
        self.store(&category.key(id), value, ttl).await
    }

    // == Schedules ==
    pub async fn cache_schedule<T: Serialize + ?Sized>(
        &self,
        schedule_id: &str,
        schedule: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(CacheCategory::Schedule, schedule_id, schedule, ttl)
            .await
    }

    pub async fn get_cached_schedule<T: DeserializeOwned>(&self, schedule_id: &str) -> Option<T> {
        self.load(&CacheCategory::Schedule.key(schedule_id)).await
    }

    pub async fn invalidate_schedule(&self, schedule_id: &str) -> u64 {
        self.client
            .del(&[CacheCategory::Schedule.key(schedule_id)])
            .await
    }

    // == Sessions ==
    pub async fn cache_session<T: Serialize + ?Sized>(
        &self,
        session_id: &str,
        session: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(CacheCategory::Session, session_id, session, ttl)
            .await
    }

    pub async fn get_cached_session<T: DeserializeOwned>(&self, session_id: &str) -> Option<T> {
        self.load(&CacheCategory::Session.key(session_id)).await
    }

    pub async fn invalidate_session(&self, session_id: &str) -> u64 {
        self.client
            .del(&[CacheCategory::Session.key(session_id)])
            .await
    }

    /// Unwraps a hashed key, logging and bypassing the cache when the
    /// parameters could not be hashed.
    fn usable_key(key: Result<String, CacheError>, name: &str) -> Option<String> {
        match key {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(name = %name, error = %e, "Unhashable parameters, bypassing cache");
                None
            }
        }
    }

    // == Computations ==
    /// Key: `computation:<kind>:<hash(params)>`.
    pub fn computation_key<P: Serialize + ?Sized>(kind: &str, params: &P) -> Result<String, CacheError> {
        let hashed = hash_params(params)?;
        Ok(CacheCategory::Computation.key(&format!("{}:{}", kind, hashed)))
    }

    pub async fn cache_computation<P, T>(&self, kind: &str, params: &P, result: &T, ttl: Option<u64>) -> bool
    where
        P: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let Some(key) = Self::usable_key(Self::computation_key(kind, params), kind) else {
            return false;
        };
        let ttl = ttl.unwrap_or(self.ttls.computation);
        self.store(&key, result, ttl).await
    }

    pub async fn get_cached_computation<P, T>(&self, kind: &str, params: &P) -> Option<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = Self::usable_key(Self::computation_key(kind, params), kind)?;
        self.load(&key).await
    }

    // == API Responses ==
    /// Key: `api:<endpoint>:<hash(params)>`.
    pub fn api_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> Result<String, CacheError> {
        let hashed = hash_params(params)?;
        Ok(CacheCategory::Api.key(&format!("{}:{}", endpoint, hashed)))
    }

    pub async fn cache_api_response<P, T>(
        &self,
        endpoint: &str,
        params: &P,
        response: &T,
        ttl: Option<u64>,
    ) -> bool
    where
        P: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let Some(key) = Self::usable_key(Self::api_key(endpoint, params), endpoint) else {
            return false;
        };
        let ttl = ttl.unwrap_or(self.ttls.api);
        self.store(&key, response, ttl).await
    }

    pub async fn get_cached_api_response<P, T>(&self, endpoint: &str, params: &P) -> Option<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = Self::usable_key(Self::api_key(endpoint, params), endpoint)?;
        self.load(&key).await
    }

    // == User Preferences ==
    pub async fn cache_user_preferences<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        preferences: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(
            CacheCategory::User,
            &format!("{}:preferences", user_id),
            preferences,
            ttl,
        )
        .await
    }

    pub async fn get_cached_user_preferences<T: DeserializeOwned>(&self, user_id: &str) -> Option<T> {
        self.load(&CacheCategory::User.key(&format!("{}:preferences", user_id)))
            .await
    }

    pub async fn invalidate_user_preferences(&self, user_id: &str) -> u64 {
        self.client
            .del(&[CacheCategory::User.key(&format!("{}:preferences", user_id))])
            .await
    }

    // == Cache Aside ==
    /// Returns the cached value for `key`, or runs `compute`, caches its
    /// result and returns it.
    ///
    /// Errors from `compute` are returned untouched and nothing is cached.
    /// A failed cache write still returns the computed value.
    pub async fn cache_aside<T, E, F, Fut>(&self, key: &str, compute: F, options: AsideOptions) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let full_key = match &options.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        };

        if let Some(cached) = self.load::<T>(&full_key).await {
            debug!(key = %full_key, "cache-aside hit");
            return Ok(cached);
        }

        let value = compute().await?;
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        if !self.store(&full_key, &value, ttl).await {
            warn!(key = %full_key, "cache-aside could not store computed value");
        }
        Ok(value)
    }

    // == Invalidation ==
    /// Deletes the given keys. Wildcard patterns are not supported and are
    /// skipped with a warning.
    pub async fn invalidate<S: AsRef<str>>(&self, keys: &[S]) -> u64 {
        let mut exact = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            if is_pattern(key) {
                warn!(key = %key, "Pattern invalidation is unsupported, skipping");
            } else {
                exact.push(key.to_string());
            }
        }

        if exact.is_empty() {
            return 0;
        }
        self.client.del(&exact).await
    }

    // == Batch Writes ==
    /// Writes entries in chunks: concurrently within a chunk, chunks one after
    /// another. Returns the number of successful writes.
    pub async fn batch_set(&self, entries: Vec<BatchEntry>) -> usize {
        let mut written = 0;

        for chunk in entries.chunks(self.chunk_size) {
            let results = join_all(chunk.iter().map(|entry| {
                let ttl = entry.ttl.unwrap_or(self.default_ttl);
                self.store(&entry.key, &entry.value, ttl)
            }))
            .await;
            written += results.into_iter().filter(|ok| *ok).count();
        }

        written
    }

    /// Preloads entries, typically at startup.
    pub async fn warm_up_cache(&self, entries: Vec<BatchEntry>) -> usize {
        let total = entries.len();
        info!(total, chunk_size = self.chunk_size, "Warming up cache");

        let written = self.batch_set(entries).await;
        if written < total {
            warn!(written, total, "Cache warm-up wrote fewer entries than requested");
        } else {
            info!(written, "Cache warm-up complete");
        }
        written
    }

    // == Passthroughs ==
    pub fn statistics(&self) -> CacheStatistics {
        self.client.statistics()
    }

    pub fn clear_local_cache(&self) {
        self.client.clear_local_cache();
    }

    pub async fn flush(&self) -> usize {
        self.client.flush().await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientSettings;
    use crate::remote::{MemoryStore, RemoteStore};
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Schedule {
        name: String,
        slots: Vec<u32>,
    }

    fn manager_with_store() -> (DomainCacheManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let remote: Arc<dyn RemoteStore> = store.clone();
        let config = Config {
            flush_debounce_ms: 3_600_000,
            batch_chunk_size: 2,
            ..Config::default()
        };
        let client = CacheClient::new(ClientSettings::from_config(&config), Some(remote));
        (DomainCacheManager::new(Arc::new(client), &config), store)
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(CacheCategory::Schedule.key("7"), "schedule:7");
        assert_eq!(CacheCategory::User.key("42:preferences"), "user:42:preferences");
    }

    #[test]
    fn test_category_ttls() {
        let ttls = CategoryTtls::default();
        assert!(CacheCategory::Session.default_ttl(&ttls) > CacheCategory::Api.default_ttl(&ttls));
    }

    #[test]
    fn test_hash_params_fixed_length_and_deterministic() {
        let small = hash_params(&json!({"q": "a"})).unwrap();
        let large = hash_params(&json!({"q": "x".repeat(10_000)})).unwrap();

        assert_eq!(small.len(), PARAM_HASH_LEN);
        assert_eq!(large.len(), PARAM_HASH_LEN);
        assert_eq!(small, hash_params(&json!({"q": "a"})).unwrap());
        assert_ne!(small, large);
    }

    #[test]
    fn test_hash_params_ignores_field_order() {
        let mut forward = BTreeMap::new();
        forward.insert("a", 1);
        forward.insert("b", 2);
        let reversed = json!({"b": 2, "a": 1});

        assert_eq!(hash_params(&forward).unwrap(), hash_params(&reversed).unwrap());
    }

    #[test]
    fn test_hash_params_sorted_keys_from_hash_map() {
        // Keys must serialize sorted; serde_json's `preserve_order` breaks this
        assert_eq!(json!({"b": 2, "a": 1}).to_string(), r#"{"a":1,"b":2}"#);

        let mut unordered = HashMap::new();
        for (i, key) in ["delta", "alpha", "charlie", "bravo", "echo"].iter().enumerate() {
            unordered.insert(*key, i);
        }
        let sorted: BTreeMap<_, _> = unordered.iter().map(|(k, v)| (*k, *v)).collect();

        assert_eq!(hash_params(&unordered).unwrap(), hash_params(&sorted).unwrap());
    }

    #[test]
    fn test_hash_params_rejects_unrepresentable_params() {
        let mut tuple_keys = HashMap::new();
        tuple_keys.insert((1u8, 2u8), 3u8);

        assert!(matches!(hash_params(&tuple_keys), Err(CacheError::Serialization(_))));
        assert!(DomainCacheManager::api_key("/tasks", &tuple_keys).is_err());
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("schedule:*"));
        assert!(is_pattern("user:?"));
        assert!(is_pattern("api:[ab]"));
        assert!(!is_pattern("schedule:7"));
    }

    #[tokio::test]
    async fn test_schedule_round_trip_uses_category_ttl() {
        let (manager, store) = manager_with_store();
        let schedule = Schedule {
            name: "weekly".to_string(),
            slots: vec![1, 2],
        };

        assert!(manager.cache_schedule("7", &schedule, None).await);
        let cached: Option<Schedule> = manager.get_cached_schedule("7").await;
        assert_eq!(cached, Some(schedule));

        manager.flush().await;
        assert_eq!(store.stored_ttl("schedule:7"), Some(3600));
    }

    #[tokio::test]
    async fn test_invalidate_schedule() {
        let (manager, _) = manager_with_store();
        manager.cache_schedule("7", &json!({"a": 1}), None).await;

        manager.invalidate_schedule("7").await;
        let cached: Option<Value> = manager.get_cached_schedule("7").await;
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_session_ttl_override() {
        let (manager, store) = manager_with_store();
        manager.cache_session("s1", &json!({"user": 1}), Some(42)).await;
        manager.flush().await;
        assert_eq!(store.stored_ttl("session:s1"), Some(42));

        manager.invalidate_session("s1").await;
        let cached: Option<Value> = manager.get_cached_session("s1").await;
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_api_response_keyed_by_params() {
        let (manager, _) = manager_with_store();
        let params = json!({"page": 1, "filter": "open"});

        manager
            .cache_api_response("/tasks", &params, &json!(["t1"]), None)
            .await;

        let hit: Option<Value> = manager.get_cached_api_response("/tasks", &params).await;
        assert_eq!(hit, Some(json!(["t1"])));

        let other: Option<Value> = manager
            .get_cached_api_response("/tasks", &json!({"page": 2}))
            .await;
        assert!(other.is_none());

        let key = DomainCacheManager::api_key("/tasks", &params).unwrap();
        assert!(key.starts_with("api:/tasks:"));
    }

    #[tokio::test]
    async fn test_unhashable_params_bypass_cache() {
        let (manager, store) = manager_with_store();
        let mut tuple_keys = HashMap::new();
        tuple_keys.insert((1u8, 2u8), 3u8);
        let mut other_tuple_keys = HashMap::new();
        other_tuple_keys.insert((9u8, 9u8), 9u8);

        assert!(!manager.cache_api_response("/tasks", &tuple_keys, &json!(["t1"]), None).await);
        assert!(!manager.cache_computation("fib", &tuple_keys, &55u64, None).await);

        let hit: Option<Value> = manager.get_cached_api_response("/tasks", &other_tuple_keys).await;
        assert!(hit.is_none());
        let hit: Option<u64> = manager.get_cached_computation("fib", &tuple_keys).await;
        assert!(hit.is_none());

        let stats = manager.statistics();
        assert_eq!(stats.local_cache_size, 0);
        assert_eq!(stats.pending_writes, 0);
        assert_eq!(stats.remote_calls, 0);
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_computation_round_trip() {
        let (manager, store) = manager_with_store();
        let params = json!({"n": 10});

        manager.cache_computation("fib", &params, &55u64, None).await;
        let cached: Option<u64> = manager.get_cached_computation("fib", &params).await;
        assert_eq!(cached, Some(55));

        manager.flush().await;
        let key = DomainCacheManager::computation_key("fib", &params).unwrap();
        assert_eq!(store.stored_ttl(&key), Some(7200));
    }

    #[tokio::test]
    async fn test_user_preferences() {
        let (manager, _) = manager_with_store();

        manager
            .cache_user_preferences("42", &json!({"theme": "dark"}), Some(600))
            .await;
        let prefs: Option<Value> = manager.get_cached_user_preferences("42").await;
        assert_eq!(prefs, Some(json!({"theme": "dark"})));

        manager.invalidate_user_preferences("42").await;
        let prefs: Option<Value> = manager.get_cached_user_preferences("42").await;
        assert!(prefs.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_miss() {
        let (manager, _) = manager_with_store();
        manager
            .client()
            .set("schedule:bad", "{not json", Some(60))
            .await;

        let cached: Option<Schedule> = manager.get_cached_schedule("bad").await;
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_cache_aside_computes_once() {
        let (manager, _) = manager_with_store();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value: std::result::Result<u32, CacheError> = manager
                .cache_aside(
                    "answer",
                    move || async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    },
                    AsideOptions {
                        ttl: Some(60),
                        prefix: Some("calc".to_string()),
                    },
                )
                .await;
            assert_eq!(value.unwrap(), 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(manager.client().exists("calc:answer").await);
    }

    #[tokio::test]
    async fn test_cache_aside_propagates_compute_error() {
        let (manager, _) = manager_with_store();

        let result: std::result::Result<u32, String> = manager
            .cache_aside(
                "broken",
                || async { Err("upstream down".to_string()) },
                AsideOptions::default(),
            )
            .await;

        assert_eq!(result.unwrap_err(), "upstream down");
        assert!(!manager.client().exists("broken").await);
    }

    #[tokio::test]
    async fn test_invalidate_skips_patterns() {
        let (manager, store) = manager_with_store();
        manager.client().set("a", "1", Some(60)).await;
        manager.flush().await;

        let removed = manager.invalidate(&["a", "schedule:*"]).await;
        assert_eq!(removed, 1);
        assert_eq!(store.calls().del, 1);

        // Only patterns: nothing sent
        assert_eq!(manager.invalidate(&["*"]).await, 0);
        assert_eq!(store.calls().del, 1);
    }

    #[tokio::test]
    async fn test_batch_set_chunks_and_counts() {
        let (manager, store) = manager_with_store();
        let entries: Vec<BatchEntry> = (0..5)
            .map(|i| BatchEntry::new(format!("k{}", i), json!(i), Some(30)))
            .collect();

        assert_eq!(manager.batch_set(entries).await, 5);
        assert_eq!(manager.statistics().pending_writes, 5);

        manager.flush().await;
        assert_eq!(store.stored("k3"), Some("3".to_string()));
        assert_eq!(store.stored_ttl("k3"), Some(30));
    }

    #[tokio::test]
    async fn test_warm_up_counts_rejected_entries() {
        let (manager, _) = manager_with_store();
        let entries = vec![
            BatchEntry::new("ok", json!("v"), None),
            BatchEntry::new("zero", json!("v"), Some(0)),
        ];

        assert_eq!(manager.warm_up_cache(entries).await, 1);
    }
}
