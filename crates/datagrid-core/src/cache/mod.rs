//! Result cache shared by every grid.
//!
//! Entries are JSON snapshots of executed pages keyed by the grid id plus the
//! canonical request parameters. Backend failures never fail a request: they
//! are logged and the page is computed directly.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::binding::FilterState;
use crate::error::{CacheError, GridError};

pub mod filesystem;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use filesystem::FilesystemStore;
pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const KEY_NAMESPACE: &str = "datagrid";

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    fn backend(&self) -> &'static str;
}

/// Key for one executed page. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `datagrid:<grid id>:<canonical parameters>`. Filters appear in declaration
    /// order and ordering clauses in submitted order, so the key does not depend
    /// on how the client ordered its parameters but does depend on sort order.
    pub fn for_request(grid_id: &str, state: &FilterState, page_size: u32) -> Self {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.extend_pairs(state.canonical_pairs());
        query.append_pair("_size", &page_size.to_string());
        CacheKey(format!("{KEY_NAMESPACE}:{grid_id}:{}", query.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve a live entry, compute and store otherwise.
    #[default]
    GetOrCompute,
    /// Delete the entry before every lookup, so each request recomputes and
    /// rewrites it.
    RefreshOnRead,
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get-or-compute" | "get_or_compute" => Ok(CachePolicy::GetOrCompute),
            "refresh-on-read" | "refresh_on_read" => Ok(CachePolicy::RefreshOnRead),
            other => Err(format!("unknown cache policy {other}")),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    policy: CachePolicy,
    stats: Arc<CacheStats>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
            policy: CachePolicy::default(),
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Return the cached value for `key`, or run `compute` and store its result.
    ///
    /// Errors from `compute` propagate and are never cached.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, GridError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GridError>>,
    {
        if self.policy == CachePolicy::RefreshOnRead {
            if let Err(err) = self.store.delete(key.as_str()).await {
                self.backend_error("delete", key, &err);
            }
        }

        match self.store.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.stats.hit();
                    debug!(key = %key, backend = self.backend(), "grid cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    self.backend_error("decode", key, &CacheError::Corrupt(err.to_string()));
                }
            },
            Ok(None) => {}
            Err(err) => self.backend_error("get", key, &err),
        }

        self.stats.miss();
        debug!(key = %key, backend = self.backend(), "grid cache miss");
        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(err) = self.store.set(key.as_str(), raw, self.ttl).await {
                    self.backend_error("set", key, &err);
                }
            }
            Err(err) => self.backend_error("encode", key, &CacheError::Corrupt(err.to_string())),
        }
        Ok(value)
    }

    fn backend_error(&self, op: &'static str, key: &CacheKey, err: &CacheError) {
        self.stats.error();
        warn!(
            op,
            key = %key,
            backend = self.backend(),
            error = %err,
            "grid cache backend error; computing directly"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{bind, Binding, GridRequest};
    use crate::definition::{FilterField, Widget, WidgetOptions};
    use std::sync::atomic::AtomicUsize;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("down".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".into()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn state(query: &str) -> FilterState {
        let fields = [FilterField::new("name", Widget::Text, WidgetOptions::default())];
        let refs: Vec<&FilterField> = fields.iter().collect();
        match bind(&refs, &GridRequest::from_query(query)) {
            Binding::Valid(state) => state,
            other => panic!("unexpected binding {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::for_request("grid", &state("name=a"), 20);
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let value: Vec<u32> = cache
                .get_or_compute(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().snapshot();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn refresh_on_read_always_recomputes() {
        let cache = ResultCache::in_memory().with_policy(CachePolicy::RefreshOnRead);
        let key = CacheKey::for_request("grid", &state("name=a"), 20);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let _: u32 = cache
                .get_or_compute(&key, || async {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_compute() {
        let cache = ResultCache::new(Arc::new(BrokenStore));
        let key = CacheKey::for_request("grid", &state("name=a"), 20);
        let value: String = cache
            .get_or_compute(&key, || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(cache.stats().snapshot().errors, 2);
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::for_request("grid", &state("name=a"), 20);
        let failed: Result<u32, GridError> = cache
            .get_or_compute(&key, || async { Err(GridError::source("boom")) })
            .await;
        assert!(failed.is_err());
        let value: u32 = cache.get_or_compute(&key, || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn keys_encode_grid_filters_page_size_and_ordering() {
        let asc = state("name=a&_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=asc");
        let desc = state("name=a&_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=desc");
        let asc_key = CacheKey::for_request("grid", &asc, 20);
        assert_ne!(asc_key, CacheKey::for_request("grid", &desc, 20));
        assert_ne!(asc_key, CacheKey::for_request("other", &asc, 20));
        assert_ne!(asc_key, CacheKey::for_request("grid", &asc, 50));
        assert_ne!(
            CacheKey::for_request("grid", &state("name=a"), 20),
            CacheKey::for_request("grid", &state("name=b"), 20)
        );
        assert!(asc_key.as_str().starts_with("datagrid:grid:name=a&_page=1"));
    }
}
