use std::sync::Arc;
use std::time::Duration;

use datagrid_core::cache::{CacheStore, FilesystemStore, InMemoryStore, ResultCache};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{AppConfig, CacheBackend};

/// The shared result cache plus the disk store when one backs it, so the
/// caller can schedule pruning.
pub struct CacheSetup {
    pub cache: ResultCache,
    pub filesystem: Option<FilesystemStore>,
}

pub async fn build_cache(cfg: &AppConfig) -> CacheSetup {
    let (store, filesystem): (Arc<dyn CacheStore>, Option<FilesystemStore>) = match cfg.cache_backend {
        CacheBackend::Memory => (Arc::new(InMemoryStore::new()), None),
        CacheBackend::Filesystem => {
            let fs = FilesystemStore::new(&cfg.cache_dir);
            (Arc::new(fs.clone()), Some(fs))
        }
        CacheBackend::Redis => match redis_store(cfg.redis_url.as_deref()).await {
            Some(store) => (store, None),
            None => {
                let fs = FilesystemStore::new(&cfg.cache_dir);
                (Arc::new(fs.clone()), Some(fs))
            }
        },
    };
    let cache = ResultCache::new(store)
        .with_ttl(cfg.cache_ttl)
        .with_policy(cfg.cache_policy);
    CacheSetup { cache, filesystem }
}

#[cfg(feature = "redis")]
async fn redis_store(redis_url: Option<&str>) -> Option<Arc<dyn CacheStore>> {
    let Some(url) = redis_url else {
        warn!("DATAGRID_CACHE_BACKEND=redis but REDIS_URL missing; falling back to filesystem");
        return None;
    };
    match datagrid_core::cache::RedisStore::connect(url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(error = %err, "failed to init redis cache; falling back to filesystem");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_store(_redis_url: Option<&str>) -> Option<Arc<dyn CacheStore>> {
    warn!("built without redis support; falling back to filesystem cache");
    None
}

/// Periodically delete expired entries from the disk cache, and temp files
/// from interrupted writes once they are older than `orphan_age`.
pub fn start_pruner(store: FilesystemStore, interval_secs: u64, orphan_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match store.prune(orphan_age).await {
                Ok(removed) => debug!(removed, "grid cache prune pass"),
                Err(err) => warn!(error = %err, dir = %store.dir().display(), "grid cache prune failed"),
            }
        }
    })
}
