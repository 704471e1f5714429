use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use datagrid_core::cache::{CachePolicy, DEFAULT_TTL};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub route_prefix: String,
    pub base_url: String,
    pub cache_backend: CacheBackend,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub cache_policy: CachePolicy,
    pub cache_prune_interval_secs: u64,
    pub redis_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("DATAGRID_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8090".into())
            .parse()
            .context("DATAGRID_ADDR is not a socket address")?;
        let log_filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,datagrid_server=debug,datagrid_core=info".into());
        let route_prefix = normalize_prefix(
            &std::env::var("DATAGRID_ROUTE_PREFIX").unwrap_or_else(|_| "/datagrid".into()),
        );
        let base_url = std::env::var("DATAGRID_BASE_URL").unwrap_or_default();
        let cache_backend = CacheBackend::from_env();
        let cache_dir = std::env::var("DATAGRID_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("datagrid-cache"));
        let cache_ttl = std::env::var("DATAGRID_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);
        let cache_policy = match std::env::var("DATAGRID_CACHE_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|err: String| {
                warn!(error = %err, "falling back to get-or-compute cache policy");
                CachePolicy::default()
            }),
            Err(_) => CachePolicy::default(),
        };
        let cache_prune_interval_secs = std::env::var("DATAGRID_CACHE_PRUNE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);
        let redis_url = std::env::var("REDIS_URL").ok();
        Ok(Self {
            bind_addr,
            log_filter,
            route_prefix,
            base_url,
            cache_backend,
            cache_dir,
            cache_ttl,
            cache_policy,
            cache_prune_interval_secs,
            redis_url,
        })
    }
}

/// `datagrid/` → `/datagrid`; an empty prefix mounts at the root.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Filesystem,
    Memory,
    Redis,
}

impl CacheBackend {
    fn from_env() -> Self {
        match std::env::var("DATAGRID_CACHE_BACKEND")
            .unwrap_or_else(|_| "filesystem".into())
            .as_str()
        {
            "memory" => CacheBackend::Memory,
            "redis" => CacheBackend::Redis,
            _ => CacheBackend::Filesystem,
        }
    }
}
