use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::CacheStore;
use crate::error::CacheError;

/// Disk-backed store: one JSON file per key under `dir`, named by the key's
/// SHA-256. Entries survive restarts and are shared by every process using the
/// same directory. Writes go through a temp file and a rename, so readers see
/// either the old entry or the new one.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    expires_at_ms: u64,
    value: String,
}

impl FilesystemStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Remove every expired or unreadable entry, plus temp files left behind
    /// by interrupted writes once they are older than `orphan_age`. Returns how
    /// many files were removed.
    pub async fn prune(&self, orphan_age: Duration) -> Result<usize, CacheError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let now = now_ms();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let stale = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => is_expired(&path, now).await?,
                Some("tmp") => is_orphan(&entry, orphan_age).await?,
                _ => continue,
            };
            if stale && remove_if_present(&path).await? {
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "pruned grid cache");
        Ok(removed)
    }
}

async fn is_expired(path: &Path, now: u64) -> Result<bool, CacheError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(serde_json::from_str::<DiskEntry>(&raw)
            .map(|e| e.expires_at_ms <= now)
            .unwrap_or(true)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

async fn is_orphan(entry: &tokio::fs::DirEntry, orphan_age: Duration) -> Result<bool, CacheError> {
    let modified = match entry.metadata().await {
        Ok(meta) => meta.modified()?,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    Ok(modified.elapsed().map(|age| age >= orphan_age).unwrap_or(false))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

async fn remove_if_present(path: &Path) -> Result<bool, CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entry: DiskEntry =
            serde_json::from_str(&raw).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        if entry.key != key {
            return Ok(None);
        }
        if entry.expires_at_ms <= now_ms() {
            remove_if_present(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = DiskEntry {
            key: key.to_string(),
            expires_at_ms: now_ms().saturating_add(ttl.as_millis() as u64),
            value,
        };
        let payload =
            serde_json::to_vec(&entry).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, payload).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        remove_if_present(&self.path_for(key)).await.map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "filesystem"
    }
}
