// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Two-tier cache (§4.7)
//!
//! In-process `HashMap` guarded by `parking_lot::RwLock`, backed by an
//! on-disk directory (one JSON file per key, atomic-rename write). `get`
//! checks the in-process tier first; on a miss it reads disk and
//! repopulates the in-process entry. `set` writes both tiers and, with
//! probability `gc_probability`, schedules a GC sweep.

use async_trait::async_trait;
use copytree_domain::cache_entry::CacheEntry;
use copytree_domain::error::CopyTreeError;
use copytree_domain::ports::Cache;
use copytree_domain::value_objects::CacheKey;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;

const DEFAULT_MAX_CACHE_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

pub struct TwoTierCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    disk_dir: PathBuf,
    gc_probability: f64,
    max_cache_age_seconds: i64,
}

impl TwoTierCache {
    pub fn new(disk_dir: PathBuf) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            disk_dir,
            gc_probability: 0.01,
            max_cache_age_seconds: DEFAULT_MAX_CACHE_AGE_SECONDS,
        }
    }

    pub fn with_gc_probability(mut self, probability: f64) -> Self {
        self.gc_probability = probability;
        self
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let sanitized = CacheKey::simple("", key).sanitized_filename();
        self.disk_dir.join(format!("{sanitized}.json"))
    }

    async fn read_disk(&self, key: &str) -> Result<Option<CacheEntry>, CopyTreeError> {
        let path = self.entry_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let entry: CacheEntry = serde_json::from_slice(&bytes)?;
                Ok(Some(entry))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CopyTreeError::Cache(format!("reading {}: {err}", path.display()))),
        }
    }

    /// Writes `entry` to a sibling temp file, then atomically renames it
    /// into place, so a concurrent reader never observes a partial file
    /// (§5: "serialize concurrent writes to the same on-disk key").
    async fn write_disk(&self, entry: &CacheEntry) -> Result<(), CopyTreeError> {
        tokio::fs::create_dir_all(&self.disk_dir)
            .await
            .map_err(|err| CopyTreeError::Cache(format!("creating cache dir: {err}")))?;
        let path = self.entry_path(&entry.key);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(entry)?;
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|err| CopyTreeError::Cache(format!("writing {}: {err}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|err| CopyTreeError::Cache(format!("renaming into {}: {err}", path.display())))?;
        Ok(())
    }

    async fn remove_disk(&self, key: &str) -> Result<(), CopyTreeError> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl Cache for TwoTierCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CopyTreeError> {
        if let Some(entry) = self.memory.read().get(key).cloned() {
            if entry.is_expired_at(chrono::Utc::now()) {
                self.memory.write().remove(key);
            } else {
                return Ok(Some(entry.value));
            }
        }

        match self.read_disk(key).await? {
            Some(entry) if !entry.is_expired_at(chrono::Utc::now()) => {
                self.memory.write().insert(key.to_string(), entry.clone());
                Ok(Some(entry.value))
            }
            Some(_) => {
                self.remove_disk(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) -> Result<(), CopyTreeError> {
        let entry = CacheEntry::new(key.to_string(), value, ttl_seconds);
        self.memory.write().insert(key.to_string(), entry.clone());
        self.write_disk(&entry).await?;

        if rand::thread_rng().gen_bool(self.gc_probability) {
            let _ = self.run_gc().await;
        }
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, CopyTreeError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn forget(&self, key: &str) -> Result<(), CopyTreeError> {
        self.memory.write().remove(key);
        self.remove_disk(key).await
    }

    async fn clear(&self, pattern: Option<&str>) -> Result<(), CopyTreeError> {
        let keys: Vec<String> = match pattern {
            Some(p) => self.memory.read().keys().filter(|k| k.contains(p)).cloned().collect(),
            None => self.memory.read().keys().cloned().collect(),
        };
        for key in keys {
            self.forget(&key).await?;
        }
        if pattern.is_none() {
            let _ = tokio::fs::remove_dir_all(&self.disk_dir).await;
        }
        Ok(())
    }

    async fn run_gc(&self) -> Result<usize, CopyTreeError> {
        let now = chrono::Utc::now();
        let mut removed = 0usize;

        let stale_memory_keys: Vec<String> = self
            .memory
            .read()
            .iter()
            .filter(|(_, e)| e.is_expired_at(now) || e.is_stale(now, self.max_cache_age_seconds))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale_memory_keys {
            self.memory.write().remove(key);
        }
        removed += stale_memory_keys.len();

        let mut entries = match tokio::fs::read_dir(&self.disk_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(removed),
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let should_remove = match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(cached) => cached.is_expired_at(now) || cached.is_stale(now, self.max_cache_age_seconds),
                    Err(_) => true,
                },
                Err(_) => true,
            };
            if should_remove && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trips_through_disk_after_memory_eviction() {
        let dir = tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf());
        cache.set("k1", serde_json::json!({"a": 1}), None).await.unwrap();
        cache.memory.write().clear();
        let value = cache.get("k1").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let dir = tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf());
        cache.set("k1", serde_json::json!("v"), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(cache.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_removed_from_disk_on_next_access() {
        let dir = tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf());
        cache.set("k1", serde_json::json!("v"), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        // Force the disk branch: the in-process tier alone is not enough
        // to prove the disk file was reaped.
        cache.memory.write().clear();
        assert_eq!(cache.get("k1").await.unwrap(), None);
        assert!(!cache.entry_path("k1").exists(), "expired disk entry must be removed on access");
    }

    #[tokio::test]
    async fn forget_removes_from_both_tiers() {
        let dir = tempdir().unwrap();
        let cache = TwoTierCache::new(dir.path().to_path_buf());
        cache.set("k1", serde_json::json!("v"), None).await.unwrap();
        cache.forget("k1").await.unwrap();
        assert!(!cache.has("k1").await.unwrap());
    }
}
