// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Filesystem-based cache implementation
//!
//! Stores a JSON header and a content blob per entry, sharded by the first
//! two characters of the key.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use super::{hash_bytes, Cache, CacheStats, CachedChain, CachedEntry};
use crate::errors::AssetflowError;

/// Filesystem-based cache
pub struct FilesystemCache {
    /// Cache directory
    cache_dir: PathBuf,
}

impl FilesystemCache {
    /// Create a new filesystem cache
    pub fn new(cache_dir: PathBuf) -> Result<Self, AssetflowError> {
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir).map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to create cache directory: {}", e),
            })?;
        }

        Ok(Self { cache_dir })
    }

    /// Cache directory
    pub fn directory(&self) -> &Path {
        &self.cache_dir
    }

    /// Header and blob paths for a key
    fn entry_paths(&self, key: &str) -> (PathBuf, PathBuf) {
        // Use first 2 chars as directory for better filesystem performance
        let (prefix, rest) = key.split_at(2.min(key.len()));
        let dir = self.cache_dir.join(prefix);
        (
            dir.join(format!("{}.json", rest)),
            dir.join(format!("{}.bin", rest)),
        )
    }

    /// List all cache entry headers
    fn list_entries(&self) -> Result<Vec<CachedEntry>, AssetflowError> {
        let mut entries = Vec::new();

        if !self.cache_dir.exists() {
            return Ok(entries);
        }

        for prefix_dir in std::fs::read_dir(&self.cache_dir).map_err(|e| {
            AssetflowError::CacheError {
                message: format!("Failed to read cache directory: {}", e),
            }
        })? {
            let prefix_dir = prefix_dir
                .map_err(|e| AssetflowError::CacheError {
                    message: format!("Failed to read cache entry: {}", e),
                })?
                .path();

            if !prefix_dir.is_dir() {
                continue;
            }

            for entry_file in std::fs::read_dir(&prefix_dir).map_err(|e| {
                AssetflowError::CacheError {
                    message: format!("Failed to read cache subdirectory: {}", e),
                }
            })? {
                let entry_file = entry_file
                    .map_err(|e| AssetflowError::CacheError {
                        message: format!("Failed to read cache file: {}", e),
                    })?
                    .path();

                if entry_file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                if let Ok(content) = std::fs::read_to_string(&entry_file) {
                    if let Ok(entry) = serde_json::from_str::<CachedEntry>(&content) {
                        entries.push(entry);
                    }
                }
            }
        }

        Ok(entries)
    }

    /// Calculate directory size recursively
    fn dir_size(path: &Path) -> Result<u64, AssetflowError> {
        let mut size = 0;

        if path.is_file() {
            return Ok(path.metadata().map(|m| m.len()).unwrap_or(0));
        }

        for entry in std::fs::read_dir(path).map_err(|e| AssetflowError::CacheError {
            message: format!("Failed to read directory: {}", e),
        })? {
            let entry = entry.map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to read entry: {}", e),
            })?;

            let path = entry.path();
            if path.is_dir() {
                size += Self::dir_size(&path)?;
            } else {
                size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(size)
    }

    async fn remove_entry(header: &Path, blob: &Path) {
        let _ = tokio::fs::remove_file(header).await;
        let _ = tokio::fs::remove_file(blob).await;
    }
}

#[async_trait]
impl Cache for FilesystemCache {
    async fn get(&self, key: &str) -> Result<Option<CachedChain>, AssetflowError> {
        let (header, blob) = self.entry_paths(key);

        if !header.exists() || !blob.exists() {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&header).await.map_err(|e| {
            AssetflowError::CacheError {
                message: format!("Failed to read cache entry: {}", e),
            }
        })?;

        let entry: CachedEntry =
            serde_json::from_str(&json).map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to parse cache entry: {}", e),
            })?;

        let content = tokio::fs::read(&blob)
            .await
            .map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to read cache blob: {}", e),
            })?;

        // Torn or tampered entry
        if hash_bytes(&content) != entry.content_hash {
            debug!(key, "dropping corrupt cache entry");
            Self::remove_entry(&header, &blob).await;
            return Ok(None);
        }

        Ok(Some(CachedChain {
            asset: entry.asset,
            rule: entry.rule,
            content,
            metadata: entry.metadata,
        }))
    }

    async fn store(&self, key: &str, chain: &CachedChain) -> Result<(), AssetflowError> {
        let (header, blob) = self.entry_paths(key);

        if let Some(parent) = header.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AssetflowError::CacheError {
                    message: format!("Failed to create cache directory: {}", e),
                }
            })?;
        }

        let entry = CachedEntry {
            timestamp: SystemTime::now(),
            asset: chain.asset.clone(),
            rule: chain.rule.clone(),
            cache_key: key.to_string(),
            content_hash: hash_bytes(&chain.content),
            metadata: chain.metadata.clone(),
        };

        let json =
            serde_json::to_string_pretty(&entry).map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to serialize cache entry: {}", e),
            })?;

        // Blob first so a header never points at missing content
        tokio::fs::write(&blob, &chain.content)
            .await
            .map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to write cache blob: {}", e),
            })?;

        tokio::fs::write(&header, json)
            .await
            .map_err(|e| AssetflowError::CacheError {
                message: format!("Failed to write cache entry: {}", e),
            })?;

        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), AssetflowError> {
        let (header, blob) = self.entry_paths(key);
        Self::remove_entry(&header, &blob).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AssetflowError> {
        if self.cache_dir.exists() {
            tokio::fs::remove_dir_all(&self.cache_dir)
                .await
                .map_err(|e| AssetflowError::CacheError {
                    message: format!("Failed to clear cache: {}", e),
                })?;

            tokio::fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| AssetflowError::CacheError {
                    message: format!("Failed to recreate cache directory: {}", e),
                })?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, AssetflowError> {
        let entries = self.list_entries()?;

        let mut stats = CacheStats {
            entries: entries.len(),
            size_bytes: 0,
            oldest_entry: None,
            newest_entry: None,
        };

        for entry in &entries {
            match stats.oldest_entry {
                None => stats.oldest_entry = Some(entry.timestamp),
                Some(oldest) if entry.timestamp < oldest => {
                    stats.oldest_entry = Some(entry.timestamp)
                }
                _ => {}
            }

            match stats.newest_entry {
                None => stats.newest_entry = Some(entry.timestamp),
                Some(newest) if entry.timestamp > newest => {
                    stats.newest_entry = Some(entry.timestamp)
                }
                _ => {}
            }
        }

        if self.cache_dir.exists() {
            stats.size_bytes = Self::dir_size(&self.cache_dir)?;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AssetMetadata;
    use tempfile::TempDir;

    fn make_chain(content: &str) -> CachedChain {
        CachedChain {
            asset: "app/main.css".into(),
            rule: "styles".into(),
            content: content.as_bytes().to_vec(),
            metadata: AssetMetadata {
                dependencies: vec!["app/base.css".into()],
                source_map: vec![],
            },
        }
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store("abcdef", &make_chain("a{}")).await.unwrap();

        let cached = cache.get("abcdef").await.unwrap().unwrap();
        assert_eq!(cached, make_chain("a{}"));
        assert!(cache.get("ffffff").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store("abcdef", &make_chain("a{}")).await.unwrap();
        assert!(cache.get("abcdef").await.unwrap().is_some());

        cache.invalidate("abcdef").await.unwrap();
        assert!(cache.get("abcdef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store("abcdef", &make_chain("a{}")).await.unwrap();
        std::fs::write(temp_dir.path().join("ab").join("cdef.bin"), b"garbage").unwrap();

        assert!(cache.get("abcdef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store("abcdef", &make_chain("a{}")).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert!(stats.size_bytes > 0);

        cache.clear().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
    }
}
