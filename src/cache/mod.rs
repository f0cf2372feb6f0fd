// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Caching layer for transform chain results
//!
//! A chain's output depends only on its inputs, so results are stored under a
//! content-derived key and reused across runs.

mod filesystem;
mod hash;

pub use filesystem::FilesystemCache;
pub use hash::{hash_bytes, ContentHasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::errors::AssetflowError;
use crate::pipeline::AssetMetadata;

/// Trait for cache implementations
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the cached chain output for a key
    async fn get(&self, key: &str) -> Result<Option<CachedChain>, AssetflowError>;

    /// Store a chain output under a key
    async fn store(&self, key: &str, chain: &CachedChain) -> Result<(), AssetflowError>;

    /// Invalidate one entry
    async fn invalidate(&self, key: &str) -> Result<(), AssetflowError>;

    /// Clear all cached results
    async fn clear(&self) -> Result<(), AssetflowError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, AssetflowError>;
}

/// Output of one transform chain run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedChain {
    /// Asset the chain ran on
    pub asset: String,
    /// Rule that selected the chain
    pub rule: String,
    /// Transformed content
    pub content: Vec<u8>,
    /// Accumulated metadata
    pub metadata: AssetMetadata,
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Oldest entry timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest entry timestamp
    pub newest_entry: Option<SystemTime>,
}

impl CacheStats {
    /// Format size for display
    pub fn formatted_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.2} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.2} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.2} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}

/// Cached entry header; the content lives in a sibling blob file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// When the entry was cached
    pub timestamp: SystemTime,
    /// Asset identifier
    pub asset: String,
    /// Rule name
    pub rule: String,
    /// Cache key
    pub cache_key: String,
    /// Digest of the blob, checked on read
    pub content_hash: String,
    /// Accumulated metadata
    pub metadata: AssetMetadata,
}
