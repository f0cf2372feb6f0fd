// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Asset sources
//!
//! A source enumerates the raw assets of a build. Identifiers are logical
//! `/`-separated paths, independent of the host platform.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Something that yields the assets of a build
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// All assets, ordered by identifier
    async fn discover(&self) -> Result<Vec<Asset>, AssetflowError>;
}

/// Files matched by glob patterns below a base directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    base_dir: PathBuf,
    patterns: Vec<String>,
    ignore: Vec<String>,
}

impl DirectorySource {
    pub fn new(base_dir: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            patterns,
            ignore: Vec::new(),
        }
    }

    /// Never yield files below `dir` (relative to the base directory or absolute)
    pub fn ignore(mut self, dir: impl AsRef<Path>) -> Self {
        let id = self.identifier(&self.base_dir.join(dir));
        self.ignore.push(id);
        self
    }

    fn is_ignored(&self, id: &str) -> bool {
        self.ignore.iter().any(|dir| {
            id.strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Matching file paths, keyed by identifier
    pub fn resolve(&self) -> Result<BTreeMap<String, PathBuf>, AssetflowError> {
        let mut files = BTreeMap::new();

        for pattern in &self.patterns {
            let full_pattern = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                self.base_dir.join(pattern).to_string_lossy().to_string()
            };

            let matches: Vec<(String, PathBuf)> = glob::glob(&full_pattern)?
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .map(|p| (self.identifier(&p), p))
                .filter(|(id, _)| !self.is_ignored(id))
                .collect();

            if matches.is_empty() {
                return Err(AssetflowError::NoInputFiles {
                    pattern: pattern.clone(),
                });
            }

            files.extend(matches);
        }

        Ok(files)
    }

    /// Logical identifier of a file below the base directory
    pub fn identifier(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
        relative
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl AssetSource for DirectorySource {
    async fn discover(&self) -> Result<Vec<Asset>, AssetflowError> {
        let files = self.resolve()?;
        debug!(count = files.len(), "discovered source files");

        let mut assets = Vec::with_capacity(files.len());
        for (id, path) in files {
            let content = tokio::fs::read(&path)
                .await
                .map_err(|e| AssetflowError::FileReadError {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            assets.push(Asset::new(id, content));
        }
        Ok(assets)
    }
}

/// In-memory assets, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn with(mut self, id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(id.into(), content.into());
        self
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn discover(&self) -> Result<Vec<Asset>, AssetflowError> {
        Ok(self
            .files
            .iter()
            .map(|(id, content)| Asset::new(id.clone(), content.clone()))
            .collect())
    }
}
