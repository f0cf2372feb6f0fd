// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Artifact output
//!
//! Writes a finalized artifact set below the output directory. Files whose
//! on-disk content already matches are left untouched.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::errors::AssetflowError;
use crate::pipeline::ArtifactSet;

/// Summary of one write pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files created or changed
    pub written: Vec<PathBuf>,
    /// Files already up to date
    pub unchanged: usize,
}

/// Writes artifacts to disk
#[derive(Debug, Clone)]
pub struct OutputWriter {
    directory: PathBuf,
}

impl OutputWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write every artifact, creating directories as needed
    pub async fn write(&self, artifacts: &ArtifactSet) -> Result<WriteReport, AssetflowError> {
        let mut report = WriteReport::default();

        for artifact in artifacts.iter() {
            let path = self.output_path(&artifact.name)?;

            if let Ok(existing) = tokio::fs::read(&path).await {
                if existing == artifact.content {
                    report.unchanged += 1;
                    continue;
                }
            }

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| write_error(parent, e))?;
            }
            tokio::fs::write(&path, &artifact.content)
                .await
                .map_err(|e| write_error(&path, e))?;

            debug!(path = %path.display(), bytes = artifact.content.len(), "wrote artifact");
            report.written.push(path);
        }

        Ok(report)
    }

    /// Path for an artifact name; names may not leave the output directory
    fn output_path(&self, name: &str) -> Result<PathBuf, AssetflowError> {
        let escapes = name.contains('\0')
            || Path::new(name)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || name.is_empty() {
            return Err(AssetflowError::FileWriteError {
                path: self.directory.join(name.replace('\0', "")),
                error: format!("artifact name '{}' escapes the output directory", name),
            });
        }
        Ok(self.directory.join(name))
    }
}

fn write_error(path: &Path, e: std::io::Error) -> AssetflowError {
    AssetflowError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Artifact;

    #[tokio::test]
    async fn test_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("dist"));

        let mut set = ArtifactSet::new();
        set.insert(Artifact::generated("images/logo.png", "png")).unwrap();
        set.insert(Artifact::generated("index.html", "<html>")).unwrap();

        let first = writer.write(&set).await.unwrap();
        assert_eq!(first.written.len(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("dist/images/logo.png")).unwrap(),
            b"png"
        );

        let second = writer.write(&set).await.unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 2);
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("dist"));

        for name in ["../evil.js", "/etc/passwd", "a/../../b"] {
            let mut set = ArtifactSet::new();
            set.insert(Artifact::generated(name, "x")).unwrap();
            let err = writer.write(&set).await.unwrap_err();
            assert!(matches!(err, AssetflowError::FileWriteError { .. }), "{name}");
        }
        assert!(!dir.path().join("evil.js").exists());
    }
}
