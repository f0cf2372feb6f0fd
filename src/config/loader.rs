// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Raw configuration loading
//!
//! YAML, JSON and TOML files are all normalized into one
//! `serde_json::Value` tree before environment resolution.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "assetflow.yaml";

/// Unresolved configuration tree plus the directory it is relative to
#[derive(Debug, Clone)]
pub struct RawConfig {
    /// Tree that may still contain conditional nodes
    pub value: Value,
    /// Directory relative paths in the config resolve against
    pub base_dir: PathBuf,
}

impl RawConfig {
    /// Load a config file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self, AssetflowError> {
        if !path.exists() {
            return Err(AssetflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| AssetflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content, base_dir),
            Some("toml") => Self::from_toml(&content, base_dir),
            _ => Self::from_yaml(&content, base_dir),
        }
    }

    /// Parse a YAML document
    pub fn from_yaml(yaml: &str, base_dir: PathBuf) -> Result<Self, AssetflowError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(Self { value, base_dir })
    }

    /// Parse a JSON document
    pub fn from_json(json: &str, base_dir: PathBuf) -> Result<Self, AssetflowError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self { value, base_dir })
    }

    /// Parse a TOML document
    pub fn from_toml(source: &str, base_dir: PathBuf) -> Result<Self, AssetflowError> {
        let toml_val: toml::Value = toml::from_str(source)?;
        let value = serde_json::to_value(toml_val)?;
        Ok(Self { value, base_dir })
    }

    /// Resolve a config-relative path
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_formats_normalize_to_same_tree() {
        let base = || PathBuf::from(".");
        let yaml = RawConfig::from_yaml("name: client\nworkers: 2\n", base()).unwrap();
        let json = RawConfig::from_json(r#"{"name": "client", "workers": 2}"#, base()).unwrap();
        let toml = RawConfig::from_toml("name = \"client\"\nworkers = 2\n", base()).unwrap();

        assert_eq!(yaml.value, json.value);
        assert_eq!(json.value, toml.value);
    }

    #[test]
    fn test_from_file_sets_base_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("assetflow.json");
        std::fs::write(&path, r#"{"name": "client"}"#).unwrap();

        let raw = RawConfig::from_file(&path).unwrap();
        assert_eq!(raw.base_dir, temp.path());
        assert_eq!(raw.resolve_path(Path::new("dist")), temp.path().join("dist"));
    }

    #[test]
    fn test_missing_file() {
        let err = RawConfig::from_file(Path::new("/nonexistent/assetflow.yaml")).unwrap_err();
        assert!(matches!(err, AssetflowError::ConfigNotFound { .. }));
    }
}
