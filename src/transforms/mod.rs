// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Transform steps
//!
//! This module provides the [`Transform`] trait every step of a rule's chain
//! implements, and the built-in steps selectable from config.

mod css;
mod define;
mod html;
mod json;
mod shell;

pub use css::{CssImportsStep, MinifyCssStep};
pub use define::DefineStep;
pub use html::{minify_html, MinifyHtmlStep};
pub use json::JsonStep;
pub use shell::ShellStep;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{PipelineConfig, StepConfig};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Read-only context shared by every step of a build run
#[derive(Debug, Clone)]
pub struct TransformContext {
    config: Arc<PipelineConfig>,
    base_dir: PathBuf,
}

impl TransformContext {
    pub fn new(config: Arc<PipelineConfig>, base_dir: PathBuf) -> Self {
        Self { config, base_dir }
    }

    /// Active environment name
    pub fn environment(&self) -> &str {
        &self.config.environment
    }

    /// Whether running in development mode
    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }

    /// Global constants declared by the pipeline
    pub fn globals(&self) -> &BTreeMap<String, Value> {
        &self.config.globals
    }

    /// Whether steps should record source-map fragments
    pub fn source_maps(&self) -> bool {
        self.config.source_maps
    }

    /// Directory the config file lives in
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The frozen configuration
    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }
}

/// What one step produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// New content, fed to the next step
    pub content: Vec<u8>,
    /// Dependencies discovered by this step
    pub dependencies: Vec<String>,
    /// Step-specific source-map data
    pub mappings: Option<String>,
}

impl TransformOutput {
    /// Output that only carries content
    pub fn content(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Add discovered dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// One content transformation in a rule's chain
///
/// Implementations must be deterministic: the same asset and context always
/// produce the same output. The executor never retries a failed step.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Step name used in logs and errors
    fn name(&self) -> &str;

    /// Stable description of the step and its options, used in cache keys
    fn fingerprint(&self) -> String {
        self.name().to_string()
    }

    /// Transform the asset's current content
    async fn apply(
        &self,
        asset: &Asset,
        ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError>;

    /// Check whether external tooling the step needs is present
    async fn check_available(&self) -> Result<bool, AssetflowError> {
        Ok(true)
    }
}

/// Pass content through unchanged
pub struct FileStep;

#[async_trait]
impl Transform for FileStep {
    fn name(&self) -> &str {
        "file"
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        Ok(TransformOutput::content(asset.content.clone()))
    }
}

/// Build a step from its config
pub fn build_step(
    step: &StepConfig,
    config: &PipelineConfig,
) -> Result<Arc<dyn Transform>, AssetflowError> {
    Ok(match step {
        StepConfig::File => Arc::new(FileStep),
        StepConfig::Json { pretty } => Arc::new(JsonStep::new(*pretty)),
        StepConfig::Define { globals } => Arc::new(DefineStep::new(&config.globals, globals)?),
        StepConfig::CssImports => Arc::new(CssImportsStep::new()),
        StepConfig::MinifyCss {
            remove_comments,
            collapse_whitespace,
        } => Arc::new(MinifyCssStep::new(*remove_comments, *collapse_whitespace)),
        StepConfig::MinifyHtml {
            remove_comments,
            collapse_whitespace,
        } => Arc::new(MinifyHtmlStep::new(*remove_comments, *collapse_whitespace)),
        StepConfig::Shell { command, shell } => {
            Arc::new(ShellStep::new(command.clone(), shell.clone()))
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_step_passes_through() {
        let ctx = test_support::context("development");
        let asset = Asset::new("img/a.png", vec![0u8, 1, 2]);

        let out = FileStep.apply(&asset, &ctx).await.unwrap();
        assert_eq!(out.content, vec![0u8, 1, 2]);
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn test_build_step_names() {
        let config = PipelineConfig::from_value(serde_json::json!({ "name": "t" })).unwrap();
        let steps = [
            StepConfig::File,
            StepConfig::Json { pretty: false },
            StepConfig::CssImports,
            StepConfig::Shell {
                command: "cat".into(),
                shell: "sh".into(),
            },
        ];

        for step in &steps {
            let built = build_step(step, &config).unwrap();
            assert_eq!(built.name(), step.name());
        }
    }

    #[test]
    fn test_context_flags() {
        assert!(test_support::context("development").is_development());
        assert!(!test_support::context("production").is_development());
    }
}
