// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Whole-graph plugin hooks
//!
//! Plugins run after every asset chain has completed. Each one sees the full
//! artifact set read-only and returns what it adds plus what it explicitly
//! reassigns; the registry applies that output before the next hook runs.

mod html;
mod manifest;
mod sprites;

pub use html::HtmlPlugin;
pub use manifest::ManifestPlugin;
pub use sprites::SpritesPlugin;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::{PipelineConfig, PluginConfig};
use crate::errors::AssetflowError;
use crate::pipeline::{Artifact, ArtifactSet};
use crate::transforms::TransformContext;

/// What a hook contributes to the artifact set
#[derive(Debug, Clone, Default)]
pub struct PluginOutput {
    /// New artifacts; their names must not exist yet
    pub added: Vec<Artifact>,
    /// Replacements for existing artifacts
    pub reassigned: Vec<Artifact>,
}

impl PluginOutput {
    /// Output adding a single artifact
    pub fn add(artifact: Artifact) -> Self {
        Self {
            added: vec![artifact],
            reassigned: Vec::new(),
        }
    }
}

/// A hook over the complete artifact set
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name used in logs and errors
    fn name(&self) -> &str;

    /// Inspect the artifacts and return additions and reassignments
    async fn run(
        &self,
        artifacts: &ArtifactSet,
        ctx: &TransformContext,
    ) -> Result<PluginOutput, AssetflowError>;
}

/// Ordered list of hooks
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every plugin a config declares, in declaration order
    pub fn from_config(config: &PipelineConfig) -> Result<Self, AssetflowError> {
        let mut registry = Self::new();
        for plugin in &config.plugins {
            registry.register(build_plugin(plugin)?);
        }
        Ok(registry)
    }

    /// Append a hook; hooks run in registration order
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every hook in order against the artifact set
    ///
    /// Stops at the first failing hook. Additions that reuse an existing name
    /// fail with [`AssetflowError::ArtifactConflict`], reassignments of unknown
    /// names with [`AssetflowError::UnknownArtifact`]. A rejected hook leaves
    /// the set untouched.
    pub async fn run(
        &self,
        artifacts: &mut ArtifactSet,
        ctx: &TransformContext,
    ) -> Result<(), AssetflowError> {
        for plugin in &self.plugins {
            let output = plugin.run(artifacts, ctx).await.map_err(|e| match e {
                AssetflowError::PluginFailed { .. }
                | AssetflowError::ArtifactConflict { .. }
                | AssetflowError::UnknownArtifact { .. } => e,
                other => AssetflowError::plugin(plugin.name(), other),
            })?;

            debug!(
                plugin = plugin.name(),
                added = output.added.len(),
                reassigned = output.reassigned.len(),
                "plugin finished"
            );

            artifacts.apply(plugin.name(), output.added, output.reassigned)?;
        }
        Ok(())
    }
}

/// Build a plugin from its config
pub fn build_plugin(plugin: &PluginConfig) -> Result<Arc<dyn Plugin>, AssetflowError> {
    Ok(match plugin {
        PluginConfig::Html {
            title,
            template,
            filename,
            inject,
            minify,
            favicon,
        } => {
            let html = HtmlPlugin::new(
                title.clone(),
                template.clone(),
                filename.clone(),
                *inject,
                *minify,
            );
            match favicon {
                Some(path) => Arc::new(html.with_favicon(path.clone())),
                None => Arc::new(html),
            }
        }
        PluginConfig::Manifest { filename } => Arc::new(ManifestPlugin::new(filename.clone())),
        PluginConfig::Sprites { filter, filename } => {
            Arc::new(SpritesPlugin::new(filter, filename.clone())?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Asset;
    use crate::transforms::test_support::context;

    /// Adds a fixed artifact
    struct Emit(&'static str);

    #[async_trait]
    impl Plugin for Emit {
        fn name(&self) -> &str {
            "emit"
        }

        async fn run(
            &self,
            _artifacts: &ArtifactSet,
            _ctx: &TransformContext,
        ) -> Result<PluginOutput, AssetflowError> {
            Ok(PluginOutput::add(Artifact::generated(self.0, "generated")))
        }
    }

    /// Prepends a banner to every script
    struct Banner;

    #[async_trait]
    impl Plugin for Banner {
        fn name(&self) -> &str {
            "banner"
        }

        async fn run(
            &self,
            artifacts: &ArtifactSet,
            _ctx: &TransformContext,
        ) -> Result<PluginOutput, AssetflowError> {
            let reassigned = artifacts
                .iter()
                .filter(|a| a.extension() == Some("js"))
                .map(|a| {
                    let mut a = a.clone();
                    let mut content = b"/* banner */\n".to_vec();
                    content.extend_from_slice(&a.content);
                    a.content = content;
                    a
                })
                .collect();
            Ok(PluginOutput {
                added: Vec::new(),
                reassigned,
            })
        }
    }

    fn artifacts() -> ArtifactSet {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::from_asset("app.js".into(), Asset::new("app/main.js", "run()")))
            .unwrap();
        set
    }

    #[tokio::test]
    async fn test_hooks_append() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Emit("stats.json")));

        let mut set = artifacts();
        registry.run(&mut set, &context("production")).await.unwrap();

        assert_eq!(set.names(), vec!["app.js", "stats.json"]);
        assert_eq!(set.get("app.js").unwrap().content, b"run()");
    }

    #[tokio::test]
    async fn test_overwrite_without_reassignment_fails() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Emit("app.js")));

        let mut set = artifacts();
        let err = registry
            .run(&mut set, &context("production"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssetflowError::ArtifactConflict { ref plugin, .. } if plugin == "emit"
        ));
        assert_eq!(set.get("app.js").unwrap().content, b"run()");
    }

    /// Adds two artifacts, the second of which already exists
    struct Pair;

    #[async_trait]
    impl Plugin for Pair {
        fn name(&self) -> &str {
            "pair"
        }

        async fn run(
            &self,
            _artifacts: &ArtifactSet,
            _ctx: &TransformContext,
        ) -> Result<PluginOutput, AssetflowError> {
            Ok(PluginOutput {
                added: vec![
                    Artifact::generated("extra.txt", "1"),
                    Artifact::generated("app.js", "2"),
                ],
                reassigned: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_rejected_hook_commits_nothing() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Pair));

        let mut set = artifacts();
        let err = registry
            .run(&mut set, &context("production"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssetflowError::ArtifactConflict { ref name, .. } if name == "app.js"
        ));
        assert_eq!(set.names(), vec!["app.js"]);
    }

    #[tokio::test]
    async fn test_explicit_reassignment() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Banner));
        registry.register(Arc::new(Emit("late.txt")));

        let mut set = artifacts();
        registry.run(&mut set, &context("production")).await.unwrap();

        assert_eq!(set.get("app.js").unwrap().content, b"/* banner */\nrun()");
        assert_eq!(set.get("app.js").unwrap().sources, vec!["app/main.js"]);
        assert!(set.contains("late.txt"));
    }

    #[test]
    fn test_registry_from_config() {
        let config = PipelineConfig::from_value(serde_json::json!({
            "name": "web",
            "plugins": [{ "type": "html" }, { "type": "manifest", "filename": "assets.json" }]
        }))
        .unwrap();

        let registry = PluginRegistry::from_config(&config).unwrap();
        assert_eq!(registry.names(), vec!["html", "manifest"]);
    }
}
