// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Compiled pipeline
//!
//! A frozen [`PipelineConfig`] turned into executable parts: compiled rules,
//! a parsed default naming template and the plugin hooks.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{NamingTemplate, OutputNamer, RuleMatcher};
use crate::config::{PipelineConfig, UnmatchedPolicy};
use crate::errors::AssetflowError;
use crate::plugins::PluginRegistry;
use crate::transforms::TransformContext;

/// Everything a build run needs, immutable once compiled
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    matcher: RuleMatcher,
    namer: OutputNamer,
    plugins: PluginRegistry,
    context: TransformContext,
}

/// How a single identifier would be handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetPlan {
    pub asset: String,
    /// Matching rule, `None` when unmatched
    pub rule: Option<String>,
    pub steps: Vec<String>,
    /// Template that names the output; `None` when the asset is skipped
    pub template: Option<String>,
}

impl Pipeline {
    /// Compile rules, naming and plugins from a frozen config
    pub fn compile(
        config: Arc<PipelineConfig>,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, AssetflowError> {
        let matcher = RuleMatcher::from_config(&config)?;
        let plugins = PluginRegistry::from_config(&config)?;
        let pipeline = Self::from_parts(config, base_dir, matcher, plugins)?;

        info!(
            pipeline = %pipeline.config.name,
            environment = %pipeline.config.environment,
            rules = pipeline.matcher.rules().len(),
            plugins = pipeline.plugins.len(),
            "pipeline compiled"
        );
        Ok(pipeline)
    }

    /// Assemble a pipeline from programmatically built rules and plugins
    pub fn from_parts(
        config: Arc<PipelineConfig>,
        base_dir: impl Into<PathBuf>,
        matcher: RuleMatcher,
        plugins: PluginRegistry,
    ) -> Result<Self, AssetflowError> {
        let namer = OutputNamer::new(NamingTemplate::parse(&config.output.filename)?);
        let context = TransformContext::new(Arc::clone(&config), base_dir.into());
        Ok(Self {
            config,
            matcher,
            namer,
            plugins,
            context,
        })
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn namer(&self) -> &OutputNamer {
        &self.namer
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Context handed to every step and plugin
    pub fn context(&self) -> &TransformContext {
        &self.context
    }

    /// Describe which rule, steps and template apply to `id`
    pub fn explain(&self, id: &str) -> Result<AssetPlan, AssetflowError> {
        let plan = match self.matcher.find(id)? {
            Some(rule) => AssetPlan {
                asset: id.to_string(),
                rule: Some(rule.name().to_string()),
                steps: rule.steps().iter().map(|s| s.name().to_string()).collect(),
                template: Some(
                    rule.naming()
                        .unwrap_or(self.namer.default_template())
                        .to_string(),
                ),
            },
            None => AssetPlan {
                asset: id.to_string(),
                rule: None,
                steps: Vec::new(),
                template: match self.matcher.policy().unmatched {
                    UnmatchedPolicy::Skip => None,
                    _ => Some(self.namer.default_template().to_string()),
                },
            },
        };
        Ok(plan)
    }

    /// Steps whose external tooling is missing, as `(rule, step)` pairs
    pub async fn missing_tools(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for rule in self.matcher.rules() {
            for step in rule.steps() {
                if !matches!(step.check_available().await, Ok(true)) {
                    missing.push((rule.name().to_string(), step.name().to_string()));
                }
            }
        }
        missing
    }

    /// Fail on the first step whose external tooling is missing
    pub async fn check_tools(&self) -> Result<(), AssetflowError> {
        let missing = self.missing_tools().await;
        let Some((rule, step)) = missing.into_iter().next() else {
            return Ok(());
        };
        Err(AssetflowError::StepUnavailable {
            reason: format!("rule '{}' needs a tool that is not installed", rule),
            step,
            help: Some("Install the tool or set the step's 'shell' option".to_string()),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.name)
            .field("environment", &self.config.environment)
            .field("rules", &self.matcher.rules())
            .field("plugins", &self.plugins.names())
            .finish()
    }
}
