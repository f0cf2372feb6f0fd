// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline validation
//!
//! Validates a resolved configuration before any asset is processed.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::environment::{declared_environments, DEFAULT_ENVIRONMENT};
use super::{EnvironmentResolver, PipelineConfig, PluginConfig, RawConfig};
use crate::errors::AssetflowError;
use crate::pipeline::NamingTemplate;

/// Resolved config and its validation, or the resolution error
pub type EnvironmentOutcome = Result<(Arc<PipelineConfig>, ValidationResult), AssetflowError>;

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a resolved pipeline configuration
    pub fn validate(config: &PipelineConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.sources.is_empty() {
            result.add_warning("No sources declared; only programmatic assets will be built");
        }

        if let Err(e) = NamingTemplate::parse(&config.output.filename) {
            result.add_error(&format!("output.filename: {}", e));
        }

        let mut seen_names = HashSet::new();
        let mut seen_tests: Vec<(&str, String)> = Vec::new();
        for (i, rule) in config.rules.iter().enumerate() {
            let name = rule.display_name(i);

            if !seen_names.insert(name.clone()) {
                result.add_error(&format!("Duplicate rule name: '{}'", name));
            }

            if rule.steps.is_empty() {
                result.add_error(&format!("Rule '{}': 'use' lists no steps", name));
            }

            for (field, pattern) in [
                ("test", Some(&rule.test)),
                ("include", rule.include.as_ref()),
                ("exclude", rule.exclude.as_ref()),
            ] {
                if let Some(pattern) = pattern {
                    if let Err(e) = Regex::new(pattern) {
                        result.add_error(&format!(
                            "Rule '{}': invalid {} pattern: {}",
                            name, field, e
                        ));
                    }
                }
            }

            if let Some(filename) = &rule.filename {
                if let Err(e) = NamingTemplate::parse(filename) {
                    result.add_error(&format!("Rule '{}': {}", name, e));
                }
            }

            // An identical unconditional test earlier in the list always wins
            if rule.include.is_none() && rule.exclude.is_none() {
                if let Some((_, earlier)) = seen_tests.iter().find(|(t, _)| *t == rule.test) {
                    result.add_warning(&format!(
                        "Rule '{}' is unreachable: rule '{}' has the same test",
                        name, earlier
                    ));
                }
                seen_tests.push((&rule.test, name));
            }
        }

        let mut outputs = HashSet::new();
        for plugin in &config.plugins {
            if !outputs.insert(plugin.output_name()) {
                result.add_error(&format!(
                    "Plugin '{}': output '{}' is already produced by another plugin",
                    plugin.name(),
                    plugin.output_name()
                ));
            }
            if let PluginConfig::Sprites { filter, .. } = plugin {
                if let Err(e) = Regex::new(filter) {
                    result.add_error(&format!("Plugin 'sprites': invalid filter: {}", e));
                }
            }
        }

        result
    }

    /// Check that files referenced by the config exist
    pub fn validate_files(config: &PipelineConfig, base_dir: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for plugin in &config.plugins {
            if let PluginConfig::Html {
                template, favicon, ..
            } = plugin
            {
                for (what, path) in [("template", template), ("favicon", favicon)] {
                    if let Some(path) = path.as_ref().filter(|p| !base_dir.join(p).exists()) {
                        missing.push(format!(
                            "Plugin 'html': {} not found: {}",
                            what,
                            path.display()
                        ));
                    }
                }
            }
        }

        missing
    }

    /// Resolve and validate a raw config once per declared environment
    ///
    /// Without an `environments` list only the default environment is checked.
    pub fn validate_environments(
        raw: &RawConfig,
    ) -> Result<Vec<(String, EnvironmentOutcome)>, AssetflowError> {
        let mut environments = declared_environments(&raw.value)?;
        if environments.is_empty() {
            environments.push(DEFAULT_ENVIRONMENT.to_string());
        }

        Ok(environments
            .into_iter()
            .map(|env| {
                let outcome = EnvironmentResolver::new(env.clone())
                    .resolve(raw)
                    .map(|config| {
                        let result = Self::validate(&config);
                        (config, result)
                    });
                (env, outcome)
            })
            .collect())
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
