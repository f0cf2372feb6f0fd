// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Environment resolution
//!
//! Flattens every environment-conditioned node of a raw configuration tree
//! into the branch for the active environment, once, before any asset is
//! processed. A conditional node is an object whose keys are `$env` and
//! optionally `$default`:
//!
//! ```yaml
//! source_maps:
//!   $env: { development: true, production: false }
//!   $default: false
//! ```

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::{PipelineConfig, RawConfig};
use crate::errors::AssetflowError;

/// Key holding the per-environment branches
pub const ENV_KEY: &str = "$env";
/// Key holding the fallback branch
pub const DEFAULT_KEY: &str = "$default";
/// Environment used when none is given
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Resolves conditional nodes for one active environment
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    environment: String,
    declared: Vec<String>,
}

impl EnvironmentResolver {
    /// Create a resolver for the active environment
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            declared: Vec::new(),
        }
    }

    /// Active environment name
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Resolve a raw config into the frozen pipeline configuration
    pub fn resolve(&self, raw: &RawConfig) -> Result<Arc<PipelineConfig>, AssetflowError> {
        let declared = declared_environments(&raw.value)?;
        let resolver = Self {
            environment: self.environment.clone(),
            declared,
        };

        if !resolver.declared.is_empty() && !resolver.declared.contains(&resolver.environment) {
            return Err(AssetflowError::UnknownEnvironment {
                environment: resolver.environment.clone(),
                declared: resolver.declared.clone(),
            });
        }

        let mut flat = resolver.resolve_value(&raw.value, "")?;
        if let Value::Object(map) = &mut flat {
            map.insert(
                "environment".to_string(),
                Value::String(resolver.environment.clone()),
            );
        } else {
            return Err(AssetflowError::invalid_config(
                "top level of the config must be a mapping",
            ));
        }

        let config = PipelineConfig::from_value(flat)?;
        debug!(
            environment = %resolver.environment,
            rules = config.rules.len(),
            plugins = config.plugins.len(),
            "configuration resolved"
        );
        Ok(Arc::new(config))
    }

    /// Resolve a single value tree; `path` names the node for errors
    pub fn resolve_value(&self, value: &Value, path: &str) -> Result<Value, AssetflowError> {
        match value {
            Value::Object(map) if is_conditional(map) => {
                let branch = self.pick_branch(map, path)?;
                self.resolve_value(branch, path)
            }
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.resolve_value(child, &join(path, key))?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let conditional = matches!(item, Value::Object(m) if is_conditional(m));
                    let resolved = self.resolve_value(item, &format!("{}[{}]", path, i))?;
                    // A conditional element resolving to null is absent in this environment
                    if conditional && resolved.is_null() {
                        continue;
                    }
                    out.push(resolved);
                }
                Ok(Value::Array(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn pick_branch<'a>(
        &self,
        node: &'a Map<String, Value>,
        path: &str,
    ) -> Result<&'a Value, AssetflowError> {
        let branches = match node.get(ENV_KEY) {
            Some(Value::Object(branches)) => branches,
            _ => {
                return Err(AssetflowError::InvalidConfig {
                    reason: format!(
                        "'{}' at '{}' must map environment names to values",
                        ENV_KEY,
                        display(path)
                    ),
                    help: None,
                })
            }
        };

        if !self.declared.is_empty() {
            if let Some(unknown) = branches.keys().find(|k| !self.declared.contains(k)) {
                return Err(AssetflowError::InvalidConfig {
                    reason: format!(
                        "branch '{}' at '{}' is not a declared environment",
                        unknown,
                        display(path)
                    ),
                    help: Some(format!("Declared environments: {}", self.declared.join(", "))),
                });
            }
        }

        branches
            .get(&self.environment)
            .or_else(|| node.get(DEFAULT_KEY))
            .ok_or_else(|| AssetflowError::MissingEnvironmentBranch {
                node: display(path).to_string(),
                environment: self.environment.clone(),
                available: branches.keys().cloned().collect(),
            })
    }
}

impl Default for EnvironmentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT)
    }
}

/// Environment names declared at the top level of a raw config
pub fn declared_environments(value: &Value) -> Result<Vec<String>, AssetflowError> {
    match value.get("environments") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AssetflowError::invalid_config("'environments' must be a list of names")
                })
            })
            .collect(),
        Some(_) => Err(AssetflowError::invalid_config(
            "'environments' must be a list of names",
        )),
    }
}

fn is_conditional(map: &Map<String, Value>) -> bool {
    map.contains_key(ENV_KEY) && map.keys().all(|k| k == ENV_KEY || k == DEFAULT_KEY)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
