// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline configuration structures
//!
//! The typed, environment-resolved schema of `assetflow.yaml`. Values of
//! these types contain no conditional nodes; see [`super::EnvironmentResolver`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Frozen pipeline configuration for one build run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Config version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Environment this config was resolved for
    #[serde(default)]
    pub environment: String,

    /// Legal environment names, if declared
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,

    /// Source globs, relative to the config file
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Output location and default naming
    #[serde(default)]
    pub output: OutputConfig,

    /// Global constants visible to transform steps
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,

    /// Record a source-map chain and emit `.map` side artifacts
    #[serde(default)]
    pub source_maps: bool,

    /// Worker pool size for per-asset chains
    #[serde(default)]
    pub workers: Option<usize>,

    /// Match policy
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Rules in declaration order (first match wins)
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Whole-graph hooks in declaration order
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    /// Transform cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_sources() -> Vec<String> {
    vec!["src/**/*".to_string()]
}

impl PipelineConfig {
    /// Parse an already-resolved configuration value
    pub fn from_value(value: Value) -> Result<Self, crate::AssetflowError> {
        serde_json::from_value(value).map_err(|e| crate::AssetflowError::InvalidConfig {
            reason: e.to_string(),
            help: Some(
                "Check field names and value types against the pipeline reference".into(),
            ),
        })
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, crate::AssetflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, crate::AssetflowError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Whether the development context flag is on
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get a rule by name
    pub fn get_rule(&self, name: &str) -> Option<&RuleConfig> {
        self.rules
            .iter()
            .enumerate()
            .find(|(i, r)| r.display_name(*i) == name)
            .map(|(_, r)| r)
    }

    /// Display names of all rules in order
    pub fn rule_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| r.display_name(i))
            .collect()
    }
}

/// Output location and default naming template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory, relative to the config file
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Default naming template
    #[serde(default = "default_filename")]
    pub filename: String,

    /// URL prefix for emitted artifacts
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            filename: default_filename(),
            public_path: default_public_path(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_filename() -> String {
    "[path][name].[hash:8].[ext]".to_string()
}

fn default_public_path() -> String {
    "/".to_string()
}

/// What to do with assets that match no rule, or several
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default)]
    pub unmatched: UnmatchedPolicy,
    #[serde(default)]
    pub ambiguous: AmbiguityPolicy,
}

/// Policy for assets no rule matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Emit the raw content under the default naming template
    #[default]
    Passthrough,
    /// Drop the asset
    Skip,
    /// Fail the build
    Error,
}

/// Policy for assets several rules match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// The earliest declared rule wins
    #[default]
    First,
    /// Fail the build
    Error,
}

/// A pattern-to-transform-chain binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Rule name (defaults to `rule[<index>]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Regex the asset identifier must match
    pub test: String,

    /// Regex the identifier must also match, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Regex that vetoes the rule (overrides `test` and `include`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// One step or an ordered list of steps
    #[serde(rename = "use")]
    pub steps: StepList,

    /// Naming template overriding `output.filename`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl RuleConfig {
    /// Name used in logs and errors
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("rule[{}]", index))
    }
}

/// A single step is a one-element chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepList {
    Many(Vec<StepConfig>),
    One(StepConfig),
}

impl StepList {
    pub fn as_slice(&self) -> &[StepConfig] {
        match self {
            Self::Many(steps) => steps,
            Self::One(step) => std::slice::from_ref(step),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Built-in transform steps with their recognized options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case", deny_unknown_fields)]
pub enum StepConfig {
    /// Pass content through unchanged
    File,

    /// Validate and re-emit JSON
    Json {
        #[serde(default)]
        pretty: bool,
    },

    /// Replace global constant identifiers with their literal values
    Define {
        #[serde(default)]
        globals: BTreeMap<String, Value>,
    },

    /// Record `@import` targets as dependencies
    CssImports,

    /// Strip comments and collapse whitespace in stylesheets
    MinifyCss {
        #[serde(default = "default_true")]
        remove_comments: bool,
        #[serde(default = "default_true")]
        collapse_whitespace: bool,
    },

    /// Strip comments and collapse whitespace in HTML
    MinifyHtml {
        #[serde(default = "default_true")]
        remove_comments: bool,
        #[serde(default = "default_true")]
        collapse_whitespace: bool,
    },

    /// Pipe content through an external command
    Shell {
        command: String,
        #[serde(default = "default_shell")]
        shell: String,
    },
}

impl StepConfig {
    /// Step name as written in config
    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Json { .. } => "json",
            Self::Define { .. } => "define",
            Self::CssImports => "css-imports",
            Self::MinifyCss { .. } => "minify-css",
            Self::MinifyHtml { .. } => "minify-html",
            Self::Shell { .. } => "shell",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_shell() -> String {
    "bash".to_string()
}

/// Whole-graph hooks with their recognized options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum PluginConfig {
    /// Render an HTML document referencing the emitted scripts and styles
    Html {
        #[serde(default = "default_html_title")]
        title: String,
        /// Template file, relative to the config file
        #[serde(default)]
        template: Option<PathBuf>,
        #[serde(default = "default_html_filename")]
        filename: String,
        #[serde(default)]
        inject: InjectPosition,
        #[serde(default)]
        minify: Option<HtmlMinifyConfig>,
        /// Icon copied next to the document, relative to the config file
        #[serde(default)]
        favicon: Option<PathBuf>,
    },

    /// Emit a JSON map from source identifier to output name
    Manifest {
        #[serde(default = "default_manifest_filename")]
        filename: String,
    },

    /// Emit an index of sprite images grouped by directory
    Sprites {
        #[serde(default = "default_sprite_filter")]
        filter: String,
        #[serde(default = "default_sprite_filename")]
        filename: String,
    },
}

impl PluginConfig {
    /// Plugin name as written in config
    pub fn name(&self) -> &'static str {
        match self {
            Self::Html { .. } => "html",
            Self::Manifest { .. } => "manifest",
            Self::Sprites { .. } => "sprites",
        }
    }

    /// Name of the artifact this plugin emits
    pub fn output_name(&self) -> &str {
        match self {
            Self::Html { filename, .. }
            | Self::Manifest { filename }
            | Self::Sprites { filename, .. } => filename,
        }
    }
}

fn default_html_title() -> String {
    "App".to_string()
}

fn default_html_filename() -> String {
    "index.html".to_string()
}

fn default_manifest_filename() -> String {
    "manifest.json".to_string()
}

fn default_sprite_filter() -> String {
    r"sprites/.*\.png$".to_string()
}

fn default_sprite_filename() -> String {
    "sprites.json".to_string()
}

/// Where the HTML plugin places asset tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectPosition {
    Head,
    #[default]
    Body,
    None,
}

/// Minification options for the HTML plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HtmlMinifyConfig {
    #[serde(default = "default_true")]
    pub remove_comments: bool,
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,
}

/// Transform cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory, relative to the config file
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".assetflow/cache")
}
