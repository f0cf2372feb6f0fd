// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error types
//!
//! Every failure carries enough context (asset identifier, stage, step or
//! plugin name) to diagnose it without re-running the build.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::AssetStage;

/// Result type for assetflow operations
pub type AssetflowResult<T> = Result<T, AssetflowError>;

/// Taxonomy category of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete pipeline declaration
    Config,
    /// Absent or ambiguous rule for an asset
    Match,
    /// A transform step failed
    Transform,
    /// Naming template or name collision problem
    Naming,
    /// A whole-graph hook failed or broke the append-only contract
    Plugin,
    /// Cache, filesystem and parse failures
    Io,
}

/// Main error type for assetflow
#[derive(Error, Debug, Diagnostic)]
pub enum AssetflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline config not found: {path}")]
    #[diagnostic(
        code(assetflow::config_not_found),
        help("Create one with 'assetflow init' or pass --config")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(assetflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("No branch for environment '{environment}' at '{node}'")]
    #[diagnostic(
        code(assetflow::missing_environment_branch),
        help("Add a '{environment}' branch or a '$default' to this node (available: {available:?})")
    )]
    MissingEnvironmentBranch {
        node: String,
        environment: String,
        available: Vec<String>,
    },

    #[error("Unknown environment '{environment}'")]
    #[diagnostic(
        code(assetflow::unknown_environment),
        help("Declared environments: {declared:?}")
    )]
    UnknownEnvironment {
        environment: String,
        declared: Vec<String>,
    },

    #[error("Rule '{rule}' has an invalid pattern '{pattern}': {error}")]
    #[diagnostic(code(assetflow::invalid_pattern))]
    InvalidPattern {
        rule: String,
        pattern: String,
        error: String,
    },

    #[error("Step '{step}' is unavailable: {reason}")]
    #[diagnostic(code(assetflow::step_unavailable))]
    StepUnavailable {
        step: String,
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Match Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No rule matches asset '{asset}'")]
    #[diagnostic(
        code(assetflow::no_matching_rule),
        help("Add a rule for this asset, or set matching.unmatched to 'passthrough' or 'skip'")
    )]
    NoMatchingRule { asset: String },

    #[error("Asset '{asset}' matches several rules: {rules:?}")]
    #[diagnostic(
        code(assetflow::ambiguous_match),
        help("Narrow the patterns or set matching.ambiguous to 'first'")
    )]
    AmbiguousMatch { asset: String, rules: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Transform Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' failed on asset '{asset}': {cause}")]
    #[diagnostic(code(assetflow::transform_failed))]
    TransformFailed {
        asset: String,
        step: String,
        cause: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Naming Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Naming template '{template}' uses unknown token '[{token}]'")]
    #[diagnostic(
        code(assetflow::unknown_token),
        help(
            "Recognized tokens: [name], [ext], [path], [hash], [contenthash], [chunkhash]; \
             hashes take an optional encoding and length like [hash:base64:8]"
        )
    )]
    UnknownToken { template: String, token: String },

    #[error("Naming template '{template}' is malformed: {reason}")]
    #[diagnostic(code(assetflow::invalid_template))]
    InvalidTemplate { template: String, reason: String },

    #[error("Output name '{name}' is produced by '{first}' and '{second}' with different content")]
    #[diagnostic(
        code(assetflow::name_collision),
        help("Include [hash] or [path] in the naming template")
    )]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Plugin '{plugin}' failed: {reason}")]
    #[diagnostic(code(assetflow::plugin_failed))]
    PluginFailed { plugin: String, reason: String },

    #[error("Plugin '{plugin}' tried to overwrite artifact '{name}'")]
    #[diagnostic(
        code(assetflow::artifact_conflict),
        help("Hooks may only append; return the artifact as an explicit reassignment to replace it")
    )]
    ArtifactConflict { plugin: String, name: String },

    #[error("Plugin '{plugin}' reassigned unknown artifact '{name}'")]
    #[diagnostic(
        code(assetflow::unknown_artifact),
        help("Reassignments replace existing artifacts; return new artifacts as additions")
    )]
    UnknownArtifact { plugin: String, name: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Per-asset wrapper
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Asset '{asset}' failed while {stage}")]
    #[diagnostic(code(assetflow::asset_failed))]
    AssetFailed {
        asset: String,
        stage: AssetStage,
        #[source]
        source: Box<AssetflowError>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Cache Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Cache error: {message}")]
    #[diagnostic(code(assetflow::cache_error))]
    CacheError { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("No source files matched pattern: {pattern}")]
    #[diagnostic(
        code(assetflow::no_input_files),
        help("Check that files matching '{pattern}' exist relative to the config file")
    )]
    NoInputFiles { pattern: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(assetflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(assetflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(assetflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(assetflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(assetflow::glob_error))]
    GlobPattern { message: String },

    #[error("Regex error: {message}")]
    #[diagnostic(code(assetflow::regex_error))]
    Regex { message: String },
}

impl From<std::io::Error> for AssetflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for AssetflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for AssetflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for AssetflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for AssetflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl From<regex::Error> for AssetflowError {
    fn from(e: regex::Error) -> Self {
        Self::Regex { message: e.to_string() }
    }
}

impl AssetflowError {
    /// Wrap an error with the asset and stage it happened in
    pub fn in_asset(self, asset: &str, stage: AssetStage) -> Self {
        match self {
            // Already wrapped by an inner layer
            wrapped @ Self::AssetFailed { .. } => wrapped,
            other => Self::AssetFailed {
                asset: asset.to_string(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Create a transform failure for a step
    pub fn transform(asset: &str, step: &str, cause: impl ToString) -> Self {
        Self::TransformFailed {
            asset: asset.to_string(),
            step: step.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Create an invalid config error without help text
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
            help: None,
        }
    }

    /// Create a plugin failure
    pub fn plugin(plugin: &str, reason: impl ToString) -> Self {
        Self::PluginFailed {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Taxonomy category, looking through the per-asset wrapper
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingEnvironmentBranch { .. }
            | Self::UnknownEnvironment { .. }
            | Self::InvalidPattern { .. }
            | Self::StepUnavailable { .. } => ErrorKind::Config,
            Self::NoMatchingRule { .. } | Self::AmbiguousMatch { .. } => ErrorKind::Match,
            Self::TransformFailed { .. } => ErrorKind::Transform,
            Self::UnknownToken { .. }
            | Self::InvalidTemplate { .. }
            | Self::NameCollision { .. } => ErrorKind::Naming,
            Self::PluginFailed { .. }
            | Self::ArtifactConflict { .. }
            | Self::UnknownArtifact { .. } => ErrorKind::Plugin,
            Self::AssetFailed { source, .. } => source.kind(),
            Self::CacheError { .. }
            | Self::FileReadError { .. }
            | Self::FileWriteError { .. }
            | Self::NoInputFiles { .. }
            | Self::Io { .. }
            | Self::Yaml { .. }
            | Self::Json { .. }
            | Self::Toml { .. }
            | Self::GlobPattern { .. }
            | Self::Regex { .. } => ErrorKind::Io,
        }
    }

    /// Identifier of the asset this error belongs to, if any
    pub fn asset(&self) -> Option<&str> {
        match self {
            Self::AssetFailed { asset, .. }
            | Self::NoMatchingRule { asset }
            | Self::AmbiguousMatch { asset, .. }
            | Self::TransformFailed { asset, .. } => Some(asset),
            _ => None,
        }
    }

    /// Name of the failing transform step, if any
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::TransformFailed { step, .. } => Some(step),
            Self::AssetFailed { source, .. } => source.step(),
            _ => None,
        }
    }

    /// Stage the asset was in when it failed, if any
    pub fn stage(&self) -> Option<AssetStage> {
        match self {
            Self::AssetFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_error_keeps_context() {
        let err = AssetflowError::transform("app/main.js", "define", "boom")
            .in_asset("app/main.js", AssetStage::Transforming);

        assert_eq!(err.kind(), ErrorKind::Transform);
        assert_eq!(err.asset(), Some("app/main.js"));
        assert_eq!(err.step(), Some("define"));
        assert_eq!(err.stage(), Some(AssetStage::Transforming));
    }

    #[test]
    fn test_wrapping_is_not_nested() {
        let err = AssetflowError::NoMatchingRule {
            asset: "a.bin".into(),
        }
        .in_asset("a.bin", AssetStage::Matching)
        .in_asset("a.bin", AssetStage::Naming);

        assert_eq!(err.stage(), Some(AssetStage::Matching));
        assert_eq!(err.kind(), ErrorKind::Match);
    }
}
