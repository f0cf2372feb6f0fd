// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! # assetflow - Declarative Asset Pipeline Compiler
//!
//! `assetflow` turns a declarative, environment-conditioned pipeline config
//! into a set of named output artifacts.
//!
//! ## Features
//!
//! - **Environment resolution** - `$env` / `$default` nodes collapse to one frozen config
//! - **Rule matching** - first-match-wins regex rules with include/exclude filters
//! - **Transform chains** - ordered steps, run concurrently across assets
//! - **Output naming** - `[name]`, `[ext]`, `[path]`, `[hash:N]` templates
//! - **Plugins** - whole-graph hooks over the finished artifact set
//! - **Caching** - chain results keyed by content and configuration
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter config
//! assetflow init my-site
//!
//! # Build for production
//! assetflow build --env production
//!
//! # See how a file would be handled
//! assetflow explain src/app/main.css
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod plugins;
pub mod source;
pub mod transforms;
pub mod utils;

// Re-export commonly used types
pub use config::{EnvironmentResolver, PipelineConfig, RawConfig};
pub use errors::{AssetflowError, AssetflowResult};
pub use pipeline::{Artifact, ArtifactSet, Asset, BuildResult, Pipeline, PipelineExecutor};
pub use plugins::{Plugin, PluginRegistry};
pub use transforms::{Transform, TransformContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
