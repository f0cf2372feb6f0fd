// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for assetflow.

pub mod build;
pub mod cache;
pub mod explain;
pub mod init;
pub mod inspect;
pub mod validate;
pub mod watch;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{
    EnvironmentResolver, PipelineConfig, RawConfig, DEFAULT_CONFIG_FILE, DEFAULT_ENVIRONMENT,
};
use crate::errors::AssetflowError;

/// Declarative asset pipeline compiler
///
/// Match assets to rules, run their transform chains, name the outputs and
/// finish with whole-graph plugins.
#[derive(Parser, Debug)]
#[clap(
    name = "assetflow",
    version,
    about = "Declarative asset pipeline compiler",
    long_about = None,
    after_help = "Examples:\n\
        assetflow init                      Write a starter assetflow.yaml\n\
        assetflow build --env production    Build for production\n\
        assetflow explain src/app/main.css  Show which rule handles a file\n\
        assetflow watch                     Rebuild on file changes\n\n\
        See 'assetflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

/// Config file and active environment
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Pipeline config file (YAML, JSON or TOML)
    #[clap(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Active environment
    #[clap(short, long, env = "ASSETFLOW_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub env: String,
}

impl ConfigArgs {
    /// Load and resolve the config; returns it with its base directory
    pub fn load(&self) -> Result<(Arc<PipelineConfig>, PathBuf), AssetflowError> {
        let raw = RawConfig::from_file(&self.config)?;
        let config = EnvironmentResolver::new(self.env.clone()).resolve(&raw)?;
        Ok((config, raw.base_dir))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter pipeline config
    Init {
        /// Pipeline name (defaults to current directory name)
        name: Option<String>,

        /// Overwrite an existing config
        #[clap(short, long)]
        force: bool,
    },

    /// Build all sources
    Build {
        #[clap(flatten)]
        config: ConfigArgs,

        /// Worker pool size
        #[clap(short, long)]
        jobs: Option<usize>,

        /// Skip cache (force re-execution)
        #[clap(long)]
        no_cache: bool,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,
    },

    /// Watch mode - rebuild on file changes
    Watch {
        #[clap(flatten)]
        config: ConfigArgs,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },

    /// Validate the config for every declared environment
    Validate {
        /// Pipeline config file
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Print the resolved configuration
    Inspect {
        #[clap(flatten)]
        config: ConfigArgs,

        /// Output format
        #[clap(short, long, value_enum, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Show which rule, steps and naming template apply to paths
    Explain {
        #[clap(flatten)]
        config: ConfigArgs,

        /// Asset paths, relative to the config file
        #[clap(required = true)]
        paths: Vec<String>,
    },

    /// Cache management
    Cache {
        /// Pipeline config file, used to locate the cache
        #[clap(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[clap(subcommand)]
        action: CacheAction,
    },
}

/// Cache management actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Clear the cache
    Clear {
        /// Skip confirmation
        #[clap(short, long)]
        yes: bool,
    },
}

/// Output format for inspect command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    Yaml,
    Json,
}

/// Turn a user-supplied path into an asset identifier
pub(crate) fn asset_id(path: &str, base_dir: &Path) -> String {
    let path = Path::new(path);
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    relative
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_asset_id() {
        assert_eq!(asset_id("./src/app/main.css", Path::new("")), "src/app/main.css");
        assert_eq!(asset_id("/site/src/a.png", Path::new("/site")), "src/a.png");
    }

    #[test]
    fn test_build_args() {
        let cli = Cli::parse_from(["assetflow", "build", "--env", "production", "-j", "4"]);
        match cli.command {
            Commands::Build { config, jobs, .. } => {
                assert_eq!(config.env, "production");
                assert_eq!(jobs, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
