// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! assetflow - Declarative Asset Pipeline Compiler

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assetflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if !assetflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { name, force } => assetflow::cli::init::run(name, force, cli.verbose).await,
        Commands::Build {
            config,
            jobs,
            no_cache,
            dry_run,
        } => assetflow::cli::build::run(config, jobs, no_cache, dry_run, cli.verbose).await,
        Commands::Watch { config, debounce } => {
            assetflow::cli::watch::run(config, debounce, cli.verbose).await
        }
        Commands::Validate { config } => assetflow::cli::validate::run(config, cli.verbose).await,
        Commands::Inspect { config, format } => assetflow::cli::inspect::run(config, format).await,
        Commands::Explain { config, paths } => assetflow::cli::explain::run(config, paths).await,
        Commands::Cache { config, action } => {
            assetflow::cli::cache::run(config, action, cli.verbose).await
        }
    }
}
