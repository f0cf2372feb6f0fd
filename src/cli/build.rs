// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Build command - run the pipeline over all sources

use colored::Colorize;
use miette::Result;
use std::path::Path;
use std::sync::Arc;

use super::ConfigArgs;
use crate::cache::FilesystemCache;
use crate::config::{PipelineConfig, PipelineValidator};
use crate::errors::AssetflowError;
use crate::output::OutputWriter;
use crate::pipeline::{BuildResult, ExecutionOptions, Pipeline, PipelineExecutor};
use crate::source::{AssetSource, DirectorySource};
use crate::utils::{create_progress_bar, format_size, print_header};

/// Run the build command
pub async fn run(
    args: ConfigArgs,
    jobs: Option<usize>,
    no_cache: bool,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let (config, base_dir) = args.load()?;

    let validation = PipelineValidator::validate(&config);
    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let pipeline = Arc::new(Pipeline::compile(Arc::clone(&config), &base_dir)?);

    let missing = pipeline.missing_tools().await;
    if !missing.is_empty() {
        eprintln!("{}", "Missing required tools:".red().bold());
        for (rule, step) in &missing {
            eprintln!("  {} rule '{}': step '{}'", "✗".red(), rule, step);
        }
    }
    pipeline.check_tools().await?;

    print_header(&format!("Pipeline: {} ({})", config.name, config.environment));

    if dry_run {
        return print_plan(&pipeline, &config, &base_dir).await;
    }

    let options = ExecutionOptions { no_cache, jobs };
    let result = execute(&pipeline, &base_dir, &options, true).await?;
    report(result, &config, &base_dir, verbose).await
}

/// Discover sources and run one build
pub(crate) async fn execute(
    pipeline: &Arc<Pipeline>,
    base_dir: &Path,
    options: &ExecutionOptions,
    progress: bool,
) -> Result<BuildResult, AssetflowError> {
    let config = pipeline.config();
    let assets = source(config, base_dir).discover().await?;

    let mut executor = PipelineExecutor::new();
    if config.cache.enabled && !options.no_cache {
        let cache = FilesystemCache::new(base_dir.join(&config.cache.directory))?;
        executor = executor.with_cache(Box::new(cache));
    }

    let bar = progress.then(|| create_progress_bar(assets.len() as u64, "Building"));
    if let Some(bar) = &bar {
        executor = executor.with_progress(bar.clone());
    }

    let result = executor
        .execute(Arc::clone(pipeline), assets, options)
        .await;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(result)
}

/// Directory source for a config, skipping generated directories
pub(crate) fn source(config: &PipelineConfig, base_dir: &Path) -> DirectorySource {
    DirectorySource::new(base_dir, config.sources.clone())
        .ignore(&config.output.directory)
        .ignore(&config.cache.directory)
}

/// Write artifacts of a finished run, or surface its error
pub(crate) async fn report(
    result: BuildResult,
    config: &PipelineConfig,
    base_dir: &Path,
    verbose: bool,
) -> Result<()> {
    let stats = result.stats;

    if let Some(error) = result.error {
        if !result.artifacts.is_empty() {
            eprintln!(
                "  {} {} artifact(s) completed before the failure were not written",
                "⚠".yellow(),
                result.artifacts.len()
            );
        }
        eprintln!(
            "{}",
            format!("Build failed after {:.2}s", result.duration.as_secs_f64()).red()
        );
        return Err(error.into());
    }

    let writer = OutputWriter::new(base_dir.join(&config.output.directory));
    let written = writer.write(&result.artifacts).await?;

    if verbose {
        for artifact in result.artifacts.iter() {
            println!(
                "  {} {} {}",
                "✓".green(),
                artifact.name,
                format!("({})", format_size(artifact.content.len() as u64)).dimmed()
            );
        }
    }

    println!();
    println!(
        "{} {} artifact(s), {} in {:.2}s",
        "Built".green().bold(),
        result.artifacts.len(),
        format_size(result.artifacts.total_size()),
        result.duration.as_secs_f64()
    );
    println!(
        "  {}",
        format!(
            "{} transformed, {} cached, {} passed through, {} skipped; {} written, {} unchanged",
            stats.transformed,
            stats.cached,
            stats.passthrough,
            stats.skipped,
            written.written.len(),
            written.unchanged
        )
        .dimmed()
    );
    println!("  Output: {}", writer.directory().display().to_string().cyan());

    Ok(())
}

async fn print_plan(pipeline: &Pipeline, config: &PipelineConfig, base_dir: &Path) -> Result<()> {
    let assets = source(config, base_dir).discover().await?;

    println!("Build plan ({} asset(s)):", assets.len());
    println!();
    for asset in &assets {
        let plan = pipeline.explain(&asset.id)?;
        match (&plan.rule, &plan.template) {
            (Some(rule), _) => println!(
                "  {} {} {}",
                asset.id.bold(),
                format!("[{}]", rule).cyan(),
                plan.steps.join(" → ").dimmed()
            ),
            (None, Some(_)) => println!("  {} {}", asset.id.bold(), "(passthrough)".dimmed()),
            (None, None) => println!("  {} {}", asset.id.dimmed(), "(skipped)".dimmed()),
        }
    }
    println!();

    Ok(())
}
