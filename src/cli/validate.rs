// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Validate command - check the config in every declared environment

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::config::{PipelineValidator, RawConfig};
use crate::pipeline::Pipeline;

/// Run the validate command
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let raw = match RawConfig::from_file(&config_path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("  {} Failed to parse {}", "✗".red(), config_path.display());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Config file parses", "✓".green());

    let mut has_issues = false;

    for (environment, outcome) in PipelineValidator::validate_environments(&raw)? {
        println!();
        println!("{} {}:", "Environment".bold(), environment.cyan());

        let (config, validation) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                has_issues = true;
                println!("  {} {}", "✗".red(), e);
                continue;
            }
        };

        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
        if !validation.is_valid() {
            has_issues = true;
            continue;
        }

        for missing in PipelineValidator::validate_files(&config, &raw.base_dir) {
            has_issues = true;
            println!("  {} {}", "⚠".yellow(), missing);
        }

        match Pipeline::compile(config, &raw.base_dir) {
            Ok(pipeline) => {
                println!("  {} Rules and plugins compile", "✓".green());
                if verbose {
                    for rule in pipeline.matcher().rules() {
                        let steps: Vec<_> = rule.steps().iter().map(|s| s.name()).collect();
                        println!("    • {} {}", rule.name(), steps.join(" → ").dimmed());
                    }
                    for plugin in pipeline.plugins().names() {
                        println!("    • plugin {}", plugin);
                    }
                }
            }
            Err(e) => {
                has_issues = true;
                println!("  {} {}", "✗".red(), e);
            }
        }
    }

    println!();
    if has_issues {
        Err(miette::miette!("Pipeline configuration has problems"))
    } else {
        println!("{}", "Pipeline is valid.".green().bold());
        Ok(())
    }
}
