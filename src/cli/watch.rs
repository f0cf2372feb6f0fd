// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Watch command - rebuild on file changes

use colored::Colorize;
use miette::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use super::{build, ConfigArgs};
use crate::pipeline::{ExecutionOptions, Pipeline};

/// Run the watch command
pub async fn run(args: ConfigArgs, debounce_ms: u64, verbose: bool) -> Result<()> {
    // Fail early on a missing or broken config
    let (config, base_dir) = args.load()?;

    println!("{}", "Starting watch mode...".bold());
    println!("Watching for changes (debounce: {}ms)", debounce_ms);
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(&base_dir, RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    let ignored = vec![
        base_dir.join(&config.output.directory),
        base_dir.join(&config.cache.directory),
    ];

    rebuild(&args, verbose).await;

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| !is_ignored(&e.path, &ignored))
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .collect();

                if !relevant.is_empty() {
                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!(
                        "{}: {} file(s) changed",
                        "Change detected".yellow(),
                        relevant.len()
                    );

                    if verbose {
                        for event in &relevant {
                            println!("  {}", event.path.display());
                        }
                    }

                    println!();
                    rebuild(&args, verbose).await;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{}: {:?}", "Watch error".red(), e);
            }
            Err(e) => {
                // Channel closed
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Whether a changed path lies in a generated directory
fn is_ignored(path: &Path, ignored: &[PathBuf]) -> bool {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    ignored.iter().any(|dir| {
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        path.starts_with(dir)
    })
}

/// Reload the config and rebuild; errors are reported, never fatal
async fn rebuild(args: &ConfigArgs, verbose: bool) {
    let (config, base_dir) = match args.load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: {}", "Failed to load config".red(), e);
            return;
        }
    };

    let pipeline = match Pipeline::compile(Arc::clone(&config), &base_dir) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("{}: {}", "Failed to compile pipeline".red(), e);
            return;
        }
    };

    let options = ExecutionOptions::default();
    let result = match build::execute(&pipeline, &base_dir, &options, false).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}: {}", "Build error".red(), e);
            return;
        }
    };

    if let Err(e) = build::report(result, &config, &base_dir, verbose).await {
        eprintln!("{}: {}", "Build failed".red(), e);
    }
}
