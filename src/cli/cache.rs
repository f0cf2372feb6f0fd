// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Cache command - manage the transform cache

use colored::Colorize;
use miette::Result;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::CacheAction;
use crate::cache::{Cache, FilesystemCache};
use crate::config::{CacheConfig, EnvironmentResolver, RawConfig};

/// Run the cache command
pub async fn run(config_path: PathBuf, action: CacheAction, verbose: bool) -> Result<()> {
    let cache_dir = cache_directory(&config_path)?;
    if verbose {
        println!("{} {}", "Cache directory:".dimmed(), cache_dir.display());
    }
    let cache = FilesystemCache::new(cache_dir.clone())?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await?;

            println!("{}", "Cache Statistics".bold());
            println!("{}", "═".repeat(40));
            println!("  Location: {}", cache_dir.display());
            println!("  Entries:  {}", stats.entries);
            println!("  Size:     {}", stats.formatted_size());

            if let Some(oldest) = stats.oldest_entry {
                if let Ok(duration) = oldest.elapsed() {
                    println!("  Oldest:   {} ago", format_duration(duration));
                }
            }

            if let Some(newest) = stats.newest_entry {
                if let Ok(duration) = newest.elapsed() {
                    println!("  Newest:   {} ago", format_duration(duration));
                }
            }

            Ok(())
        }

        CacheAction::Clear { yes } => {
            let stats = cache.stats().await?;

            if stats.entries == 0 {
                println!("{}", "Cache is already empty.".dimmed());
                return Ok(());
            }

            if !yes {
                print!(
                    "Clear {} cache entries ({})? [y/N] ",
                    stats.entries,
                    stats.formatted_size()
                );
                io::stdout().flush().ok();

                let mut input = String::new();
                io::stdin().read_line(&mut input).ok();

                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("{}", "Cancelled.".dimmed());
                    return Ok(());
                }
            }

            cache.clear().await?;
            println!("{}", "Cache cleared.".green());

            Ok(())
        }
    }
}

/// Cache directory named by the config, or the default next to it
fn cache_directory(config_path: &Path) -> Result<PathBuf> {
    if config_path.exists() {
        let raw = RawConfig::from_file(config_path)?;
        let config = EnvironmentResolver::default().resolve(&raw)?;
        return Ok(raw.resolve_path(&config.cache.directory));
    }

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(base_dir.join(CacheConfig::default().directory))
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d");
    }

    #[test]
    fn test_cache_directory_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("assetflow.yaml");
        std::fs::write(&config, "name: web\ncache:\n  directory: tmp/cache\n").unwrap();

        let resolved = cache_directory(&config).unwrap();
        assert!(resolved.ends_with("tmp/cache"));
    }

    #[test]
    fn test_cache_directory_default() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = cache_directory(&dir.path().join("missing.yaml")).unwrap();
        assert_eq!(resolved, dir.path().join(".assetflow/cache"));
    }
}
