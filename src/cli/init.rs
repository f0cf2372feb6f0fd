// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Init command - write a starter pipeline config

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::config::DEFAULT_CONFIG_FILE;

/// Run the init command
pub async fn run(name: Option<String>, force: bool, verbose: bool) -> Result<()> {
    let project_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "my-site".to_string())
    });

    println!("{}", "Initializing assetflow project...".bold());
    println!();

    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() && !force {
        return Err(miette::miette!(
            help = "Pass --force to overwrite it",
            "{} already exists",
            DEFAULT_CONFIG_FILE
        ));
    }

    let content = generate_template(&project_name);
    std::fs::write(path, &content)
        .map_err(|e| miette::miette!("Failed to write {}: {}", DEFAULT_CONFIG_FILE, e))?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_FILE);

    if !Path::new("src").exists() {
        std::fs::create_dir_all("src")
            .map_err(|e| miette::miette!("Failed to create directory 'src': {}", e))?;
        println!("  {} Created src/", "✓".green());
    }

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Put your scripts, styles and images under {}", "src/".cyan());
    println!("  2. Adjust the rules in {}", DEFAULT_CONFIG_FILE.cyan());
    println!("  3. Run {} to build", "assetflow build".cyan());
    println!();

    if verbose {
        println!("{}", "Generated config:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn generate_template(name: &str) -> String {
    format!(
        r#"# assetflow pipeline configuration
version: "1"
name: "{name}"

environments: [development, production]

sources:
  - "src/**/*"

output:
  directory: dist
  filename: "[path][name].[hash:8].[ext]"
  public_path: /

globals:
  __DEV__:
    $env:
      development: true
      production: false

source_maps:
  $env:
    development: true
    production: false

rules:
  - name: scripts
    test: '\.js$'
    use:
      step: define

  - name: data
    test: '\.json$'
    use:
      step: json

  - name: styles
    test: '\.css$'
    include: '^src/app/'
    use:
      - step: css-imports
      - $env:
          production:
            step: minify-css
        $default: null

  - name: images
    test: '\.(png|jpe?g|gif|svg)$'
    use:
      step: file
    filename: "images/[name]_[hash:base64:5].[ext]"

  - name: audio
    test: '\.mp3$'
    use:
      step: file
    filename: "media/[hash].[ext]"

  - name: fonts
    test: '\.(woff2?|eot|ttf|otf)$'
    use:
      step: file
    filename: "fonts/[name]_[hash:base64:5].[ext]"

plugins:
  - type: html
    title: "{name}"
    minify:
      $env:
        production:
          remove_comments: true
          collapse_whitespace: true
      $default: null
  - type: manifest
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvironmentResolver, PipelineValidator, RawConfig, StepConfig};
    use std::path::PathBuf;

    fn resolve(environment: &str) -> std::sync::Arc<crate::config::PipelineConfig> {
        let raw = RawConfig::from_yaml(&generate_template("demo"), PathBuf::from(".")).unwrap();
        EnvironmentResolver::new(environment).resolve(&raw).unwrap()
    }

    #[test]
    fn test_template_resolves_in_every_environment() {
        let dev = resolve("development");
        assert!(dev.source_maps);
        assert_eq!(dev.name, "demo");
        let styles = dev.get_rule("styles").unwrap();
        assert_eq!(styles.steps.as_slice().len(), 1);

        let prod = resolve("production");
        assert!(!prod.source_maps);
        let styles = prod.get_rule("styles").unwrap();
        assert!(matches!(
            styles.steps.as_slice()[1],
            StepConfig::MinifyCss { .. }
        ));
    }

    #[test]
    fn test_template_is_valid() {
        for environment in ["development", "production"] {
            let result = PipelineValidator::validate(&resolve(environment));
            assert!(result.is_valid(), "{}: {:?}", environment, result.errors);
        }
    }
}
