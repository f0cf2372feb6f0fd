// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Explain command - show how paths would be handled

use colored::Colorize;
use miette::Result;
use std::sync::Arc;

use super::{asset_id, ConfigArgs};
use crate::pipeline::Pipeline;

/// Run the explain command
pub async fn run(args: ConfigArgs, paths: Vec<String>) -> Result<()> {
    let (config, base_dir) = args.load()?;
    let pipeline = Pipeline::compile(Arc::clone(&config), &base_dir)?;

    for path in &paths {
        let id = asset_id(path, &base_dir);
        let plan = pipeline.explain(&id)?;

        println!("{}", id.bold());
        match &plan.rule {
            Some(rule) => {
                println!("  rule:     {}", rule.cyan());
                println!("  steps:    {}", plan.steps.join(" → "));
            }
            None => println!("  rule:     {}", "(none)".dimmed()),
        }

        match &plan.template {
            Some(template) => {
                println!("  template: {}", template);
                // Passthrough content is final, so its name is known up front
                if plan.rule.is_none() {
                    if let Ok(content) = std::fs::read(base_dir.join(&id)) {
                        let name = pipeline.namer().name(&id, &content, None);
                        println!("  output:   {}", name.green());
                    }
                }
            }
            None => println!("  {}", "skipped".dimmed()),
        }
    }

    Ok(())
}
