// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Inspect command - print the resolved configuration

use miette::Result;

use super::{ConfigArgs, InspectFormat};

/// Run the inspect command
pub async fn run(args: ConfigArgs, format: InspectFormat) -> Result<()> {
    let (config, _) = args.load()?;

    let rendered = match format {
        InspectFormat::Yaml => config.to_yaml()?,
        InspectFormat::Json => config.to_json()?,
    };
    println!("{}", rendered.trim_end());

    Ok(())
}
