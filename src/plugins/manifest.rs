// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Asset manifest: source identifier to emitted name
//!
//! Sources deduplicated onto one artifact each get their own entry.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Plugin, PluginOutput};
use crate::errors::AssetflowError;
use crate::pipeline::{Artifact, ArtifactSet};
use crate::transforms::TransformContext;

/// Emits a JSON manifest of every source-backed artifact
pub struct ManifestPlugin {
    filename: String,
}

impl ManifestPlugin {
    pub fn new(filename: String) -> Self {
        Self { filename }
    }
}

#[async_trait]
impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn run(
        &self,
        artifacts: &ArtifactSet,
        _ctx: &TransformContext,
    ) -> Result<PluginOutput, AssetflowError> {
        let entries: BTreeMap<&str, &str> = artifacts
            .iter()
            .flat_map(|a| a.sources.iter().map(|src| (src.as_str(), a.name.as_str())))
            .collect();

        let json = serde_json::to_vec_pretty(&entries)?;
        Ok(PluginOutput::add(Artifact::generated(&self.filename, json)))
    }
}
