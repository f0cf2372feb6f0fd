// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Sprite groups
//!
//! Groups emitted sprite images by the name of their source directory, so
//! `sprites/icons/a.png` and `sprites/icons/b.png` form the `icons` group.
//! Composing the images themselves is left to downstream tooling.

use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;

use super::{Plugin, PluginOutput};
use crate::errors::AssetflowError;
use crate::pipeline::{Artifact, ArtifactSet};
use crate::transforms::TransformContext;

pub struct SpritesPlugin {
    filter: Regex,
    filename: String,
}

impl SpritesPlugin {
    pub fn new(filter: &str, filename: String) -> Result<Self, AssetflowError> {
        let filter = Regex::new(filter).map_err(|e| AssetflowError::InvalidPattern {
            rule: "plugin 'sprites'".to_string(),
            pattern: filter.to_string(),
            error: e.to_string(),
        })?;
        Ok(Self { filter, filename })
    }

    /// Group name for a source identifier
    fn group(id: &str) -> &str {
        let mut dirs = id.rsplit('/').skip(1);
        dirs.next().unwrap_or("default")
    }
}

#[async_trait]
impl Plugin for SpritesPlugin {
    fn name(&self) -> &str {
        "sprites"
    }

    async fn run(
        &self,
        artifacts: &ArtifactSet,
        ctx: &TransformContext,
    ) -> Result<PluginOutput, AssetflowError> {
        let public_path = &ctx.config().output.public_path;
        let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for artifact in artifacts.iter() {
            let url = super::html::public_url(public_path, &artifact.name);
            for source in artifact.sources.iter().filter(|s| self.filter.is_match(s)) {
                let group = groups.entry(Self::group(source)).or_default();
                if group.last() != Some(&url) {
                    group.push(url.clone());
                }
            }
        }

        let json = serde_json::to_vec_pretty(&groups)?;
        Ok(PluginOutput::add(Artifact::generated(&self.filename, json)))
    }
}
