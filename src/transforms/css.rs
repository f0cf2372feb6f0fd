// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Stylesheet steps: import discovery and minification

use async_trait::async_trait;
use regex::Regex;

use super::{Transform, TransformContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Records `@import` targets as dependencies of the stylesheet
pub struct CssImportsStep {
    pattern: Regex,
}

impl CssImportsStep {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r#"@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?[^;]*;"#,
            )
            .expect("static import pattern"),
        }
    }

    /// Import targets in declaration order, relative ones resolved
    pub fn imports(&self, asset_id: &str, text: &str) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for cap in self.pattern.captures_iter(text) {
            let dep = resolve_import(asset_id, &cap[1]);
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }
}

impl Default for CssImportsStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transform for CssImportsStep {
    fn name(&self) -> &str {
        "css-imports"
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        let text = asset.text(self.name())?;
        let deps = self.imports(&asset.id, text);
        Ok(TransformOutput::content(asset.content.clone()).with_dependencies(deps))
    }
}

/// Resolve a relative import against the importing asset's directory
///
/// URLs and root-relative paths are kept as written.
fn resolve_import(asset_id: &str, target: &str) -> String {
    if target.contains("://") || target.starts_with('/') || target.starts_with("data:") {
        return target.to_string();
    }

    let mut segments: Vec<&str> = match asset_id.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Strips comments and collapses whitespace
pub struct MinifyCssStep {
    remove_comments: bool,
    collapse_whitespace: bool,
    comments: Regex,
    whitespace: Regex,
    punctuation: Regex,
}

impl MinifyCssStep {
    pub fn new(remove_comments: bool, collapse_whitespace: bool) -> Self {
        Self {
            remove_comments,
            collapse_whitespace,
            comments: Regex::new(r"(?s)/\*.*?\*/").expect("static comment pattern"),
            whitespace: Regex::new(r"\s+").expect("static whitespace pattern"),
            punctuation: Regex::new(r"\s*([{};,>])\s*").expect("static punctuation pattern"),
        }
    }

    /// Minify stylesheet text
    pub fn minify(&self, css: &str) -> String {
        let mut out = css.to_string();
        if self.remove_comments {
            out = self.comments.replace_all(&out, "").into_owned();
        }
        if self.collapse_whitespace {
            out = self.whitespace.replace_all(&out, " ").into_owned();
            out = self.punctuation.replace_all(&out, "$1").into_owned();
            out = out.replace(";}", "}");
            out = out.trim().to_string();
        }
        out
    }
}

#[async_trait]
impl Transform for MinifyCssStep {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn fingerprint(&self) -> String {
        format!(
            "minify-css(remove_comments={},collapse_whitespace={})",
            self.remove_comments, self.collapse_whitespace
        )
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        let text = asset.text(self.name())?;
        Ok(TransformOutput::content(self.minify(text)))
    }
}
