// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! HTML minification
//!
//! Shared by the `minify-html` step and the `html` plugin. Whitespace inside
//! `<pre>` and `<textarea>` is not preserved.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use super::{Transform, TransformContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

struct Patterns {
    comments: Regex,
    between_tags: Regex,
    runs: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        comments: Regex::new(r"(?s)<!--.*?-->").expect("static comment pattern"),
        between_tags: Regex::new(r">\s+<").expect("static tag pattern"),
        runs: Regex::new(r"\s{2,}").expect("static whitespace pattern"),
    })
}

/// Minify an HTML document
pub fn minify_html(html: &str, remove_comments: bool, collapse_whitespace: bool) -> String {
    let p = patterns();
    let mut out = html.to_string();
    if remove_comments {
        out = p.comments.replace_all(&out, "").into_owned();
    }
    if collapse_whitespace {
        out = p.between_tags.replace_all(&out, "><").into_owned();
        out = p.runs.replace_all(&out, " ").into_owned();
        out = out.trim().to_string();
    }
    out
}

/// Minifies HTML assets
pub struct MinifyHtmlStep {
    remove_comments: bool,
    collapse_whitespace: bool,
}

impl MinifyHtmlStep {
    pub fn new(remove_comments: bool, collapse_whitespace: bool) -> Self {
        Self {
            remove_comments,
            collapse_whitespace,
        }
    }
}

#[async_trait]
impl Transform for MinifyHtmlStep {
    fn name(&self) -> &str {
        "minify-html"
    }

    fn fingerprint(&self) -> String {
        format!(
            "minify-html(remove_comments={},collapse_whitespace={})",
            self.remove_comments, self.collapse_whitespace
        )
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        let text = asset.text(self.name())?;
        Ok(TransformOutput::content(minify_html(
            text,
            self.remove_comments,
            self.collapse_whitespace,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_html() {
        let html =
            "<html>\n  <!-- nav -->\n  <body>\n    <p>Hello   world</p>\n  </body>\n</html>\n";
        assert_eq!(
            minify_html(html, true, true),
            "<html><body><p>Hello world</p></body></html>"
        );
    }

    #[test]
    fn test_minify_html_keeps_comments() {
        let html = "<p>a</p> <!-- keep -->";
        assert_eq!(minify_html(html, false, true), "<p>a</p><!-- keep -->");
    }
}
