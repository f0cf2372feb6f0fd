// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! HTML document generation
//!
//! Renders a page that references every emitted stylesheet and script.
//! Stylesheets always go into `<head>`; scripts go where `inject` says.
//! A configured favicon is copied into the output under its file name and
//! linked from `<head>` whatever the inject position.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{Plugin, PluginOutput};
use crate::config::{HtmlMinifyConfig, InjectPosition};
use crate::errors::AssetflowError;
use crate::pipeline::{Artifact, ArtifactSet};
use crate::transforms::{minify_html, TransformContext};

const DEFAULT_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>{{title}}</title>
</head>
<body>
</body>
</html>
";

pub struct HtmlPlugin {
    title: String,
    template: Option<PathBuf>,
    filename: String,
    inject: InjectPosition,
    minify: Option<HtmlMinifyConfig>,
    favicon: Option<PathBuf>,
}

impl HtmlPlugin {
    pub fn new(
        title: String,
        template: Option<PathBuf>,
        filename: String,
        inject: InjectPosition,
        minify: Option<HtmlMinifyConfig>,
    ) -> Self {
        Self {
            title,
            template,
            filename,
            inject,
            minify,
            favicon: None,
        }
    }

    /// Copy `path` into the output and link it as the page icon
    pub fn with_favicon(mut self, path: PathBuf) -> Self {
        self.favicon = Some(path);
        self
    }

    /// Output name of the favicon
    fn favicon_name(&self) -> Option<String> {
        let path = self.favicon.as_ref()?;
        Some(path.file_name()?.to_string_lossy().into_owned())
    }

    async fn load_favicon(
        &self,
        ctx: &TransformContext,
    ) -> Result<Option<Artifact>, AssetflowError> {
        let (Some(favicon), Some(name)) = (&self.favicon, self.favicon_name()) else {
            return Ok(None);
        };
        let path = ctx.base_dir().join(favicon);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| AssetflowError::FileReadError {
                path,
                error: e.to_string(),
            })?;
        Ok(Some(Artifact::generated(name, content)))
    }

    async fn load_template(&self, ctx: &TransformContext) -> Result<String, AssetflowError> {
        let Some(template) = &self.template else {
            return Ok(DEFAULT_TEMPLATE.to_string());
        };
        let path = ctx.base_dir().join(template);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AssetflowError::FileReadError {
                path,
                error: e.to_string(),
            })
    }

    /// Render the document for an artifact set
    pub fn render(&self, template: &str, artifacts: &ArtifactSet, public_path: &str) -> String {
        let mut styles = Vec::new();
        let mut scripts = Vec::new();
        for artifact in artifacts.iter() {
            let url = public_url(public_path, &artifact.name);
            match artifact.extension() {
                Some("css") => styles.push(format!("<link href=\"{}\" rel=\"stylesheet\">", url)),
                Some("js") => scripts.push(format!("<script src=\"{}\"></script>", url)),
                _ => {}
            }
        }

        let mut html = template.replace("{{title}}", &self.title);
        if let Some(name) = self.favicon_name() {
            let url = public_url(public_path, &name);
            let icon = format!("<link rel=\"icon\" href=\"{}\">", url);
            html = inject_before(&html, "</head>", &[icon]);
        }
        match self.inject {
            InjectPosition::None => {}
            InjectPosition::Head => {
                styles.append(&mut scripts);
                html = inject_before(&html, "</head>", &styles);
            }
            InjectPosition::Body => {
                html = inject_before(&html, "</head>", &styles);
                html = inject_before(&html, "</body>", &scripts);
            }
        }

        match self.minify {
            Some(opts) => minify_html(&html, opts.remove_comments, opts.collapse_whitespace),
            None => html,
        }
    }
}

#[async_trait]
impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "html"
    }

    async fn run(
        &self,
        artifacts: &ArtifactSet,
        ctx: &TransformContext,
    ) -> Result<PluginOutput, AssetflowError> {
        let template = self.load_template(ctx).await?;
        let favicon = self.load_favicon(ctx).await?;
        let html = self.render(&template, artifacts, &ctx.config().output.public_path);

        let mut output = PluginOutput::add(Artifact::generated(&self.filename, html));
        output.added.extend(favicon);
        Ok(output)
    }
}

/// Join the public path and an output name
pub(crate) fn public_url(public_path: &str, name: &str) -> String {
    if public_path.is_empty() || public_path.ends_with('/') {
        format!("{}{}", public_path, name)
    } else {
        format!("{}/{}", public_path, name)
    }
}

/// Insert tag lines before the first `marker`, or at the end without one
fn inject_before(html: &str, marker: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    let block = tags.join("\n");
    match html.find(marker) {
        Some(pos) => format!("{}{}\n{}", &html[..pos], block, &html[pos..]),
        None => format!("{}{}\n", html, block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Asset;
    use crate::transforms::test_support::context;

    fn artifacts() -> ArtifactSet {
        let mut set = ArtifactSet::new();
        for (name, id) in [
            ("app.js", "app/main.js"),
            ("app.css", "app/main.css"),
            ("images/logo.png", "img/logo.png"),
        ] {
            set.insert(Artifact::from_asset(name.into(), Asset::new(id, name)))
                .unwrap();
        }
        set
    }

    fn context_in(dir: &std::path::Path) -> TransformContext {
        let config = crate::config::PipelineConfig::from_value(serde_json::json!({ "name": "t" }));
        TransformContext::new(std::sync::Arc::new(config.unwrap()), dir.to_path_buf())
    }

    fn plugin(inject: InjectPosition, minify: Option<HtmlMinifyConfig>) -> HtmlPlugin {
        HtmlPlugin::new("Web IM".into(), None, "index.html".into(), inject, minify)
    }

    #[test]
    fn test_render_default_template() {
        let html = plugin(InjectPosition::Body, None).render(DEFAULT_TEMPLATE, &artifacts(), "/");

        insta::assert_snapshot!(html, @r###"
        <!DOCTYPE html>
        <html>
        <head>
        <meta charset="utf-8">
        <title>Web IM</title>
        <link href="/app.css" rel="stylesheet">
        </head>
        <body>
        <script src="/app.js"></script>
        </body>
        </html>
        "###);
    }

    #[test]
    fn test_inject_head_and_none() {
        let set = artifacts();

        let head = plugin(InjectPosition::Head, None).render(DEFAULT_TEMPLATE, &set, "/static");
        let head_end = head.find("</head>").unwrap();
        assert!(head.find("<script src=\"/static/app.js\">").unwrap() < head_end);

        let none = plugin(InjectPosition::None, None).render(DEFAULT_TEMPLATE, &set, "/");
        assert!(!none.contains("<script"));
        assert!(!none.contains("<link"));
    }

    #[test]
    fn test_minified_output() {
        let minify = HtmlMinifyConfig {
            remove_comments: true,
            collapse_whitespace: true,
        };
        let html = plugin(InjectPosition::Body, Some(minify)).render(
            "<html><head></head>\n<!-- x -->\n<body>\n</body></html>",
            &artifacts(),
            "",
        );
        assert_eq!(
            html,
            "<html><head><link href=\"app.css\" rel=\"stylesheet\"></head><body><script src=\"app.js\"></script></body></html>"
        );
    }

    #[tokio::test]
    async fn test_template_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("page.html"),
            "<head><title>{{title}}</title></head><body></body>",
        )
        .unwrap();

        let ctx = context_in(dir.path());
        let plugin = HtmlPlugin::new(
            "Docs".into(),
            Some(PathBuf::from("page.html")),
            "docs.html".into(),
            InjectPosition::Body,
            None,
        );

        let out = plugin.run(&artifacts(), &ctx).await.unwrap();
        let html = String::from_utf8(out.added[0].content.clone()).unwrap();
        assert_eq!(
            html,
            "<head><title>Docs</title><link href=\"/app.css\" rel=\"stylesheet\">\n</head><body><script src=\"/app.js\"></script>\n</body>"
        );
        assert_eq!(out.added[0].name, "docs.html");

        let missing = HtmlPlugin::new(
            "Docs".into(),
            Some(PathBuf::from("nope.html")),
            "docs.html".into(),
            InjectPosition::Body,
            None,
        );
        assert!(matches!(
            missing.run(&artifacts(), &context("production")).await,
            Err(AssetflowError::FileReadError { .. })
        ));
    }

    #[tokio::test]
    async fn test_favicon_copied_and_linked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/favicon.ico"), [0u8, 0, 1, 0]).unwrap();

        let ctx = context_in(dir.path());
        let plugin = plugin(InjectPosition::None, None)
            .with_favicon(PathBuf::from("assets/favicon.ico"));

        let out = plugin.run(&artifacts(), &ctx).await.unwrap();
        assert_eq!(out.added.len(), 2);
        assert_eq!(out.added[1].name, "favicon.ico");
        assert_eq!(out.added[1].content, vec![0u8, 0, 1, 0]);

        let html = String::from_utf8(out.added[0].content.clone()).unwrap();
        let icon = html.find("<link rel=\"icon\" href=\"/favicon.ico\">").unwrap();
        assert!(icon < html.find("</head>").unwrap());

        let missing = plugin.with_favicon(PathBuf::from("assets/missing.ico"));
        assert!(matches!(
            missing.run(&artifacts(), &ctx).await,
            Err(AssetflowError::FileReadError { .. })
        ));
    }
}
