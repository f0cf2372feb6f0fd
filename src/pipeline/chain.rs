// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Transform chain execution
//!
//! Steps of one chain run strictly in sequence; each step's output content
//! is the next step's input and metadata only accumulates.

use std::sync::Arc;
use tracing::debug;

use super::{Asset, AssetMetadata, SourceMapFragment};
use crate::cache::hash_bytes;
use crate::errors::AssetflowError;
use crate::transforms::{Transform, TransformContext};

/// Apply `steps` to `asset` in order
///
/// Fails fast: the first failing step aborts the chain and the error names
/// the asset and the step.
pub async fn run_chain(
    mut asset: Asset,
    steps: &[Arc<dyn Transform>],
    ctx: &TransformContext,
) -> Result<Asset, AssetflowError> {
    for step in steps {
        let output = step.apply(&asset, ctx).await.map_err(|e| match e {
            AssetflowError::TransformFailed { .. } => e,
            other => AssetflowError::transform(&asset.id, step.name(), other),
        })?;

        debug!(
            asset = %asset.id,
            step = step.name(),
            bytes_in = asset.content.len(),
            bytes_out = output.content.len(),
            "step applied"
        );

        let mut metadata = AssetMetadata {
            dependencies: output.dependencies,
            source_map: Vec::new(),
        };
        if ctx.source_maps() {
            metadata.source_map.push(SourceMapFragment {
                step: step.name().to_string(),
                input: hash_bytes(&asset.content),
                output: hash_bytes(&output.content),
                mappings: output.mappings,
            });
        }

        asset.content = output.content;
        asset.metadata.extend(metadata);
    }

    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{test_support::context, TransformOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Appends a marker and declares a dependency
    struct Append(&'static str);

    #[async_trait]
    impl Transform for Append {
        fn name(&self) -> &str {
            self.0
        }

        async fn apply(
            &self,
            asset: &Asset,
            _ctx: &TransformContext,
        ) -> Result<TransformOutput, AssetflowError> {
            let mut content = asset.content.clone();
            content.extend_from_slice(self.0.as_bytes());
            Ok(TransformOutput::content(content).with_dependencies(vec![format!("{}.dep", self.0)]))
        }
    }

    struct Fail;

    #[async_trait]
    impl Transform for Fail {
        fn name(&self) -> &str {
            "always-fails"
        }

        async fn apply(
            &self,
            _asset: &Asset,
            _ctx: &TransformContext,
        ) -> Result<TransformOutput, AssetflowError> {
            Err(AssetflowError::Io {
                message: "disk on fire".into(),
            })
        }
    }

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Transform for Count {
        fn name(&self) -> &str {
            "count"
        }

        async fn apply(
            &self,
            asset: &Asset,
            _ctx: &TransformContext,
        ) -> Result<TransformOutput, AssetflowError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TransformOutput::content(asset.content.clone()))
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order_and_metadata_accumulates() {
        let steps: Vec<Arc<dyn Transform>> = vec![Arc::new(Append("a")), Arc::new(Append("b"))];
        let asset = Asset::new("x.txt", "");

        let out = run_chain(asset, &steps, &context("production")).await.unwrap();
        assert_eq!(out.content, b"ab");
        assert_eq!(out.metadata.dependencies, vec!["a.dep", "b.dep"]);
        assert!(out.metadata.source_map.is_empty());
    }

    #[tokio::test]
    async fn test_failure_names_step_and_stops_chain() {
        let counter = Arc::new(AtomicUsize::new(0));
        let steps: Vec<Arc<dyn Transform>> = vec![
            Arc::new(Append("a")),
            Arc::new(Fail),
            Arc::new(Count(counter.clone())),
        ];

        let err = run_chain(Asset::new("x.txt", ""), &steps, &context("production"))
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some("always-fails"));
        assert_eq!(err.asset(), Some("x.txt"));
        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_source_map_chain_recorded() {
        let value = serde_json::json!({ "name": "t", "source_maps": true });
        let config = crate::config::PipelineConfig::from_value(value).unwrap();
        let ctx = TransformContext::new(Arc::new(config), std::path::PathBuf::from("."));

        let steps: Vec<Arc<dyn Transform>> = vec![Arc::new(Append("a")), Arc::new(Append("b"))];
        let out = run_chain(Asset::new("x.txt", ""), &steps, &ctx).await.unwrap();

        let chain = &out.metadata.source_map;
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].step, "a");
        assert_eq!(chain[0].input, hash_bytes(b""));
        assert_eq!(chain[0].output, chain[1].input);
        assert_eq!(chain[1].output, hash_bytes(b"ab"));
    }
}
