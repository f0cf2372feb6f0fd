// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! JSON normalization

use async_trait::async_trait;
use serde_json::Value;

use super::{Transform, TransformContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Parses JSON and re-emits it compact or pretty
pub struct JsonStep {
    pretty: bool,
}

impl JsonStep {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

#[async_trait]
impl Transform for JsonStep {
    fn name(&self) -> &str {
        "json"
    }

    fn fingerprint(&self) -> String {
        format!("json(pretty={})", self.pretty)
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        let value: Value = serde_json::from_slice(&asset.content)
            .map_err(|e| AssetflowError::transform(&asset.id, self.name(), e))?;

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| AssetflowError::transform(&asset.id, self.name(), e))?;

        Ok(TransformOutput::content(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::transforms::test_support::context;

    #[tokio::test]
    async fn test_compacts_json() {
        let asset = Asset::new("data/locale.json", "{\n  \"a\": [1, 2]\n}\n");
        let out = JsonStep::new(false)
            .apply(&asset, &context("production"))
            .await
            .unwrap();

        assert_eq!(out.content, br#"{"a":[1,2]}"#);
    }

    #[tokio::test]
    async fn test_invalid_json_is_transform_error() {
        let asset = Asset::new("data/broken.json", "{ nope");
        let err = JsonStep::new(true)
            .apply(&asset, &context("production"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transform);
        assert_eq!(err.asset(), Some("data/broken.json"));
    }
}
