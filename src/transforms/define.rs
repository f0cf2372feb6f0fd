// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Global constant injection
//!
//! Replaces identifiers such as `__DEV__` or `process.env.NODE_ENV` with the
//! JSON literal of their configured value. Matching is textual on identifier
//! boundaries; string contents are not special-cased.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{Transform, TransformContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Replaces global constant identifiers with literals
pub struct DefineStep {
    literals: BTreeMap<String, String>,
    pattern: Option<Regex>,
}

impl DefineStep {
    /// Merge pipeline globals with step-local ones (step-local wins)
    pub fn new(
        globals: &BTreeMap<String, Value>,
        local: &BTreeMap<String, Value>,
    ) -> Result<Self, AssetflowError> {
        let mut literals = BTreeMap::new();
        for (name, value) in globals.iter().chain(local.iter()) {
            literals.insert(name.clone(), value.to_string());
        }

        if let Some(bad) = literals.keys().find(|k| !is_identifier_path(k)) {
            return Err(AssetflowError::invalid_config(format!(
                "define: '{}' is not an identifier",
                bad
            )));
        }

        // Longest first so `a.b.c` wins over `a.b`
        let mut names: Vec<&String> = literals.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let pattern = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        Ok(Self { literals, pattern })
    }

    /// Apply the replacement to text
    pub fn replace(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in pattern.find_iter(text) {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            if before.is_some_and(|c| is_ident_char(c) || c == '.')
                || after.is_some_and(is_ident_char)
            {
                continue;
            }
            out.push_str(&text[last..m.start()]);
            out.push_str(&self.literals[m.as_str()]);
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

#[async_trait]
impl Transform for DefineStep {
    fn name(&self) -> &str {
        "define"
    }

    fn fingerprint(&self) -> String {
        let defs: Vec<String> = self
            .literals
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("define({})", defs.join(","))
    }

    async fn apply(
        &self,
        asset: &Asset,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        let text = asset.text(self.name())?;
        Ok(TransformOutput::content(self.replace(text)))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_identifier_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|seg| {
            let mut chars = seg.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                && chars.all(is_ident_char)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::test_support::context;
    use serde_json::json;

    fn globals(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_replaces_on_identifier_boundaries() {
        let step = DefineStep::new(
            &globals(json!({ "__DEV__": true, "process.env.NODE_ENV": "production" })),
            &BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(
            step.replace("if (__DEV__ && process.env.NODE_ENV !== 'x') {}"),
            "if (true && \"production\" !== 'x') {}"
        );
        assert_eq!(step.replace("my__DEV__ + __DEV__x"), "my__DEV__ + __DEV__x");
        assert_eq!(step.replace("obj.__DEV__"), "obj.__DEV__");
        assert_eq!(step.replace("[__DEV__,__DEV__]"), "[true,true]");
    }

    #[test]
    fn test_local_overrides_global() {
        let step = DefineStep::new(
            &globals(json!({ "__API__": "/api" })),
            &globals(json!({ "__API__": "/v2" })),
        )
        .unwrap();

        assert_eq!(step.replace("fetch(__API__)"), "fetch(\"/v2\")");
        assert!(step.fingerprint().contains("__API__=\"/v2\""));
    }

    #[test]
    fn test_rejects_non_identifiers() {
        let err = DefineStep::new(&globals(json!({ "a b": 1 })), &BTreeMap::new());
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_apply_requires_utf8() {
        let step = DefineStep::new(&BTreeMap::new(), &BTreeMap::new()).unwrap();
        let asset = Asset::new("bad.js", vec![0xff, 0xfe]);

        let err = step.apply(&asset, &context("development")).await.unwrap_err();
        assert_eq!(err.step(), Some("define"));
    }
}
