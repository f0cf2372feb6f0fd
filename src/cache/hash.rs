// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Content hashing for output names and cache keys
//!
//! Uses BLAKE3 for fast, deterministic content hashing.

use blake3::Hasher;
use serde_json::Value;
use std::collections::BTreeMap;

/// Incremental content hasher
pub struct ContentHasher {
    hasher: Hasher,
}

impl ContentHasher {
    /// Create a new content hasher
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Cache key for running one rule's chain over one asset
    ///
    /// Covers everything that can change the chain's output: environment,
    /// global constants, rule, step fingerprints, identifier and content.
    pub fn chain_key(
        environment: &str,
        globals: &BTreeMap<String, Value>,
        rule: &str,
        step_fingerprints: &[String],
        asset_id: &str,
        content: &[u8],
    ) -> String {
        let mut hasher = Self::new();
        hasher.field(environment.as_bytes());
        for (name, value) in globals {
            hasher.field(name.as_bytes());
            hasher.field(value.to_string().as_bytes());
        }
        hasher.field(rule.as_bytes());
        for fingerprint in step_fingerprints {
            hasher.field(fingerprint.as_bytes());
        }
        hasher.field(asset_id.as_bytes());
        hasher.update(content);
        hasher.finalize()
    }

    /// Hash a length-prefixed field so adjacent fields cannot run together
    fn field(&mut self, data: &[u8]) {
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
    }

    /// Hash arbitrary bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and get the hex digest
    pub fn finalize(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }

    /// Finalize and get the raw 32-byte digest
    pub fn finalize_bytes(self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex digest of a byte slice
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let hash1 = hash_bytes(b"hello");
        let hash2 = hash_bytes(b"hello");
        let hash3 = hash_bytes(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_chain_key_sensitivity() {
        let globals = BTreeMap::new();
        let steps = vec!["define".to_string()];
        let base = ContentHasher::chain_key("development", &globals, "js", &steps, "a.js", b"x");

        assert_eq!(
            base,
            ContentHasher::chain_key("development", &globals, "js", &steps, "a.js", b"x")
        );
        assert_ne!(
            base,
            ContentHasher::chain_key("production", &globals, "js", &steps, "a.js", b"x")
        );

        let mut dev = BTreeMap::new();
        dev.insert("__DEV__".to_string(), Value::Bool(true));
        assert_ne!(
            base,
            ContentHasher::chain_key("development", &dev, "js", &steps, "a.js", b"x")
        );
    }

    #[test]
    fn test_fields_do_not_run_together() {
        let globals = BTreeMap::new();
        let a = ContentHasher::chain_key("ab", &globals, "c", &[], "x", b"");
        let b = ContentHasher::chain_key("a", &globals, "bc", &[], "x", b"");
        assert_ne!(a, b);
    }
}
