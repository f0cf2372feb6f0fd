// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Assets and artifacts
//!
//! An [`Asset`] is one discovered input flowing through a transform chain.
//! An [`Artifact`] is a named output. The [`ArtifactSet`] collects artifacts
//! for one build run and only ever grows, except for explicit reassignment.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use crate::errors::AssetflowError;

/// One discrete input unit flowing through the pipeline
#[derive(Debug, Clone)]
pub struct Asset {
    /// Logical path, always `/`-separated
    pub id: String,
    /// Current content
    pub content: Vec<u8>,
    /// Metadata accumulated by transform steps
    pub metadata: AssetMetadata,
}

impl Asset {
    /// Create a freshly discovered asset
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: AssetMetadata::default(),
        }
    }

    /// Content as UTF-8, or a transform failure naming `step`
    pub fn text(&self, step: &str) -> Result<&str, AssetflowError> {
        std::str::from_utf8(&self.content)
            .map_err(|e| AssetflowError::transform(&self.id, step, format!("not UTF-8: {}", e)))
    }
}

/// Metadata accumulated along a transform chain
///
/// Steps only ever add to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Declared dependency edges (other asset identifiers or URLs)
    pub dependencies: Vec<String>,
    /// Source-map chain, one fragment per step when enabled
    pub source_map: Vec<SourceMapFragment>,
}

impl AssetMetadata {
    /// Append another metadata block, skipping duplicate dependencies
    pub fn extend(&mut self, other: AssetMetadata) {
        for dep in other.dependencies {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self.source_map.extend(other.source_map);
    }
}

/// One link of a source-map chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapFragment {
    /// Step that produced this link
    pub step: String,
    /// Digest of the content the step received
    pub input: String,
    /// Digest of the content the step produced
    pub output: String,
    /// Step-specific mapping data, if the step provides any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<String>,
}

/// Stage an asset is in while flowing through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStage {
    Matching,
    Transforming,
    Naming,
}

impl std::fmt::Display for AssetStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matching => write!(f, "matching"),
            Self::Transforming => write!(f, "transforming"),
            Self::Naming => write!(f, "naming"),
        }
    }
}

/// A named output of the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Output name relative to the output directory
    pub name: String,
    /// Final content
    pub content: Vec<u8>,
    /// Source identifiers that produced this output, sorted and unique;
    /// empty for artifacts generated by plugins or by the pipeline
    pub sources: Vec<String>,
    /// Metadata of the asset this artifact came from
    pub metadata: AssetMetadata,
}

impl Artifact {
    /// Artifact produced from a source asset
    pub fn from_asset(name: String, asset: Asset) -> Self {
        Self {
            name,
            content: asset.content,
            sources: vec![asset.id],
            metadata: asset.metadata,
        }
    }

    /// Side artifact generated by a plugin or by the pipeline itself
    pub fn generated(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            sources: Vec::new(),
            metadata: AssetMetadata::default(),
        }
    }

    /// Whether no source asset backs this artifact
    pub fn is_generated(&self) -> bool {
        self.sources.is_empty()
    }

    /// File extension of the output name, without the dot
    pub fn extension(&self) -> Option<&str> {
        let file = self.name.rsplit('/').next().unwrap_or(&self.name);
        file.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// Ordered, append-only set of artifacts keyed by output name
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: BTreeMap<String, Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact produced by an asset chain
    ///
    /// Identical content under the same name is deduplicated and the sources
    /// are merged; different content under the same name is a collision.
    /// The result does not depend on insertion order.
    pub fn insert(&mut self, mut artifact: Artifact) -> Result<(), AssetflowError> {
        artifact.sources.sort();
        artifact.sources.dedup();

        let existing = match self.artifacts.entry(artifact.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(artifact);
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if existing.content != artifact.content {
            return Err(AssetflowError::NameCollision {
                name: artifact.name.clone(),
                first: describe_origin(existing),
                second: describe_origin(&artifact),
            });
        }

        // Metadata of the lowest source identifier wins
        let incoming_first = artifact.sources.first();
        if incoming_first.is_some()
            && (existing.sources.is_empty() || incoming_first < existing.sources.first())
        {
            existing.metadata = artifact.metadata;
        }
        existing.sources.extend(artifact.sources);
        existing.sources.sort();
        existing.sources.dedup();
        Ok(())
    }

    /// Apply one plugin's output
    ///
    /// Every addition must use a fresh name and every reassignment must name
    /// an existing artifact. Nothing is committed unless all of them do.
    pub fn apply(
        &mut self,
        plugin: &str,
        added: Vec<Artifact>,
        reassigned: Vec<Artifact>,
    ) -> Result<(), AssetflowError> {
        let mut fresh = HashSet::new();
        for artifact in &added {
            if self.artifacts.contains_key(&artifact.name) || !fresh.insert(&artifact.name) {
                return Err(AssetflowError::ArtifactConflict {
                    plugin: plugin.to_string(),
                    name: artifact.name.clone(),
                });
            }
        }
        if let Some(unknown) = reassigned
            .iter()
            .find(|a| !self.artifacts.contains_key(&a.name))
        {
            return Err(AssetflowError::UnknownArtifact {
                plugin: plugin.to_string(),
                name: unknown.name.clone(),
            });
        }

        for artifact in added.into_iter().chain(reassigned) {
            self.artifacts.insert(artifact.name.clone(), artifact);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Artifacts in name order
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Output names in order
    pub fn names(&self) -> Vec<&str> {
        self.artifacts.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Total content size in bytes
    pub fn total_size(&self) -> u64 {
        self.artifacts.values().map(|a| a.content.len() as u64).sum()
    }
}

fn describe_origin(artifact: &Artifact) -> String {
    if artifact.is_generated() {
        "<generated>".to_string()
    } else {
        artifact.sources.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accumulates() {
        let mut meta = AssetMetadata {
            dependencies: vec!["a.css".into()],
            source_map: vec![],
        };
        meta.extend(AssetMetadata {
            dependencies: vec!["a.css".into(), "b.css".into()],
            source_map: vec![],
        });

        assert_eq!(meta.dependencies, vec!["a.css", "b.css"]);
    }

    #[test]
    fn test_insert_dedupes_identical_content() {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::from_asset("x.js".into(), Asset::new("a.js", "1")))
            .unwrap();
        set.insert(Artifact::from_asset("x.js".into(), Asset::new("b.js", "1")))
            .unwrap();
        assert_eq!(set.len(), 1);

        let err = set
            .insert(Artifact::from_asset("x.js".into(), Asset::new("c.js", "2")))
            .unwrap_err();
        assert!(matches!(err, AssetflowError::NameCollision { .. }));
    }

    #[test]
    fn test_dedupe_merges_sources_in_any_order() {
        let build = |order: [&str; 2]| {
            let mut set = ArtifactSet::new();
            for id in order {
                let mut asset = Asset::new(id, "same");
                asset.metadata.dependencies.push(format!("{id}.dep"));
                set.insert(Artifact::from_asset("83fe8257.png".into(), asset))
                    .unwrap();
            }
            set
        };

        let forward = build(["a/x.png", "b/x.png"]);
        let backward = build(["b/x.png", "a/x.png"]);
        for set in [&forward, &backward] {
            let artifact = set.get("83fe8257.png").unwrap();
            assert_eq!(artifact.sources, vec!["a/x.png", "b/x.png"]);
            assert_eq!(artifact.metadata.dependencies, vec!["a/x.png.dep"]);
        }
    }

    #[test]
    fn test_apply_rejects_existing_name() {
        let mut set = ArtifactSet::new();
        set.apply("html", vec![Artifact::generated("index.html", "a")], vec![])
            .unwrap();

        let err = set
            .apply("manifest", vec![Artifact::generated("index.html", "b")], vec![])
            .unwrap_err();
        assert!(matches!(err, AssetflowError::ArtifactConflict { .. }));
        assert_eq!(set.get("index.html").unwrap().content, b"a");
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::generated("taken.txt", "old")).unwrap();

        let err = set
            .apply(
                "emit",
                vec![
                    Artifact::generated("fresh.txt", "1"),
                    Artifact::generated("taken.txt", "2"),
                ],
                vec![],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AssetflowError::ArtifactConflict { ref name, .. } if name == "taken.txt"
        ));
        assert!(!set.contains("fresh.txt"));

        let err = set
            .apply(
                "emit",
                vec![Artifact::generated("twice.txt", "1"), Artifact::generated("twice.txt", "2")],
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, AssetflowError::ArtifactConflict { .. }));
        assert!(!set.contains("twice.txt"));
    }

    #[test]
    fn test_reassign_requires_existing_name() {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::generated("app.js", "run()")).unwrap();

        let err = set
            .apply(
                "sneaky",
                vec![Artifact::generated("ok.txt", "1")],
                vec![Artifact::generated("new.js", "x")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AssetflowError::UnknownArtifact { ref name, .. } if name == "new.js"
        ));
        assert!(!set.contains("new.js"));
        assert!(!set.contains("ok.txt"));

        set.apply("banner", vec![], vec![Artifact::generated("app.js", "/* b */run()")])
            .unwrap();
        assert_eq!(set.get("app.js").unwrap().content, b"/* b */run()");
    }

    #[test]
    fn test_extension() {
        assert_eq!(Artifact::generated("css/app.1234.css", "").extension(), Some("css"));
        assert_eq!(Artifact::generated("v1.2/LICENSE", "").extension(), None);
    }
}
