// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline executor
//!
//! Runs one build: every asset's chain in a bounded worker pool, then the
//! plugin hooks over the complete artifact set. The first failure cancels
//! outstanding work; artifacts that already completed are kept.
//!
//! Source maps are assembled after the barrier, one per emitted name, so
//! deduplicated sources share a single map listing each chain.

use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{
    run_chain, Artifact, ArtifactSet, Asset, AssetStage, OutputNamer, Pipeline, Rule,
    SourceMapFragment,
};
use crate::cache::{Cache, CachedChain, ContentHasher};
use crate::config::UnmatchedPolicy;
use crate::errors::AssetflowError;

/// Build run options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Skip cache lookups and stores
    pub no_cache: bool,
    /// Worker pool size, overriding the config
    pub jobs: Option<usize>,
}

/// Lifecycle of a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Configured,
    Processing,
    Finalizing,
    Finalized,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Configured => "configured",
            Self::Processing => "processing",
            Self::Finalizing => "finalizing",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Assets handed to the run
    pub assets: usize,
    /// Chains actually executed
    pub transformed: usize,
    /// Chains served from the cache
    pub cached: usize,
    /// Unmatched assets emitted unchanged
    pub passthrough: usize,
    /// Unmatched assets dropped
    pub skipped: usize,
}

/// Outcome of a build run
#[derive(Debug)]
pub struct BuildResult {
    /// Artifacts that completed, including plugin output on success
    pub artifacts: ArtifactSet,
    /// First failure, if the run failed
    pub error: Option<AssetflowError>,
    pub state: RunState,
    pub duration: Duration,
    pub stats: BuildStats,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The finalized artifacts, or the first error
    pub fn into_result(self) -> Result<ArtifactSet, AssetflowError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.artifacts),
        }
    }
}

/// What a worker produced for one asset
enum Outcome {
    Emitted {
        artifact: Artifact,
        /// Chain fragments, present when source maps are on
        source_map: Option<Vec<SourceMapFragment>>,
        cached: bool,
        passthrough: bool,
    },
    Skipped,
}

/// Chain fragments per source, grouped by emitted name
type SourceMaps = BTreeMap<String, BTreeMap<String, Vec<SourceMapFragment>>>;

/// Pipeline executor
pub struct PipelineExecutor {
    cache: Option<Arc<dyn Cache>>,
    progress: Option<ProgressBar>,
}

impl PipelineExecutor {
    /// Create a new pipeline executor
    pub fn new() -> Self {
        Self {
            cache: None,
            progress: None,
        }
    }

    /// Set the cache layer
    pub fn with_cache(mut self, cache: Box<dyn Cache>) -> Self {
        self.cache = Some(Arc::from(cache));
        self
    }

    /// Report per-asset progress on a bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run every asset through the pipeline, then the plugin hooks
    pub async fn execute(
        &self,
        pipeline: Arc<Pipeline>,
        assets: Vec<Asset>,
        options: &ExecutionOptions,
    ) -> BuildResult {
        let start = Instant::now();
        let mut state = RunState::Init;
        let mut stats = BuildStats {
            assets: assets.len(),
            ..Default::default()
        };

        transition(&mut state, RunState::Configured);
        let workers = options
            .jobs
            .or(pipeline.config().workers)
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1);
        let cache = if options.no_cache {
            None
        } else {
            self.cache.clone()
        };
        if let Some(pb) = &self.progress {
            pb.set_length(assets.len() as u64);
        }

        transition(&mut state, RunState::Processing);
        debug!(workers, assets = assets.len(), "spawning asset chains");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();
        for asset in assets {
            let pipeline = Arc::clone(&pipeline);
            let cache = cache.clone();
            let permit = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await.map_err(|e| AssetflowError::Io {
                    message: format!("worker pool closed: {}", e),
                })?;
                process_asset(&pipeline, cache.as_deref(), asset).await
            });
        }

        let mut artifacts = ArtifactSet::new();
        let mut source_maps = SourceMaps::new();
        let mut failure: Option<AssetflowError> = None;

        while let Some(joined) = join_set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => Err(AssetflowError::Io {
                    message: format!("asset worker panicked: {}", join_err),
                }),
            };

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }

            let result = outcome.and_then(|outcome| match outcome {
                Outcome::Emitted {
                    artifact,
                    source_map,
                    cached,
                    passthrough,
                } => {
                    if passthrough {
                        stats.passthrough += 1;
                    } else if cached {
                        stats.cached += 1;
                    } else {
                        stats.transformed += 1;
                    }
                    let name = artifact.name.clone();
                    let sources = artifact.sources.clone();
                    artifacts.insert(artifact)?;
                    if let Some(fragments) = source_map {
                        let chains = source_maps.entry(name).or_default();
                        for source in sources {
                            chains.insert(source, fragments.clone());
                        }
                    }
                    Ok(())
                }
                Outcome::Skipped => {
                    stats.skipped += 1;
                    Ok(())
                }
            });

            if let Err(err) = result {
                if failure.is_none() {
                    warn!(error = %err, "asset failed, cancelling outstanding work");
                    join_set.abort_all();
                    failure = Some(err);
                }
            }
        }

        if failure.is_none() {
            failure = insert_source_maps(&mut artifacts, source_maps).err();
        }

        if let Some(err) = failure {
            transition(&mut state, RunState::Failed);
            return BuildResult {
                artifacts,
                error: Some(err),
                state,
                duration: start.elapsed(),
                stats,
            };
        }

        transition(&mut state, RunState::Finalizing);
        let error = pipeline
            .plugins()
            .run(&mut artifacts, pipeline.context())
            .await
            .err();

        transition(
            &mut state,
            if error.is_some() {
                RunState::Failed
            } else {
                RunState::Finalized
            },
        );

        let duration = start.elapsed();
        info!(
            artifacts = artifacts.len(),
            transformed = stats.transformed,
            cached = stats.cached,
            elapsed_ms = duration.as_millis() as u64,
            "build finished"
        );

        BuildResult {
            artifacts,
            error,
            state,
            duration,
            stats,
        }
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "run state");
    *state = next;
}

/// Match, transform and name one asset
async fn process_asset(
    pipeline: &Pipeline,
    cache: Option<&dyn Cache>,
    asset: Asset,
) -> Result<Outcome, AssetflowError> {
    let id = asset.id.clone();
    let rule = pipeline
        .matcher()
        .find(&id)
        .map_err(|e| e.in_asset(&id, AssetStage::Matching))?;

    let Some(rule) = rule else {
        if pipeline.matcher().policy().unmatched == UnmatchedPolicy::Skip {
            debug!(asset = %id, "no rule matches, skipping");
            return Ok(Outcome::Skipped);
        }
        debug!(asset = %id, "no rule matches, passing through");
        let name = pipeline.namer().name(&id, &asset.content, None);
        return Ok(Outcome::Emitted {
            artifact: Artifact::from_asset(name, asset),
            source_map: None,
            cached: false,
            passthrough: true,
        });
    };

    debug!(asset = %id, rule = rule.name(), "matched");
    let (asset, cached) = transform_asset(pipeline, cache, rule, asset)
        .await
        .map_err(|e| e.in_asset(&id, AssetStage::Transforming))?;

    let name = pipeline
        .namer()
        .name(&asset.id, &asset.content, rule.naming());
    let source_map = (pipeline.config().source_maps && !asset.metadata.source_map.is_empty())
        .then(|| asset.metadata.source_map.clone());
    debug!(asset = %id, output = %name, "named");

    Ok(Outcome::Emitted {
        artifact: Artifact::from_asset(name, asset),
        source_map,
        cached,
        passthrough: false,
    })
}

/// Run the rule's chain, consulting the cache first
async fn transform_asset(
    pipeline: &Pipeline,
    cache: Option<&dyn Cache>,
    rule: &Rule,
    asset: Asset,
) -> Result<(Asset, bool), AssetflowError> {
    let ctx = pipeline.context();

    let Some(cache) = cache else {
        return Ok((run_chain(asset, rule.steps(), ctx).await?, false));
    };

    let mut fingerprints = rule.fingerprints();
    // fragments are only recorded with source maps on
    if ctx.source_maps() {
        fingerprints.push("source-maps".to_string());
    }
    let key = ContentHasher::chain_key(
        ctx.environment(),
        ctx.globals(),
        rule.name(),
        &fingerprints,
        &asset.id,
        &asset.content,
    );

    match cache.get(&key).await {
        Ok(Some(hit)) => {
            debug!(asset = %asset.id, "cache hit");
            return Ok((
                Asset {
                    id: asset.id,
                    content: hit.content,
                    metadata: hit.metadata,
                },
                true,
            ));
        }
        Ok(None) => {}
        Err(e) => debug!(asset = %asset.id, error = %e, "cache read failed, treating as miss"),
    }

    let out = run_chain(asset, rule.steps(), ctx).await?;

    let entry = CachedChain {
        asset: out.id.clone(),
        rule: rule.name().to_string(),
        content: out.content.clone(),
        metadata: out.metadata.clone(),
    };
    if let Err(e) = cache.store(&key, &entry).await {
        warn!(asset = %out.id, error = %e, "failed to store chain result");
    }

    Ok((out, false))
}

/// Add one `<name>.map` side artifact per emitted name
fn insert_source_maps(
    artifacts: &mut ArtifactSet,
    source_maps: SourceMaps,
) -> Result<(), AssetflowError> {
    for (name, chains) in source_maps {
        let first = chains.keys().next().cloned().unwrap_or_default();
        source_map_artifact(&name, chains)
            .and_then(|map| artifacts.insert(map))
            .map_err(|e| e.in_asset(&first, AssetStage::Naming))?;
    }
    Ok(())
}

/// Side artifact describing the transform chain of every source behind `name`
fn source_map_artifact(
    name: &str,
    chains: BTreeMap<String, Vec<SourceMapFragment>>,
) -> Result<Artifact, AssetflowError> {
    let map = serde_json::json!({
        "file": name,
        "sources": chains.keys().collect::<Vec<_>>(),
        "chains": chains,
    });
    Ok(Artifact::generated(
        OutputNamer::source_map_name(name),
        serde_json::to_vec_pretty(&map)?,
    ))
}
