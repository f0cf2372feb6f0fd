// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline core
//!
//! Assets, rule matching, transform chains, output naming and the executor
//! that drives a build run.

mod asset;
mod chain;
mod compiled;
mod executor;
mod matcher;
mod naming;

pub use asset::{Artifact, ArtifactSet, Asset, AssetMetadata, AssetStage, SourceMapFragment};
pub use chain::run_chain;
pub use compiled::{AssetPlan, Pipeline};
pub use executor::{BuildResult, BuildStats, ExecutionOptions, PipelineExecutor, RunState};
pub use matcher::{match_rule, Rule, RuleMatcher};
pub use naming::{NamingTemplate, OutputNamer};
