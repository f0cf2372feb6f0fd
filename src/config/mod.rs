// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline configuration
//!
//! Loading (YAML, JSON, TOML), environment resolution into the frozen
//! [`PipelineConfig`], and validation.

mod definition;
pub mod environment;
mod loader;
mod validation;

pub use definition::*;
pub use environment::{EnvironmentResolver, DEFAULT_ENVIRONMENT};
pub use loader::{RawConfig, DEFAULT_CONFIG_FILE};
pub use validation::{PipelineValidator, ValidationResult};
