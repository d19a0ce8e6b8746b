//! gktask command-line driver
//!
//! Loads a generation plan, feeds each case through the
//! [`Generator`](gktask_manifest::Generator) and writes the rewritten
//! documents plus a JSON run summary.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod output;
pub mod plan;

pub use output::{rewrite_plan, OutputError, RunSummary};
pub use plan::{Plan, PlanError};

use gktask_manifest::{ConfigError, GeneratorConfig};
use std::path::Path;

/// Load generator configuration
///
/// No path means defaults.
///
/// # Errors
/// Returns error if the file cannot be read or is invalid
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig, ConfigError> {
    match path {
        Some(path) => GeneratorConfig::from_file(path),
        None => Ok(GeneratorConfig::default()),
    }
}
