//! Subcommand implementations

pub mod discover;
pub mod manual;
pub mod measure;
pub mod report;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::ToolDescriptor;
use tpbench_core::infrastructure::CatalogStore;

/// Open the pattern library, preferring the command-line override.
pub fn open_store(override_path: Option<&PathBuf>, config: &Config) -> Result<CatalogStore> {
    let tp_lib = override_path.unwrap_or(&config.library.tp_lib);
    CatalogStore::new(tp_lib).with_context(|| format!("opening pattern library {}", tp_lib.display()))
}

/// Output directory, preferring the command-line override.
pub fn output_dir(override_path: Option<&PathBuf>, config: &Config) -> PathBuf {
    override_path.cloned().unwrap_or_else(|| config.library.output_dir.clone())
}

/// Parse `name:version` tool descriptors.
pub fn parse_tools(raw: &[String]) -> Result<Vec<ToolDescriptor>> {
    raw.iter()
        .map(|s| ToolDescriptor::from_str(s).map_err(anyhow::Error::msg))
        .collect()
}

/// Requested pattern ids, or the whole language when `--all` is given.
pub fn resolve_patterns(
    store: &CatalogStore,
    language: &tpbench_core::domain::value_objects::Language,
    patterns: &[u32],
    all: bool,
) -> Result<Vec<u32>> {
    if all {
        Ok(store.list_patterns(language)?)
    } else {
        Ok(patterns.to_vec())
    }
}
