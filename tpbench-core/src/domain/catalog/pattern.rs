//! Pattern entity

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::instance::Instance;
use crate::domain::value_objects::Language;

/// Verbatim mirror of a pattern metadata JSON file.
///
/// `instances` is the only mandatory key; everything else falls back to
/// values derived from the pattern directory name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relative paths to the instance metadata files
    pub instances: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A named group of equivalent code examples in a single language.
#[derive(Debug, Clone)]
pub struct Pattern {
    pattern_id: u32,
    name: String,
    language: Language,
    directory: PathBuf,
    meta: PatternMetadata,
    instances: Vec<Instance>,
}

impl Pattern {
    /// Assemble a pattern from its metadata and eagerly loaded instances.
    ///
    /// Every instance must already carry this pattern's id and language;
    /// a mismatch is a construction error, not something the engines are
    /// expected to tolerate.
    pub fn assemble(
        pattern_id: u32,
        meta: PatternMetadata,
        directory: PathBuf,
        language: Language,
        instances: Vec<Instance>,
    ) -> Result<Self, CatalogError> {
        if pattern_id == 0 {
            return Err(CatalogError::pattern_value("pattern_id must be positive"));
        }

        for instance in &instances {
            if instance.pattern_id() != pattern_id {
                return Err(CatalogError::pattern_value(format!(
                    "instance {} carries pattern id {} but belongs to pattern {}",
                    instance.instance_id(),
                    instance.pattern_id(),
                    pattern_id
                )));
            }
            if instance.language() != &language {
                return Err(CatalogError::pattern_value(format!(
                    "instance {} carries language {} but belongs to a {} pattern",
                    instance.instance_id(),
                    instance.language(),
                    language
                )));
            }
        }

        let dir_name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = meta
            .name
            .clone()
            .unwrap_or_else(|| name_from_dir(&dir_name));

        Ok(Self {
            pattern_id,
            name,
            language,
            directory,
            meta,
            instances,
        })
    }

    pub fn pattern_id(&self) -> u32 {
        self.pattern_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn family(&self) -> Option<&str> {
        self.meta.family.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.meta.tags
    }

    /// Inline description text, or the relative path of a Markdown file.
    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.meta.version.as_deref()
    }

    /// Absolute pattern directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Name of the pattern directory (e.g. `1_static_variables`).
    pub fn directory_name(&self) -> String {
        self.directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, instance_id: u32) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|i| i.instance_id() == instance_id)
    }

    /// The verbatim metadata, for re-serialisation.
    pub fn metadata(&self) -> &PatternMetadata {
        &self.meta
    }
}

/// Human name derived from a pattern directory: the part after the numeric
/// prefix, with underscores as spaces.
fn name_from_dir(dir_name: &str) -> String {
    let rest = dir_name
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(dir_name);
    rest.replace('_', " ")
}
