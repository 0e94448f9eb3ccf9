//! Pattern instance entity
//!
//! An instance is one concrete code example of a pattern, together with an
//! expectation about how a correct SAST tool behaves on it and an optional
//! discovery rule for finding similar code in a target application.
//!
//! Path attributes (code, discovery rule, compile artefacts, expectation
//! sink/source files) are stored relative to the instance directory exactly
//! as the metadata file records them; every accessor resolves them against
//! the current directory root, so moving the directory only has to update
//! that single root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use crate::domain::value_objects::{rule_extension_for, Language};

/// Accuracy classification of a discovery rule, as curated by the
/// catalogue maintainers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAccuracy {
    Perfect,
    #[serde(rename = "FP")]
    FalsePositives,
    #[serde(rename = "FN")]
    FalseNegatives,
    #[serde(rename = "FPFN")]
    FalsePositivesAndNegatives,
}

/// Expected SAST behaviour on an instance.
///
/// `expectation` is `true` when a correct tool reports a finding matching
/// the type/sink fields, `false` when it must stay silent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(rename = "type")]
    pub expectation_type: String,
    #[serde(default)]
    pub sink_file: Option<String>,
    #[serde(default)]
    pub sink_line: Option<u32>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub source_line: Option<u32>,
    pub expectation: bool,
}

impl Expectation {
    /// Basename of the expected sink file, when one is recorded.
    pub fn sink_file_name(&self) -> Option<String> {
        self.sink_file
            .as_deref()
            .and_then(|p| Path::new(p).file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Boolean classification of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceProperties {
    pub category: Option<String>,
    pub feature_vs_internal_api: Option<String>,
    pub input_sanitizer: bool,
    pub source_and_sink: bool,
    pub negative_test_case: bool,
}

/// `code` section of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeSection {
    pub path: Option<String>,
    pub injection_skeleton_broken: bool,
}

/// `discovery` section of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub rule: Option<String>,
    pub method: Option<String>,
    pub rule_accuracy: Option<RuleAccuracy>,
    pub notes: Option<String>,
}

/// `compile` section of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSection {
    pub binary: Option<String>,
    pub instruction: Option<String>,
    pub dependencies: Option<String>,
}

/// `remediation` section of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediationSection {
    pub notes: Option<String>,
    pub transformation: Option<String>,
    pub modeling_rule: Option<String>,
}

/// Verbatim mirror of an instance metadata JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: CodeSection,
    pub expectation: Expectation,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub compile: CompileSection,
    #[serde(default)]
    pub properties: InstanceProperties,
    #[serde(default)]
    pub remediation: RemediationSection,
}

/// One concrete code example of a pattern.
#[derive(Debug, Clone)]
pub struct Instance {
    instance_id: u32,
    pattern_id: u32,
    language: Language,
    /// Current absolute root; all relative metadata paths resolve here.
    directory: PathBuf,
    json_filename: String,
    meta: InstanceMetadata,
}

impl Instance {
    /// Build an instance from its parsed metadata.
    ///
    /// `json_path` is the absolute path of the metadata file; the instance
    /// directory and id are derived from it. Validation is eager: the
    /// expectation/negative-test-case invariant, the discovery-rule
    /// extension, and containment of referenced paths are all checked here.
    pub fn from_metadata(
        meta: InstanceMetadata,
        json_path: &Path,
        pattern_id: u32,
        language: Language,
    ) -> Result<Self, CatalogError> {
        let directory = json_path
            .parent()
            .ok_or_else(|| CatalogError::instance_invalid("metadata file has no parent directory"))?
            .to_path_buf();
        let json_filename = json_path
            .file_name()
            .ok_or_else(|| CatalogError::instance_invalid("metadata path has no file name"))?
            .to_string_lossy()
            .into_owned();

        let dir_name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let instance_id = numeric_prefix(&dir_name).ok_or_else(|| {
            CatalogError::instance_invalid(format!(
                "instance directory '{}' has no numeric prefix",
                dir_name
            ))
        })?;

        let instance = Self {
            instance_id,
            pattern_id,
            language,
            directory,
            json_filename,
            meta,
        };
        instance.validate()?;
        Ok(instance)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.meta.expectation.expectation == self.meta.properties.negative_test_case {
            return Err(CatalogError::instance_invalid(format!(
                "instance {}: expectation ({}) must be the negation of negative_test_case ({})",
                self.instance_id,
                self.meta.expectation.expectation,
                self.meta.properties.negative_test_case
            )));
        }

        let code_rel = self.meta.code.path.as_deref().ok_or_else(|| {
            CatalogError::instance_invalid(format!(
                "instance {}: code.path is missing",
                self.instance_id
            ))
        })?;
        self.checked_resolve(code_rel, "code.path")?;

        if let Some(rule) = self.meta.discovery.rule.as_deref() {
            if let Some(expected_ext) = self.meta.discovery.method.as_deref().and_then(rule_extension_for) {
                let actual = Path::new(rule)
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if actual != expected_ext {
                    return Err(CatalogError::instance_invalid(format!(
                        "instance {}: discovery rule '{}' does not carry the '.{}' extension of method '{}'",
                        self.instance_id,
                        rule,
                        expected_ext,
                        self.meta.discovery.method.as_deref().unwrap_or_default()
                    )));
                }
            }
            // Rules are often shared at pattern level ("../shared_rule.sc"),
            // so only existence is required here, not containment.
            let resolved = self.directory.join(rule);
            if !resolved.exists() {
                return Err(CatalogError::instance_invalid(format!(
                    "instance {}: discovery.rule '{}' does not exist",
                    self.instance_id, rule
                )));
            }
        }

        Ok(())
    }

    /// Resolve a relative metadata path, rejecting anything that escapes or
    /// is missing from the instance directory.
    fn checked_resolve(&self, relative: &str, what: &str) -> Result<PathBuf, CatalogError> {
        let rel = Path::new(relative);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(CatalogError::instance_invalid(format!(
                "instance {}: {} '{}' does not resolve under the instance directory",
                self.instance_id, what, relative
            )));
        }
        let resolved = self.directory.join(rel);
        if !resolved.exists() {
            return Err(CatalogError::instance_invalid(format!(
                "instance {}: {} '{}' does not exist",
                self.instance_id, what, relative
            )));
        }
        Ok(resolved)
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn pattern_id(&self) -> u32 {
        self.pattern_id
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Absolute instance directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Name of the instance directory (e.g. `1_instance_2_global_variables`).
    pub fn directory_name(&self) -> String {
        self.directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Absolute path of the metadata JSON file.
    pub fn json_path(&self) -> PathBuf {
        self.directory.join(&self.json_filename)
    }

    /// Absolute path of the code example.
    pub fn code_path(&self) -> PathBuf {
        // code.path presence is validated at construction time
        self.directory
            .join(self.meta.code.path.as_deref().unwrap_or_default())
    }

    pub fn injection_skeleton_broken(&self) -> bool {
        self.meta.code.injection_skeleton_broken
    }

    pub fn expectation(&self) -> &Expectation {
        &self.meta.expectation
    }

    pub fn properties(&self) -> &InstanceProperties {
        &self.meta.properties
    }

    /// Absolute path of the discovery rule, when one is recorded.
    ///
    /// Canonicalised when possible so instances referencing one shared rule
    /// file agree on the path.
    pub fn discovery_rule(&self) -> Option<PathBuf> {
        self.meta.discovery.rule.as_deref().map(|r| {
            let joined = self.directory.join(r);
            joined.canonicalize().unwrap_or(joined)
        })
    }

    pub fn discovery_method(&self) -> Option<&str> {
        self.meta.discovery.method.as_deref()
    }

    pub fn discovery_rule_accuracy(&self) -> Option<RuleAccuracy> {
        self.meta.discovery.rule_accuracy
    }

    /// Absolute path of the compiled binary, when one is recorded.
    pub fn compile_binary(&self) -> Option<PathBuf> {
        self.meta
            .compile
            .binary
            .as_deref()
            .map(|b| self.directory.join(b))
    }

    pub fn compile_instruction(&self) -> Option<&str> {
        self.meta.compile.instruction.as_deref()
    }

    /// Absolute path of the compile dependencies, when recorded.
    pub fn compile_dependencies(&self) -> Option<PathBuf> {
        self.meta
            .compile
            .dependencies
            .as_deref()
            .map(|d| self.directory.join(d))
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    /// The verbatim metadata, for re-serialisation.
    pub fn metadata(&self) -> &InstanceMetadata {
        &self.meta
    }

    /// Path of the metadata file relative to the library root, as recorded
    /// in measurement files: `<LANG>/<pattern_dir>/<instance_dir>/<file>.json`.
    pub fn relative_json_path(&self, tp_lib: &Path) -> PathBuf {
        self.json_path()
            .strip_prefix(tp_lib)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.json_path())
    }

    /// Move the instance directory on disk and rebase the in-memory root in
    /// one step, so dependent paths transparently re-resolve.
    pub fn relocate(&mut self, new_directory: &Path) -> Result<(), CatalogError> {
        std::fs::rename(&self.directory, new_directory)?;
        self.directory = new_directory.to_path_buf();
        Ok(())
    }

    /// Rebase the in-memory root without touching the filesystem. Used when
    /// the directory was moved by an external actor.
    pub fn set_directory(&mut self, new_directory: PathBuf) {
        self.directory = new_directory;
    }
}

/// Leading decimal digits of a directory name (`12_instance_...` -> 12).
pub(crate) fn numeric_prefix(name: &str) -> Option<u32> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !name[digits.len()..].starts_with('_') {
        return None;
    }
    digits.parse().ok()
}
