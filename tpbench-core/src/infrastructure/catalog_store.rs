//! Disk-resident catalogue store
//!
//! Owns the tp_lib layout:
//!
//! ```text
//! <tp_lib>/<LANG>/<pid>_<snake>/<pid>_<snake>.json                  pattern metadata
//! <tp_lib>/<LANG>/<pid>_<snake>/<iid>_instance_<pid>_<snake>/...    instance dirs
//! <tp_lib>/measurements/<LANG>/<pattern_dir>/<instance_dir>/
//!     measurement-YYYY-MM-DD_HH-MM-SS.json                          measurement arrays
//! ```
//!
//! All loading is eager and validating; all measurement writes are atomic
//! (temp file in the destination directory, then rename).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::catalog::instance::{numeric_prefix, Instance, InstanceMetadata};
use crate::domain::catalog::pattern::{Pattern, PatternMetadata};
use crate::domain::catalog::{CatalogError, Measurement};
use crate::domain::value_objects::{Language, ToolDescriptor};

const MEASUREMENTS_DIR: &str = "measurements";

/// Handle on one on-disk pattern library.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    tp_lib: PathBuf,
}

impl CatalogStore {
    /// Open a library root. The directory must already exist.
    pub fn new(tp_lib: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let tp_lib = tp_lib.into();
        if !tp_lib.is_dir() {
            return Err(CatalogError::TPLibDoesNotExist(tp_lib));
        }
        Ok(Self { tp_lib })
    }

    pub fn tp_lib(&self) -> &Path {
        &self.tp_lib
    }

    fn language_dir(&self, language: &Language) -> PathBuf {
        self.tp_lib.join(language.as_str())
    }

    /// Canonical pattern directory name: `<pid>_<snake_name>`.
    pub fn pattern_dir_name(pattern_id: u32, name: &str) -> String {
        format!("{}_{}", pattern_id, snake(name))
    }

    /// Canonical instance directory name: `<iid>_instance_<pid>_<snake_name>`.
    pub fn instance_dir_name(instance_id: u32, pattern_id: u32, name: &str) -> String {
        format!("{}_instance_{}_{}", instance_id, pattern_id, snake(name))
    }

    /// Enumerate the pattern ids present for a language, in ascending order.
    pub fn list_patterns(&self, language: &Language) -> Result<Vec<u32>, CatalogError> {
        let dir = self.language_dir(language);
        if !dir.is_dir() {
            return Err(CatalogError::LanguageTPLibDoesNotExist {
                language: language.to_string(),
                tp_lib: self.tp_lib.clone(),
            });
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = numeric_prefix(&name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Load a pattern and all of its instances.
    pub fn load_pattern(
        &self,
        pattern_id: u32,
        language: &Language,
    ) -> Result<Pattern, CatalogError> {
        let lang_dir = self.language_dir(language);
        if !lang_dir.is_dir() {
            return Err(CatalogError::LanguageTPLibDoesNotExist {
                language: language.to_string(),
                tp_lib: self.tp_lib.clone(),
            });
        }

        let pattern_dir = find_numbered_dir(&lang_dir, pattern_id)?
            .ok_or(CatalogError::PatternDoesNotExist(pattern_id))?;
        let dir_name = pattern_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let metadata_path = pattern_dir.join(format!("{}.json", dir_name));
        let raw = std::fs::read_to_string(&metadata_path).map_err(|e| {
            CatalogError::pattern_invalid(format!(
                "pattern {}: cannot read metadata '{}': {}",
                pattern_id,
                metadata_path.display(),
                e
            ))
        })?;
        let meta: PatternMetadata = serde_json::from_str(&raw).map_err(|e| {
            CatalogError::pattern_invalid(format!("pattern {}: malformed metadata: {}", pattern_id, e))
        })?;

        let mut instances = Vec::with_capacity(meta.instances.len());
        for relative in &meta.instances {
            let json_path = pattern_dir.join(relative);
            if !json_path.is_file() {
                return Err(CatalogError::pattern_invalid(format!(
                    "pattern {}: references non-existent instance '{}'",
                    pattern_id, relative
                )));
            }
            instances.push(self.load_instance(&json_path, pattern_id, language)?);
        }
        instances.sort_by_key(Instance::instance_id);

        debug!(
            pattern_id,
            language = %language,
            instances = instances.len(),
            "Loaded pattern"
        );
        Pattern::assemble(pattern_id, meta, pattern_dir, language.clone(), instances)
    }

    /// Load a single instance from its metadata file.
    pub fn load_instance(
        &self,
        json_path: &Path,
        pattern_id: u32,
        language: &Language,
    ) -> Result<Instance, CatalogError> {
        let raw = std::fs::read_to_string(json_path).map_err(|e| {
            CatalogError::InstanceDoesNotExist(format!("{}: {}", json_path.display(), e))
        })?;
        let meta: InstanceMetadata = serde_json::from_str(&raw).map_err(|e| {
            CatalogError::instance_invalid(format!(
                "malformed metadata '{}': {}",
                json_path.display(),
                e
            ))
        })?;
        Instance::from_metadata(meta, json_path, pattern_id, language.clone())
    }

    /// Per-instance measurement directory.
    pub fn measurement_dir(
        &self,
        language: &Language,
        pattern_dir_name: &str,
        instance_dir_name: &str,
    ) -> PathBuf {
        self.tp_lib
            .join(MEASUREMENTS_DIR)
            .join(language.as_str())
            .join(pattern_dir_name)
            .join(instance_dir_name)
    }

    /// Latest persisted verdict of `tool` on one instance, if any.
    ///
    /// Only the measurement file with the lexicographically-greatest name is
    /// consulted; its records are filtered by tool name and the version-match
    /// predicate (exact, or wildcard for "saas" descriptors).
    pub fn get_last_measurement(
        &self,
        tool: &ToolDescriptor,
        language: &Language,
        pattern_id: u32,
        instance_id: u32,
    ) -> Result<Option<Measurement>, CatalogError> {
        let lang_dir = self.language_dir(language);
        let pattern_dir = find_numbered_dir(&lang_dir, pattern_id)?
            .ok_or(CatalogError::PatternDoesNotExist(pattern_id))?;
        let instance_dir = find_numbered_dir(&pattern_dir, instance_id)?.ok_or_else(|| {
            CatalogError::InstanceDoesNotExist(format!(
                "pattern {} has no instance {}",
                pattern_id, instance_id
            ))
        })?;

        let dir = self.measurement_dir(
            language,
            &dir_name_of(&pattern_dir),
            &dir_name_of(&instance_dir),
        );
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut files: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with("measurement-") && name.ends_with(".json") {
                files.push(name);
            }
        }
        let Some(latest) = files.into_iter().max() else {
            return Ok(None);
        };

        let path = dir.join(latest);
        let raw = std::fs::read_to_string(&path)?;
        let records: Vec<Measurement> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::other(format!("{}: {}", path.display(), e)))?;

        Ok(records
            .into_iter()
            .filter(|m| m.tool == tool.name && tool.version_matches(&m.version))
            .max_by_key(|m| m.date))
    }

    /// Persist measurements, one JSON array per (pattern, instance) group.
    ///
    /// Files land in the per-instance measurement directory, named with the
    /// group's timestamp. The write is atomic: content goes to a temp file
    /// in the destination directory, then a rename. Returns the written
    /// paths.
    pub fn save_measurements(
        &self,
        measurements: &[Measurement],
    ) -> Result<Vec<PathBuf>, CatalogError> {
        let mut groups: BTreeMap<(u32, u32), Vec<&Measurement>> = BTreeMap::new();
        for m in measurements {
            groups.entry((m.pattern_id, m.instance_id)).or_default().push(m);
        }

        let mut written = Vec::with_capacity(groups.len());
        for ((pattern_id, instance_id), group) in groups {
            // The instance field is `<LANG>/<pattern_dir>/<instance_dir>/<file>.json`,
            // so its parent is exactly the measurement subtree for this instance.
            let Some(instance_subdir) = group[0].instance.parent() else {
                warn!(pattern_id, instance_id, "Measurement has no instance path; skipped");
                continue;
            };
            let dir = self.tp_lib.join(MEASUREMENTS_DIR).join(instance_subdir);
            std::fs::create_dir_all(&dir)?;

            let filename = Measurement::filename(&group[0].date);
            let target = dir.join(&filename);

            let json = serde_json::to_vec_pretty(&group)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.persist(&target)
                .map_err(|e| CatalogError::Io(e.error))?;

            debug!(pattern_id, instance_id, file = %target.display(), "Saved measurements");
            written.push(target);
        }
        Ok(written)
    }
}

fn dir_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Find the unique subdirectory of `parent` whose numeric prefix is `id`.
fn find_numbered_dir(parent: &Path, id: u32) -> Result<Option<PathBuf>, CatalogError> {
    if !parent.is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if numeric_prefix(&name) == Some(id) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

fn snake(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}
