//! Test fixtures: a small pattern library and a scripted stub adapter

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;

use tpbench_core::domain::catalog::Finding;
use tpbench_core::domain::value_objects::Language;
use tpbench_sast::{SastAdapter, SastError};

/// Seed `<tp_lib>/<lang>/<pid>_<name>` with instances whose expectation is
/// `type=xss, sink_file=code.php, sink_line=5` and the given polarity.
pub fn seed_pattern(tp_lib: &Path, lang: &str, pid: u32, name: &str, expectations: &[(u32, bool)]) {
    let pattern_dir_name = format!("{}_{}", pid, name);
    let pattern_dir = tp_lib.join(lang).join(&pattern_dir_name);
    std::fs::create_dir_all(&pattern_dir).unwrap();

    let mut instance_refs = Vec::new();
    for &(iid, expectation) in expectations {
        let instance_dir_name = format!("{}_instance_{}_{}", iid, pid, name);
        let instance_dir = pattern_dir.join(&instance_dir_name);
        std::fs::create_dir_all(&instance_dir).unwrap();
        std::fs::write(instance_dir.join("code.php"), "<?php echo $_GET['p']; ?>").unwrap();

        let metadata = json!({
            "code": { "path": "code.php", "injection_skeleton_broken": false },
            "expectation": {
                "type": "xss",
                "sink_file": "code.php",
                "sink_line": 5,
                "expectation": expectation
            },
            "properties": { "negative_test_case": !expectation }
        });
        let json_name = format!("{}.json", instance_dir_name);
        std::fs::write(
            instance_dir.join(&json_name),
            serde_json::to_string_pretty(&metadata).unwrap(),
        )
        .unwrap();
        instance_refs.push(format!("{}/{}", instance_dir_name, json_name));
    }

    let pattern_metadata = json!({
        "name": name.replace('_', " "),
        "instances": instance_refs
    });
    std::fs::write(
        pattern_dir.join(format!("{}.json", pattern_dir_name)),
        serde_json::to_string_pretty(&pattern_metadata).unwrap(),
    )
    .unwrap();
}

/// Scripted adapter: findings keyed by instance directory name, written to
/// and read back from a JSON artefact like a real tool result.
pub struct StubAdapter {
    name: String,
    version: String,
    languages: Vec<String>,
    /// instance directory name -> findings; a missing key fails the launch
    findings: HashMap<String, Vec<Finding>>,
    fail_missing: bool,
}

impl StubAdapter {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            languages: vec!["PHP".to_string()],
            findings: HashMap::new(),
            fail_missing: false,
        }
    }

    pub fn with_findings(mut self, instance_dir: &str, findings: Vec<Finding>) -> Self {
        self.findings.insert(instance_dir.to_string(), findings);
        self
    }

    /// Launches for instances without scripted findings fail instead of
    /// returning an empty set.
    pub fn failing_when_unscripted(mut self) -> Self {
        self.fail_missing = true;
        self
    }
}

#[async_trait]
impl SastAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn supported_languages(&self) -> &[String] {
        &self.languages
    }

    async fn tool_version(&self) -> String {
        self.version.clone()
    }

    async fn launch(
        &self,
        src_dir: &Path,
        _language: &Language,
        output_dir: &Path,
        _lib_dir: Option<&Path>,
        _measurement: bool,
    ) -> Result<PathBuf, SastError> {
        let key = src_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let findings = match self.findings.get(&key) {
            Some(findings) => findings.clone(),
            None if self.fail_missing => {
                return Err(SastError::scan_failed(&self.name, format!("no scan for {}", key)))
            }
            None => Vec::new(),
        };

        tokio::fs::create_dir_all(output_dir).await?;
        let out_file = output_dir.join("result.json");
        tokio::fs::write(&out_file, serde_json::to_vec(&findings).unwrap()).await?;
        Ok(out_file)
    }

    async fn inspect(
        &self,
        result_file: &Path,
        _language: &Language,
    ) -> Result<Vec<Finding>, SastError> {
        let raw = tokio::fs::read_to_string(result_file).await?;
        serde_json::from_str(&raw).map_err(|e| SastError::parse_failed(&self.name, e.to_string()))
    }
}
