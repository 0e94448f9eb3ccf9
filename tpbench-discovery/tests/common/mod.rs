//! Test fixtures: a catalogue with discovery rules, plus scripted CPG and
//! rule-runner components

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tpbench_discovery::{CpgGenerator, DiscoveryError, RawFinding, RuleRunner};

/// Seed a pattern whose instances all expect `xss` in `code.php`.
///
/// `rule_rel` is the rule path as stored in metadata; `"../shared.sc"`
/// style references create the file at pattern level so instances share it.
pub fn seed_pattern_with_rules(
    tp_lib: &Path,
    lang: &str,
    pid: u32,
    name: &str,
    instances: &[(u32, Option<&str>)],
) {
    let pattern_dir_name = format!("{}_{}", pid, name);
    let pattern_dir = tp_lib.join(lang).join(&pattern_dir_name);
    std::fs::create_dir_all(&pattern_dir).unwrap();

    let mut instance_refs = Vec::new();
    for &(iid, rule_rel) in instances {
        let instance_dir_name = format!("{}_instance_{}_{}", iid, pid, name);
        let instance_dir = pattern_dir.join(&instance_dir_name);
        std::fs::create_dir_all(&instance_dir).unwrap();
        std::fs::write(instance_dir.join("code.php"), "<?php echo $_GET['p']; ?>").unwrap();

        let discovery = match rule_rel {
            Some(rule) => {
                let rule_file = instance_dir.join(rule);
                if !rule_file.exists() {
                    std::fs::write(&rule_file, "cpg.call.l").unwrap();
                }
                json!({ "rule": rule, "method": "joern" })
            }
            None => json!({}),
        };
        let metadata = json!({
            "code": { "path": "code.php" },
            "expectation": { "type": "xss", "sink_file": "code.php", "expectation": true },
            "discovery": discovery,
            "properties": { "negative_test_case": false }
        });
        let json_name = format!("{}.json", instance_dir_name);
        std::fs::write(
            instance_dir.join(&json_name),
            serde_json::to_string_pretty(&metadata).unwrap(),
        )
        .unwrap();
        instance_refs.push(format!("{}/{}", instance_dir_name, json_name));
    }

    std::fs::write(
        pattern_dir.join(format!("{}.json", pattern_dir_name)),
        serde_json::to_string_pretty(&json!({
            "name": name.replace('_', " "),
            "instances": instance_refs
        }))
        .unwrap(),
    )
    .unwrap();
}

/// Write a measurement file recording one verdict per instance.
pub fn seed_measurements(
    tp_lib: &Path,
    lang: &str,
    pid: u32,
    name: &str,
    tool: &str,
    version: &str,
    verdicts: &[(u32, bool)],
) {
    let pattern_dir_name = format!("{}_{}", pid, name);
    for &(iid, result) in verdicts {
        let instance_dir_name = format!("{}_instance_{}_{}", iid, pid, name);
        let dir = tp_lib
            .join("measurements")
            .join(lang)
            .join(&pattern_dir_name)
            .join(&instance_dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let records = json!([{
            "date": "2024-06-01T10:00:00Z",
            "result": result,
            "expected_result": true,
            "tool": tool,
            "version": version,
            "instance": format!("{}/{}/{}/{}.json", lang, pattern_dir_name, instance_dir_name, instance_dir_name),
            "pattern_id": pid,
            "instance_id": iid,
            "language": lang
        }]);
        std::fs::write(
            dir.join("measurement-2024-06-01_10-00-00.json"),
            serde_json::to_string_pretty(&records).unwrap(),
        )
        .unwrap();
    }
}

/// CPG generator that writes an empty binary, or fails on demand.
pub struct StubCpgGenerator {
    pub fail: bool,
}

#[async_trait]
impl CpgGenerator for StubCpgGenerator {
    async fn generate(
        &self,
        _src_dir: &Path,
        build_name: &str,
        out_dir: &Path,
        _timeout: Option<Duration>,
    ) -> Result<PathBuf, DiscoveryError> {
        if self.fail {
            return Err(DiscoveryError::CPGGenerationError("scripted failure".to_string()));
        }
        std::fs::create_dir_all(out_dir).unwrap();
        let cpg = out_dir.join(format!("{}.cpg.bin", build_name));
        std::fs::write(&cpg, b"cpg").unwrap();
        Ok(cpg)
    }
}

/// Rule runner scripted by rule file basename; records every execution.
pub struct StubRuleRunner {
    pub findings: HashMap<String, Vec<RawFinding>>,
    pub failing: Vec<String>,
    pub executed: Mutex<Vec<PathBuf>>,
}

impl StubRuleRunner {
    pub fn new() -> Self {
        Self {
            findings: HashMap::new(),
            failing: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_findings(mut self, rule_basename: &str, findings: Vec<RawFinding>) -> Self {
        self.findings.insert(rule_basename.to_string(), findings);
        self
    }

    pub fn failing_on(mut self, rule_basename: &str) -> Self {
        self.failing.push(rule_basename.to_string());
        self
    }
}

pub fn finding(filename: &str, line: i64, method: &str) -> RawFinding {
    RawFinding {
        filename: filename.to_string(),
        line_number: line,
        method_full_name: method.to_string(),
    }
}

#[async_trait]
impl RuleRunner for StubRuleRunner {
    async fn run_rule(
        &self,
        _cpg: &Path,
        rule: &Path,
        _timeout: Option<Duration>,
    ) -> Result<Vec<RawFinding>, DiscoveryError> {
        self.executed.lock().unwrap().push(rule.to_path_buf());
        let key = rule
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&key) {
            return Err(DiscoveryError::DiscoveryRuleError(format!(
                "scripted failure for {}",
                key
            )));
        }
        Ok(self.findings.get(&key).cloned().unwrap_or_default())
    }
}
