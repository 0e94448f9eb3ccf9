//! Shared fixtures: build a small pattern library inside a TempDir

use std::path::{Path, PathBuf};

use serde_json::json;

/// One instance to seed into a fixture pattern.
pub struct InstanceSeed {
    pub iid: u32,
    pub expectation_type: String,
    pub sink_file: Option<String>,
    pub sink_line: Option<u32>,
    pub expectation: bool,
    /// (rule filename, method); the rule file is created next to the code
    pub rule: Option<(String, String)>,
}

impl InstanceSeed {
    pub fn positive(iid: u32) -> Self {
        Self {
            iid,
            expectation_type: "xss".to_string(),
            sink_file: Some("code.php".to_string()),
            sink_line: Some(5),
            expectation: true,
            rule: None,
        }
    }

    pub fn negative(iid: u32) -> Self {
        Self {
            expectation: false,
            ..Self::positive(iid)
        }
    }

    pub fn with_rule(mut self, rule: &str, method: &str) -> Self {
        self.rule = Some((rule.to_string(), method.to_string()));
        self
    }
}

/// Create `<tp_lib>/<lang>/<pid>_<name>/` with metadata and instance dirs,
/// returning the pattern directory.
pub fn seed_pattern(
    tp_lib: &Path,
    lang: &str,
    pid: u32,
    name: &str,
    instances: &[InstanceSeed],
) -> PathBuf {
    let pattern_dir_name = format!("{}_{}", pid, name);
    let pattern_dir = tp_lib.join(lang).join(&pattern_dir_name);
    std::fs::create_dir_all(&pattern_dir).unwrap();

    let mut instance_refs = Vec::new();
    for seed in instances {
        let instance_dir_name = format!("{}_instance_{}_{}", seed.iid, pid, name);
        let instance_dir = pattern_dir.join(&instance_dir_name);
        std::fs::create_dir_all(&instance_dir).unwrap();
        std::fs::write(instance_dir.join("code.php"), "<?php echo $_GET['p']; ?>").unwrap();

        let discovery = match &seed.rule {
            Some((rule, method)) => {
                std::fs::write(instance_dir.join(rule), "cpg.call.l").unwrap();
                json!({ "rule": rule, "method": method, "rule_accuracy": "Perfect", "notes": null })
            }
            None => json!({ "rule": null, "method": null, "rule_accuracy": null, "notes": null }),
        };

        let metadata = json!({
            "description": null,
            "code": { "path": "code.php", "injection_skeleton_broken": false },
            "expectation": {
                "type": seed.expectation_type,
                "sink_file": seed.sink_file,
                "sink_line": seed.sink_line,
                "source_file": null,
                "source_line": null,
                "expectation": seed.expectation
            },
            "discovery": discovery,
            "compile": { "binary": null, "instruction": null, "dependencies": null },
            "properties": {
                "category": "S0",
                "feature_vs_internal_api": "FEATURE",
                "input_sanitizer": false,
                "source_and_sink": false,
                "negative_test_case": !seed.expectation
            },
            "remediation": { "notes": null, "transformation": null, "modeling_rule": null }
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
        "description": null,
        "family": "test_family",
        "tags": ["sast", name],
        "instances": instance_refs,
        "version": "1"
    });
    std::fs::write(
        pattern_dir.join(format!("{}.json", pattern_dir_name)),
        serde_json::to_string_pretty(&pattern_metadata).unwrap(),
    )
    .unwrap();

    pattern_dir
}

/// Write a raw measurement file for one instance, bypassing the store.
pub fn seed_measurement_file(
    tp_lib: &Path,
    lang: &str,
    pattern_dir_name: &str,
    instance_dir_name: &str,
    timestamp: &str,
    records: serde_json::Value,
) -> PathBuf {
    let dir = tp_lib
        .join("measurements")
        .join(lang)
        .join(pattern_dir_name)
        .join(instance_dir_name);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("measurement-{}.json", timestamp));
    std::fs::write(&path, serde_json::to_string_pretty(&records).unwrap()).unwrap();
    path
}

/// A measurement record as found in measurement files.
pub fn measurement_record(
    date: &str,
    result: bool,
    tool: &str,
    version: &str,
    lang: &str,
    pattern_dir_name: &str,
    instance_dir_name: &str,
    pid: u32,
    iid: u32,
) -> serde_json::Value {
    json!({
        "date": date,
        "result": result,
        "expected_result": true,
        "tool": tool,
        "version": version,
        "instance": format!("{}/{}/{}/{}.json", lang, pattern_dir_name, instance_dir_name, instance_dir_name),
        "pattern_id": pid,
        "instance_id": iid,
        "language": lang
    })
}
