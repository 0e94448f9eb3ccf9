//! SARIF result parsing
//!
//! These types cover the slice of SARIF 2.1.0 the framework consumes:
//! per-run results with a rule id and one physical location.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tpbench_core::domain::catalog::Finding;

/// Root SARIF document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifLog {
    #[serde(default)]
    pub runs: Vec<SarifRun>,
}

/// One analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifRun {
    #[serde(default)]
    pub results: Vec<SarifResult>,
    #[serde(default)]
    pub tool: Option<SarifTool>,
}

/// Tool block (used for version probing of SARIF-producing tools)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifDriver {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A single result (finding)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    #[serde(default)]
    pub physical_location: Option<PhysicalLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
    #[serde(default)]
    pub artifact_location: Option<ArtifactLocation>,
    #[serde(default)]
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactLocation {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default)]
    pub start_line: Option<u32>,
}

/// Convert a SARIF document into framework findings.
///
/// `type_mapping` translates native rule ids onto the framework
/// vulnerability taxonomy; unmapped rule ids pass through verbatim.
/// Results without a resolvable file and line are dropped.
pub fn findings_from_sarif(log: &SarifLog, type_mapping: &HashMap<String, String>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for run in &log.runs {
        for result in &run.results {
            let Some(rule_id) = result.rule_id.as_deref() else {
                debug!("SARIF result without ruleId skipped");
                continue;
            };
            let finding_type = type_mapping
                .get(rule_id)
                .cloned()
                .unwrap_or_else(|| rule_id.to_string());

            let location = result
                .locations
                .first()
                .and_then(|l| l.physical_location.as_ref());
            let file = location
                .and_then(|p| p.artifact_location.as_ref())
                .and_then(|a| a.uri.as_deref())
                .and_then(|uri| Path::new(uri).file_name())
                .map(|n| n.to_string_lossy().into_owned());
            let line = location.and_then(|p| p.region.as_ref()).and_then(|r| r.start_line);

            match (file, line) {
                (Some(file), Some(line)) => findings.push(Finding::new(finding_type, file, line)),
                _ => debug!(rule_id, "SARIF result without file/line skipped"),
            }
        }
    }

    findings
}
