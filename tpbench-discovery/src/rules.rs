//! Discovery rule execution and output parsing
//!
//! A joern discovery rule is a Scala script executed by the query runner
//! with the CPG bound to `name`. The runner prints a result line of the
//! form `(<cpg_path>, <rule_name>, <json_list>)`; each record of the JSON
//! list must carry `filename`, `methodFullName` and `lineNumber`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::errors::DiscoveryError;

/// One raw location reported by a discovery rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawFinding {
    pub filename: String,
    pub line_number: i64,
    pub method_full_name: String,
}

/// Executes one discovery rule against a CPG.
#[async_trait]
pub trait RuleRunner: Send + Sync {
    async fn run_rule(
        &self,
        cpg: &Path,
        rule: &Path,
        timeout: Option<Duration>,
    ) -> Result<Vec<RawFinding>, DiscoveryError>;
}

/// Rule execution through the joern query runner.
pub struct JoernRuleRunner {
    joern_bin: PathBuf,
}

impl JoernRuleRunner {
    pub fn new(joern_bin: impl Into<PathBuf>) -> Self {
        Self {
            joern_bin: joern_bin.into(),
        }
    }
}

#[async_trait]
impl RuleRunner for JoernRuleRunner {
    async fn run_rule(
        &self,
        cpg: &Path,
        rule: &Path,
        timeout: Option<Duration>,
    ) -> Result<Vec<RawFinding>, DiscoveryError> {
        let mut command = Command::new(&self.joern_bin);
        command
            .arg("--script")
            .arg(rule)
            .arg("--params")
            .arg(format!("name={}", cpg.display()));

        debug!(rule = %rule.display(), cpg = %cpg.display(), "Running discovery rule");

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    DiscoveryError::DiscoveryRuleError(format!(
                        "rule '{}' timed out after {} seconds",
                        rule.display(),
                        limit.as_secs()
                    ))
                })?,
            None => command.output().await,
        }
        .map_err(|e| DiscoveryError::DiscoveryRuleError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DiscoveryError::DiscoveryRuleError(format!(
                "rule '{}' exited with {:?}: {}",
                rule.display(),
                output.status.code(),
                stderr.trim()
            )));
        }

        parse_rule_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the query runner's stdout into raw findings.
///
/// The result line is the last line shaped like `(x, y, z)`; the third
/// field is a JSON list of finding records.
pub fn parse_rule_output(stdout: &str) -> Result<Vec<RawFinding>, DiscoveryError> {
    let tuple = stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('(') && l.ends_with(')'))
        .last()
        .ok_or_else(|| {
            DiscoveryError::DiscoveryRuleParsingResultError(
                "no '(cpg, rule, results)' line in rule output".to_string(),
            )
        })?;

    let inner = &tuple[1..tuple.len() - 1];
    let mut fields = inner.splitn(3, ',');
    let (Some(_cpg), Some(rule_name), Some(json_list)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(DiscoveryError::DiscoveryRuleParsingResultError(format!(
            "result line '{}' does not split into three fields",
            tuple
        )));
    };

    let records: Vec<serde_json::Value> =
        serde_json::from_str(json_list.trim()).map_err(|e| {
            DiscoveryError::DiscoveryRuleParsingResultError(format!(
                "rule '{}': invalid JSON list: {}",
                rule_name.trim(),
                e
            ))
        })?;

    let mut findings = Vec::with_capacity(records.len());
    for record in records {
        let filename = string_field(&record, "filename", rule_name)?;
        let method_full_name = string_field(&record, "methodFullName", rule_name)?;
        let line_number = record
            .get("lineNumber")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing_key(rule_name, "lineNumber"))?;
        findings.push(RawFinding {
            filename,
            line_number,
            method_full_name,
        });
    }

    trace!(count = findings.len(), "Parsed rule output");
    Ok(findings)
}

fn string_field(
    record: &serde_json::Value,
    key: &str,
    rule_name: &str,
) -> Result<String, DiscoveryError> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| missing_key(rule_name, key))
}

fn missing_key(rule_name: &str, key: &str) -> DiscoveryError {
    DiscoveryError::DiscoveryRuleParsingResultError(format!(
        "rule '{}': record is missing '{}'",
        rule_name.trim(),
        key
    ))
}

/// Flatten rule inputs into concrete rule files.
///
/// Directories are walked recursively; only files whose suffix equals the
/// method's registered extension survive. Nonexistent inputs and files of
/// other types are dropped silently.
pub fn flatten_rule_paths(inputs: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    let mut rules = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() {
                    push_if_rule(&mut rules, entry.path(), extension);
                }
            }
        } else if input.is_file() {
            push_if_rule(&mut rules, input, extension);
        } else {
            trace!(input = %input.display(), "Rule input dropped: not found");
        }
    }
    rules
}

fn push_if_rule(rules: &mut Vec<PathBuf>, path: &Path, extension: &str) {
    if path.extension().map(|e| e == extension).unwrap_or(false) {
        rules.push(path.to_path_buf());
    }
}
