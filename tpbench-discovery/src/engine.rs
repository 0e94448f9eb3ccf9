//! The discovery engine
//!
//! Pattern-driven discovery walks the requested patterns, keeps the
//! instances whose latest measurements show a blind spot for the chosen
//! tools, deduplicates their discovery rules, executes every unique rule
//! once against the CPG, and multiplexes raw findings back across the
//! instances sharing each rule. Manual discovery skips the catalogue and
//! runs an explicit set of rule files.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use tpbench_core::config::Config;
use tpbench_core::domain::catalog::CatalogError;
use tpbench_core::domain::value_objects::{rule_extension_for, Language, ToolDescriptor};
use tpbench_core::infrastructure::CatalogStore;
use tpbench_core::logging::RunLog;

use crate::cpg::{CpgGenerator, JoernCpgGenerator};
use crate::errors::DiscoveryError;
use crate::rules::{flatten_rule_paths, JoernRuleRunner, RuleRunner};

pub const DISCOVERY_CSV_HEADER: &str =
    "filename,lineNumber,methodFullName,patternId,instanceId,patternName,queryFile";
pub const MANUAL_CSV_HEADER: &str =
    "filename,lineNumber,methodFullName,queryName,queryFile,result";

/// A rule-level problem recorded in the run summary.
#[derive(Debug, Clone)]
pub struct RuleFailure {
    pub pattern_id: u32,
    pub instance_ids: Vec<u32>,
    pub rule: Option<PathBuf>,
    pub error: String,
}

/// Outcome of one pattern-driven discovery invocation.
#[derive(Debug, Clone)]
pub struct DiscoverySummary {
    pub cpg_path: PathBuf,
    pub csv_path: PathBuf,
    pub findings: usize,
    pub used_measured_patterns_ids: Vec<u32>,
    pub ignored_not_measured_patterns_ids: Vec<u32>,
    pub skipped_pattern_ids: Vec<u32>,
    pub failures: Vec<RuleFailure>,
}

/// Outcome of one manual discovery invocation.
#[derive(Debug, Clone)]
pub struct ManualSummary {
    pub cpg_path: PathBuf,
    pub csv_path: PathBuf,
    pub executed_rules: usize,
    pub findings: usize,
}

/// Discovers pattern occurrences in a target source tree.
pub struct DiscoveryEngine {
    store: CatalogStore,
    generator: Arc<dyn CpgGenerator>,
    runner: Arc<dyn RuleRunner>,
    skip_pattern_ids: Vec<u32>,
    rule_timeout: Option<Duration>,
    log_filename: String,
}

impl DiscoveryEngine {
    /// Build an engine for `language` from the configuration tables.
    ///
    /// Fails with `CPGLanguageNotSupported` when the configuration has no
    /// CPG generator for the language.
    pub fn for_language(
        store: CatalogStore,
        config: &Config,
        language: &Language,
    ) -> Result<Self, DiscoveryError> {
        let generator_config = config
            .cpg
            .get(language.as_str())
            .cloned()
            .ok_or_else(|| DiscoveryError::CPGLanguageNotSupported(language.to_string()))?;
        let generator = JoernCpgGenerator::new(generator_config);
        let runner = JoernRuleRunner::new(generator.query_runner());
        Ok(Self::with_components(
            store,
            Arc::new(generator),
            Arc::new(runner),
            config,
        ))
    }

    /// Assemble an engine from explicit components (used by tests and by
    /// callers providing their own toolchain).
    pub fn with_components(
        store: CatalogStore,
        generator: Arc<dyn CpgGenerator>,
        runner: Arc<dyn RuleRunner>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            generator,
            runner,
            skip_pattern_ids: config.discovery.skip_pattern_ids.clone(),
            rule_timeout: config.discovery.rule_timeout_seconds.map(Duration::from_secs),
            log_filename: config.logging.log_filename.clone(),
        }
    }

    /// Pattern-driven discovery.
    ///
    /// With `ignore_measurements` set, the measurement gate is bypassed and
    /// every instance with a discovery rule becomes a candidate.
    #[allow(clippy::too_many_arguments)]
    pub async fn discover(
        &self,
        src_dir: &Path,
        pattern_ids: &[u32],
        language: &Language,
        tools: &[ToolDescriptor],
        build_name: &str,
        out_dir: &Path,
        ignore_measurements: bool,
    ) -> Result<DiscoverySummary, DiscoveryError> {
        if !src_dir.is_dir() {
            return Err(CatalogError::TargetDirDoesNotExist(src_dir.to_path_buf()).into());
        }
        let mut run_log = RunLog::open(out_dir, &self.log_filename)?;

        run_log.phase(&format!(
            "discovery: generating CPG for {} as '{}'",
            src_dir.display(),
            build_name
        ));
        let cpg_path = self
            .generator
            .generate(src_dir, build_name, out_dir, self.rule_timeout)
            .await?;

        // Select candidate instances, gated by prior measurements.
        let mut used_measured = Vec::new();
        let mut ignored_not_measured = Vec::new();
        let mut skipped = Vec::new();
        let mut failures: Vec<RuleFailure> = Vec::new();
        // rule path -> pattern id -> (pattern name, instance ids)
        let mut rule_targets: BTreeMap<PathBuf, BTreeMap<u32, (String, Vec<u32>)>> =
            BTreeMap::new();

        for &pattern_id in pattern_ids {
            if self.skip_pattern_ids.contains(&pattern_id) {
                debug!(pattern_id, "Pattern on the discovery deny-list; skipped");
                skipped.push(pattern_id);
                continue;
            }
            let pattern = match self.store.load_pattern(pattern_id, language) {
                Ok(pattern) => pattern,
                Err(e) => {
                    run_log.warn(&format!("pattern {}: not discovered: {}", pattern_id, e));
                    failures.push(RuleFailure {
                        pattern_id,
                        instance_ids: vec![],
                        rule: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let mut pattern_measured = false;
            let mut candidates = Vec::new();
            for instance in pattern.instances() {
                if ignore_measurements {
                    candidates.push(instance);
                    continue;
                }
                let mut latest = Vec::new();
                for tool in tools {
                    match self.store.get_last_measurement(
                        tool,
                        language,
                        pattern_id,
                        instance.instance_id(),
                    ) {
                        Ok(Some(measurement)) => latest.push(measurement),
                        Ok(None) => {}
                        Err(e) => warn!(
                            pattern_id,
                            instance_id = instance.instance_id(),
                            error = %e,
                            "Measurement lookup failed"
                        ),
                    }
                }
                if latest.is_empty() {
                    continue;
                }
                pattern_measured = true;
                // Supportive candidate: at least one requested tool missed it.
                if latest.iter().any(|m| !m.result) {
                    candidates.push(instance);
                }
            }

            if !ignore_measurements && !pattern_measured {
                run_log.warn(&format!(
                    "pattern {}: {}; ignored in discovery",
                    pattern_id,
                    CatalogError::MeasurementNotFound(pattern_id)
                ));
                ignored_not_measured.push(pattern_id);
                continue;
            }
            used_measured.push(pattern_id);

            for instance in candidates {
                let Some(rule) = instance.discovery_rule() else {
                    run_log.warn(&format!(
                        "pattern {} instance {}: no discovery rule; skipped",
                        pattern_id,
                        instance.instance_id()
                    ));
                    continue;
                };
                match instance.discovery_method() {
                    Some("joern") => {}
                    other => {
                        failures.push(RuleFailure {
                            pattern_id,
                            instance_ids: vec![instance.instance_id()],
                            rule: Some(rule.clone()),
                            error: DiscoveryError::DiscoveryMethodNotSupported(
                                other.unwrap_or("<none>").to_string(),
                            )
                            .to_string(),
                        });
                        continue;
                    }
                }
                let entry = rule_targets
                    .entry(rule)
                    .or_default()
                    .entry(pattern_id)
                    .or_insert_with(|| (pattern.name().to_string(), Vec::new()));
                entry.1.push(instance.instance_id());
            }
        }

        run_log.phase(&format!(
            "discovery: {} unique rule(s) over {} pattern(s)",
            rule_targets.len(),
            used_measured.len()
        ));

        // Execute each unique rule once and multiplex its findings.
        let mut rows: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (rule, targets) in &rule_targets {
            let findings = match self.runner.run_rule(&cpg_path, rule, self.rule_timeout).await {
                Ok(findings) => findings,
                Err(e) => {
                    run_log.warn(&format!("rule {}: {}", rule.display(), e));
                    for (&pattern_id, (_, instance_ids)) in targets {
                        failures.push(RuleFailure {
                            pattern_id,
                            instance_ids: instance_ids.clone(),
                            rule: Some(rule.clone()),
                            error: e.to_string(),
                        });
                    }
                    continue;
                }
            };
            for (&pattern_id, (pattern_name, instance_ids)) in targets {
                let mut ids: Vec<u32> = instance_ids.clone();
                ids.sort_unstable();
                ids.dedup();
                let instance_field = csv_field(
                    &ids.iter().map(u32::to_string).collect::<Vec<_>>().join(", "),
                );
                for finding in &findings {
                    let row = format!(
                        "{},{},{},{},{},{},{}",
                        csv_field(&finding.filename),
                        finding.line_number,
                        csv_field(&finding.method_full_name),
                        pattern_id,
                        instance_field,
                        csv_field(pattern_name),
                        csv_field(&rule.to_string_lossy()),
                    );
                    if seen.insert(row.clone()) {
                        rows.push(row);
                    }
                }
            }
        }

        let csv_path = out_dir.join(format!(
            "discovery_{}_{}.csv",
            build_name,
            Utc::now().format("%Y-%m-%d_%H-%M-%S")
        ));
        write_csv(&csv_path, DISCOVERY_CSV_HEADER, &rows)?;

        run_log.phase(&format!(
            "discovery: {} finding(s) written to {}",
            rows.len(),
            csv_path.display()
        ));
        info!(
            findings = rows.len(),
            rules = rule_targets.len(),
            ignored = ignored_not_measured.len(),
            "Discovery finished"
        );

        Ok(DiscoverySummary {
            cpg_path,
            csv_path,
            findings: rows.len(),
            used_measured_patterns_ids: used_measured,
            ignored_not_measured_patterns_ids: ignored_not_measured,
            skipped_pattern_ids: skipped,
            failures,
        })
    }

    /// Manual discovery: run an explicit set of rule files or directories.
    ///
    /// Inputs are flattened recursively; only files carrying the method's
    /// registered extension are executed. Every rule produces at least one
    /// CSV row: its findings, a `NO_RESULT` marker, or its error message.
    #[allow(clippy::too_many_arguments)]
    pub async fn manual_discovery(
        &self,
        src_dir: &Path,
        method: &str,
        rule_inputs: &[PathBuf],
        build_name: &str,
        out_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<ManualSummary, DiscoveryError> {
        let Some(extension) = rule_extension_for(method) else {
            return Err(DiscoveryError::DiscoveryMethodNotSupported(method.to_string()));
        };
        if !src_dir.is_dir() {
            return Err(CatalogError::TargetDirDoesNotExist(src_dir.to_path_buf()).into());
        }
        let mut run_log = RunLog::open(out_dir, &self.log_filename)?;

        let rules = flatten_rule_paths(rule_inputs, extension);
        run_log.phase(&format!(
            "manual discovery: {} rule(s) after flattening {} input(s)",
            rules.len(),
            rule_inputs.len()
        ));

        let cpg_path = self
            .generator
            .generate(src_dir, build_name, out_dir, timeout.or(self.rule_timeout))
            .await?;

        let mut rows = Vec::new();
        let mut findings_total = 0usize;
        for rule in &rules {
            let query_name = rule
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let query_file = csv_field(&rule.to_string_lossy());

            match self
                .runner
                .run_rule(&cpg_path, rule, timeout.or(self.rule_timeout))
                .await
            {
                Ok(findings) if findings.is_empty() => {
                    rows.push(format!(",,,{},{},NO_RESULT", csv_field(&query_name), query_file));
                }
                Ok(findings) => {
                    findings_total += findings.len();
                    for finding in findings {
                        rows.push(format!(
                            "{},{},{},{},{},",
                            csv_field(&finding.filename),
                            finding.line_number,
                            csv_field(&finding.method_full_name),
                            csv_field(&query_name),
                            query_file,
                        ));
                    }
                }
                Err(e) => {
                    run_log.warn(&format!("rule {}: {}", rule.display(), e));
                    rows.push(format!(
                        ",,,{},{},{}",
                        csv_field(&query_name),
                        query_file,
                        csv_field(&e.to_string()),
                    ));
                }
            }
        }

        let csv_path = out_dir.join(format!(
            "manual_discovery_{}_{}.csv",
            build_name,
            Utc::now().format("%Y-%m-%d_%H-%M-%S")
        ));
        write_csv(&csv_path, MANUAL_CSV_HEADER, &rows)?;

        run_log.phase(&format!(
            "manual discovery: {} rule(s) executed, {} finding(s), CSV at {}",
            rules.len(),
            findings_total,
            csv_path.display()
        ));

        Ok(ManualSummary {
            cpg_path,
            csv_path,
            executed_rules: rules.len(),
            findings: findings_total,
        })
    }
}

fn write_csv(path: &Path, header: &str, rows: &[String]) -> Result<(), DiscoveryError> {
    let mut content = String::with_capacity(header.len() + rows.iter().map(String::len).sum::<usize>() + rows.len() + 1);
    content.push_str(header);
    content.push('\n');
    for row in rows {
        let _ = writeln!(content, "{}", row);
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Quote a CSV field when it contains a comma or a quote.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Group helper kept for summary consumers: map rule failures per pattern.
pub fn failures_by_pattern(failures: &[RuleFailure]) -> HashMap<u32, Vec<&RuleFailure>> {
    let mut grouped: HashMap<u32, Vec<&RuleFailure>> = HashMap::new();
    for failure in failures {
        grouped.entry(failure.pattern_id).or_default().push(failure);
    }
    grouped
}
