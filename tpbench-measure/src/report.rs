//! Measurement report export
//!
//! Walks the latest persisted measurement of every requested
//! (instance, tool) pair and writes a CSV summary plus a JSON twin of the
//! same rows into the output directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use tpbench_core::domain::value_objects::{Language, ToolDescriptor};
use tpbench_core::infrastructure::CatalogStore;

use crate::engine::MeasureError;

pub const REPORT_CSV_HEADER: &str =
    "pattern_id,instance_id,pattern_name,language,tool,results,expectation,negative_test_case";

/// One report row; `results` is "true"/"false", or "NA" when the pair has
/// never been measured.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub pattern_id: u32,
    pub instance_id: u32,
    pub pattern_name: String,
    pub language: String,
    pub tool: String,
    pub results: String,
    pub expectation: bool,
    pub negative_test_case: bool,
}

/// Paths of the two artefacts written by [`export_report`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Export the measurement report for the given patterns and tools.
///
/// Patterns that fail to load are skipped with a warning; the report is an
/// operator artefact and must survive a partially broken catalogue.
pub fn export_report(
    store: &CatalogStore,
    language: &Language,
    pattern_ids: &[u32],
    tools: &[ToolDescriptor],
    output_dir: &Path,
) -> Result<ReportPaths, MeasureError> {
    let mut rows: Vec<ReportRow> = Vec::new();

    for &pattern_id in pattern_ids {
        let pattern = match store.load_pattern(pattern_id, language) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(pattern_id, error = %e, "Pattern skipped in report");
                continue;
            }
        };
        for instance in pattern.instances() {
            for tool in tools {
                let results = match store.get_last_measurement(
                    tool,
                    language,
                    pattern_id,
                    instance.instance_id(),
                ) {
                    Ok(Some(m)) => m.result.to_string(),
                    Ok(None) => "NA".to_string(),
                    Err(e) => {
                        warn!(pattern_id, instance_id = instance.instance_id(), error = %e,
                            "Measurement lookup failed in report");
                        "NA".to_string()
                    }
                };
                rows.push(ReportRow {
                    pattern_id,
                    instance_id: instance.instance_id(),
                    pattern_name: pattern.name().to_string(),
                    language: language.to_string(),
                    tool: tool.name.clone(),
                    results,
                    expectation: instance.expectation().expectation,
                    negative_test_case: instance.properties().negative_test_case,
                });
            }
        }
    }

    std::fs::create_dir_all(output_dir)?;
    let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let csv_path = output_dir.join(format!("measurement_report_{}.csv", stamp));
    let json_path = output_dir.join(format!("measurement_report_{}.json", stamp));

    let mut csv = String::from(REPORT_CSV_HEADER);
    csv.push('\n');
    for row in &rows {
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{}",
            row.pattern_id,
            row.instance_id,
            row.pattern_name,
            row.language,
            row.tool,
            row.results,
            row.expectation,
            row.negative_test_case
        );
    }
    std::fs::write(&csv_path, csv)?;
    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&rows).map_err(|e| std::io::Error::other(e.to_string()))?,
    )?;

    Ok(ReportPaths {
        csv: csv_path,
        json: json_path,
    })
}
