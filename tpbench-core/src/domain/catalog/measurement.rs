//! Measurement entity and the verdict rule
//!
//! A measurement is the recorded verdict of one tool on one instance at one
//! point in time. The verdict compares the tool's findings against the
//! instance expectation; `result == true` means the tool behaved as the
//! catalogue predicts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instance::{Expectation, Instance};
use crate::domain::value_objects::Language;

/// Expected sink file participates in finding matching.
pub const SINK_FILE_STRICT: bool = true;
/// Expected sink line does not; numerous instances record a line that tools
/// legitimately report a few lines off. Loosened on purpose, tighten only
/// behind an explicit operator opt-in.
pub const SINK_LINE_STRICT: bool = false;

/// One normalised SAST finding, as returned by an adapter's `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    /// Vulnerability type in the framework taxonomy (e.g. "xss")
    #[serde(rename = "type")]
    pub finding_type: String,
    /// Basename of the file the finding points at
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

impl Finding {
    pub fn new(finding_type: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            finding_type: finding_type.into(),
            file: file.into(),
            line,
        }
    }
}

/// The verdict of one tool on one instance at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub date: DateTime<Utc>,
    /// Did the finding set satisfy the expectation?
    pub result: bool,
    /// Copy of `expectation.expectation` at measurement time, for provenance
    pub expected_result: bool,
    pub tool: String,
    pub version: String,
    /// Metadata file path relative to the library root
    pub instance: PathBuf,
    pub pattern_id: u32,
    pub instance_id: u32,
    pub language: Language,
}

impl Measurement {
    /// Compute the verdict of `findings` against an instance expectation.
    ///
    /// This is the only place the strictness constants are consulted.
    pub fn define(
        findings: &[Finding],
        instance: &Instance,
        tp_lib: &Path,
        date: DateTime<Utc>,
        tool: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let expectation = instance.expectation();
        let found = findings.iter().any(|f| matches(f, expectation));

        Self {
            date,
            result: found == expectation.expectation,
            expected_result: expectation.expectation,
            tool: tool.into(),
            version: version.into(),
            instance: instance.relative_json_path(tp_lib),
            pattern_id: instance.pattern_id(),
            instance_id: instance.instance_id(),
            language: instance.language().clone(),
        }
    }

    /// Timestamp fragment used in measurement filenames. Zero-padded and
    /// ISO-ordered, so lexicographic filename order equals wall-clock order.
    pub fn filename_timestamp(date: &DateTime<Utc>) -> String {
        date.format("%Y-%m-%d_%H-%M-%S").to_string()
    }

    /// Measurement filename for a given invocation timestamp.
    pub fn filename(date: &DateTime<Utc>) -> String {
        format!("measurement-{}.json", Self::filename_timestamp(date))
    }
}

/// Does a single finding satisfy an expectation?
fn matches(finding: &Finding, expectation: &Expectation) -> bool {
    if finding.finding_type != expectation.expectation_type {
        return false;
    }
    if SINK_FILE_STRICT {
        if let Some(sink_file) = expectation.sink_file_name() {
            if sink_file != finding.file {
                return false;
            }
        }
    }
    if SINK_LINE_STRICT {
        if let Some(sink_line) = expectation.sink_line {
            if sink_line != finding.line {
                return false;
            }
        }
    }
    true
}
