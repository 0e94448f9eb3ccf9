//! Runtime job bookkeeping for the measurement pipeline

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tpbench_core::domain::catalog::{Instance, Measurement};
use tpbench_core::domain::value_objects::{Language, ToolDescriptor};
use tpbench_sast::SastAdapter;

/// Transient correlation token for one (instance, tool) analysis job.
///
/// Lives only for the duration of a `measure` invocation; the harvester
/// matches queue items back to it by `job_id`.
pub(crate) struct SastJob {
    pub tool: ToolDescriptor,
    /// Concrete version after "saas" resolution
    pub tool_version: String,
    pub adapter: Arc<dyn SastAdapter>,
    pub instance: Instance,
    pub error: bool,
    pub extracted: bool,
    pub measurement: Option<Measurement>,
}

/// Item of the `in_queue`: everything a worker needs to drive one launch.
pub(crate) struct JobRequest {
    pub job_id: Uuid,
    pub adapter: Arc<dyn SastAdapter>,
    pub src_dir: PathBuf,
    pub language: Language,
    pub output_dir: PathBuf,
    pub lib_dir: Option<PathBuf>,
}

/// Item of the `out_queue`: a finished launch, successful or not.
pub(crate) struct JobOutcome {
    pub job_id: Uuid,
    /// `None` when the launch failed; the job is still marked done
    pub result_file: Option<PathBuf>,
}

/// Reference to one job or pattern in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct JobRef {
    pub pattern_id: u32,
    pub instance_id: Option<u32>,
    pub tool: Option<String>,
}

impl JobRef {
    pub fn pattern(pattern_id: u32) -> Self {
        Self {
            pattern_id,
            instance_id: None,
            tool: None,
        }
    }

    pub fn job(pattern_id: u32, instance_id: u32, tool: &str) -> Self {
        Self {
            pattern_id,
            instance_id: Some(instance_id),
            tool: Some(tool.to_string()),
        }
    }
}

/// Outcome of one `measure` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct MeasureSummary {
    /// Shared timestamp carried by every measurement of this invocation
    pub date: DateTime<Utc>,
    /// Patterns that could not be loaded (with per-job detail where known)
    pub sast_job_collection_error: Vec<JobRef>,
    /// Jobs whose launch or inspection failed
    pub sast_job_execution_error: Vec<JobRef>,
    /// Jobs that produced a measurement
    pub sast_job_execution_valid: Vec<JobRef>,
    /// Ids of patterns that produced no measurement at all
    pub not_measured_patterns_ids: Vec<u32>,
    /// Measurement files written by this invocation
    pub measurement_files: Vec<PathBuf>,
}
