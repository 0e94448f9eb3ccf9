//! tpbench-measure - the SAST measurement pipeline
//!
//! Given a list of pattern ids, a language, and a set of tools, the engine
//! enumerates every (instance, tool) job, schedules the jobs across a
//! bounded pool of cooperative workers, correlates each finished job with
//! its expectation, and persists per-instance timestamped measurement
//! records through the catalogue store.
//!
//! Failure of a single job never cancels its siblings; per-pattern and
//! per-job problems are collected into the run summary instead of being
//! raised.

pub mod engine;
pub mod job;
pub mod report;

pub use engine::{MeasureError, MeasurementEngine};
pub use job::{JobRef, MeasureSummary};
pub use report::export_report;
