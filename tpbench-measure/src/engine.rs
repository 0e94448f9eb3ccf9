//! The measurement engine
//!
//! A single-threaded cooperative pipeline over two FIFO queues: workers
//! drain `in_queue`, awaiting one SAST launch at a time, and push outcomes
//! onto `out_queue`; the harvester is the sole consumer of `out_queue` and
//! correlates outcomes back to their jobs by id. Both queues are
//! constructed per invocation and threaded through the tasks, never shared
//! process-wide.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tpbench_core::config::Config;
use tpbench_core::domain::catalog::{CatalogError, Measurement};
use tpbench_core::domain::value_objects::{Language, ToolDescriptor};
use tpbench_core::infrastructure::CatalogStore;
use tpbench_core::logging::RunLog;
use tpbench_sast::{AdapterRegistry, SastError};

use crate::job::{JobOutcome, JobRef, JobRequest, MeasureSummary, SastJob};

/// Fatal measurement errors. Per-pattern and per-job problems never land
/// here; they are collected into the [`MeasureSummary`].
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Sast(#[from] SastError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Measures how SAST tools behave on catalogue instances.
pub struct MeasurementEngine {
    store: CatalogStore,
    registry: Arc<AdapterRegistry>,
    workers: usize,
    log_filename: String,
}

impl MeasurementEngine {
    pub fn new(store: CatalogStore, registry: Arc<AdapterRegistry>, config: &Config) -> Self {
        Self {
            store,
            registry,
            workers: config.measurement.workers,
            log_filename: config.logging.log_filename.clone(),
        }
    }

    /// Run every requested (pattern instance × tool) job and persist the
    /// verdicts.
    ///
    /// All measurements of one invocation share a single timestamp, and
    /// each targeted instance ends up with exactly one measurement file
    /// carrying that timestamp. No job is ever retried.
    pub async fn measure(
        &self,
        pattern_ids: &[u32],
        language: &Language,
        tools: &[ToolDescriptor],
        output_dir: &Path,
    ) -> Result<MeasureSummary, MeasureError> {
        let date = Utc::now();
        let mut run_log = RunLog::open(output_dir, &self.log_filename)?;

        // Fatal preconditions: unknown tools, or nothing left after the
        // language filter.
        let supported = self.registry.filter_for_language(tools, language)?;
        let mut resolved = Vec::with_capacity(supported.len());
        for (descriptor, adapter) in supported {
            let version = adapter.tool_version().await;
            resolved.push((descriptor, adapter, version));
        }
        run_log.phase(&format!(
            "measurement: {} tool(s) support {}, {} pattern(s) requested",
            resolved.len(),
            language,
            pattern_ids.len()
        ));

        // Enumerate jobs; a pattern that fails to load is skipped, not fatal.
        let mut jobs: HashMap<Uuid, SastJob> = HashMap::new();
        let mut requests: Vec<JobRequest> = Vec::new();
        let mut collection_errors: Vec<JobRef> = Vec::new();
        let mut not_measured: Vec<u32> = Vec::new();

        for &pattern_id in pattern_ids {
            let pattern = match self.store.load_pattern(pattern_id, language) {
                Ok(pattern) => pattern,
                Err(e) => {
                    run_log.warn(&format!("pattern {}: not measured: {}", pattern_id, e));
                    collection_errors.push(JobRef::pattern(pattern_id));
                    not_measured.push(pattern_id);
                    continue;
                }
            };
            for instance in pattern.instances() {
                for (descriptor, adapter, version) in &resolved {
                    let job_id = Uuid::new_v4();
                    jobs.insert(
                        job_id,
                        SastJob {
                            tool: descriptor.clone(),
                            tool_version: version.clone(),
                            adapter: adapter.clone(),
                            instance: instance.clone(),
                            error: false,
                            extracted: false,
                            measurement: None,
                        },
                    );
                    requests.push(JobRequest {
                        job_id,
                        adapter: adapter.clone(),
                        src_dir: instance.directory().to_path_buf(),
                        language: language.clone(),
                        output_dir: output_dir.join(format!("sast_{}", job_id.simple())),
                        lib_dir: None,
                    });
                }
            }
        }

        let total = jobs.len();
        run_log.phase(&format!("measurement: {} job(s) scheduled", total));

        // Per-invocation queues, sized so enumeration never blocks.
        let (in_tx, in_rx) = mpsc::channel::<JobRequest>(total.max(1));
        let (out_tx, mut out_rx) = mpsc::channel::<JobOutcome>(total.max(1));
        for request in requests {
            // Capacity equals the job count, so this never suspends.
            in_tx.send(request).await.expect("in_queue closed early");
        }
        drop(in_tx);

        // Worker pool: exactly `workers` cooperative tasks, each awaiting
        // one launch at a time. A failed launch enqueues a null outcome and
        // the worker moves on.
        let in_rx = Arc::new(Mutex::new(in_rx));
        let mut worker_handles = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let in_rx = in_rx.clone();
            let out_tx = out_tx.clone();
            worker_handles.push(tokio::spawn(async move {
                loop {
                    let request = { in_rx.lock().await.recv().await };
                    let Some(request) = request else { break };
                    let job_id = request.job_id;
                    let result_file = match request
                        .adapter
                        .launch(
                            &request.src_dir,
                            &request.language,
                            &request.output_dir,
                            request.lib_dir.as_deref(),
                            true,
                        )
                        .await
                    {
                        Ok(path) => Some(path),
                        Err(e) => {
                            warn!(worker, %job_id, error = %e, "SAST launch failed");
                            None
                        }
                    };
                    if out_tx.send(JobOutcome { job_id, result_file }).await.is_err() {
                        break;
                    }
                }
                debug!(worker, "Measurement worker drained in_queue");
            }));
        }
        // The harvester keeps one sender so already-extracted items can be
        // pushed back instead of dropped.
        let requeue_tx = out_tx;

        // Harvest: match every outcome to its job, inspect, and attach the
        // verdict.
        let mut remaining = total;
        while remaining > 0 {
            let Some(outcome) = out_rx.recv().await else {
                break;
            };
            let Some(job) = jobs.get_mut(&outcome.job_id) else {
                warn!(job_id = %outcome.job_id, "Outcome for unknown job dropped");
                continue;
            };
            if job.extracted {
                // Already handled; push back rather than lose a sibling item.
                let _ = requeue_tx.send(outcome).await;
                continue;
            }

            match outcome.result_file {
                Some(result_file) => {
                    let adapter = job.adapter.clone();
                    match adapter.inspect(&result_file, language).await {
                        Ok(findings) => {
                            job.measurement = Some(Measurement::define(
                                &findings,
                                &job.instance,
                                self.store.tp_lib(),
                                date,
                                &job.tool.name,
                                &job.tool_version,
                            ));
                        }
                        Err(e) => {
                            job.error = true;
                            run_log.warn(&format!(
                                "pattern {} instance {} tool {}: inspection failed: {}",
                                job.instance.pattern_id(),
                                job.instance.instance_id(),
                                job.tool.name,
                                e
                            ));
                        }
                    }
                }
                None => job.error = true,
            }
            job.extracted = true;
            remaining -= 1;
        }

        for handle in worker_handles {
            let _ = handle.await;
        }

        // Summarise and persist, one file per instance at the shared
        // timestamp.
        let mut execution_valid = Vec::new();
        let mut execution_error = Vec::new();
        let mut measurements = Vec::new();
        for job in jobs.values() {
            let job_ref = JobRef::job(
                job.instance.pattern_id(),
                job.instance.instance_id(),
                &job.tool.name,
            );
            match (&job.measurement, job.error) {
                (Some(measurement), false) => {
                    measurements.push(measurement.clone());
                    execution_valid.push(job_ref);
                }
                _ => execution_error.push(job_ref),
            }
        }
        execution_valid.sort();
        execution_error.sort();
        collection_errors.sort();
        not_measured.sort_unstable();

        let measurement_files = self.store.save_measurements(&measurements)?;
        run_log.phase(&format!(
            "measurement: {} verdict(s) saved into {} file(s), {} job error(s), {} pattern(s) not measured",
            measurements.len(),
            measurement_files.len(),
            execution_error.len(),
            not_measured.len()
        ));
        info!(
            valid = execution_valid.len(),
            errors = execution_error.len(),
            not_measured = not_measured.len(),
            "Measurement finished"
        );

        Ok(MeasureSummary {
            date,
            sast_job_collection_error: collection_errors,
            sast_job_execution_error: execution_error,
            sast_job_execution_valid: execution_valid,
            not_measured_patterns_ids: not_measured,
            measurement_files,
        })
    }
}
