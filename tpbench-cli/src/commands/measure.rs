//! Measure command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::Language;
use tpbench_measure::MeasurementEngine;
use tpbench_sast::AdapterRegistry;

use super::{open_store, output_dir, parse_tools, resolve_patterns};

/// Arguments for the measure command
#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Language of the patterns (e.g. PHP)
    #[arg(short, long)]
    pub language: String,

    /// Pattern ids to measure
    #[arg(short, long, num_args = 1..)]
    pub patterns: Vec<u32>,

    /// Measure every pattern of the language
    #[arg(short = 'a', long, conflicts_with = "patterns")]
    pub all: bool,

    /// Tools as name:version pairs
    #[arg(long, num_args = 1.., required = true)]
    pub tools: Vec<String>,

    /// Number of cooperative workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Pattern library root (overrides configuration)
    #[arg(long)]
    pub tp_lib: Option<PathBuf>,

    /// Output directory (overrides configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: MeasureArgs, config: &Config) -> Result<()> {
    let language = Language::new(&args.language);
    let store = open_store(args.tp_lib.as_ref(), config)?;
    let out_dir = output_dir(args.output.as_ref(), config);
    let tools = parse_tools(&args.tools)?;
    let pattern_ids = resolve_patterns(&store, &language, &args.patterns, args.all)?;

    let mut config = config.clone();
    if let Some(workers) = args.workers {
        config.measurement.workers = workers;
    }

    let registry = Arc::new(AdapterRegistry::from_config(&config)?);
    let engine = MeasurementEngine::new(store, registry, &config);
    let summary = engine.measure(&pattern_ids, &language, &tools, &out_dir).await?;

    println!(
        "measured {} job(s) ok, {} job error(s), {} pattern(s) not measured; {} file(s) written",
        summary.sast_job_execution_valid.len(),
        summary.sast_job_execution_error.len(),
        summary.not_measured_patterns_ids.len(),
        summary.measurement_files.len(),
    );
    Ok(())
}
