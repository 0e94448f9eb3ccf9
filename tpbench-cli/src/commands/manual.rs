//! Manual discovery command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::Language;
use tpbench_discovery::DiscoveryEngine;

use super::{open_store, output_dir};

/// Arguments for the manual-discovery command
#[derive(Args, Debug)]
pub struct ManualDiscoveryArgs {
    /// Target source directory to analyse
    #[arg(short, long)]
    pub src_dir: PathBuf,

    /// Discovery method the rules are written for
    #[arg(short, long, default_value = "joern")]
    pub method: String,

    /// Rule files or directories (directories are searched recursively)
    #[arg(short, long, num_args = 1.., required = true)]
    pub rules: Vec<PathBuf>,

    /// Language used to pick the CPG generator (e.g. PHP)
    #[arg(short, long)]
    pub language: String,

    /// Name for the generated CPG (defaults to the source directory name)
    #[arg(short, long)]
    pub build_name: Option<String>,

    /// Per-rule timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Pattern library root (overrides configuration)
    #[arg(long)]
    pub tp_lib: Option<PathBuf>,

    /// Output directory (overrides configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ManualDiscoveryArgs, config: &Config) -> Result<()> {
    let language = Language::new(&args.language);
    let store = open_store(args.tp_lib.as_ref(), config)?;
    let out_dir = output_dir(args.output.as_ref(), config);
    let build_name = args.build_name.clone().unwrap_or_else(|| {
        args.src_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string())
    });

    let engine = DiscoveryEngine::for_language(store, config, &language)?;
    let summary = engine
        .manual_discovery(
            &args.src_dir,
            &args.method,
            &args.rules,
            &build_name,
            &out_dir,
            args.timeout.map(Duration::from_secs),
        )
        .await?;

    println!(
        "executed {} rule(s), {} finding(s); CSV at {}",
        summary.executed_rules,
        summary.findings,
        summary.csv_path.display(),
    );
    Ok(())
}
