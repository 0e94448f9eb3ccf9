//! Discover command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::Language;
use tpbench_discovery::DiscoveryEngine;

use super::{open_store, output_dir, parse_tools, resolve_patterns};

/// Arguments for the discover command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Target source directory to analyse
    #[arg(short, long)]
    pub src_dir: PathBuf,

    /// Language of the patterns (e.g. PHP)
    #[arg(short, long)]
    pub language: String,

    /// Pattern ids to discover
    #[arg(short, long, num_args = 1..)]
    pub patterns: Vec<u32>,

    /// Discover every pattern of the language
    #[arg(short = 'a', long, conflicts_with = "patterns")]
    pub all: bool,

    /// Tools as name:version pairs; their measurements gate discovery
    #[arg(long, num_args = 1.., required = true)]
    pub tools: Vec<String>,

    /// Name for the generated CPG (defaults to the source directory name)
    #[arg(short, long)]
    pub build_name: Option<String>,

    /// Run discovery rules even for patterns without measurements
    #[arg(long)]
    pub ignore_measurements: bool,

    /// Pattern library root (overrides configuration)
    #[arg(long)]
    pub tp_lib: Option<PathBuf>,

    /// Output directory (overrides configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: DiscoverArgs, config: &Config) -> Result<()> {
    let language = Language::new(&args.language);
    let store = open_store(args.tp_lib.as_ref(), config)?;
    let out_dir = output_dir(args.output.as_ref(), config);
    let tools = parse_tools(&args.tools)?;
    let pattern_ids = resolve_patterns(&store, &language, &args.patterns, args.all)?;
    let build_name = args.build_name.clone().unwrap_or_else(|| {
        args.src_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string())
    });

    let engine = DiscoveryEngine::for_language(store, config, &language)?;
    let summary = engine
        .discover(
            &args.src_dir,
            &pattern_ids,
            &language,
            &tools,
            &build_name,
            &out_dir,
            args.ignore_measurements,
        )
        .await?;

    println!(
        "discovered {} finding(s) from {} pattern(s); {} pattern(s) ignored without measurements; CSV at {}",
        summary.findings,
        summary.used_measured_patterns_ids.len(),
        summary.ignored_not_measured_patterns_ids.len(),
        summary.csv_path.display(),
    );
    Ok(())
}
