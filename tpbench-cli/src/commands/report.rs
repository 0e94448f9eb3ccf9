//! Report command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::Language;
use tpbench_measure::export_report;

use super::{open_store, output_dir, parse_tools, resolve_patterns};

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Language of the patterns (e.g. PHP)
    #[arg(short, long)]
    pub language: String,

    /// Pattern ids to include
    #[arg(short, long, num_args = 1..)]
    pub patterns: Vec<u32>,

    /// Include every pattern of the language
    #[arg(short = 'a', long, conflicts_with = "patterns")]
    pub all: bool,

    /// Tools as name:version pairs
    #[arg(long, num_args = 1.., required = true)]
    pub tools: Vec<String>,

    /// Pattern library root (overrides configuration)
    #[arg(long)]
    pub tp_lib: Option<PathBuf>,

    /// Output directory (overrides configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ReportArgs, config: &Config) -> Result<()> {
    let language = Language::new(&args.language);
    let store = open_store(args.tp_lib.as_ref(), config)?;
    let out_dir = output_dir(args.output.as_ref(), config);
    let tools = parse_tools(&args.tools)?;
    let pattern_ids = resolve_patterns(&store, &language, &args.patterns, args.all)?;

    let paths = export_report(&store, &language, &pattern_ids, &tools, &out_dir)?;
    println!("report written to {} and {}", paths.csv.display(), paths.json.display());
    Ok(())
}
