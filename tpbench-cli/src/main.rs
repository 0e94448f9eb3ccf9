//! tpbench command-line front-end
//!
//! Thin dispatch layer over the measurement and discovery engines. All
//! heavy lifting lives in the engine crates; this binary resolves
//! configuration, initialises tracing, and prints per-phase one-liners.

mod commands;
mod exit_codes;

use clap::{Parser, Subcommand};

use tpbench_core::{init_tracing, Config};

#[derive(Parser, Debug)]
#[command(
    name = "tpbench",
    version,
    about = "Testability pattern workbench: measure SAST tools against a pattern catalogue and discover pattern occurrences via CPG queries"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run SAST tools against pattern instances and persist the verdicts
    Measure(commands::measure::MeasureArgs),
    /// Discover pattern occurrences in a target source tree
    Discover(commands::discover::DiscoverArgs),
    /// Run explicit discovery rules against a target source tree
    ManualDiscovery(commands::manual::ManualDiscoveryArgs),
    /// Export a CSV/JSON report of the latest measurements
    Report(commands::report::ReportArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tpbench: failed to load configuration: {}", e);
            std::process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("tpbench: failed to initialise logging: {}", e);
        std::process::exit(exit_codes::CONFIG_ERROR);
    }

    let outcome = match cli.command {
        Commands::Measure(args) => commands::measure::run(args, &config).await,
        Commands::Discover(args) => commands::discover::run(args, &config).await,
        Commands::ManualDiscovery(args) => commands::manual::run(args, &config).await,
        Commands::Report(args) => commands::report::run(args, &config).await,
    };

    if let Err(e) = outcome {
        tracing::error!("{:#}", e);
        eprintln!("tpbench: {:#}", e);
        std::process::exit(exit_codes::FAILURE);
    }
}
