//! CLI tool for Renderbench.
//!
//! Runs timed trials against synthetic workloads and analyzes exported results.

mod commands;
mod workload;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::workload::{Strategy, Workload};

#[derive(Parser)]
#[command(name = "renderbench")]
#[command(about = "Timed render trials and commit statistics", long_about = None)]
#[command(version)]
enum Commands {
    /// Run a timed trial against a synthetic workload
    Run(RunArgs),

    /// Print the report of an exported trial
    Analyze {
        /// Path to an exported JSON record
        path: PathBuf,

        /// Print the statistics as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the available workloads
    Workloads,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Workload rendered on every tick
    #[arg(long, short, value_enum, default_value = "medium-agg")]
    workload: Workload,

    /// Whether unchanged inputs are recomputed
    #[arg(long, short, value_enum, default_value = "baseline")]
    strategy: Strategy,

    /// Update rate in Hz
    #[arg(long, default_value_t = 20.0)]
    hz: f64,

    /// Divide the update rate by this before ticking
    #[arg(long, default_value_t = 1.0)]
    tick_divisor: f64,

    /// Stop automatically after this many milliseconds (0 runs until Ctrl-C)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Status refresh cadence in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Publish a snapshot on every refresh instead of only at the end
    #[arg(long)]
    live: bool,

    /// Label used in logs and the export file name
    #[arg(long)]
    profiler_id: Option<String>,

    /// Trial title shown in the report
    #[arg(long)]
    title: Option<String>,

    /// TOML file with runner settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the export record here (a directory gets a generated file name)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    match Commands::parse() {
        Commands::Run(args) => commands::run(args).await,
        Commands::Analyze { path, json } => commands::analyze(&path, json),
        Commands::Workloads => commands::list_workloads(),
    }
}
