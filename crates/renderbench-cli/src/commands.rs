//! Command implementations for the Renderbench CLI.

mod run;

pub use run::run;

use crate::workload::Workload;
use anyhow::{Context, Result};
use renderbench_analysis::{ExportRecord, Report};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Analyze command: print the report of an exported record.
pub fn analyze(path: &Path, json: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let record = ExportRecord::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse export record {}", path.display()))?;

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trial".to_string());
    let report = Report::new(title, record.stats);

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("Collected at: {}", record.collected_at);
        println!();
        print!("{}", report.to_text());
    }
    Ok(())
}

/// Workloads command: list the synthetic workloads.
pub fn list_workloads() -> Result<()> {
    println!("Available workloads: {}", Workload::ALL.len());
    println!();
    for workload in Workload::ALL {
        println!("  {:<12} {}", workload.name(), workload.description());
    }
    println!();
    println!("Strategies: baseline (recompute every commit), memo (reuse while input is unchanged)");
    Ok(())
}
