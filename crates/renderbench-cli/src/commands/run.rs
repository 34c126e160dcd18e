//! Run command: drive a synthetic workload through one timed trial.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use renderbench_analysis::Report;
use renderbench_runtime::{
    derive_frequency, ExperimentRunner, RefreshMode, RenderSink, RunnerConfig, Ticker,
};

use crate::workload::Scene;
use crate::RunArgs;

/// Trial length when neither a flag nor a config file sets one.
const DEFAULT_DURATION_MS: u64 = 10_000;

fn load_config_file(path: &Path) -> Result<RunnerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Merge the optional config file with the command-line flags; flags win.
fn resolve_config(args: &RunArgs, file: Option<RunnerConfig>) -> RunnerConfig {
    let from_file = file.is_some();
    let mut config = file.unwrap_or_else(|| {
        RunnerConfig::new(format!("{}-{}", args.workload.name(), args.strategy.name()))
            .with_title(format!(
                "{} workload ({})",
                args.workload.name(),
                args.strategy.name()
            ))
            .with_duration(Duration::from_millis(DEFAULT_DURATION_MS))
    });

    if let Some(profiler_id) = &args.profiler_id {
        config.profiler_id = profiler_id.clone();
        if !from_file && args.title.is_none() {
            config.title = profiler_id.clone();
        }
    }
    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    if let Some(duration_ms) = args.duration_ms {
        config.duration_ms = Some(duration_ms);
    }
    if let Some(refresh_ms) = args.refresh_ms {
        config.refresh_interval_ms = refresh_ms;
    }
    if args.live {
        config.refresh_mode = RefreshMode::Live;
    }
    config
}

fn output_path(output: &Path, runner: &ExperimentRunner) -> PathBuf {
    if output.is_dir() {
        output.join(runner.export_filename())
    } else {
        output.to_path_buf()
    }
}

/// Run command: start a trial, render on every tick until it stops, then report.
pub async fn run(args: RunArgs) -> Result<()> {
    if !(args.tick_divisor > 0.0) {
        bail!("--tick-divisor must be positive, got {}", args.tick_divisor);
    }

    let file = args.config.as_deref().map(load_config_file).transpose()?;
    let config = resolve_config(&args, file);
    let frequency = derive_frequency(args.hz / args.tick_divisor);

    println!(
        "Running '{}' ({} workload, {} strategy) at {} Hz...",
        config.title,
        args.workload.name(),
        args.strategy.name(),
        frequency
    );
    match config.auto_stop() {
        Some(after) => println!("Auto-stop after {:.1}s (Ctrl-C stops early)", after.as_secs_f64()),
        None => println!("Press Ctrl-C to stop"),
    }
    println!();

    let runner = ExperimentRunner::new(config)?;
    let sink = runner.collector();
    let mut scene = Scene::new(runner.config().profiler_id.clone(), args.workload, args.strategy);

    runner.start();
    sink.on_render(scene.commit(0));

    let mut ticker = Ticker::start(frequency)?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            tick = ticker.next() => match tick {
                Some(step) => sink.on_render(scene.commit(step)),
                None => break,
            },
            _ = runner.wait_until_idle() => break,
            _ = &mut ctrl_c => {
                println!("Interrupted, stopping trial...");
                runner.stop();
                break;
            }
        }
    }
    ticker.cancel();
    runner.stop();

    let stats = runner.snapshot();
    print!("{}", Report::new(runner.config().title.clone(), (*stats).clone()).to_text());

    if let Some(output) = &args.output {
        let path = output_path(output, &runner);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        runner.download(BufWriter::new(file))?;
        println!();
        println!("Export written to {}", path.display());
    }

    Ok(())
}
