//! Collection and trial runtime for Renderbench.
//!
//! This crate provides:
//! - The sample store and the ingestion handle given to instrumented code
//! - A periodic ticker for driving workloads
//! - The experiment runner that owns a trial's lifecycle and timers

pub mod config;
pub mod runner;
pub mod store;
pub mod ticker;

pub use config::{RefreshMode, RunnerConfig};
pub use runner::ExperimentRunner;
pub use store::{Collector, RenderSink, SampleStore};
pub use ticker::{derive_frequency, Ticker};
