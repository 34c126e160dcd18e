//! Analysis and reporting for Renderbench.
//!
//! This crate provides:
//! - Summary statistics over collected render samples
//! - Performance grading and text/JSON reports
//! - The export record handed to external sinks

pub mod export;
pub mod report;
pub mod stats;

pub use export::{export_filename, export_filename_at, ExportRecord};
pub use report::{Grade, Report};
pub use stats::{compute, long_task_ratio, LONG_TASK_THRESHOLD_MS};
