//! Core types for the Renderbench toolchain.
//!
//! This crate defines the data structures shared by the collector, the
//! statistics engine and the experiment runner. It contains no logic beyond
//! constructors and small accessors, plus the crate-wide error type.

pub mod error;
pub mod sample;
pub mod snapshot;

pub use error::{Error, Result};
pub use sample::{Phase, RenderEvent, Sample};
pub use snapshot::{StatsSnapshot, TrialState};
