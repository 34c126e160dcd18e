//! Summary statistics and trial state.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Point-in-time summary of a trial's samples.
///
/// A snapshot is a value: it owns a copy of the samples it was computed
/// from and is never mutated after it is published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_commits: usize,
    pub mount_commits: usize,
    pub update_commits: usize,
    pub total_actual_duration: f64,
    pub average_actual_duration: f64,
    pub max_actual_duration: f64,
    pub min_actual_duration: f64,
    pub p50_actual_duration: f64,
    pub p95_actual_duration: f64,
    /// Commits slower than the 60fps frame budget
    pub long_tasks: usize,
    /// All samples in append order
    pub data: Vec<Sample>,
}

impl StatsSnapshot {
    /// The all-zero snapshot of a trial with no samples.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_commits == 0
    }

    /// The last `n` samples in append order (fewer if the trial is shorter).
    pub fn recent(&self, n: usize) -> &[Sample] {
        let start = self.data.len().saturating_sub(n);
        &self.data[start..]
    }
}

/// Lifecycle state of an experiment runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrialState {
    #[default]
    Idle,
    /// Instrumentation is active and samples are being collected.
    Collecting,
}

impl TrialState {
    pub fn is_active(&self) -> bool {
        matches!(self, TrialState::Collecting)
    }
}
