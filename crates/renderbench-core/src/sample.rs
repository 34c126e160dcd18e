//! Render timing samples.

use serde::{Deserialize, Serialize};

/// Which kind of commit produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// First commit of a subtree since it was activated.
    Mount,
    /// Any later commit of the same subtree.
    Update,
}

/// A single commit as reported by an instrumented subtree.
///
/// This is what crosses the ingestion boundary. The collector turns it into
/// a [`Sample`] by stamping the time elapsed since the trial's reset.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    /// Identifier of the instrumented subtree
    pub id: String,
    pub phase: Phase,
    /// Time spent rendering this commit, in milliseconds
    pub actual_duration: f64,
    /// Estimated time to render the whole subtree without memoization, in milliseconds
    pub base_duration: f64,
    /// Monotonic time the render started, in milliseconds
    pub start_time: f64,
    /// Monotonic time the commit completed, in milliseconds
    pub commit_time: f64,
}

impl RenderEvent {
    pub fn new(id: impl Into<String>, phase: Phase, actual_duration: f64) -> Self {
        Self {
            id: id.into(),
            phase,
            actual_duration,
            base_duration: actual_duration,
            start_time: 0.0,
            commit_time: actual_duration,
        }
    }

    pub fn with_base_duration(mut self, base_duration: f64) -> Self {
        self.base_duration = base_duration;
        self
    }

    pub fn with_times(mut self, start_time: f64, commit_time: f64) -> Self {
        self.start_time = start_time;
        self.commit_time = commit_time;
        self
    }

    /// Freeze the event into a sample observed `timestamp` ms after the trial origin.
    pub fn into_sample(self, timestamp: f64) -> Sample {
        Sample {
            id: self.id,
            phase: self.phase,
            actual_duration: self.actual_duration,
            base_duration: self.base_duration,
            start_time: self.start_time,
            commit_time: self.commit_time,
            timestamp,
        }
    }
}

/// One observed render commit.
///
/// Field names serialize in camelCase to match the exported file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: String,
    pub phase: Phase,
    pub actual_duration: f64,
    pub base_duration: f64,
    pub start_time: f64,
    pub commit_time: f64,
    /// Milliseconds elapsed since the trial's reset
    pub timestamp: f64,
}
