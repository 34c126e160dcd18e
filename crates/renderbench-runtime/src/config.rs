//! Experiment runner configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence of the status refresh while a trial is collecting.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 500;

/// In quiet mode, log progress once every this many refreshes (5 s at the default cadence).
pub const DEFAULT_PROGRESS_LOG_EVERY: u32 = 10;

/// What the periodic refresh does while a trial is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Publish a fresh snapshot on every refresh.
    Live,
    /// Publish only at start, stop and reset; log progress in between.
    #[default]
    Quiet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Opaque label attached to logs and export file names
    pub profiler_id: String,
    /// Human-readable trial title
    pub title: String,
    /// Stop automatically this long after `start()`. `None` or 0 means manual stop only.
    pub duration_ms: Option<u64>,
    pub refresh_interval_ms: u64,
    pub refresh_mode: RefreshMode,
    pub progress_log_every: u32,
}

impl RunnerConfig {
    pub fn new(profiler_id: impl Into<String>) -> Self {
        let profiler_id = profiler_id.into();
        Self {
            title: profiler_id.clone(),
            profiler_id,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn with_progress_log_every(mut self, every: u32) -> Self {
        self.progress_log_every = every;
        self
    }

    /// The auto-stop delay, if one is configured.
    pub fn auto_stop(&self) -> Option<Duration> {
        self.duration_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// The refresh period, never shorter than one millisecond.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            profiler_id: "profiler".to_string(),
            title: "profiler".to_string(),
            duration_ms: None,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            refresh_mode: RefreshMode::default(),
            progress_log_every: DEFAULT_PROGRESS_LOG_EVERY,
        }
    }
}
