use crate::stats::{long_task_ratio, LONG_TASK_THRESHOLD_MS};
use renderbench_core::{Result, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Number of commits shown in the recent-trend strip.
pub const RECENT_WINDOW: usize = 50;

/// Commits at or under this many milliseconds are graded good.
pub const GOOD_THRESHOLD_MS: f64 = 8.0;

/// Coarse performance grade of a commit duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Good,
    Fair,
    /// Over the 60fps frame budget.
    Poor,
}

impl Grade {
    pub fn of(duration_ms: f64) -> Self {
        if duration_ms > LONG_TASK_THRESHOLD_MS {
            Grade::Poor
        } else if duration_ms > GOOD_THRESHOLD_MS {
            Grade::Fair
        } else {
            Grade::Good
        }
    }

    /// Grade of a whole trial, judged by its p95 commit.
    pub fn of_snapshot(snapshot: &StatsSnapshot) -> Self {
        Self::of(snapshot.p95_actual_duration)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Good => "good",
            Grade::Fair => "fair",
            Grade::Poor => "needs improvement",
        }
    }

    fn glyph(&self) -> char {
        match self {
            Grade::Good => '.',
            Grade::Fair => 'o',
            Grade::Poor => '#',
        }
    }
}

/// Generates human-readable and machine-readable reports.
pub struct Report {
    title: String,
    stats: StatsSnapshot,
}

impl Report {
    pub fn new(title: impl Into<String>, stats: StatsSnapshot) -> Self {
        Self {
            title: title.into(),
            stats,
        }
    }

    /// Generate a human-readable text report.
    pub fn to_text(&self) -> String {
        let stats = &self.stats;
        let mut out = String::new();

        let _ = writeln!(out, "== {} ==", self.title);
        if stats.is_empty() {
            let _ = writeln!(out, "No commits recorded.");
            return out;
        }

        let _ = writeln!(
            out,
            "Commits:     {} (mount {}, update {})",
            stats.total_commits, stats.mount_commits, stats.update_commits
        );
        let _ = writeln!(
            out,
            "Duration:    avg {:.2} ms, min {:.2} ms, max {:.2} ms, total {:.2} ms",
            stats.average_actual_duration,
            stats.min_actual_duration,
            stats.max_actual_duration,
            stats.total_actual_duration
        );
        let _ = writeln!(
            out,
            "Percentiles: p50 {:.2} ms, p95 {:.2} ms",
            stats.p50_actual_duration, stats.p95_actual_duration
        );
        let ratio = match long_task_ratio(stats) {
            Some(ratio) => format!("{:.1}%", ratio * 100.0),
            None => "n/a".to_string(),
        };
        let _ = writeln!(
            out,
            "Long tasks:  {} over {} ms ({})",
            stats.long_tasks, LONG_TASK_THRESHOLD_MS, ratio
        );

        let grade = Grade::of_snapshot(stats);
        let _ = write!(out, "Grade:       {} (p95 {:.2} ms", grade.label(), stats.p95_actual_duration);
        if grade == Grade::Poor {
            let _ = write!(out, ", over the 60fps budget");
        }
        let _ = writeln!(out, ")");

        let recent = stats.recent(RECENT_WINDOW);
        let strip: String = recent.iter().map(|s| Grade::of(s.actual_duration).glyph()).collect();
        let _ = writeln!(out, "Recent {:>3}:  {}", recent.len(), strip);

        out
    }

    /// Generate a JSON report.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.stats)?)
    }
}
