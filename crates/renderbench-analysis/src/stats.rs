//! Summary statistics over a trial's samples.

use renderbench_core::{Phase, Sample, StatsSnapshot};

/// Commits slower than this (in milliseconds) miss a 60fps frame.
pub const LONG_TASK_THRESHOLD_MS: f64 = 16.67;

pub const P50: f64 = 0.50;
pub const P95: f64 = 0.95;

/// Nearest-rank index for percentile `p` in an ascending sequence of `len` values.
///
/// This is `floor(len * p)` with no interpolation. For `p < 1` and `len > 0`
/// the result is always in range.
pub fn percentile_index(len: usize, p: f64) -> usize {
    (len as f64 * p).floor() as usize
}

/// Value at percentile `p` of an ascending-sorted slice, or 0 if the index is out of range.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    sorted.get(percentile_index(sorted.len(), p)).copied().unwrap_or(0.0)
}

pub fn is_long_task(actual_duration: f64) -> bool {
    actual_duration > LONG_TASK_THRESHOLD_MS
}

/// Compute the summary statistics of `samples`.
///
/// An empty slice yields the all-zero snapshot. The returned snapshot owns a
/// copy of `samples`, in the given order.
pub fn compute(samples: &[Sample]) -> StatsSnapshot {
    if samples.is_empty() {
        return StatsSnapshot::empty();
    }

    let mut durations: Vec<f64> = samples.iter().map(|s| s.actual_duration).collect();
    durations.sort_by(f64::total_cmp);

    let mount_commits = samples.iter().filter(|s| s.phase == Phase::Mount).count();
    let update_commits = samples.iter().filter(|s| s.phase == Phase::Update).count();
    let long_tasks = durations.iter().filter(|d| is_long_task(**d)).count();

    let total_actual_duration: f64 = durations.iter().sum();
    let average_actual_duration = total_actual_duration / durations.len() as f64;

    StatsSnapshot {
        total_commits: samples.len(),
        mount_commits,
        update_commits,
        total_actual_duration,
        average_actual_duration,
        max_actual_duration: durations[durations.len() - 1],
        min_actual_duration: durations[0],
        p50_actual_duration: percentile(&durations, P50),
        p95_actual_duration: percentile(&durations, P95),
        long_tasks,
        data: samples.to_vec(),
    }
}

/// Share of commits that were long tasks, or `None` for a snapshot without commits.
pub fn long_task_ratio(snapshot: &StatsSnapshot) -> Option<f64> {
    if snapshot.total_commits == 0 {
        return None;
    }
    Some(snapshot.long_tasks as f64 / snapshot.total_commits as f64)
}
