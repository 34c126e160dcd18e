//! Trial lifecycle: start, periodic refresh, auto-stop and finalization.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use renderbench_analysis::{export_filename, ExportRecord};
use renderbench_core::{Error, Result, StatsSnapshot, TrialState};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::{RefreshMode, RunnerConfig};
use crate::store::Collector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    Manual,
    AutoStop,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Manual => write!(f, "manual"),
            StopCause::AutoStop => write!(f, "auto-stop"),
        }
    }
}

/// Holds at most one pending timer task. The task is aborted when the slot
/// is re-armed, cancelled or dropped.
#[derive(Default)]
struct TimerSlot(Option<JoinHandle<()>>);

impl TimerSlot {
    fn arm(&mut self, task: JoinHandle<()>) {
        self.cancel();
        self.0 = Some(task);
    }

    fn cancel(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }

    fn is_armed(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Default)]
struct Control {
    state: TrialState,
    /// Incremented on every start; timer tasks only act on their own trial.
    trial: u64,
    refresh: TimerSlot,
    auto_stop: TimerSlot,
}

struct Inner {
    config: RunnerConfig,
    collector: Collector,
    control: Mutex<Control>,
    published: watch::Sender<Arc<StatsSnapshot>>,
    state: watch::Sender<TrialState>,
    handle: Handle,
}

impl Inner {
    fn publish(&self, stats: StatsSnapshot) {
        self.published.send_replace(Arc::new(stats));
    }

    fn set_state(&self, control: &mut Control, state: TrialState) {
        control.state = state;
        self.state.send_replace(state);
    }

    /// Periodic refresh for `trial`. Returns false once the trial is over.
    fn refresh(&self, trial: u64, refreshes: u32) -> bool {
        let control = self.control.lock();
        if control.trial != trial || !control.state.is_active() {
            return false;
        }

        let stats = self.collector.stats();
        let every = self.config.progress_log_every;
        if every > 0 && refreshes % every == 0 {
            info!(
                profiler = %self.config.profiler_id,
                commits = stats.total_commits,
                average_ms = stats.average_actual_duration,
                "trial in progress"
            );
        }
        if self.config.refresh_mode == RefreshMode::Live {
            self.publish(stats);
        }
        true
    }

    /// Move to idle, release both timers and publish the final snapshot.
    ///
    /// With `trial` set, only that trial may be stopped. Returns false if
    /// nothing was stopped.
    fn finish(&self, trial: Option<u64>, cause: StopCause) -> bool {
        let mut control = self.control.lock();
        if !control.state.is_active() || trial.is_some_and(|t| t != control.trial) {
            debug!(profiler = %self.config.profiler_id, %cause, "stop ignored, no trial running");
            return false;
        }

        self.set_state(&mut control, TrialState::Idle);
        control.refresh.cancel();
        control.auto_stop.cancel();

        let stats = self.collector.seal();
        info!(
            profiler = %self.config.profiler_id,
            %cause,
            commits = stats.total_commits,
            average_ms = stats.average_actual_duration,
            p95_ms = stats.p95_actual_duration,
            long_tasks = stats.long_tasks,
            "trial finished"
        );
        self.publish(stats);
        true
    }
}

async fn refresh_loop(runner: Weak<Inner>, trial: u64, first: Instant, period: Duration) {
    let mut interval = time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refreshes = 0u32;
    loop {
        interval.tick().await;
        let Some(inner) = runner.upgrade() else {
            break;
        };
        refreshes = refreshes.wrapping_add(1);
        if !inner.refresh(trial, refreshes) {
            break;
        }
    }
}

async fn auto_stop(runner: Weak<Inner>, trial: u64, deadline: Instant) {
    time::sleep_until(deadline).await;
    if let Some(inner) = runner.upgrade() {
        inner.finish(Some(trial), StopCause::AutoStop);
    }
}

/// Coordinates timed trials over a shared [`Collector`].
///
/// Clones control the same runner. All timers run on the tokio runtime the
/// runner was created on; a current-thread runtime gives the cooperative,
/// single-threaded scheduling the trial logic is written for.
#[derive(Clone)]
pub struct ExperimentRunner {
    inner: Arc<Inner>,
}

impl ExperimentRunner {
    /// Create a runner on the current tokio runtime.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_handle(config, handle))
    }

    pub fn with_handle(config: RunnerConfig, handle: Handle) -> Self {
        let (published, _) = watch::channel(Arc::new(StatsSnapshot::empty()));
        let (state, _) = watch::channel(TrialState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                collector: Collector::with_accepting(false),
                control: Mutex::new(Control::default()),
                published,
                state,
                handle,
            }),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    /// The ingestion handle to give to instrumented code.
    ///
    /// Events are only recorded while a trial is collecting.
    pub fn collector(&self) -> Collector {
        self.inner.collector.clone()
    }

    pub fn state(&self) -> TrialState {
        self.inner.control.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Begin a trial. A no-op returning false if one is already running.
    pub fn start(&self) -> bool {
        let inner = &self.inner;
        let mut control = inner.control.lock();
        if control.state.is_active() {
            debug!(profiler = %inner.config.profiler_id, "start ignored, trial already running");
            return false;
        }

        let now = Instant::now();
        inner.collector.open_fresh();
        inner.publish(StatsSnapshot::empty());
        control.trial += 1;
        let trial = control.trial;
        inner.set_state(&mut control, TrialState::Collecting);

        let period = inner.config.refresh_interval();
        let task = inner
            .handle
            .spawn(refresh_loop(Arc::downgrade(inner), trial, now + period, period));
        control.refresh.arm(task);

        if let Some(after) = inner.config.auto_stop() {
            let task = inner
                .handle
                .spawn(auto_stop(Arc::downgrade(inner), trial, now + after));
            control.auto_stop.arm(task);
        }

        info!(
            profiler = %inner.config.profiler_id,
            title = %inner.config.title,
            trial,
            auto_stop_ms = inner.config.duration_ms.unwrap_or(0),
            "trial started"
        );
        true
    }

    /// End the running trial and publish its final snapshot.
    ///
    /// A no-op returning false if no trial is running. Once this returns, a
    /// pending auto-stop for the trial can no longer fire.
    pub fn stop(&self) -> bool {
        self.inner.finish(None, StopCause::Manual)
    }

    /// Discard the collected samples and publish an empty snapshot. The trial
    /// state is left as it is.
    pub fn reset_data(&self) {
        let control = self.inner.control.lock();
        self.inner.collector.reset();
        self.inner.publish(StatsSnapshot::empty());
        info!(profiler = %self.inner.config.profiler_id, state = ?control.state, "data reset");
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<StatsSnapshot> {
        self.inner.published.borrow().clone()
    }

    /// Receive every snapshot the runner publishes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StatsSnapshot>> {
        self.inner.published.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<TrialState> {
        self.inner.state.subscribe()
    }

    /// Statistics over everything collected so far, whether or not published.
    pub fn current_stats(&self) -> StatsSnapshot {
        self.inner.collector.stats()
    }

    /// Resolve once no trial is running.
    pub async fn wait_until_idle(&self) {
        let mut state = self.watch_state();
        let _ = state.wait_for(|s| !s.is_active()).await;
    }

    /// Write an export record of the collected data to `sink`.
    pub fn download<W: Write>(&self, sink: W) -> Result<()> {
        ExportRecord::new(self.current_stats())?.write_to(sink)
    }

    /// File name to suggest to the export sink.
    pub fn export_filename(&self) -> String {
        export_filename(&self.inner.config.profiler_id)
    }

    /// Whether the refresh and auto-stop timers are pending.
    pub fn timers_armed(&self) -> (bool, bool) {
        let control = self.inner.control.lock();
        (control.refresh.is_armed(), control.auto_stop.is_armed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RenderSink;
    use renderbench_core::{Phase, RenderEvent};

    fn runner(config: RunnerConfig) -> ExperimentRunner {
        ExperimentRunner::new(config).unwrap()
    }

    fn commit(sink: &Collector, phase: Phase, actual_duration: f64) {
        sink.on_render(RenderEvent::new("probe", phase, actual_duration));
    }

    #[test]
    fn test_new_requires_runtime() {
        assert!(matches!(
            ExperimentRunner::new(RunnerConfig::default()),
            Err(Error::NoRuntime)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop() {
        let runner = runner(RunnerConfig::new("basic"));
        let sink = runner.collector();

        commit(&sink, Phase::Mount, 1.0);
        assert!(sink.is_empty(), "idle runner must not record");

        assert!(runner.start());
        assert!(runner.is_active());
        assert_eq!(runner.timers_armed(), (true, false));

        commit(&sink, Phase::Mount, 5.0);
        commit(&sink, Phase::Update, 10.0);
        commit(&sink, Phase::Update, 20.0);

        assert!(runner.stop());
        assert_eq!(runner.state(), TrialState::Idle);
        assert_eq!(runner.timers_armed(), (false, false));

        let stats = runner.snapshot();
        assert_eq!(stats.total_commits, 3);
        assert_eq!(stats.mount_commits, 1);
        assert_eq!(stats.p50_actual_duration, 10.0);
        assert_eq!(stats.long_tasks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_is_noop() {
        let runner = runner(RunnerConfig::new("twice"));
        let sink = runner.collector();
        assert!(runner.start());
        commit(&sink, Phase::Mount, 2.0);

        assert!(!runner.start());
        assert_eq!(sink.len(), 1, "second start must not reset");
        assert!(runner.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_stop_is_idempotent() {
        let runner = runner(RunnerConfig::new("double"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 3.0);
        commit(&sink, Phase::Update, 4.0);

        assert!(runner.stop());
        let first = runner.snapshot();
        assert!(!runner.stop());
        assert_eq!(*runner.snapshot(), *first);
        assert!(!runner.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let runner = runner(RunnerConfig::new("idle"));
        assert!(!runner.stop());
        assert!(runner.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_clears_previous_trial() {
        let runner = runner(RunnerConfig::new("restart"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 3.0);
        runner.stop();
        assert_eq!(runner.snapshot().total_commits, 1);

        runner.start();
        assert!(runner.snapshot().is_empty());
        assert!(runner.current_stats().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_data_keeps_state() {
        let runner = runner(RunnerConfig::new("reset").with_refresh_mode(RefreshMode::Live));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 30.0);
        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(runner.snapshot().total_commits, 1);

        runner.reset_data();
        assert!(runner.is_active());
        assert_eq!(*runner.snapshot(), StatsSnapshot::empty());
        assert!(runner.current_stats().data.is_empty());

        commit(&sink, Phase::Update, 2.0);
        runner.stop();
        let stats = runner.snapshot();
        assert_eq!(stats.total_commits, 1);
        assert_eq!(stats.data[0].phase, Phase::Update);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_data_when_idle() {
        let runner = runner(RunnerConfig::new("idle-reset"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 1.0);
        runner.stop();

        runner.reset_data();
        assert_eq!(runner.state(), TrialState::Idle);
        assert!(runner.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_mode_publishes_on_refresh() {
        let runner = runner(RunnerConfig::new("live").with_refresh_mode(RefreshMode::Live));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 1.0);

        time::sleep(Duration::from_millis(499)).await;
        assert!(runner.snapshot().is_empty());
        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(runner.snapshot().total_commits, 1);

        commit(&sink, Phase::Update, 1.0);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runner.snapshot().total_commits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_mode_publishes_only_at_stop() {
        let runner = runner(RunnerConfig::new("quiet"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 1.0);

        time::sleep(Duration::from_millis(5_100)).await;
        assert!(runner.snapshot().is_empty());
        assert_eq!(runner.current_stats().total_commits, 1);

        runner.stop();
        assert_eq!(runner.snapshot().total_commits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_after_duration() {
        let config = RunnerConfig::new("auto").with_duration(Duration::from_millis(1000));
        let runner = runner(config);
        let sink = runner.collector();
        let started = Instant::now();
        runner.start();
        assert_eq!(runner.timers_armed(), (true, true));

        commit(&sink, Phase::Mount, 4.0);
        time::sleep(Duration::from_millis(999)).await;
        assert!(runner.is_active());
        commit(&sink, Phase::Update, 6.0);

        runner.wait_until_idle().await;
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(runner.state(), TrialState::Idle);
        assert_eq!(runner.timers_armed(), (false, false));

        let stats = runner.snapshot();
        assert_eq!(stats.total_commits, 2);
        assert_eq!(stats.total_actual_duration, 10.0);

        commit(&sink, Phase::Update, 50.0);
        assert_eq!(runner.snapshot().total_commits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_cancels_auto_stop() {
        let config = RunnerConfig::new("race").with_duration(Duration::from_millis(1000));
        let runner = runner(config);
        let mut states = runner.watch_state();
        runner.start();
        states.borrow_and_update();

        time::sleep(Duration::from_millis(400)).await;
        assert!(runner.stop());
        assert!(states.has_changed().unwrap());
        states.borrow_and_update();

        // a second trial must not be cut short by the first trial's timer
        runner.start();
        states.borrow_and_update();
        time::sleep(Duration::from_millis(700)).await;
        assert!(runner.is_active());
        assert!(!states.has_changed().unwrap());

        time::sleep(Duration::from_millis(400)).await;
        assert!(!runner.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_at_auto_stop_deadline() {
        let config = RunnerConfig::new("tie").with_duration(Duration::from_millis(1000));
        let runner = runner(config);
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 2.0);

        time::advance(Duration::from_millis(1000)).await;
        runner.stop();
        runner.stop();
        tokio::task::yield_now().await;

        assert!(!runner.is_active());
        assert_eq!(runner.snapshot().total_commits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_writes_record() {
        let runner = runner(RunnerConfig::new("dl"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 12.5);
        runner.stop();

        let mut buf = Vec::new();
        runner.download(&mut buf).unwrap();
        let record = ExportRecord::from_reader(buf.as_slice()).unwrap();
        assert_eq!(record.stats.total_commits, 1);
        assert_eq!(record.stats.data[0].actual_duration, 12.5);
        assert!(runner.export_filename().starts_with("dl-performance-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_after_stop_matches_final_snapshot() {
        let runner = runner(RunnerConfig::new("sealed"));
        let sink = runner.collector();
        runner.start();
        commit(&sink, Phase::Mount, 4.0);
        runner.stop();
        commit(&sink, Phase::Update, 40.0);

        assert_eq!(runner.current_stats(), *runner.snapshot());
        let mut buf = Vec::new();
        runner.download(&mut buf).unwrap();
        let record = ExportRecord::from_reader(buf.as_slice()).unwrap();
        assert_eq!(record.stats.total_commits, 1);
        assert_eq!(record.stats.long_tasks, 0);
        assert_eq!(record.stats.data, runner.snapshot().data);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_runner_releases_timers() {
        let config = RunnerConfig::new("drop").with_duration(Duration::from_millis(100));
        let runner = runner(config);
        let mut published = runner.subscribe();
        runner.start();
        published.borrow_and_update();
        drop(runner);

        time::sleep(Duration::from_millis(200)).await;
        assert!(published.has_changed().is_err());
    }
}
