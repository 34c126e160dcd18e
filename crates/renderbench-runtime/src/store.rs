//! Sample storage and the ingestion boundary.

use std::sync::Arc;

use parking_lot::Mutex;
use renderbench_analysis::compute;
use renderbench_core::{RenderEvent, Sample, StatsSnapshot};
use tokio::time::Instant;

/// A trait for receiving render commits from an instrumented subtree.
pub trait RenderSink: Send + Sync {
    /// Called once per commit with the commit's timing data.
    fn on_render(&self, event: RenderEvent);
}

/// Append-only, ordered log of the samples of one trial.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<Sample>,
    origin: Instant,
}

impl SampleStore {
    /// Creates an empty store whose elapsed-time origin is now.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            origin: Instant::now(),
        }
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Stamp `event` with the time elapsed since the origin and append it.
    pub fn record(&mut self, event: RenderEvent) {
        let timestamp = self.elapsed_ms();
        self.append(event.into_sample(timestamp));
    }

    /// Milliseconds since the last reset, on the monotonic clock.
    pub fn elapsed_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Drop every sample and move the origin to now.
    ///
    /// The old buffer is released rather than cleared, so copies handed out
    /// earlier are never affected.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// An independent copy of the samples, in append order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

struct CollectorState {
    store: SampleStore,
    accepting: bool,
}

/// Shared handle to a trial's [`SampleStore`].
///
/// Clones refer to the same store. Instrumented code holds a clone and pushes
/// events through [`RenderSink::on_render`]; events arriving while the
/// collector is closed are dropped.
#[derive(Clone)]
pub struct Collector {
    state: Arc<Mutex<CollectorState>>,
}

impl Collector {
    /// Creates an open collector with an empty store.
    pub fn new() -> Self {
        Self::with_accepting(true)
    }

    pub(crate) fn with_accepting(accepting: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectorState {
                store: SampleStore::new(),
                accepting,
            })),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    pub fn reset(&self) {
        self.state.lock().store.reset();
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.state.lock().store.snapshot()
    }

    /// Statistics over the current contents of the store.
    pub fn stats(&self) -> StatsSnapshot {
        compute(self.state.lock().store.samples())
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset the store and start accepting events.
    pub(crate) fn open_fresh(&self) {
        let mut state = self.state.lock();
        state.store.reset();
        state.accepting = true;
    }

    /// Stop accepting events and return the statistics of everything collected so far.
    pub(crate) fn seal(&self) -> StatsSnapshot {
        let mut state = self.state.lock();
        state.accepting = false;
        compute(state.store.samples())
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for Collector {
    fn on_render(&self, event: RenderEvent) {
        let mut state = self.state.lock();
        if state.accepting {
            state.store.record(event);
        }
    }
}
