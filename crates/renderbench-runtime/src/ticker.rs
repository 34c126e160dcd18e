//! Periodic pulse generator that drives workload re-evaluation.

use std::num::NonZeroU32;
use std::time::Duration;

use renderbench_core::{Error, Result};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Clamp a derived rate to a valid ticker frequency: `max(1, floor(hz))`.
///
/// Non-finite and non-positive inputs map to 1 Hz.
pub fn derive_frequency(hz: f64) -> NonZeroU32 {
    if !hz.is_finite() {
        return NonZeroU32::MIN;
    }
    let floored = hz.floor().clamp(1.0, u32::MAX as f64) as u32;
    NonZeroU32::new(floored).unwrap_or(NonZeroU32::MIN)
}

/// Emits an increasing tick count every `1000 / hz` milliseconds.
///
/// The count starts at 0 and the first increment lands one period after
/// [`Ticker::start`]. Dropping the ticker cancels it.
pub struct Ticker {
    ticks: watch::Receiver<u64>,
    task: JoinHandle<()>,
    period: Duration,
    cancelled: bool,
}

impl Ticker {
    /// Start ticking at `frequency_hz` on the current tokio runtime.
    ///
    /// Rates above 1 GHz tick once per nanosecond.
    pub fn start(frequency_hz: NonZeroU32) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let period = Duration::from_nanos(1_000_000_000 / u64::from(frequency_hz.get()))
            .max(Duration::from_nanos(1));
        let (tx, rx) = watch::channel(0u64);

        let first = Instant::now() + period;
        let task = handle.spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count = 0u64;
            loop {
                interval.tick().await;
                count += 1;
                if tx.send(count).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            ticks: rx,
            task,
            period,
            cancelled: false,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The latest tick count.
    pub fn current(&self) -> u64 {
        *self.ticks.borrow()
    }

    /// Wait for the next tick. Returns `None` once the ticker is cancelled.
    pub async fn next(&mut self) -> Option<u64> {
        if self.cancelled {
            return None;
        }
        self.ticks.changed().await.ok()?;
        Some(*self.ticks.borrow_and_update())
    }

    /// Stop emitting ticks. Idempotent.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_derive_frequency() {
        assert_eq!(derive_frequency(20.0).get(), 20);
        assert_eq!(derive_frequency(20.0 / 10.0).get(), 2);
        assert_eq!(derive_frequency(9.9).get(), 9);
        assert_eq!(derive_frequency(5.0 / 10.0).get(), 1);
        assert_eq!(derive_frequency(0.0).get(), 1);
        assert_eq!(derive_frequency(-3.0).get(), 1);
        assert_eq!(derive_frequency(f64::NAN).get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_count_up_at_period() {
        let started = Instant::now();
        let mut ticker = Ticker::start(hz(10)).unwrap();
        assert_eq!(ticker.period(), Duration::from_millis(100));
        assert_eq!(ticker.current(), 0);

        assert_eq!(ticker.next().await, Some(1));
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(ticker.next().await, Some(2));
        assert_eq!(ticker.next().await, Some(3));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(400));
        assert_eq!(ticker.current(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut ticker = Ticker::start(hz(50)).unwrap();
        assert_eq!(ticker.next().await, Some(1));

        ticker.cancel();
        ticker.cancel();
        assert!(ticker.is_cancelled());
        assert_eq!(ticker.next().await, None);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ticker.next().await, None);
        assert!(ticker.current() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frequency_above_one_ghz_still_ticks() {
        let mut ticker = Ticker::start(derive_frequency(2.0e9)).unwrap();
        assert_eq!(ticker.period(), Duration::from_nanos(1));

        let tick = time::timeout(Duration::from_millis(200), ticker.next()).await;
        assert!(matches!(tick, Ok(Some(n)) if n >= 1));
        assert!(!ticker.task.is_finished());
    }

    #[test]
    fn test_start_requires_runtime() {
        assert!(matches!(Ticker::start(hz(1)), Err(Error::NoRuntime)));
    }
}
