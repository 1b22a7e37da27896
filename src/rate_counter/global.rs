//! # Global Rate Counter
//!
//! Process-wide event volume over a sliding set of equal time windows.
//!
//! ```text
//!     record_event() ──► live slot ──┐
//!                                    │  every rotation_interval_ms
//!     ┌────┬────┬────┬────┐          ▼
//!     │ 12 │  9 │ 14 │  3 │   rotate: average = 38 / 4 = 9
//!     └────┴────┴────┴─▲──┘           next slot zeroed, becomes live
//!                      live
//! ```

use super::{
    config::RateCounterConfig,
    error::CounterError,
    metrics::CounterStats,
    scheduler::{DrivenRing, RotationMode},
};
use std::time::Duration;

/// Default prefix for the rotation thread name.
const DEFAULT_THREAD_NAME: &str = "flow-control";

/// Lock-free counter of events per time window for the whole process.
///
/// Events are added to the live window with a single atomic add. A
/// background thread advances to a fresh window every
/// `rotation_interval_ms`, keeping the last `slot_count` windows readable.
/// Dropping the counter stops that thread.
///
/// ## Example
///
/// ```rust
/// use flowrate::GlobalRateCounter;
///
/// // 4 windows of one second each
/// let counter = GlobalRateCounter::new(4, 1000).unwrap();
///
/// for _ in 0..5 {
///     counter.record_event();
/// }
/// assert_eq!(counter.current_window_count(), 5);
///
/// counter.rotate();
/// assert_eq!(counter.current_window_count(), 0);
/// assert_eq!(counter.average_window_count(), 1);
/// assert_eq!(counter.window_count_n_steps_ago(1), 5);
/// ```
///
/// ## Sharing
///
/// ```rust
/// use flowrate::GlobalRateCounter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(GlobalRateCounter::new(10, 100).unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = counter.clone();
///         thread::spawn(move || {
///             for _ in 0..100 {
///                 counter.record_event();
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(counter.window_total(), 400);
/// ```
pub struct GlobalRateCounter {
    driven: DrivenRing,
}

impl GlobalRateCounter {
    /// Creates a counter with `slot_count` windows of `rotation_interval_ms`.
    ///
    /// # Errors
    ///
    /// Fails if either argument is zero, if `slot_count` exceeds
    /// [`MAX_SLOT_COUNT`](crate::MAX_SLOT_COUNT), or if the rotation thread
    /// cannot be spawned.
    pub fn new(slot_count: usize, rotation_interval_ms: u64) -> Result<Self, CounterError> {
        Self::with_config(RateCounterConfig::new(slot_count, rotation_interval_ms))
    }

    /// Creates a counter from a full configuration.
    ///
    /// ```rust
    /// use flowrate::{GlobalRateCounter, MemoryOrdering, RateCounterConfig};
    ///
    /// let config = RateCounterConfig::per_second(60)
    ///     .with_ordering(MemoryOrdering::Relaxed)
    ///     .with_thread_name("ingress-flow");
    /// let counter = GlobalRateCounter::with_config(config).unwrap();
    /// assert_eq!(counter.slot_count(), 60);
    /// ```
    pub fn with_config(config: RateCounterConfig) -> Result<Self, CounterError> {
        let driven = DrivenRing::start(config, DEFAULT_THREAD_NAME, RotationMode::Advance)?;
        Ok(Self { driven })
    }

    /// Records one event in the live window and returns the window's new count.
    #[inline(always)]
    pub fn record_event(&self) -> u64 {
        self.driven.ring().increment_current(1)
    }

    /// Records `n` events at once and returns the window's new count.
    #[inline]
    pub fn record_events(&self, n: u64) -> u64 {
        self.driven.ring().increment_current(n)
    }

    /// Events recorded in the live window so far.
    #[inline]
    pub fn current_window_count(&self) -> u64 {
        self.driven.ring().value_at(0)
    }

    /// Average events per window, as computed by the last rotation.
    ///
    /// Zero until the first rotation. During the first cycle the average
    /// still divides by the full slot count.
    #[inline]
    pub fn average_window_count(&self) -> u64 {
        self.driven.ring().average()
    }

    /// Events recorded in the window `n` rotations ago.
    ///
    /// `n` wraps modulo the slot count: `n == slot_count()` reads the live
    /// window again.
    #[inline]
    pub fn window_count_n_steps_ago(&self, n: usize) -> u64 {
        self.driven.ring().value_at(n)
    }

    /// Sum of every window still held by the ring.
    pub fn window_total(&self) -> u64 {
        self.driven.ring().total()
    }

    /// Window counts from the oldest to the live one.
    pub fn slots_oldest_first(&self) -> Vec<u64> {
        self.driven.ring().slots_oldest_first()
    }

    /// Number of windows kept.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.driven.ring().slot_count()
    }

    /// Time between two rotations.
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.driven.config().rotation_interval_ms)
    }

    /// Total span of history kept (`slot_count × rotation_interval`).
    pub fn window_span(&self) -> Duration {
        Duration::from_millis(self.driven.config().window_span_ms())
    }

    /// The configuration this counter was built with.
    pub fn config(&self) -> &RateCounterConfig {
        self.driven.config()
    }

    /// Advances to the next window immediately.
    ///
    /// Does not reset the schedule. Returns `false` if the scheduled
    /// rotation was running at the same moment, in which case this call
    /// did nothing.
    pub fn rotate(&self) -> bool {
        self.driven.rotate_now()
    }

    /// Snapshot of the ring, windows ordered oldest first.
    pub fn stats(&self) -> CounterStats {
        let ring = self.driven.ring();
        CounterStats::from_slots(
            ring.slots_oldest_first(),
            ring.average(),
            ring.total_rotations(),
            ring.last_rotation_ms(),
        )
    }

    /// Stops the rotation thread.
    ///
    /// Counts stay readable and writable but no longer rotate. Once this
    /// returns no scheduled rotation will run again. Dropping the counter
    /// does the same.
    pub fn shutdown(&self) {
        self.driven.shutdown();
    }

    /// Whether the rotation thread is still running.
    pub fn is_rotating(&self) -> bool {
        self.driven.is_running()
    }
}

impl std::fmt::Debug for GlobalRateCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalRateCounter")
            .field("slot_count", &self.slot_count())
            .field("rotation_interval_ms", &self.config().rotation_interval_ms)
            .field("current_window_count", &self.current_window_count())
            .field("average_window_count", &self.average_window_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // Long enough that the scheduler never fires during a test
    const IDLE_INTERVAL_MS: u64 = 60_000;

    fn idle_counter(slot_count: usize) -> GlobalRateCounter {
        GlobalRateCounter::new(slot_count, IDLE_INTERVAL_MS).unwrap()
    }

    #[test]
    fn test_starts_empty() {
        for n in [1, 2, 4, 16] {
            let counter = idle_counter(n);
            assert_eq!(counter.current_window_count(), 0);
            assert_eq!(counter.average_window_count(), 0);
            assert_eq!(counter.window_total(), 0);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            GlobalRateCounter::new(0, 1000),
            Err(CounterError::ZeroSlotCount)
        ));
        assert!(matches!(
            GlobalRateCounter::new(4, 0),
            Err(CounterError::ZeroRotationInterval)
        ));
    }

    #[test]
    fn test_record_event_counts_in_live_window() {
        let counter = idle_counter(4);
        for k in 1..=25 {
            assert_eq!(counter.record_event(), k);
        }
        assert_eq!(counter.current_window_count(), 25);
    }

    #[test]
    fn test_record_events_adds_delta() {
        let counter = idle_counter(4);
        assert_eq!(counter.record_events(10), 10);
        assert_eq!(counter.record_event(), 11);
        assert_eq!(counter.record_events(0), 11);
    }

    #[test]
    fn test_rotation_scenario() {
        let counter = idle_counter(4);

        for _ in 0..5 {
            counter.record_event();
        }
        assert_eq!(counter.current_window_count(), 5);

        assert!(counter.rotate());
        assert_eq!(counter.current_window_count(), 0);
        assert_eq!(counter.average_window_count(), 1);

        for _ in 0..3 {
            counter.record_event();
        }
        assert_eq!(counter.current_window_count(), 3);
        assert_eq!(counter.window_count_n_steps_ago(1), 5);
    }

    #[test]
    fn test_average_after_rotation_is_floor_of_mean() {
        let counter = idle_counter(3);
        counter.record_events(4);
        counter.rotate();
        counter.record_events(6);
        counter.rotate();
        counter.record_events(7);

        // [4, 6, 7] -> 17 / 3 = 5
        counter.rotate();
        assert_eq!(counter.average_window_count(), 5);
    }

    #[test]
    fn test_full_cycle_without_events_clears_history() {
        let counter = idle_counter(4);
        counter.record_events(9);

        for _ in 0..4 {
            counter.rotate();
        }

        assert_eq!(counter.window_total(), 0);
        assert!(counter.slots_oldest_first().iter().all(|&v| v == 0));
        // The average is taken before the reset, so the 4th rotation still saw 9
        assert_eq!(counter.average_window_count(), 2);

        counter.rotate();
        assert_eq!(counter.average_window_count(), 0);
    }

    #[test]
    fn test_rotations_on_empty_counter_stay_zero() {
        let counter = idle_counter(5);
        for _ in 0..5 {
            counter.rotate();
        }
        assert_eq!(counter.window_total(), 0);
        assert_eq!(counter.average_window_count(), 0);
        assert_eq!(counter.stats().total_rotations, 5);
    }

    #[test]
    fn test_lookback_wraps_at_slot_count() {
        let counter = idle_counter(4);
        counter.record_events(2);
        counter.rotate();
        counter.record_events(8);

        assert_eq!(counter.window_count_n_steps_ago(0), 8);
        assert_eq!(counter.window_count_n_steps_ago(1), 2);
        assert_eq!(counter.window_count_n_steps_ago(4), 8);
        assert_eq!(counter.window_count_n_steps_ago(5), 2);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let counter = idle_counter(4);
        counter.record_events(7);
        counter.rotate();
        counter.record_events(3);

        let first = (counter.current_window_count(), counter.average_window_count());
        for _ in 0..5 {
            assert_eq!(
                (counter.current_window_count(), counter.average_window_count()),
                first
            );
        }
    }

    #[test]
    fn test_durations() {
        let counter = GlobalRateCounter::new(6, 250).unwrap();
        assert_eq!(counter.rotation_interval(), Duration::from_millis(250));
        assert_eq!(counter.window_span(), Duration::from_millis(1500));
        assert_eq!(counter.slot_count(), 6);
    }

    #[test]
    fn test_stats_snapshot() {
        let counter = idle_counter(3);
        counter.record_events(4);
        counter.rotate();
        counter.record_events(1);

        let stats = counter.stats();
        assert_eq!(stats.slots, vec![0, 4, 1]);
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.busiest_slot, 4);
        assert_eq!(stats.average_count, 1);
        assert_eq!(stats.total_rotations, 1);
    }

    #[test]
    fn test_scheduled_rotation() {
        let counter = GlobalRateCounter::new(4, 200).unwrap();
        for _ in 0..5 {
            counter.record_event();
        }

        // One rotation fires at ~200ms, the next not before ~400ms
        thread::sleep(Duration::from_millis(300));

        assert_eq!(counter.current_window_count(), 0);
        assert_eq!(counter.average_window_count(), 1);
        assert_eq!(counter.window_count_n_steps_ago(1), 5);
    }

    #[test]
    fn test_shutdown_stops_rotation() {
        let counter = GlobalRateCounter::new(4, 20).unwrap();
        assert!(counter.is_rotating());

        counter.shutdown();
        assert!(!counter.is_rotating());

        let rotations = counter.stats().total_rotations;
        counter.record_events(3);
        thread::sleep(Duration::from_millis(80));

        assert_eq!(counter.stats().total_rotations, rotations);
        assert_eq!(counter.current_window_count(), 3);

        // Shutting down twice is fine
        counter.shutdown();
    }

    #[test]
    fn test_concurrent_recording() {
        let counter = Arc::new(idle_counter(8));
        let mut handles = vec![];

        for _ in 0..10 {
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counter.record_event();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.current_window_count(), 10_000);
    }

    #[test]
    fn test_debug_impl() {
        let counter = idle_counter(4);
        counter.record_events(2);
        let debug = format!("{:?}", counter);

        assert!(debug.contains("GlobalRateCounter"));
        assert!(debug.contains("slot_count: 4"));
        assert!(debug.contains("current_window_count: 2"));
    }
}
