//! # Rate Counter Configuration
//!
//! Configuration structures and enums that control how a counter is laid out
//! and how often it rotates.
//!
//! ## Key Concepts
//!
//! ```text
//!     Ring Configuration:
//!
//!     slot_count = 4, rotation_interval_ms = 1000
//!
//!     ┌──────┬──────┬──────┬──────┐
//!     │  s0  │  s1  │  s2  │  s3  │   ← one slot per second
//!     └──────┴──────┴──▲───┴──────┘
//!                      │
//!                current_index        ← advances once per interval
//!
//!     Window span: 4 × 1000ms = 4s of history
//! ```
//!
//! ### Memory Ordering
//!
//! ```text
//!     Relaxed ──────► Fast but minimal guarantees
//!        │
//!     AcquireRelease ► Balanced (recommended)
//!        │
//!     Sequential ───► Slow but strongest guarantees
//! ```

use super::error::CounterError;
use std::sync::atomic::Ordering;

/// Upper bound on the number of slots a single ring may hold.
///
/// Every slot occupies its own cache line, so a ring of this size already
/// costs several megabytes.
pub const MAX_SLOT_COUNT: usize = 65_536;

/// Memory ordering strategy for atomic slot operations.
///
/// ## Quick Guide
///
/// - Use `Relaxed` when counts are only polled for dashboards
/// - Use `AcquireRelease` (default) for most use cases
/// - Use `Sequential` when debugging ordering problems
///
/// ## Example
///
/// ```rust
/// use flowrate::{MemoryOrdering, RateCounterConfig};
///
/// let fast = RateCounterConfig::per_second(60).with_ordering(MemoryOrdering::Relaxed);
/// let strict = RateCounterConfig::per_second(60).with_ordering(MemoryOrdering::Sequential);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrdering {
    /// Relaxed ordering - fastest, counts may be observed slightly out of order.
    Relaxed,

    /// Acquire-Release ordering - balanced performance and correctness (default).
    #[default]
    AcquireRelease,

    /// Sequential consistency - strongest guarantees but slower.
    Sequential,
}

impl MemoryOrdering {
    /// Ordering for plain slot reads.
    #[inline(always)]
    pub(crate) fn load(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    /// Ordering for index publication and slot resets.
    #[inline(always)]
    pub(crate) fn store(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Release,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    /// Ordering for fetch-add and swap on slots.
    #[inline(always)]
    pub(crate) fn rmw(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::AcqRel,
            Self::Sequential => Ordering::SeqCst,
        }
    }
}

/// Configuration for rate counter instances.
///
/// The same configuration drives both counter flavours. For a
/// [`GlobalRateCounter`](crate::GlobalRateCounter) `slot_count` is the number
/// of consecutive time windows kept; for a
/// [`KeyedRateCounter`](crate::KeyedRateCounter) it is the number of hash
/// buckets keys are spread across.
///
/// ## Examples
///
/// ```rust
/// use flowrate::RateCounterConfig;
///
/// // One minute of history at one-second resolution
/// let config = RateCounterConfig::per_second(60);
/// assert_eq!(config.window_span_ms(), 60_000);
///
/// // Custom layout: 8 slots of 250ms
/// let config = RateCounterConfig::new(8, 250);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateCounterConfig {
    /// Number of slots in the ring (windows or buckets). Must be at least 1.
    pub slot_count: usize,

    /// Milliseconds between two rotations. Must be greater than 0.
    pub rotation_interval_ms: u64,

    /// Memory ordering strategy for atomic operations.
    pub ordering: MemoryOrdering,

    /// Prefix for the rotation thread name. `None` picks a default per
    /// counter flavour.
    pub thread_name: Option<String>,
}

impl Default for RateCounterConfig {
    /// Ten one-second slots with `AcquireRelease` ordering.
    fn default() -> Self {
        Self {
            slot_count: 10,
            rotation_interval_ms: 1000,
            ordering: MemoryOrdering::default(),
            thread_name: None,
        }
    }
}

impl RateCounterConfig {
    /// Creates a configuration with the given slot count and rotation interval.
    pub fn new(slot_count: usize, rotation_interval_ms: u64) -> Self {
        Self {
            slot_count,
            rotation_interval_ms,
            ..Default::default()
        }
    }

    /// `slots` one-second windows.
    pub fn per_second(slots: usize) -> Self {
        Self::new(slots, 1000)
    }

    /// `slots` one-minute windows.
    ///
    /// ```rust
    /// use flowrate::RateCounterConfig;
    ///
    /// // Last hour, minute by minute
    /// let config = RateCounterConfig::per_minute(60);
    /// assert_eq!(config.rotation_interval_ms, 60_000);
    /// ```
    pub fn per_minute(slots: usize) -> Self {
        Self::new(slots, 60_000)
    }

    /// Sets the memory ordering strategy.
    pub fn with_ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the prefix used to name the rotation thread.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`CounterError::ZeroSlotCount`] if `slot_count` is 0
    /// - [`CounterError::TooManySlots`] if `slot_count` exceeds [`MAX_SLOT_COUNT`]
    /// - [`CounterError::ZeroRotationInterval`] if `rotation_interval_ms` is 0
    ///
    /// ```rust
    /// use flowrate::{CounterError, RateCounterConfig};
    ///
    /// let config = RateCounterConfig::new(0, 1000);
    /// assert!(matches!(config.validate(), Err(CounterError::ZeroSlotCount)));
    /// ```
    pub fn validate(&self) -> Result<(), CounterError> {
        if self.slot_count == 0 {
            return Err(CounterError::ZeroSlotCount);
        }

        if self.slot_count > MAX_SLOT_COUNT {
            return Err(CounterError::TooManySlots {
                requested: self.slot_count,
                max: MAX_SLOT_COUNT,
            });
        }

        if self.rotation_interval_ms == 0 {
            return Err(CounterError::ZeroRotationInterval);
        }

        Ok(())
    }

    /// Total span of history covered by the ring, in milliseconds.
    ///
    /// Only meaningful for the temporal (global) counter.
    pub fn window_span_ms(&self) -> u64 {
        (self.slot_count as u64).saturating_mul(self.rotation_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ordering() {
        let ordering = MemoryOrdering::AcquireRelease;
        assert_eq!(ordering.load(), Ordering::Acquire);
        assert_eq!(ordering.store(), Ordering::Release);
        assert_eq!(ordering.rmw(), Ordering::AcqRel);
    }

    #[test]
    fn test_memory_ordering_all_variants() {
        let relaxed = MemoryOrdering::Relaxed;
        assert_eq!(relaxed.load(), Ordering::Relaxed);
        assert_eq!(relaxed.store(), Ordering::Relaxed);
        assert_eq!(relaxed.rmw(), Ordering::Relaxed);

        let sequential = MemoryOrdering::Sequential;
        assert_eq!(sequential.load(), Ordering::SeqCst);
        assert_eq!(sequential.store(), Ordering::SeqCst);
        assert_eq!(sequential.rmw(), Ordering::SeqCst);
    }

    #[test]
    fn test_default_memory_ordering() {
        assert_eq!(MemoryOrdering::default(), MemoryOrdering::AcquireRelease);
    }

    #[test]
    fn test_config_validation() {
        assert!(RateCounterConfig::default().validate().is_ok());

        let zero_slots = RateCounterConfig {
            slot_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_slots.validate(),
            Err(CounterError::ZeroSlotCount)
        ));

        let zero_interval = RateCounterConfig {
            rotation_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_interval.validate(),
            Err(CounterError::ZeroRotationInterval)
        ));
    }

    #[test]
    fn test_slot_count_upper_bound() {
        assert!(RateCounterConfig::new(MAX_SLOT_COUNT, 10).validate().is_ok());

        let result = RateCounterConfig::new(MAX_SLOT_COUNT + 1, 10).validate();
        match result {
            Err(CounterError::TooManySlots { requested, max }) => {
                assert_eq!(requested, MAX_SLOT_COUNT + 1);
                assert_eq!(max, MAX_SLOT_COUNT);
            }
            other => panic!("expected TooManySlots, got {:?}", other),
        }
    }

    #[test]
    fn test_single_slot_is_valid() {
        assert!(RateCounterConfig::new(1, 1).validate().is_ok());
    }

    #[test]
    fn test_config_factories() {
        let config = RateCounterConfig::per_second(30);
        assert_eq!(config.slot_count, 30);
        assert_eq!(config.rotation_interval_ms, 1000);
        assert_eq!(config.window_span_ms(), 30_000);

        let config = RateCounterConfig::per_minute(5);
        assert_eq!(config.rotation_interval_ms, 60_000);
        assert_eq!(config.window_span_ms(), 300_000);
    }

    #[test]
    fn test_config_with_ordering_and_name() {
        let config = RateCounterConfig::default()
            .with_ordering(MemoryOrdering::Sequential)
            .with_thread_name("api-flow");

        assert_eq!(config.ordering, MemoryOrdering::Sequential);
        assert_eq!(config.thread_name.as_deref(), Some("api-flow"));
    }

    #[test]
    fn test_window_span_saturates() {
        let config = RateCounterConfig::new(MAX_SLOT_COUNT, u64::MAX);
        assert_eq!(config.window_span_ms(), u64::MAX);
    }
}
