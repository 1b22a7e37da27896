//! # Flowrate - Lock-free Sliding-Window Event Counters
//!
//! A small library for answering two questions under heavy concurrency:
//! "how many events happened recently?" and "how much load is this client
//! producing compared to everybody else?". Recording an event is a single
//! atomic add, so it is cheap enough to call on every request.
//!
//! ## The Slot Ring
//!
//! Both counters keep a fixed ring of atomic slots. A background thread
//! rotates the ring at a fixed rate and publishes the average slot count.
//!
//! ```text
//!     Global counter, 4 slots, rotation every second:
//!
//!     t=0s   [ 5 ][ 0 ][ 0 ][ 0 ]   live = slot 0
//!     t=1s   [ 5 ][ 0 ][ 0 ][ 0 ]   avg = 5/4 = 1, live = slot 1
//!     t=1.5  [ 5 ][ 3 ][ 0 ][ 0 ]
//!     t=2s   [ 5 ][ 3 ][ 0 ][ 0 ]   avg = 8/4 = 2, live = slot 2
//!     ...
//!     t=4s   [ 0 ][ 3 ][ 0 ][ 0 ]   oldest window (slot 0) is cleared
//! ```
//!
//! - **Global counter** - one slot per time window, the live window advances
//!   on every rotation
//! - **Keyed counter** - one slot per hash bucket, every bucket is drained
//!   on every rotation
//!
//! ## Quick Start
//!
//! ### Counting Events Over Time
//!
//! ```rust
//! use flowrate::GlobalRateCounter;
//!
//! // 10 windows of 1 second each
//! let counter = GlobalRateCounter::new(10, 1000).unwrap();
//!
//! counter.record_event();
//! counter.record_events(4);
//!
//! assert_eq!(counter.current_window_count(), 5);
//! println!("average per second: {}", counter.average_window_count());
//! ```
//!
//! ### Spotting Heavy Clients
//!
//! ```rust
//! use flowrate::KeyedRateCounter;
//!
//! let counter = KeyedRateCounter::new(64, 1000).unwrap();
//!
//! // In your request handler:
//! let client = "192.168.1.100";
//! counter.record_event(client);
//!
//! let average = counter.average_window_count();
//! if average > 0 && counter.count_for_key(client) > average * 10 {
//!     // Throttle this client
//! }
//! ```
//!
//! ### Builder Pattern
//!
//! ```rust
//! use flowrate::{MemoryOrdering, RateCounterBuilder};
//!
//! let counter = RateCounterBuilder::new()
//!     .slot_count(60)
//!     .rotation_interval_ms(1000)
//!     .memory_ordering(MemoryOrdering::Relaxed)
//!     .thread_name("requests-per-minute")
//!     .build_global()
//!     .unwrap();
//!
//! assert_eq!(counter.slot_count(), 60);
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Your Application      │
//!                    └──────────┬──────────────┘
//!                               │
//!                ┌──────────────┴───────────────┐
//!                │                               │
//!     ┌──────────▼──────────┐       ┌───────────▼──────────┐
//!     │  GlobalRateCounter  │       │  KeyedRateCounter    │
//!     ├─────────────────────┤       ├──────────────────────┤
//!     │ • Time windows      │       │ • Hash buckets       │
//!     │ • Lookback          │       │ • Fixed memory       │
//!     │ • Ring advances     │       │ • Buckets decay      │
//!     └──────────┬──────────┘       └───────────┬──────────┘
//!                └──────────────┬───────────────┘
//!                    ┌──────────▼──────────────┐
//!                    │ SlotRing + RotationTask │
//!                    └─────────────────────────┘
//! ```
//!
//! ## Performance Characteristics
//!
//! | Operation | Time Complexity | Space Complexity |
//! |-----------|----------------|------------------|
//! | record_event() | O(1) | O(1) |
//! | current / average / lookback reads | O(1) | O(1) |
//! | rotation (global) | O(N) | O(1) |
//! | rotation (keyed) | O(N) | O(1) |
//! | stats() | O(N) | O(N) |
//!
//! ## Accuracy
//!
//! Counts are approximate by design of the data structure. An event recorded
//! while a rotation is running may land in either the old or the new window,
//! and keys that share a bucket share a count. No event is ever dropped.
//!
//! ## Thread Safety
//!
//! All counters are `Send + Sync` and meant to be shared via `Arc`:
//! - `GlobalRateCounter` - see [`SharedGlobalCounter`]
//! - `KeyedRateCounter` - see [`SharedKeyedCounter`]
//!
//! Dropping the last handle stops the rotation thread.
//!
//! ## Examples
//!
//! See the `demos/` directory for complete examples:
//! - `basic.rs` - Global counter with scheduled rotation
//! - `ip_flow.rs` - Per-client load tracking

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

// Internal module
mod rate_counter;

// Public re-exports
pub use rate_counter::{
    current_time_ms, CounterError, CounterStats, GlobalRateCounter, KeyedRateCounter,
    MemoryOrdering, RateCounterConfig, SlotRing, CACHE_LINE_SIZE, MAX_SLOT_COUNT,
};

/// A global counter wrapped in `Arc` for sharing across threads.
///
/// # Example
/// ```rust
/// use flowrate::{GlobalRateCounter, SharedGlobalCounter};
/// use std::sync::Arc;
///
/// let shared: SharedGlobalCounter = Arc::new(GlobalRateCounter::new(10, 1000).unwrap());
///
/// let counter = shared.clone();
/// std::thread::spawn(move || {
///     counter.record_event();
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(shared.current_window_count(), 1);
/// ```
pub type SharedGlobalCounter = std::sync::Arc<GlobalRateCounter>;

/// A keyed counter wrapped in `Arc`, typically shared by request handlers.
pub type SharedKeyedCounter = std::sync::Arc<KeyedRateCounter>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
///
/// 1.71 is the first release with `BuildHasher::hash_one`.
pub const MSRV: &str = "1.71.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use flowrate::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical counting use cases.
    //!
    //! # Example
    //! ```rust
    //! use flowrate::prelude::*;
    //!
    //! let counter = GlobalRateCounter::new(10, 1000).unwrap();
    //! let config = RateCounterConfig::per_second(10);
    //! let ordering = MemoryOrdering::AcquireRelease;
    //! ```

    pub use crate::{
        CounterError, CounterStats, GlobalRateCounter, KeyedRateCounter, MemoryOrdering,
        RateCounterBuilder, RateCounterConfig, SharedGlobalCounter, SharedKeyedCounter,
    };
}

/// Builder for counters with non-default configuration.
///
/// The same builder can produce either counter kind.
///
/// # Example
///
/// ```rust
/// use flowrate::RateCounterBuilder;
///
/// let keyed = RateCounterBuilder::new()
///     .slot_count(256)
///     .rotation_interval_ms(5_000)
///     .build_keyed()
///     .unwrap();
///
/// assert_eq!(keyed.slot_count(), 256);
///
/// // Invalid settings are reported, not panicked on
/// let result = RateCounterBuilder::new().slot_count(0).build_global();
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateCounterBuilder {
    config: RateCounterConfig,
}

impl RateCounterBuilder {
    /// Creates a new builder with default configuration.
    ///
    /// Default configuration:
    /// - 10 slots
    /// - 1000ms (1 second) rotation interval
    /// - AcquireRelease memory ordering
    /// - Default thread name for the counter kind
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of slots (windows or buckets).
    pub fn slot_count(mut self, slot_count: usize) -> Self {
        self.config.slot_count = slot_count;
        self
    }

    /// Sets the rotation interval in milliseconds.
    ///
    /// Common values:
    /// - 1000 ms = one window per second
    /// - 60000 ms = one window per minute
    pub fn rotation_interval_ms(mut self, ms: u64) -> Self {
        self.config.rotation_interval_ms = ms;
        self
    }

    /// Sets the memory ordering strategy for atomic operations.
    pub fn memory_ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.config.ordering = ordering;
        self
    }

    /// Sets the prefix of the rotation thread name.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = Some(name.into());
        self
    }

    /// Builds a [`GlobalRateCounter`] and starts its rotation thread.
    ///
    /// # Errors
    ///
    /// Returns a [`CounterError`] if the configuration is invalid or the
    /// thread cannot be spawned.
    pub fn build_global(self) -> Result<GlobalRateCounter, CounterError> {
        GlobalRateCounter::with_config(self.config)
    }

    /// Builds a [`KeyedRateCounter`] and starts its rotation thread.
    ///
    /// # Errors
    ///
    /// Same as [`build_global`](Self::build_global).
    pub fn build_keyed(self) -> Result<KeyedRateCounter, CounterError> {
        KeyedRateCounter::with_config(self.config)
    }
}
