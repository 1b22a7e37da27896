//! # Keyed Rate Counter
//!
//! Approximate per-key load tracking with a fixed memory footprint.
//!
//! ```text
//!     Keyed Counting:
//!
//!     10.0.0.1 ──┐
//!     10.0.0.7 ──┼──► hash(key) mod N ──► bucket
//!     10.0.0.9 ──┘
//!                     ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!                     │  3 │  0 │ 41 │  2 │  0 │  5 │  1 │  0 │
//!                     └────┴────┴─▲──┴────┴────┴────┴────┴────┘
//!                                 hot bucket
//!
//!     Every rotation_interval_ms:
//!       average = sum / N, then every bucket drops back to 0
//! ```
//!
//! Unlike a map holding one counter per address, the memory
//! used here never grows with the number of distinct keys. The price is
//! collisions: two keys that land in the same bucket share a count.
//! Buckets have no time order; the ring is only rotated to forget old load.

use super::{
    config::RateCounterConfig,
    error::CounterError,
    metrics::CounterStats,
    scheduler::{DrivenRing, RotationMode},
};
use ahash::RandomState;
use std::hash::BuildHasher;
use std::time::Duration;

/// Default prefix for the rotation thread name.
const DEFAULT_THREAD_NAME: &str = "ip-flow-control";

// Fixed seeds so a key always maps to the same bucket for a given N.
const ROUTING_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Lock-free per-key load counter backed by a fixed set of hash buckets.
///
/// Each key is hashed to one of `slot_count` buckets. Recording an event is
/// a single atomic add on that bucket. A background thread drains all
/// buckets every `rotation_interval_ms`, publishing the average load per
/// bucket before clearing them.
///
/// An empty key always maps to bucket 0.
///
/// ## Example
///
/// ```rust
/// use flowrate::KeyedRateCounter;
///
/// let counter = KeyedRateCounter::new(8, 1000).unwrap();
///
/// assert_eq!(counter.count_for_key("10.0.0.1"), 0);
/// counter.record_event("10.0.0.1");
/// assert_eq!(counter.count_for_key("10.0.0.1"), 1);
///
/// // Compare one client against the average bucket load
/// counter.rotate();
/// let average = counter.average_window_count();
/// assert_eq!(counter.count_for_key("10.0.0.1"), 0);
/// assert_eq!(average, 0); // 1 event / 8 buckets
/// ```
pub struct KeyedRateCounter {
    driven: DrivenRing,
    hasher: RandomState,
}

impl KeyedRateCounter {
    /// Creates a counter with `slot_count` buckets drained every
    /// `rotation_interval_ms`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`GlobalRateCounter::new`](crate::GlobalRateCounter::new).
    pub fn new(slot_count: usize, rotation_interval_ms: u64) -> Result<Self, CounterError> {
        Self::with_config(RateCounterConfig::new(slot_count, rotation_interval_ms))
    }

    /// Creates a counter from a full configuration.
    pub fn with_config(config: RateCounterConfig) -> Result<Self, CounterError> {
        let driven = DrivenRing::start(config, DEFAULT_THREAD_NAME, RotationMode::Decay)?;
        let [k0, k1, k2, k3] = ROUTING_SEEDS;
        Ok(Self {
            driven,
            hasher: RandomState::with_seeds(k0, k1, k2, k3),
        })
    }

    /// Bucket index `key` is routed to.
    ///
    /// A pure function of the key and the slot count.
    #[inline]
    pub fn bucket_for(&self, key: &str) -> usize {
        if key.is_empty() {
            return 0;
        }

        let slot_count = self.driven.ring().slot_count();
        // The hash is unsigned, so the remainder is already a valid index
        let bucket = (self.hasher.hash_one(key) % slot_count as u64) as usize;
        debug_assert!(bucket < slot_count);
        bucket
    }

    /// Records one event for `key` and returns its bucket's new count.
    #[inline]
    pub fn record_event(&self, key: &str) -> u64 {
        self.record_events(key, 1)
    }

    /// Records `n` events for `key` and returns its bucket's new count.
    #[inline]
    pub fn record_events(&self, key: &str, n: u64) -> u64 {
        let bucket = self.bucket_for(key);
        self.driven.ring().increment(bucket, n)
    }

    /// Live count of the bucket `key` is routed to.
    ///
    /// Includes events of every other key sharing the bucket.
    #[inline]
    pub fn count_for_key(&self, key: &str) -> u64 {
        self.driven.ring().slot_value(self.bucket_for(key))
    }

    /// Average load per bucket published by the last rotation.
    #[inline]
    pub fn average_window_count(&self) -> u64 {
        self.driven.ring().average()
    }

    /// Number of buckets.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.driven.ring().slot_count()
    }

    /// Time between two rotations.
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.driven.config().rotation_interval_ms)
    }

    /// The configuration this counter was built with.
    pub fn config(&self) -> &RateCounterConfig {
        self.driven.config()
    }

    /// Publishes the average and clears every bucket immediately.
    ///
    /// Returns `false` if the scheduled rotation was running at the same
    /// moment, in which case this call did nothing.
    pub fn rotate(&self) -> bool {
        self.driven.rotate_now()
    }

    /// Snapshot of the buckets, in bucket order.
    pub fn stats(&self) -> CounterStats {
        let ring = self.driven.ring();
        CounterStats::from_slots(
            ring.slot_values(),
            ring.average(),
            ring.total_rotations(),
            ring.last_rotation_ms(),
        )
    }

    /// Stops the rotation thread. See [`GlobalRateCounter::shutdown`](crate::GlobalRateCounter::shutdown).
    pub fn shutdown(&self) {
        self.driven.shutdown();
    }

    /// Whether the rotation thread is still running.
    pub fn is_rotating(&self) -> bool {
        self.driven.is_running()
    }
}

impl std::fmt::Debug for KeyedRateCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRateCounter")
            .field("slot_count", &self.slot_count())
            .field("rotation_interval_ms", &self.config().rotation_interval_ms)
            .field("average_window_count", &self.average_window_count())
            .finish()
    }
}
