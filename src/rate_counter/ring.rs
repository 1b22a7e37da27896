//! # Rotating Slot Ring
//!
//! The primitive both counters are built on: a fixed ring of independently
//! atomic slots plus a cursor naming the slot that currently accepts
//! increments.
//!
//! ```text
//!     Ring with 4 slots, current_index = 2:
//!
//!        value_at(2)  value_at(1)  value_at(0)  value_at(3)
//!     ┌────────────┬────────────┬────────────┬────────────┐
//!     │     s0     │     s1     │     s2     │     s3     │
//!     │   frozen   │   frozen   │   LIVE ◄── │   oldest   │
//!     └────────────┴────────────┴────────────┴────────────┘
//!
//!     rotate():
//!       1. average = (s0 + s1 + s2 + s3) / 4
//!       2. s3 = 0
//!       3. current_index = 3
//! ```
//!
//! ## Lock-Free Design
//!
//! Increments are a single `fetch_add` on one slot; reads are a single load.
//! Contention is confined to callers hitting the same slot. Rotation is the
//! only destructive operation and is serialized by an in-progress flag, so a
//! manual `rotate()` can never interleave with the scheduled one.
//!
//! An increment that read the old cursor just before a rotation lands in the
//! slot that has just become history. That skew is bounded by one increment
//! per caller and is accepted.

use super::{
    config::{MemoryOrdering, MAX_SLOT_COUNT},
    error::CounterError,
    utils::{current_time_ms, CacheAligned},
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// A fixed-size ring of atomic counters rotated at a fixed cadence.
///
/// The ring itself has no notion of time; whoever owns it decides when to
/// call [`rotate`](Self::rotate) or [`decay`](Self::decay). The counters in
/// this crate hand that job to a background rotation thread.
///
/// ## Example
///
/// ```rust
/// use flowrate::{MemoryOrdering, SlotRing};
///
/// let ring = SlotRing::new(4, MemoryOrdering::default()).unwrap();
///
/// for _ in 0..5 {
///     ring.increment_current(1);
/// }
/// assert_eq!(ring.value_at(0), 5);
///
/// ring.rotate();
/// assert_eq!(ring.value_at(0), 0);
/// assert_eq!(ring.value_at(1), 5);
/// assert_eq!(ring.average(), 1); // 5 / 4, truncated
/// ```
pub struct SlotRing {
    // Hot path: one cache line per slot
    slots: Box<[CacheAligned<AtomicU64>]>,

    /// Position of the live slot. Written only by the rotating thread.
    current_index: CacheAligned<AtomicUsize>,

    /// Mean count per slot computed by the last rotation.
    average: AtomicU64,

    total_rotations: AtomicU64,
    last_rotation_ms: AtomicU64,

    /// Set while a rotation or decay is running.
    rotating: AtomicBool,

    ordering: MemoryOrdering,
}

impl SlotRing {
    /// Creates a ring of `slot_count` zeroed slots.
    ///
    /// # Errors
    ///
    /// [`CounterError::ZeroSlotCount`] or [`CounterError::TooManySlots`] when
    /// `slot_count` is outside `1..=MAX_SLOT_COUNT`.
    pub fn new(slot_count: usize, ordering: MemoryOrdering) -> Result<Self, CounterError> {
        if slot_count == 0 {
            return Err(CounterError::ZeroSlotCount);
        }
        if slot_count > MAX_SLOT_COUNT {
            return Err(CounterError::TooManySlots {
                requested: slot_count,
                max: MAX_SLOT_COUNT,
            });
        }

        let slots = (0..slot_count)
            .map(|_| CacheAligned::new(AtomicU64::new(0)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            current_index: CacheAligned::new(AtomicUsize::new(0)),
            average: AtomicU64::new(0),
            total_rotations: AtomicU64::new(0),
            last_rotation_ms: AtomicU64::new(0),
            rotating: AtomicBool::new(false),
            ordering,
        })
    }

    /// Adds `delta` to the slot at `slot_index` and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics if `slot_index >= slot_count()`. A bad index is a bug in the
    /// caller's routing, not a runtime condition.
    #[inline(always)]
    pub fn increment(&self, slot_index: usize, delta: u64) -> u64 {
        self.slots[slot_index]
            .get()
            .fetch_add(delta, self.ordering.rmw())
            .wrapping_add(delta)
    }

    /// Adds `delta` to the live slot and returns the new value.
    #[inline(always)]
    pub fn increment_current(&self, delta: u64) -> u64 {
        self.increment(self.current_index(), delta)
    }

    /// Advances the ring by one window.
    ///
    /// Publishes `sum(slots) / slot_count` as the new average, zeroes the
    /// slot after the live one and makes it live. Returns `false` without
    /// touching anything if another rotation or decay is in progress.
    pub fn rotate(&self) -> bool {
        let Some(_guard) = RotationGuard::acquire(&self.rotating) else {
            debug!("Rotation already in progress, skipping");
            return false;
        };

        let slot_count = self.slots.len();
        let average = self.total() / slot_count as u64;
        self.average.store(average, self.ordering.store());

        let current = self.current_index();
        let next = (current + 1) % slot_count;

        // Zero the next slot before publishing it; writers only ever target
        // the published index.
        self.slots[next].get().store(0, self.ordering.store());
        self.current_index.get().store(next, self.ordering.store());

        self.finish_rotation();
        debug!("Rotated slot ring to index {} (average: {})", next, average);
        true
    }

    /// Drains every slot at once.
    ///
    /// Publishes `sum(slots) / slot_count` as the new average and leaves all
    /// slots at zero. The cursor does not move. Each slot is drained with an
    /// atomic swap, so an increment racing the decay is either counted in
    /// this average or kept for the next one, never lost.
    ///
    /// Returns the drained total, or `None` if another rotation or decay is
    /// in progress.
    pub fn decay(&self) -> Option<u64> {
        let Some(_guard) = RotationGuard::acquire(&self.rotating) else {
            debug!("Decay already in progress, skipping");
            return None;
        };

        let total = self.slots.iter().fold(0u64, |acc, slot| {
            acc.saturating_add(slot.get().swap(0, self.ordering.rmw()))
        });
        let average = total / self.slots.len() as u64;
        self.average.store(average, self.ordering.store());

        self.finish_rotation();
        debug!(
            "Decayed {} slots (total: {}, average: {})",
            self.slots.len(),
            total,
            average
        );
        Some(total)
    }

    #[inline]
    fn finish_rotation(&self) {
        self.total_rotations.fetch_add(1, Ordering::Relaxed);
        self.last_rotation_ms.store(current_time_ms(), Ordering::Relaxed);
    }

    /// Index of the live slot.
    #[inline(always)]
    pub fn current_index(&self) -> usize {
        self.current_index.get().load(self.ordering.load())
    }

    /// Number of slots in the ring.
    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Average count per slot as of the last rotation or decay.
    ///
    /// Zero until the first rotation. Before the ring has completed a full
    /// cycle this still divides by the full slot count.
    #[inline]
    pub fn average(&self) -> u64 {
        self.average.load(self.ordering.load())
    }

    /// Count of the slot `offset` rotations back from the live one.
    ///
    /// `offset` wraps modulo the slot count, so `value_at(slot_count())`
    /// reads the live slot again.
    #[inline]
    pub fn value_at(&self, offset: usize) -> u64 {
        let slot_count = self.slots.len();
        let offset = offset % slot_count;
        let index = (self.current_index() + slot_count - offset) % slot_count;
        self.slot_value(index)
    }

    /// Raw count of the slot at `index`, with no cursor interpretation.
    ///
    /// # Panics
    ///
    /// Panics if `index >= slot_count()`.
    #[inline]
    pub fn slot_value(&self, index: usize) -> u64 {
        self.slots[index].get().load(self.ordering.load())
    }

    /// Sum of every slot, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.slots.iter().fold(0u64, |acc, slot| {
            acc.saturating_add(slot.get().load(self.ordering.load()))
        })
    }

    /// Slot values in index order.
    pub fn slot_values(&self) -> Vec<u64> {
        (0..self.slots.len()).map(|i| self.slot_value(i)).collect()
    }

    /// Slot values from the oldest window to the live one.
    ///
    /// ```rust
    /// use flowrate::{MemoryOrdering, SlotRing};
    ///
    /// let ring = SlotRing::new(3, MemoryOrdering::default()).unwrap();
    /// ring.increment_current(1);
    /// ring.rotate();
    /// ring.increment_current(2);
    /// ring.rotate();
    /// ring.increment_current(3);
    ///
    /// assert_eq!(ring.slots_oldest_first(), vec![1, 2, 3]);
    /// ```
    pub fn slots_oldest_first(&self) -> Vec<u64> {
        let slot_count = self.slots.len();
        let oldest = self.current_index() + 1;
        (0..slot_count)
            .map(|i| self.slot_value((oldest + i) % slot_count))
            .collect()
    }

    /// Number of rotations and decays performed since creation.
    #[inline]
    pub fn total_rotations(&self) -> u64 {
        self.total_rotations.load(Ordering::Relaxed)
    }

    /// Timestamp (see [`current_time_ms`]) of the last rotation, or 0.
    #[inline]
    pub fn last_rotation_ms(&self) -> u64 {
        self.last_rotation_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
impl SlotRing {
    /// Marks a rotation as in progress (or finished) without running one.
    pub(crate) fn hold_rotation(&self, held: bool) {
        self.rotating.store(held, Ordering::Release);
    }
}

impl std::fmt::Debug for SlotRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotRing")
            .field("slot_count", &self.slot_count())
            .field("current_index", &self.current_index())
            .field("average", &self.average())
            .field("total_rotations", &self.total_rotations())
            .finish()
    }
}

/// RAII guard for the rotation flag.
///
/// Releases the flag even if the rotation panics.
struct RotationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RotationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RotationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ring(slot_count: usize) -> SlotRing {
        SlotRing::new(slot_count, MemoryOrdering::AcquireRelease).unwrap()
    }

    #[test]
    fn test_new_ring_is_zeroed() {
        for n in [1, 2, 7, 64] {
            let ring = ring(n);
            assert_eq!(ring.slot_count(), n);
            assert_eq!(ring.current_index(), 0);
            assert_eq!(ring.average(), 0);
            assert_eq!(ring.total(), 0);
            assert!(ring.slot_values().iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn test_invalid_slot_counts() {
        assert!(matches!(
            SlotRing::new(0, MemoryOrdering::default()),
            Err(CounterError::ZeroSlotCount)
        ));
        assert!(matches!(
            SlotRing::new(MAX_SLOT_COUNT + 1, MemoryOrdering::default()),
            Err(CounterError::TooManySlots { .. })
        ));
    }

    #[test]
    fn test_increment_returns_new_value() {
        let ring = ring(4);
        assert_eq!(ring.increment(2, 1), 1);
        assert_eq!(ring.increment(2, 1), 2);
        assert_eq!(ring.increment(2, 10), 12);
        assert_eq!(ring.slot_value(2), 12);
        assert_eq!(ring.slot_value(0), 0);
    }

    #[test]
    #[should_panic]
    fn test_increment_out_of_range_panics() {
        let ring = ring(4);
        ring.increment(4, 1);
    }

    #[test]
    fn test_rotate_advances_and_resets() {
        let ring = ring(4);
        ring.increment_current(5);

        assert!(ring.rotate());
        assert_eq!(ring.current_index(), 1);
        assert_eq!(ring.value_at(0), 0);
        assert_eq!(ring.value_at(1), 5);
        assert_eq!(ring.average(), 1);
        assert_eq!(ring.total_rotations(), 1);
        assert!(ring.last_rotation_ms() > 0);
    }

    #[test]
    fn test_rotation_cycle_wraps() {
        let ring = ring(3);
        for expected in [1, 2, 0, 1, 2, 0] {
            ring.rotate();
            assert_eq!(ring.current_index(), expected);
        }
    }

    #[test]
    fn test_full_cycle_without_increments_clears_ring() {
        let ring = ring(5);
        for i in 0..5 {
            ring.increment_current(i as u64 + 3);
            ring.rotate();
        }
        assert!(ring.total() > 0);

        for _ in 0..5 {
            ring.rotate();
        }

        assert_eq!(ring.total(), 0);
        assert_eq!(ring.average(), 0);
    }

    #[test]
    fn test_average_is_truncated_mean() {
        let ring = ring(4);
        // [3, 4, 0, 0] -> 7 / 4 = 1
        ring.increment(0, 3);
        ring.increment(1, 4);
        ring.rotate();
        assert_eq!(ring.average(), 1);

        let ring = ring_with(&[10, 10, 10, 9]);
        ring.rotate();
        assert_eq!(ring.average(), 9);
    }

    fn ring_with(values: &[u64]) -> SlotRing {
        let ring = ring(values.len());
        for (i, &v) in values.iter().enumerate() {
            ring.increment(i, v);
        }
        ring
    }

    #[test]
    fn test_single_slot_ring() {
        let ring = ring(1);
        ring.increment_current(7);

        assert!(ring.rotate());
        assert_eq!(ring.current_index(), 0);
        assert_eq!(ring.average(), 7);
        assert_eq!(ring.value_at(0), 0);
        assert_eq!(ring.value_at(5), 0);
    }

    #[test]
    fn test_value_at_wraps_cyclically() {
        let ring = ring(4);
        ring.increment_current(1);
        ring.rotate();
        ring.increment_current(2);
        ring.rotate();
        ring.increment_current(3);

        assert_eq!(ring.value_at(0), 3);
        assert_eq!(ring.value_at(1), 2);
        assert_eq!(ring.value_at(2), 1);
        assert_eq!(ring.value_at(3), 0);

        // Looking back exactly N steps lands on the live slot again
        assert_eq!(ring.value_at(4), ring.value_at(0));
        assert_eq!(ring.value_at(5), ring.value_at(1));
        assert_eq!(ring.value_at(4 * 1000 + 2), ring.value_at(2));
        assert_eq!(ring.value_at(usize::MAX), ring.value_at(usize::MAX % 4));
    }

    #[test]
    fn test_slots_oldest_first() {
        let ring = ring(4);
        for v in 1..=6 {
            ring.increment_current(v);
            ring.rotate();
        }
        ring.increment_current(7);

        // Windows 4..=7 survive, oldest first
        assert_eq!(ring.slots_oldest_first(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_decay_drains_every_slot() {
        let ring = ring_with(&[4, 0, 9, 3]);
        let index_before = ring.current_index();

        assert_eq!(ring.decay(), Some(16));
        assert_eq!(ring.average(), 4);
        assert_eq!(ring.total(), 0);
        assert_eq!(ring.current_index(), index_before);
        assert_eq!(ring.total_rotations(), 1);
    }

    #[test]
    fn test_rotation_skipped_while_in_progress() {
        let ring = ring(4);
        ring.rotating.store(true, Ordering::Release);

        assert!(!ring.rotate());
        assert_eq!(ring.decay(), None);
        assert_eq!(ring.current_index(), 0);
        assert_eq!(ring.total_rotations(), 0);

        ring.rotating.store(false, Ordering::Release);
        assert!(ring.rotate());
    }

    #[test]
    fn test_rotation_guard_releases_flag() {
        let flag = AtomicBool::new(false);
        {
            let guard = RotationGuard::acquire(&flag);
            assert!(guard.is_some());
            assert!(RotationGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_reads_are_idempotent() {
        let ring = ring_with(&[2, 8, 5]);
        ring.rotate();

        let first = (ring.value_at(0), ring.value_at(1), ring.average());
        for _ in 0..10 {
            assert_eq!((ring.value_at(0), ring.value_at(1), ring.average()), first);
        }
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let ring = Arc::new(ring(8));
        let mut handles = vec![];

        for t in 0..8 {
            let ring = ring.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    // Half the threads share slot 0, the rest spread out
                    let index = if t % 2 == 0 { 0 } else { t };
                    ring.increment(index, 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ring.slot_value(0), 40_000);
        assert_eq!(ring.total(), 80_000);
    }

    #[test]
    fn test_decay_under_concurrent_increments_loses_nothing() {
        let ring = Arc::new(ring(4));
        let writer = {
            let ring = ring.clone();
            thread::spawn(move || {
                for i in 0..20_000u64 {
                    ring.increment((i % 4) as usize, 1);
                }
            })
        };

        let mut drained = 0u64;
        while !writer.is_finished() {
            drained += ring.decay().unwrap_or(0);
        }
        writer.join().unwrap();
        drained += ring.decay().unwrap_or(0);

        assert_eq!(drained, 20_000);
        assert_eq!(ring.total(), 0);
    }

    #[test]
    fn test_debug_impl() {
        let ring = ring(3);
        let debug = format!("{:?}", ring);
        assert!(debug.contains("SlotRing"));
        assert!(debug.contains("slot_count: 3"));
    }
}
