//! Point-in-time statistics for rate counters.
//!
//! ```text
//!     Counter Stats:
//!     ┌─────────────────────────────────────┐
//!     │  Slots: 4      Rotations: 12        │
//!     │  ▁▃█▂  (oldest → live)              │
//!     │  Average: 23   Busiest: 61          │
//!     │  Imbalance: 2.65×                   │
//!     └─────────────────────────────────────┘
//! ```

use std::fmt;

/// Snapshot of a counter's ring.
///
/// Slot values are read one by one without stopping writers, so the
/// snapshot is approximate under load, like the counter itself.
///
/// For a [`GlobalRateCounter`](crate::GlobalRateCounter) `slots` runs from
/// the oldest window to the live one. For a
/// [`KeyedRateCounter`](crate::KeyedRateCounter) it is in bucket order.
///
/// ## Example
///
/// ```rust
/// use flowrate::GlobalRateCounter;
///
/// let counter = GlobalRateCounter::new(4, 1000).unwrap();
/// counter.record_events(12);
///
/// let stats = counter.stats();
/// assert_eq!(stats.total_count, 12);
/// println!("{}", stats.summary());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterStats {
    /// Number of slots in the ring.
    pub slot_count: usize,

    /// Average count per slot published by the last rotation.
    pub average_count: u64,

    /// Sum of all slots at snapshot time.
    pub total_count: u64,

    /// Largest single slot value at snapshot time.
    pub busiest_slot: u64,

    /// Rotations (or decays) performed since the counter was created.
    pub total_rotations: u64,

    /// Timestamp of the last rotation in milliseconds, 0 if none yet.
    pub last_rotation_ms: u64,

    /// Individual slot values.
    pub slots: Vec<u64>,
}

impl CounterStats {
    pub(crate) fn from_slots(
        slots: Vec<u64>,
        average_count: u64,
        total_rotations: u64,
        last_rotation_ms: u64,
    ) -> Self {
        let total_count = slots.iter().fold(0u64, |acc, &v| acc.saturating_add(v));
        let busiest_slot = slots.iter().copied().max().unwrap_or(0);
        Self {
            slot_count: slots.len(),
            average_count,
            total_count,
            busiest_slot,
            total_rotations,
            last_rotation_ms,
            slots,
        }
    }

    /// Ratio of the busiest slot to the published average.
    ///
    /// For a keyed counter a high value points at a hot key (or a collision
    /// of several keys in one bucket). Returns 0.0 when no average has been
    /// published yet.
    pub fn imbalance(&self) -> f64 {
        if self.average_count == 0 {
            0.0
        } else {
            self.busiest_slot as f64 / self.average_count as f64
        }
    }

    /// Mean over the live slot values rather than the last published average.
    pub fn live_mean(&self) -> f64 {
        if self.slot_count == 0 {
            0.0
        } else {
            self.total_count as f64 / self.slot_count as f64
        }
    }

    /// Slot values joined by spaces, e.g. `"3 0 7 1"`.
    pub fn slot_line(&self) -> String {
        self.slots
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Rate Counter Stats:\n\
             ├─ Ring:\n\
             │  ├─ Slots: {}\n\
             │  ├─ Values: [{}]\n\
             │  └─ Rotations: {}\n\
             └─ Load:\n\
                ├─ Average: {}\n\
                ├─ Total: {}\n\
                ├─ Busiest Slot: {}\n\
                └─ Imbalance: {:.2}x",
            self.slot_count,
            self.slot_line(),
            self.total_rotations,
            self.average_count,
            self.total_count,
            self.busiest_slot,
            self.imbalance()
        )
    }
}

impl fmt::Display for CounterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
