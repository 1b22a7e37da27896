//! # Rate Counter Module
//!
//! Internal implementation of the sliding-window counters. Each submodule
//! owns one concern; the public surface is re-exported from here.
//!
//! ## Module Structure
//!
//! ```text
//!     rate_counter/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── config.rs       (Configuration and validation)
//!     ├── error.rs        (Error type)
//!     ├── ring.rs         (Lock-free slot ring)
//!     ├── scheduler.rs    (Background rotation thread)
//!     ├── global.rs       (Time-windowed global counter)
//!     ├── keyed.rs        (Hash-bucketed per-key counter)
//!     ├── metrics.rs      (Snapshots and summaries)
//!     └── utils.rs        (Clock and cache alignment)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     record_event()                    every rotation_interval_ms
//!          │                                      │
//!          ▼                                      ▼
//!     ┌──────────────┐                   ┌────────────────┐
//!     │ Global/Keyed │                   │ RotationTask   │
//!     └──────┬───────┘                   └───────┬────────┘
//!            │ fetch_add                         │ rotate / decay
//!            ▼                                   ▼
//!     ┌─────────────────────────────────────────────────┐
//!     │                    SlotRing                     │
//!     │   [slot 0][slot 1] ... [slot N-1]   average     │
//!     └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Component Responsibilities
//!
//! - **config**: Slot count, interval, memory ordering and validation
//! - **ring**: Atomic slots, rotation and decay
//! - **scheduler**: Fixed-rate thread that drives a ring
//! - **global**: Windowed counter over time
//! - **keyed**: Fixed-size approximate per-key counter
//! - **metrics**: Point-in-time statistics

mod config;
mod error;
mod global;
mod keyed;
mod metrics;
mod ring;
mod scheduler;
mod utils;

/// Configuration types for customizing counter behavior
pub use config::{MemoryOrdering, RateCounterConfig, MAX_SLOT_COUNT};

/// Error returned when a counter cannot be created
pub use error::CounterError;

/// Time-windowed global counter
pub use global::GlobalRateCounter;

/// Hash-bucketed per-key counter
pub use keyed::KeyedRateCounter;

/// Snapshot statistics
pub use metrics::CounterStats;

/// The slot ring both counters are built on
pub use ring::SlotRing;

/// Monotonic clock and slot padding size
pub use utils::{current_time_ms, CACHE_LINE_SIZE};
