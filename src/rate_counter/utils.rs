//! # Utility Functions (utils.rs)
//!
//! Low-level helpers shared by the ring and the scheduler: cache-line
//! padding for slots and a monotonic millisecond clock.
//!
//! ```text
//!     x86_64 (Intel/AMD):  cache line 64 bytes
//!     AArch64 (ARM):       cache line 128 bytes
//!     Generic (fallback):  cache line 64 bytes (assumed)
//! ```

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Cache line size for x86_64 processors (Intel/AMD).
#[cfg(target_arch = "x86_64")]
pub const CACHE_LINE_SIZE: usize = 64;

/// Cache line size for ARM64 processors.
#[cfg(target_arch = "aarch64")]
pub const CACHE_LINE_SIZE: usize = 128;

/// Default cache line size for other architectures.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const CACHE_LINE_SIZE: usize = 64;

// Wall-clock epoch captured once, advanced with a monotonic Instant so a
// system clock jump cannot move rotation timestamps backwards.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Returns the current time in milliseconds since UNIX epoch.
///
/// The value is monotonic for the life of the process.
///
/// # Example
///
/// ```rust
/// use flowrate::current_time_ms;
///
/// let before = current_time_ms();
/// let after = current_time_ms();
/// assert!(after >= before);
/// ```
#[inline(always)]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Cache-aligned wrapper for values to prevent false sharing.
///
/// Every slot of a ring is wrapped in one of these so that two threads
/// hammering neighbouring slots never invalidate each other's cache line.
///
/// ```text
///     Without alignment:          With alignment:
///     ┌─────────────────────┐     ┌─────────────────────┐
///     │ slot 0 │ slot 1 │ … │     │ slot 0              │
///     └─────────────────────┘     └─────────────────────┘
///       one line, shared          ┌─────────────────────┐
///                                 │ slot 1              │
///                                 └─────────────────────┘
/// ```
#[cfg(target_arch = "x86_64")]
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);
#[cfg(target_arch = "aarch64")]
#[repr(C, align(128))]
pub(crate) struct CacheAligned<T>(pub(crate) T);
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> &T {
        &self.0
    }
}
