//! # Rotation Scheduler
//!
//! Every counter owns one background thread that calls its tick function at
//! a fixed rate. The thread lives exactly as long as the owning counter.
//!
//! ```text
//!     Fixed-rate schedule (interval = 100ms):
//!
//!     start      +100      +200      +300      +400
//!       │─────────│─────────│─────────│─────────│
//!                 tick      tick      tick      tick
//!
//!     A tick that runs late does not shift the grid: the next deadline is
//!     still start + k × interval, and missed deadlines fire back to back.
//! ```
//!
//! Stopping sends a message over a channel and joins the thread, so once
//! [`RotationTask::stop`] returns no tick will ever run again.

use super::{config::RateCounterConfig, error::CounterError, ring::SlotRing};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Process-wide sequence for rotation thread names.
static THREAD_SEQUENCE: AtomicUsize = AtomicUsize::new(1);

/// Handle to a running rotation thread.
///
/// Dropping the handle stops the thread.
pub(crate) struct RotationTask {
    name: String,
    interval: Duration,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RotationTask {
    /// Spawns a thread named `<prefix>-<n>` that calls `tick` every `interval`.
    ///
    /// The first tick fires one interval after spawning. A panic inside
    /// `tick` is logged and the schedule continues.
    pub(crate) fn spawn<F>(prefix: &str, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = format!(
            "{}-{}",
            prefix,
            THREAD_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            info!(
                "Started rotation thread {} (interval: {}ms)",
                thread_name,
                interval.as_millis()
            );

            let mut next_tick = Instant::now() + interval;
            let mut lag_latch = LagLatch::default();
            loop {
                let wait = next_tick.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }

                if panic::catch_unwind(AssertUnwindSafe(&mut tick)).is_err() {
                    error!("Rotation on thread {} panicked", thread_name);
                }

                next_tick += interval;
                let lag = Instant::now().saturating_duration_since(next_tick);
                if lag_latch.should_warn(lag, interval) {
                    warn!(
                        "Rotation thread {} is {}ms behind schedule, catching up",
                        thread_name,
                        lag.as_millis()
                    );
                }
            }

            info!("Rotation thread {} stopping", thread_name);
        })?;

        Ok(Self {
            name,
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    ///
    /// A tick already in progress completes first. Calling `stop` more than
    /// once is a no-op.
    pub(crate) fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The receiver is gone only if the thread already exited
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Rotation thread {} terminated abnormally", self.name);
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

/// Reports a scheduler falling behind once per stall rather than once per
/// missed tick.
#[derive(Debug, Default)]
struct LagLatch {
    lagging: bool,
}

impl LagLatch {
    /// Returns `true` only on the tick where the lag first exceeds one interval.
    fn should_warn(&mut self, lag: Duration, interval: Duration) -> bool {
        let behind = lag > interval;
        let first = behind && !self.lagging;
        self.lagging = behind;
        first
    }
}

impl Drop for RotationTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RotationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// What a scheduled tick does to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RotationMode {
    /// Move to the next time window ([`SlotRing::rotate`]).
    Advance,
    /// Drain every bucket ([`SlotRing::decay`]).
    Decay,
}

impl RotationMode {
    #[inline]
    pub(crate) fn apply(self, ring: &SlotRing) -> bool {
        match self {
            Self::Advance => ring.rotate(),
            Self::Decay => ring.decay().is_some(),
        }
    }

    /// Body of a scheduled tick.
    ///
    /// A manual rotation running at the same moment takes the place of this
    /// tick; the schedule itself is not shifted.
    fn scheduled(self, ring: &SlotRing) -> bool {
        let applied = self.apply(ring);
        if !applied {
            debug!(
                "Scheduled {:?} on thread {} skipped, a manual rotation was running",
                self,
                thread::current().name().unwrap_or("unnamed")
            );
        }
        applied
    }
}

/// A slot ring bound to the thread that rotates it.
///
/// The ring is shared with the rotation thread through an `Arc`; the task
/// handle sits behind a mutex that is only touched on shutdown, never on the
/// record or read paths.
pub(crate) struct DrivenRing {
    ring: Arc<SlotRing>,
    task: Mutex<RotationTask>,
    mode: RotationMode,
    config: RateCounterConfig,
}

impl DrivenRing {
    /// Validates `config`, builds the ring and starts its rotation thread.
    pub(crate) fn start(
        config: RateCounterConfig,
        default_thread_name: &str,
        mode: RotationMode,
    ) -> Result<Self, CounterError> {
        config.validate()?;

        let ring = Arc::new(SlotRing::new(config.slot_count, config.ordering)?);
        let ticking = Arc::clone(&ring);
        let prefix = config.thread_name.as_deref().unwrap_or(default_thread_name);
        let task = RotationTask::spawn(
            prefix,
            Duration::from_millis(config.rotation_interval_ms),
            move || {
                mode.scheduled(&ticking);
            },
        )?;

        Ok(Self {
            ring,
            task: Mutex::new(task),
            mode,
            config,
        })
    }

    #[inline(always)]
    pub(crate) fn ring(&self) -> &SlotRing {
        &self.ring
    }

    pub(crate) fn config(&self) -> &RateCounterConfig {
        &self.config
    }

    /// Runs one tick on the calling thread. Returns `false` if a scheduled
    /// tick was running at the same moment and this one was skipped.
    pub(crate) fn rotate_now(&self) -> bool {
        self.mode.apply(&self.ring)
    }

    pub(crate) fn shutdown(&self) {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_running()
    }

    pub(crate) fn thread_name(&self) -> String {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .name()
            .to_owned()
    }
}

impl std::fmt::Debug for DrivenRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrivenRing")
            .field("ring", &self.ring)
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish()
    }
}
