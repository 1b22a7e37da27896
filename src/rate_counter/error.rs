/// Error type for this crate.
///
/// Every variant is raised at construction time; a counter that was built
/// successfully never fails afterwards.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// The ring needs at least one slot.
    #[error("slot_count must be greater than 0")]
    ZeroSlotCount,

    /// The requested ring is larger than [`MAX_SLOT_COUNT`](crate::MAX_SLOT_COUNT).
    #[error("slot_count {requested} exceeds the maximum of {max}")]
    TooManySlots {
        /// Slot count that was asked for.
        requested: usize,
        /// Largest accepted slot count.
        max: usize,
    },

    /// Rotation must happen at a positive interval.
    #[error("rotation_interval_ms must be greater than 0")]
    ZeroRotationInterval,

    /// The operating system refused to start the rotation thread.
    #[error("failed to spawn rotation thread: {0}")]
    Spawn(#[from] std::io::Error),
}
