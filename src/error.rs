//! Error types surfaced by the FIFO and codec layers.
//!
//! Protocol-level validation failures (bad framing, bad payload characters)
//! are not modeled as a separate error enum: the engine maps every one of
//! them to a single wire signal (NACK) and never surfaces them to the host
//! application, so there is nothing for application code to match on.

/// Failures returned by [`crate::fifo::ByteFifo`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoError {
    /// Capacity passed to `ByteFifo::new` was not a power of two (or was
    /// smaller than 2).
    #[error("fifo capacity is not a power of two")]
    NonPowerOfTwo,
    /// `put` was called while the buffer held `capacity - 1` bytes already.
    #[error("fifo is full")]
    Full,
    /// `get`/`pop` was called while head == tail.
    #[error("fifo is empty")]
    Empty,
}
