use thiserror::Error;

/// Errors raised while constructing a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Ring capacity must be a positive number of slots.
    #[error("ring capacity must be positive")]
    ZeroCapacity,
}
