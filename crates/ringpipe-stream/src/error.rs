//! Error types for pipeline operations.

use crate::charset::Charset;
use ringpipe::RingError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced on driver futures and agent operations.
#[derive(Debug, Error)]
pub enum PipeError {
    /// A constructor or configuration argument is out of contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An operation was started on an agent that is not idle.
    #[error("agent is busy")]
    AlreadyBusy,

    /// The underlying byte source or sink failed.
    #[error("i/o failure in byte source or sink")]
    Io(#[source] std::io::Error),

    /// Terminal malformed byte sequence (distinct from the recoverable
    /// wrap-around splits the decoder absorbs through its scratch buffer).
    #[error("malformed {charset} byte sequence")]
    Decode { charset: Charset },

    /// A character has no representation in the configured character set.
    #[error("character not representable in {charset}")]
    Encode { charset: Charset },

    /// The driver deadline elapsed before completion.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A caller-supplied callback failed.
    #[error("callback failed")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipeError {
    /// `true` if the error names a condition the caller can fix by
    /// reconstructing the agent with different arguments.
    #[inline]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::AlreadyBusy)
    }

    /// `true` if the error terminated the owning agent (its output ring has
    /// been latched EOS and the agent will not run again).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_usage()
    }
}

impl From<RingError> for PipeError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::ZeroCapacity => Self::InvalidArgument("ring capacity must be positive"),
        }
    }
}

impl From<std::io::Error> for PipeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
