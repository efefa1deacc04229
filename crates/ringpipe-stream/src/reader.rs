//! Byte stream reader: pulls from an opaque byte source into a byte ring
//! whenever non-blocking progress is possible.

use crate::agent::Agent;
use crate::error::PipeError;
use crate::source::{ByteSource, EosSource, ReadOutcome};
use ringpipe::ByteRing;
use std::sync::Arc;

/// Agent that moves bytes from an [`EosSource`] into a [`ByteRing`].
///
/// Each action reads up to `min(source.available(), straight write span)`
/// bytes directly into the ring storage, so arrival chunks land without an
/// intermediate copy. End of stream, whether reported by the source's own
/// sentinel or by the EOS overlay, latches the ring, and any source error
/// latches the ring as well before surfacing as [`PipeError::Io`], so
/// downstream stages always observe a terminated stream.
pub struct ByteStreamReader<S> {
    source: EosSource<S>,
    ring: Arc<ByteRing>,
    latched_eos: bool,
}

impl<S: ByteSource> ByteStreamReader<S> {
    pub fn new(source: EosSource<S>, ring: Arc<ByteRing>) -> Self {
        Self {
            source,
            ring,
            latched_eos: false,
        }
    }

    fn latch(&mut self) {
        self.ring.set_eos();
        self.latched_eos = true;
    }
}

impl<S: ByteSource> Agent for ByteStreamReader<S> {
    /// Bytes moved by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        if self.latched_eos || self.ring.to_write_straight() == 0 {
            return false;
        }
        // An availability error counts as ready so the action surfaces it.
        self.source.available().map_or(true, |n| n > 0)
    }

    fn done(&mut self) -> bool {
        if self.latched_eos {
            return true;
        }
        // Consult the EOS overlay before scheduling another poll.
        if self.source.is_eos() {
            self.latch();
            return true;
        }
        false
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let available = match self.source.available() {
            Ok(n) => n,
            Err(err) => {
                self.latch();
                return Err(PipeError::Io(err));
            }
        };
        let mut run = self.ring.write_run();
        let n = available.min(run.len());
        if n == 0 {
            return Ok(0);
        }
        match self.source.read(&mut run.as_mut_slice()[..n]) {
            Ok(ReadOutcome::Bytes(moved)) => {
                run.commit(moved);
                Ok(moved)
            }
            Ok(ReadOutcome::Eos) => {
                drop(run);
                self.latch();
                Ok(0)
            }
            Err(err) => {
                drop(run);
                self.latch();
                Err(PipeError::Io(err))
            }
        }
    }

    fn abort(&mut self) {
        self.latch();
    }
}
