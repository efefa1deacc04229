//! Byte stream writer: drains a byte ring into an opaque byte sink.

use crate::agent::Agent;
use crate::error::PipeError;
use crate::source::ByteSink;
use ringpipe::ByteRing;
use std::sync::Arc;

/// Agent that moves bytes from a [`ByteRing`] into a [`ByteSink`].
///
/// Each action hands the sink the whole straight readable span of the ring,
/// then advances past it. The sink contract offers no availability signal, so
/// the call may block briefly inside the sink; callers that need a hard
/// non-blocking guarantee must supply a sink with bounded blocking.
pub struct ByteStreamWriter<W> {
    ring: Arc<ByteRing>,
    sink: W,
    failed: bool,
}

impl<W: ByteSink> ByteStreamWriter<W> {
    pub fn new(ring: Arc<ByteRing>, sink: W) -> Self {
        Self {
            ring,
            sink,
            failed: false,
        }
    }

    /// Returns the sink once the agent is retired.
    pub fn into_sink(self) -> W {
        self.sink
    }
}

impl<W: ByteSink> Agent for ByteStreamWriter<W> {
    /// Bytes moved by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        !self.failed && self.ring.to_read() > 0
    }

    fn done(&mut self) -> bool {
        self.failed || self.ring.is_drained()
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let run = self.ring.read_run();
        if run.is_empty() {
            return Ok(0);
        }
        if let Err(err) = self.sink.write(run.as_slice()) {
            self.failed = true;
            return Err(PipeError::Io(err));
        }
        let n = run.len();
        run.commit(n);
        Ok(n)
    }

    fn abort(&mut self) {
        self.failed = true;
    }
}
