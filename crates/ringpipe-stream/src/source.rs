//! Byte source/sink contracts and the end-of-stream overlay.
//!
//! The platform primitives this pipeline consumes are deliberately dumb: a
//! [`ByteSource`] can say how many bytes are ready *now* and hand them over,
//! but an `available()` of zero is ambiguous between "later" and "never".
//! [`EosSource`] overlays the missing signal with a caller-supplied probe
//! (process liveness, a known total length, or an arbitrary predicate) and
//! latches it once true.
//!
//! [`MemorySource`] and [`MemorySink`] are in-memory endpoints used
//! throughout the test suites; the source can release its bytes in timed
//! chunks to model a slow producer.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Result of one read against a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were delivered; zero means "nothing yet, maybe later".
    Bytes(usize),
    /// The source will never deliver another byte.
    Eos,
}

/// An opaque, non-blocking byte producer.
///
/// `available()` is advisory: absent an EOS overlay, zero may mean "not yet"
/// or "never". `read` delivers at most `buf.len()` bytes and reports EOS at
/// most once via [`ReadOutcome::Eos`]; platform sources that cannot detect
/// their own end simply keep returning `Bytes(0)`.
pub trait ByteSource: Send {
    fn available(&mut self) -> io::Result<usize>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;
}

/// An opaque byte consumer. `write` must accept the whole buffer and may
/// block briefly doing so.
pub trait ByteSink: Send {
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;
}

/// Liveness probe for a source fed by another process.
pub trait ProcessHandle: Send {
    fn is_alive(&mut self) -> bool;
}

impl<F: FnMut() -> bool + Send> ProcessHandle for F {
    fn is_alive(&mut self) -> bool {
        self()
    }
}

type AvailableFn<S> = Box<dyn FnMut(&mut S) -> io::Result<usize> + Send>;
type ProbeFn<S> = Box<dyn FnMut(&mut S, u64) -> bool + Send>;

enum Probe<S> {
    /// Rely on the source's own `Eos` sentinel only.
    None,
    /// Arbitrary predicate over the source and the running byte count.
    Custom(ProbeFn<S>),
    /// Drained and the feeding process has exited.
    Process(Box<dyn ProcessHandle>),
    /// Drained and the known total length has been read.
    Length(u64),
}

/// A byte source with an end-of-stream signal layered on top.
///
/// The probe latches: once it reports EOS the wrapper stays at EOS no matter
/// what the underlying source does. The byte-stream reader consults
/// [`is_eos`](Self::is_eos) before scheduling another poll, which is what
/// turns "available() == 0 forever" into a terminating pipeline instead of an
/// idle one.
pub struct EosSource<S> {
    inner: S,
    probe: Probe<S>,
    available_override: Option<AvailableFn<S>>,
    latched: bool,
    bytes_read: u64,
}

impl<S: ByteSource> EosSource<S> {
    /// No probe: EOS comes only from the source's own `Eos` sentinel.
    pub fn unbounded(inner: S) -> Self {
        Self::with(inner, Probe::None)
    }

    /// EOS once `probe(source, bytes_read_so_far)` first returns true.
    pub fn with_probe(
        inner: S,
        probe: impl FnMut(&mut S, u64) -> bool + Send + 'static,
    ) -> Self {
        Self::with(inner, Probe::Custom(Box::new(probe)))
    }

    /// EOS once the source is drained and the feeding process has exited.
    pub fn attached_to_process(inner: S, handle: impl ProcessHandle + 'static) -> Self {
        Self::with(inner, Probe::Process(Box::new(handle)))
    }

    /// EOS once the source is drained and `length` bytes have been read
    /// (e.g. a file of known size).
    pub fn sized(inner: S, length: u64) -> Self {
        Self::with(inner, Probe::Length(length))
    }

    fn with(inner: S, probe: Probe<S>) -> Self {
        Self {
            inner,
            probe,
            available_override: None,
            latched: false,
            bytes_read: 0,
        }
    }

    /// Replaces the source's availability report.
    pub fn with_available(
        mut self,
        available: impl FnMut(&mut S) -> io::Result<usize> + Send + 'static,
    ) -> Self {
        self.available_override = Some(Box::new(available));
        self
    }

    /// Bytes delivered through this wrapper so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Evaluates (and latches) the EOS overlay.
    pub fn is_eos(&mut self) -> bool {
        if self.latched {
            return true;
        }
        let hit = match &mut self.probe {
            Probe::None => false,
            Probe::Custom(probe) => probe(&mut self.inner, self.bytes_read),
            Probe::Process(handle) => {
                // An availability error is not EOS; the read path surfaces it.
                let drained = self.inner.available().map_or(false, |n| n == 0);
                drained && !handle.is_alive()
            }
            Probe::Length(length) => {
                let drained = self.inner.available().map_or(false, |n| n == 0);
                drained && self.bytes_read == *length
            }
        };
        if hit {
            self.latched = true;
        }
        self.latched
    }
}

impl<S: ByteSource> ByteSource for EosSource<S> {
    fn available(&mut self) -> io::Result<usize> {
        if self.latched {
            return Ok(0);
        }
        match &mut self.available_override {
            Some(available) => available(&mut self.inner),
            None => self.inner.available(),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if self.latched {
            return Ok(ReadOutcome::Eos);
        }
        match self.inner.read(buf)? {
            ReadOutcome::Bytes(n) => {
                self.bytes_read += n as u64;
                Ok(ReadOutcome::Bytes(n))
            }
            ReadOutcome::Eos => {
                self.latched = true;
                Ok(ReadOutcome::Eos)
            }
        }
    }
}

// ---------------------------------------------------------------------
// In-memory endpoints
// ---------------------------------------------------------------------

/// In-memory byte source, optionally releasing its contents in timed chunks.
///
/// With chunking configured, the first chunk is available immediately and one
/// more is released per elapsed interval, which models a producer that keeps
/// the pipeline waiting. Exhaustion is reported as `Bytes(0)`, not `Eos`, to
/// mimic platform sources that cannot see their own end; wrap in
/// [`EosSource::sized`] to terminate.
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    interval: Duration,
    started: Option<Instant>,
    signal_eos: bool,
}

impl MemorySource {
    /// Everything available immediately; exhaustion reports `Bytes(0)`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk: 0,
            interval: Duration::ZERO,
            started: None,
            signal_eos: false,
        }
    }

    /// Everything available immediately; exhaustion reports the `Eos`
    /// sentinel, like a source that does know its own end.
    pub fn with_eos_sentinel(data: impl Into<Vec<u8>>) -> Self {
        let mut src = Self::new(data);
        src.signal_eos = true;
        src
    }

    /// Releases `chunk` bytes immediately and `chunk` more per `interval`.
    pub fn chunked(data: impl Into<Vec<u8>>, chunk: usize, interval: Duration) -> Self {
        let mut src = Self::new(data);
        src.chunk = chunk.max(1);
        src.interval = interval;
        src
    }

    /// Total bytes released by the chunk schedule so far.
    fn released(&mut self) -> usize {
        if self.chunk == 0 {
            return self.data.len();
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        let intervals = if self.interval.is_zero() {
            u64::MAX
        } else {
            started.elapsed().as_nanos() as u64 / self.interval.as_nanos().max(1) as u64
        };
        let chunks = intervals.saturating_add(1);
        (chunks.saturating_mul(self.chunk as u64)).min(self.data.len() as u64) as usize
    }
}

impl ByteSource for MemorySource {
    fn available(&mut self) -> io::Result<usize> {
        let pending = self.released() - self.pos;
        // A source that knows its own end stays "readable" once exhausted so
        // callers reach the sentinel, the way a closed descriptor stays
        // readable under poll(2).
        if pending == 0 && self.signal_eos && self.pos == self.data.len() {
            return Ok(1);
        }
        Ok(pending)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let avail = self.released() - self.pos;
        if avail == 0 {
            if self.signal_eos && self.pos == self.data.len() {
                return Ok(ReadOutcome::Eos);
            }
            return Ok(ReadOutcome::Bytes(0));
        }
        let n = avail.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(ReadOutcome::Bytes(n))
    }
}

/// In-memory byte sink; cloneable so tests can keep a handle on the
/// collected output while the pipeline owns the sink.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().expect("sink mutex poisoned").clone()
    }
}

impl ByteSink for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.data.lock().expect("sink mutex poisoned").extend_from_slice(buf);
        Ok(())
    }
}
