//! Ring-buffer watcher: invokes a callback whenever items are available.

use crate::agent::Agent;
use crate::error::PipeError;
use ringpipe::{ScalarRing, SlotRing};
use std::sync::Arc;

/// Read-side observations a watcher needs from any ring variant.
pub trait WatchTarget: Send + Sync {
    /// Items currently available to read.
    fn pending(&self) -> usize;
    /// EOS latched and nothing left to read.
    fn is_drained(&self) -> bool;
}

impl<T: Copy + Send> WatchTarget for ScalarRing<T> {
    fn pending(&self) -> usize {
        self.to_read()
    }

    fn is_drained(&self) -> bool {
        ScalarRing::is_drained(self)
    }
}

impl<T: Send> WatchTarget for SlotRing<T> {
    fn pending(&self) -> usize {
        self.to_read()
    }

    fn is_drained(&self) -> bool {
        SlotRing::is_drained(self)
    }
}

/// Terminal agent that calls back whenever the watched ring has items.
///
/// The watcher consumes nothing itself: the callback is responsible for
/// draining the ring (through the handle it receives), and may find more than
/// one item waiting. A callback error terminates the watcher and surfaces as
/// [`PipeError::Internal`] on the driving future.
pub struct RingWatcher<R, F> {
    ring: Arc<R>,
    callback: F,
}

impl<R, F> RingWatcher<R, F>
where
    R: WatchTarget,
    F: FnMut(&R) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send,
{
    pub fn new(ring: Arc<R>, callback: F) -> Self {
        Self { ring, callback }
    }
}

impl<R, F> Agent for RingWatcher<R, F>
where
    R: WatchTarget,
    F: FnMut(&R) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send,
{
    /// Items that were pending when the callback fired.
    type Output = usize;

    fn ready(&mut self) -> bool {
        self.ring.pending() > 0
    }

    fn done(&mut self) -> bool {
        self.ring.is_drained()
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let pending = self.ring.pending();
        (self.callback)(&self.ring).map_err(PipeError::Internal)?;
        Ok(pending)
    }
}
