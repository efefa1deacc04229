use crate::invariants::{
    debug_assert_bounded_count, debug_assert_monotonic, debug_assert_reader_behind_writer,
};
use crate::RingError;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Both ring variants share this sequence-counter protocol:
//
// ## Sequence Numbers
//
// `read_seq` and `write_seq` are unbounded u64 counters. Physical slot
// positions are `seq % capacity`, computed only when storage is touched.
// Capacities need not be powers of two (small staging rings are often odd
// sizes), so index wrapping uses `%` rather than a mask.
//
// ## Ordering Protocol
//
// **Writer:** fills slots in `[write_seq, write_seq + n)`, then publishes with
// a Release store of `write_seq`. It confirms free space with an Acquire load
// of `read_seq`, which synchronizes with the reader's Release store and
// guarantees the reader has vacated those slots.
//
// **Reader:** observes items with an Acquire load of `write_seq` (synchronizes
// with the writer's Release store, making the slot contents visible), then
// publishes consumption with a Release store of `read_seq`.
//
// **EOS:** the writer latches `eos` with a Release store *after* its final
// `write_seq` publication. A reader that Acquire-loads `eos == true` therefore
// also observes every published item, so "drained" (eos and nothing left to
// read, checked in that order) is a stable terminal state.
//
// Each counter has exactly one writing side; the counters are cache-padded so
// the two sides never share a line.
//
// =============================================================================

/// Shared sequence-counter state: the algebra behind every ring variant.
#[derive(Debug)]
pub(crate) struct SeqState {
    /// Written by the producer side only.
    write_seq: CachePadded<AtomicU64>,
    /// Written by the consumer side only.
    read_seq: CachePadded<AtomicU64>,
    /// Latched once by the producer side; never cleared.
    eos: AtomicBool,
    capacity: usize,
}

impl SeqState {
    pub(crate) fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        Ok(Self {
            write_seq: CachePadded::new(AtomicU64::new(0)),
            read_seq: CachePadded::new(AtomicU64::new(0)),
            eos: AtomicBool::new(false),
            capacity,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence of the next unread item. Acquire: callers touch slot contents.
    #[inline]
    pub(crate) fn read_seq(&self) -> u64 {
        self.read_seq.load(Ordering::Acquire)
    }

    /// Sequence of the next free slot. Acquire: callers touch slot contents.
    #[inline]
    pub(crate) fn write_seq(&self) -> u64 {
        self.write_seq.load(Ordering::Acquire)
    }

    /// Number of items available to read.
    #[inline]
    pub(crate) fn to_read(&self) -> usize {
        let w = self.write_seq.load(Ordering::Acquire);
        let r = self.read_seq.load(Ordering::Acquire);
        let count = w.wrapping_sub(r) as usize;
        debug_assert_bounded_count!(count, self.capacity);
        count
    }

    /// Number of free slots available to write.
    #[inline]
    pub(crate) fn to_write(&self) -> usize {
        self.capacity - self.to_read()
    }

    /// Readable items in the contiguous span at the current read position.
    #[inline]
    pub(crate) fn to_read_straight(&self) -> usize {
        let r = self.read_seq.load(Ordering::Acquire);
        let until_edge = self.capacity - (r % self.capacity as u64) as usize;
        self.to_read().min(until_edge)
    }

    /// Free slots in the contiguous span at the current write position.
    #[inline]
    pub(crate) fn to_write_straight(&self) -> usize {
        let w = self.write_seq.load(Ordering::Acquire);
        let until_edge = self.capacity - (w % self.capacity as u64) as usize;
        self.to_write().min(until_edge)
    }

    /// Physical slot index for a sequence number.
    #[inline]
    pub(crate) fn slot(&self, seq: u64) -> usize {
        (seq % self.capacity as u64) as usize
    }

    /// Publish `n` newly written items. Writer side only.
    #[inline]
    pub(crate) fn publish_write(&self, n: usize) {
        let w = self.write_seq.load(Ordering::Relaxed);
        let new_w = w.wrapping_add(n as u64);
        let r = self.read_seq.load(Ordering::Relaxed);
        debug_assert_monotonic!("write_seq", w, new_w);
        debug_assert_bounded_count!(new_w.wrapping_sub(r) as usize, self.capacity);
        self.write_seq.store(new_w, Ordering::Release);
    }

    /// Publish `n` consumed items. Reader side only.
    #[inline]
    pub(crate) fn publish_read(&self, n: usize) {
        let r = self.read_seq.load(Ordering::Relaxed);
        let new_r = r.wrapping_add(n as u64);
        let w = self.write_seq.load(Ordering::Relaxed);
        debug_assert_monotonic!("read_seq", r, new_r);
        debug_assert_reader_behind_writer!(new_r, w);
        self.read_seq.store(new_r, Ordering::Release);
    }

    /// Latch end-of-stream. Writer side; idempotent.
    #[inline]
    pub(crate) fn set_eos(&self) {
        self.eos.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_eos(&self) -> bool {
        self.eos.load(Ordering::Acquire)
    }

    /// EOS latched and nothing left to read. The `eos` load comes first, so a
    /// `true` result happens-after the final item publication.
    #[inline]
    pub(crate) fn is_drained(&self) -> bool {
        self.is_eos() && self.to_read() == 0
    }
}
