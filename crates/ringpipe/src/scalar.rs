use crate::run::{ReadRun, WriteRun};
use crate::seq::SeqState;
use crate::RingError;
use std::cell::UnsafeCell;

/// SPSC ring buffer over plain scalar elements.
///
/// Storage is a fixed, default-initialized `Box<[T]>`, so every slot is always
/// a valid `T` and the zero-copy run views can hand out ordinary slices: a
/// byte source reads straight into a [`WriteRun`], a byte sink drains straight
/// out of a [`ReadRun`], no staging buffer in between.
///
/// # Concurrency contract
///
/// One party writes (advances `write_seq`, may latch EOS), one party reads
/// (advances `read_seq`). The slots at or ahead of `write_seq` belong to the
/// writer, the slots behind `read_seq` are free; neither side touches the
/// other's span. Obtaining two overlapping [`WriteRun`]s (or calling writer
/// operations from two threads at once) violates this contract.
pub struct ScalarRing<T> {
    seq: SeqState,
    storage: UnsafeCell<Box<[T]>>,
}

/// Ring of raw octets, the transport between byte sources/sinks and codecs.
pub type ByteRing = ScalarRing<u8>;

/// Ring of scalar characters, the transport between codecs and line agents.
pub type CharRing = ScalarRing<char>;

// Safety: slot access is disciplined by the sequence-counter protocol in
// `SeqState`; each slot has one writing side at any moment.
unsafe impl<T: Send> Send for ScalarRing<T> {}
unsafe impl<T: Send> Sync for ScalarRing<T> {}

impl<T: Copy + Default> ScalarRing<T> {
    /// Creates a ring with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let seq = SeqState::new(capacity)?;
        let storage = vec![T::default(); capacity].into_boxed_slice();
        Ok(Self {
            seq,
            storage: UnsafeCell::new(storage),
        })
    }
}

impl<T: Copy> ScalarRing<T> {
    // ---------------------------------------------------------------------
    // AVAILABILITY
    // ---------------------------------------------------------------------

    #[inline]
    pub fn capacity(&self) -> usize {
        self.seq.capacity()
    }

    /// Items available to read.
    #[inline]
    pub fn to_read(&self) -> usize {
        self.seq.to_read()
    }

    /// Free slots available to write.
    #[inline]
    pub fn to_write(&self) -> usize {
        self.seq.to_write()
    }

    /// Readable items in the contiguous span at the read position.
    #[inline]
    pub fn to_read_straight(&self) -> usize {
        self.seq.to_read_straight()
    }

    /// Free slots in the contiguous span at the write position.
    #[inline]
    pub fn to_write_straight(&self) -> usize {
        self.seq.to_write_straight()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_read() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.to_write() == 0
    }

    // ---------------------------------------------------------------------
    // ITEM API
    // ---------------------------------------------------------------------

    /// Returns the element `delta` positions ahead of the read position
    /// without consuming it, or `None` past the available items.
    pub fn peek(&self, delta: usize) -> Option<T> {
        if delta >= self.seq.to_read() {
            return None;
        }
        let seq = self.seq.read_seq().wrapping_add(delta as u64);
        // SAFETY: the slot is inside [read_seq, write_seq); the Acquire load
        // in to_read() synchronized with the writer's publication, and the
        // writer will not reuse the slot until read_seq advances past it.
        Some(unsafe { (*self.storage.get())[self.seq.slot(seq)] })
    }

    /// Consumes and returns the next element, or `None` when nothing is
    /// available. Reading past the last item does not move the read position.
    pub fn read(&self) -> Option<T> {
        let item = self.peek(0)?;
        self.seq.publish_read(1);
        Some(item)
    }

    /// Appends one element. Returns `false` when the ring is full or EOS has
    /// been latched; a refused write has no effect on `write_seq`.
    pub fn write(&self, item: T) -> bool {
        if self.seq.is_eos() || self.seq.to_write() == 0 {
            return false;
        }
        let seq = self.seq.write_seq();
        // SAFETY: the slot is ahead of write_seq and behind read_seq + capacity
        // (checked above), so it belongs to the writer until publication.
        unsafe {
            (*self.storage.get())[self.seq.slot(seq)] = item;
        }
        self.seq.publish_write(1);
        true
    }

    /// Bulk append. Copies as much of `src` as fits and returns the count.
    pub fn write_from(&self, src: &[T]) -> usize {
        if self.seq.is_eos() {
            return 0;
        }
        let mut written = 0;
        while written < src.len() {
            let mut run = self.write_run();
            if run.is_empty() {
                break;
            }
            let n = run.len().min(src.len() - written);
            run.as_mut_slice()[..n].copy_from_slice(&src[written..written + n]);
            run.commit(n);
            written += n;
        }
        written
    }

    /// Bulk drain. Copies up to `out.len()` items and returns the count.
    pub fn read_into(&self, out: &mut [T]) -> usize {
        let mut read = 0;
        while read < out.len() {
            let run = self.read_run();
            if run.is_empty() {
                break;
            }
            let n = run.len().min(out.len() - read);
            out[read..read + n].copy_from_slice(&run.as_slice()[..n]);
            run.commit(n);
            read += n;
        }
        read
    }

    /// Skips up to `delta` readable items; returns the amount actually
    /// skipped.
    pub fn advance_read(&self, delta: usize) -> usize {
        let n = delta.min(self.seq.to_read());
        if n > 0 {
            self.seq.publish_read(n);
        }
        n
    }

    /// Publishes up to `delta` slots previously filled through a run view;
    /// returns the amount actually published. Has no effect after EOS.
    pub fn advance_write(&self, delta: usize) -> usize {
        if self.seq.is_eos() {
            return 0;
        }
        let n = delta.min(self.seq.to_write());
        if n > 0 {
            self.seq.publish_write(n);
        }
        n
    }

    // ---------------------------------------------------------------------
    // ZERO-COPY RUN VIEWS
    // ---------------------------------------------------------------------

    /// View of the contiguous readable span. Consume with
    /// [`ReadRun::commit`]; an uncommitted run leaves the ring untouched.
    pub fn read_run(&self) -> ReadRun<'_, T> {
        let start = self.seq.read_seq();
        let len = self.seq.to_read_straight();
        ReadRun::new(self, start, len)
    }

    /// View of the contiguous writable span. Publish with
    /// [`WriteRun::commit`]; an uncommitted run leaves the ring untouched.
    /// Empty after EOS has been latched.
    pub fn write_run(&self) -> WriteRun<'_, T> {
        let start = self.seq.write_seq();
        let len = if self.seq.is_eos() {
            0
        } else {
            self.seq.to_write_straight()
        };
        WriteRun::new(self, start, len)
    }

    // ---------------------------------------------------------------------
    // END OF STREAM
    // ---------------------------------------------------------------------

    /// Latches end-of-stream: no further items will ever be produced.
    #[inline]
    pub fn set_eos(&self) {
        self.seq.set_eos();
    }

    #[inline]
    pub fn is_eos(&self) -> bool {
        self.seq.is_eos()
    }

    /// EOS latched and every published item consumed.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.seq.is_drained()
    }

    // ---------------------------------------------------------------------
    // INTERNAL (run view plumbing)
    // ---------------------------------------------------------------------

    #[inline]
    pub(crate) fn seq_state(&self) -> &SeqState {
        &self.seq
    }

    /// Raw slot pointer for the run views.
    ///
    /// # Safety
    ///
    /// Callers must stay within the span the sequence counters assign to
    /// their side (readable span for readers, writable span for writers).
    #[inline]
    pub(crate) unsafe fn slot_ptr(&self) -> *mut T {
        (*self.storage.get()).as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round() {
        let ring = ByteRing::new(4).unwrap();
        assert!(ring.write(1));
        assert!(ring.write(2));
        assert_eq!(ring.to_read(), 2);
        assert_eq!(ring.peek(0), Some(1));
        assert_eq!(ring.peek(1), Some(2));
        assert_eq!(ring.peek(2), None);
        assert_eq!(ring.read(), Some(1));
        assert_eq!(ring.read(), Some(2));
        assert_eq!(ring.read(), None);
    }

    #[test]
    fn refuses_writes_when_full() {
        let ring = ByteRing::new(2).unwrap();
        assert!(ring.write(1));
        assert!(ring.write(2));
        assert!(!ring.write(3));
        assert_eq!(ring.to_read(), 2);
    }

    #[test]
    fn eos_freezes_write_seq() {
        let ring = ByteRing::new(4).unwrap();
        assert!(ring.write(1));
        ring.set_eos();
        assert!(!ring.write(2));
        assert_eq!(ring.advance_write(1), 0);
        assert!(ring.write_run().is_empty());
        assert_eq!(ring.to_read(), 1);
        assert_eq!(ring.read(), Some(1));
        assert!(ring.is_drained());
    }

    #[test]
    fn wrap_around_preserves_order() {
        let ring = ByteRing::new(3).unwrap();
        for round in 0u8..10 {
            assert!(ring.write(round));
            assert!(ring.write(round.wrapping_add(100)));
            assert_eq!(ring.read(), Some(round));
            assert_eq!(ring.read(), Some(round.wrapping_add(100)));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn straight_runs_split_at_the_edge() {
        let ring = ByteRing::new(4).unwrap();
        assert_eq!(ring.write_from(&[1, 2, 3]), 3);
        assert_eq!(ring.advance_read(2), 2);
        assert_eq!(ring.write_from(&[4, 5]), 2);

        // read position 2, items 3..=5: straight span is two slots to the edge
        assert_eq!(ring.to_read(), 3);
        assert_eq!(ring.to_read_straight(), 2);
        let run = ring.read_run();
        assert_eq!(run.as_slice(), &[3, 4]);
        run.commit(2);
        let run = ring.read_run();
        assert_eq!(run.as_slice(), &[5]);
        run.commit(1);
    }

    #[test]
    fn bulk_copies_cross_the_edge() {
        let ring = ByteRing::new(5).unwrap();
        assert_eq!(ring.write_from(&[9, 9, 9, 9]), 4);
        assert_eq!(ring.advance_read(4), 4);

        let data = [1, 2, 3, 4, 5];
        assert_eq!(ring.write_from(&data), 5);
        let mut out = [0u8; 5];
        assert_eq!(ring.read_into(&mut out), 5);
        assert_eq!(out, data);
    }

    #[test]
    fn advance_clamps_to_availability() {
        let ring = ByteRing::new(4).unwrap();
        ring.write_from(&[1, 2]);
        assert_eq!(ring.advance_read(10), 2);
        assert_eq!(ring.advance_read(1), 0);
        assert_eq!(ring.advance_write(10), 2);
        assert_eq!(ring.to_write(), 0);
    }

    #[test]
    fn char_ring_carries_scalars() {
        let ring = CharRing::new(3).unwrap();
        assert!(ring.write('Б'));
        assert!(ring.write('✓'));
        assert_eq!(ring.read(), Some('Б'));
        assert_eq!(ring.read(), Some('✓'));
    }
}
