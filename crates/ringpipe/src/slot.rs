use crate::seq::SeqState;
use crate::RingError;
use std::cell::UnsafeCell;

/// SPSC ring buffer over owned elements.
///
/// Writing moves the element into its slot; reading moves it back out, so
/// strings and other heap-owning values pass through without cloning. Slots
/// hold `Option<T>`, which keeps drop handling in safe code (for `String` the
/// niche makes this layout-free).
///
/// The concurrency contract matches [`ScalarRing`](crate::ScalarRing): one
/// writing side, one reading side, sequence counters published with
/// release/acquire ordering.
pub struct SlotRing<T> {
    seq: SeqState,
    storage: UnsafeCell<Box<[Option<T>]>>,
}

/// Ring of text lines, the transport between line agents and callers.
pub type LineRing = SlotRing<String>;

// Safety: slot access is disciplined by the sequence-counter protocol in
// `SeqState`; each slot has one writing side at any moment.
unsafe impl<T: Send> Send for SlotRing<T> {}
unsafe impl<T: Send> Sync for SlotRing<T> {}

impl<T> SlotRing<T> {
    /// Creates a ring with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let seq = SeqState::new(capacity)?;
        let storage = (0..capacity).map(|_| None).collect::<Box<[Option<T>]>>();
        Ok(Self {
            seq,
            storage: UnsafeCell::new(storage),
        })
    }

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

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_read() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.to_write() == 0
    }

    /// Borrows the element `delta` positions ahead of the read position, or
    /// `None` past the available items. Reader side only: the borrow is valid
    /// because the writer cannot reuse the slot until `read_seq` passes it.
    pub fn peek(&self, delta: usize) -> Option<&T> {
        if delta >= self.seq.to_read() {
            return None;
        }
        let seq = self.seq.read_seq().wrapping_add(delta as u64);
        // SAFETY: the slot is inside [read_seq, write_seq), published by the
        // writer's Release store and observed by our Acquire load.
        unsafe { (*self.storage.get())[self.seq.slot(seq)].as_ref() }
    }

    /// Moves the next element out of the ring, or returns `None` when nothing
    /// is available.
    pub fn read(&self) -> Option<T> {
        if self.seq.to_read() == 0 {
            return None;
        }
        let seq = self.seq.read_seq();
        // SAFETY: reader-owned slot, see peek(); take() leaves the vacated
        // slot as None for the writer's next lap.
        let item = unsafe { (*self.storage.get())[self.seq.slot(seq)].take() };
        self.seq.publish_read(1);
        item
    }

    /// Moves `item` into the ring. Returns it back via `Err` when the ring is
    /// full or EOS has been latched; a refused write has no effect.
    pub fn write(&self, item: T) -> Result<(), T> {
        if self.seq.is_eos() || self.seq.to_write() == 0 {
            return Err(item);
        }
        let seq = self.seq.write_seq();
        // SAFETY: writer-owned slot ahead of write_seq; the previous occupant
        // was taken by the reader (or is the initial None).
        unsafe {
            (*self.storage.get())[self.seq.slot(seq)] = Some(item);
        }
        self.seq.publish_write(1);
        Ok(())
    }

    /// Drops up to `delta` readable items; returns the amount skipped.
    pub fn advance_read(&self, delta: usize) -> usize {
        let n = delta.min(self.seq.to_read());
        let start = self.seq.read_seq();
        for i in 0..n {
            let seq = start.wrapping_add(i as u64);
            // SAFETY: reader-owned slots; dropping in place before publishing.
            unsafe {
                (*self.storage.get())[self.seq.slot(seq)] = None;
            }
        }
        if n > 0 {
            self.seq.publish_read(n);
        }
        n
    }

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_round_trip() {
        let ring = LineRing::new(2).unwrap();
        ring.write("one".to_string()).unwrap();
        ring.write("two".to_string()).unwrap();
        assert_eq!(ring.write("three".to_string()), Err("three".to_string()));
        assert_eq!(ring.peek(0).map(String::as_str), Some("one"));
        assert_eq!(ring.read().as_deref(), Some("one"));
        assert_eq!(ring.read().as_deref(), Some("two"));
        assert_eq!(ring.read(), None);
    }

    #[test]
    fn empty_lines_are_items_too() {
        let ring = LineRing::new(3).unwrap();
        ring.write(String::new()).unwrap();
        assert_eq!(ring.to_read(), 1);
        assert_eq!(ring.read(), Some(String::new()));
    }

    #[test]
    fn rejected_write_returns_the_item_after_eos() {
        let ring = LineRing::new(2).unwrap();
        ring.write("kept".to_string()).unwrap();
        ring.set_eos();
        assert_eq!(ring.write("late".to_string()), Err("late".to_string()));
        assert_eq!(ring.to_read(), 1);
        assert_eq!(ring.read().as_deref(), Some("kept"));
        assert!(ring.is_drained());
    }

    #[test]
    fn advance_read_drops_skipped_items() {
        let ring = SlotRing::<Vec<u8>>::new(4).unwrap();
        ring.write(vec![1]).unwrap();
        ring.write(vec![2]).unwrap();
        ring.write(vec![3]).unwrap();
        assert_eq!(ring.advance_read(2), 2);
        assert_eq!(ring.read(), Some(vec![3]));
        assert_eq!(ring.advance_read(1), 0);
    }

    #[test]
    fn wrap_around_preserves_order() {
        let ring = LineRing::new(2).unwrap();
        for i in 0..7 {
            ring.write(format!("line-{i}")).unwrap();
            assert_eq!(ring.read(), Some(format!("line-{i}")));
        }
    }
}
