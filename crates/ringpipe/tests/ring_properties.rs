//! Property-based tests for the ring buffer invariants.
//!
//! Coverage:
//! - `ScalarRing<u8>` / `ScalarRing<char>` (plain-scalar storage)
//! - `SlotRing<String>` (owned-element storage)
//!
//! Both variants share the same sequence-counter algebra, so the invariants
//! are exercised against each.

use proptest::prelude::*;
use ringpipe::{ByteRing, CharRing, LineRing};
use std::sync::Arc;
use std::thread;

// =============================================================================
// Bounded count: 0 <= to_read <= capacity, to_read + to_write == capacity
// =============================================================================

proptest! {
    /// The availability algebra holds after any interleaving of writes and
    /// reads, at any capacity (including odd, non-power-of-two sizes).
    #[test]
    fn prop_availability_algebra(
        capacity in 1usize..64,
        ops in proptest::collection::vec(any::<(bool, u8)>(), 0..200),
    ) {
        let ring = ByteRing::new(capacity).unwrap();
        for (is_write, byte) in ops {
            if is_write {
                ring.write(byte);
            } else {
                ring.read();
            }
            prop_assert!(ring.to_read() <= capacity);
            prop_assert_eq!(ring.to_read() + ring.to_write(), capacity);
            prop_assert!(ring.to_read_straight() <= ring.to_read());
            prop_assert!(ring.to_write_straight() <= ring.to_write());
        }
    }

    /// Straight runs never exceed the distance to the physical edge.
    #[test]
    fn prop_straight_runs_are_contiguous(
        capacity in 1usize..32,
        writes in 0usize..100,
        reads in 0usize..100,
    ) {
        let ring = ByteRing::new(capacity).unwrap();
        for i in 0..writes {
            ring.write(i as u8);
        }
        ring.advance_read(reads);

        let run = ring.read_run();
        prop_assert_eq!(run.len(), ring.to_read_straight());
        let n = run.len();
        run.commit(n);
    }

    /// FIFO: every byte comes out in the order it went in, across wraps.
    #[test]
    fn prop_fifo_order(
        capacity in 1usize..16,
        data in proptest::collection::vec(any::<u8>(), 0..300),
    ) {
        let ring = ByteRing::new(capacity).unwrap();
        let mut out = Vec::with_capacity(data.len());
        let mut offered = 0;
        while out.len() < data.len() {
            offered += ring.write_from(&data[offered..]);
            let mut buf = [0u8; 8];
            let n = ring.read_into(&mut buf);
            out.extend_from_slice(&buf[..n]);
        }
        prop_assert_eq!(out, data);
    }

    /// Once EOS is latched, write_seq is frozen no matter what the writer does.
    #[test]
    fn prop_eos_freezes_writes(
        capacity in 1usize..16,
        pre in 0usize..16,
        post in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let ring = ByteRing::new(capacity).unwrap();
        let written = (0..pre).map(|i| ring.write(i as u8)).filter(|ok| *ok).count();
        ring.set_eos();

        for b in post {
            prop_assert!(!ring.write(b));
        }
        prop_assert_eq!(ring.write_from(&[1, 2, 3]), 0);
        prop_assert_eq!(ring.advance_write(3), 0);
        prop_assert_eq!(ring.to_read(), written);
    }

    /// Reading past the last item reports absent and does not move read_seq.
    #[test]
    fn prop_read_past_end_is_stable(capacity in 1usize..16) {
        let ring = CharRing::new(capacity).unwrap();
        ring.write('x');
        assert_eq!(ring.read(), Some('x'));
        for _ in 0..4 {
            prop_assert_eq!(ring.read(), None);
            prop_assert_eq!(ring.peek(0), None);
            prop_assert_eq!(ring.to_read(), 0);
        }
        // the ring still works after the misses
        ring.write('y');
        prop_assert_eq!(ring.read(), Some('y'));
    }

    /// Owned-element variant: same algebra, ownership preserved.
    #[test]
    fn prop_slot_ring_fifo(
        capacity in 1usize..8,
        lines in proptest::collection::vec("[a-z]{0,6}", 0..50),
    ) {
        let ring = LineRing::new(capacity).unwrap();
        let mut out = Vec::with_capacity(lines.len());
        let mut pending = lines.clone().into_iter();
        let mut carry: Option<String> = None;
        loop {
            let item = match carry.take().or_else(|| pending.next()) {
                Some(item) => match ring.write(item) {
                    Ok(()) => None,
                    Err(back) => Some(back),
                },
                None => None,
            };
            carry = item;
            match ring.read() {
                Some(line) => out.push(line),
                None if carry.is_none() => break,
                None => {}
            }
        }
        prop_assert_eq!(out, lines);
    }
}

// =============================================================================
// Cross-thread delivery: release/acquire publication is enough for SPSC
// =============================================================================

#[test]
fn threaded_byte_stream_arrives_in_order() {
    let ring = Arc::new(ByteRing::new(7).unwrap());
    let total = 10_000usize;

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut sent = 0usize;
            while sent < total {
                if ring.write((sent % 251) as u8) {
                    sent += 1;
                } else {
                    thread::yield_now();
                }
            }
            ring.set_eos();
        })
    };

    let consumer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut received = Vec::with_capacity(total);
            loop {
                match ring.read() {
                    Some(b) => received.push(b),
                    None if ring.is_drained() => break,
                    None => thread::yield_now(),
                }
            }
            received
        })
    };

    producer.join().unwrap();
    let received = consumer.join().unwrap();
    assert_eq!(received.len(), total);
    for (i, b) in received.iter().enumerate() {
        assert_eq!(*b, (i % 251) as u8);
    }
}

#[test]
fn threaded_eos_is_observed_after_the_last_item() {
    // EOS is latched right after the final write; the consumer must never
    // see "drained" while an item is still unread.
    for _ in 0..200 {
        let ring = Arc::new(LineRing::new(3).unwrap());
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..5 {
                    let mut item = format!("m{i}");
                    loop {
                        match ring.write(item) {
                            Ok(()) => break,
                            Err(back) => {
                                item = back;
                                thread::yield_now();
                            }
                        }
                    }
                }
                ring.set_eos();
            })
        };
        let mut seen = 0;
        loop {
            match ring.read() {
                Some(_) => seen += 1,
                None if ring.is_drained() => break,
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(seen, 5);
    }
}
