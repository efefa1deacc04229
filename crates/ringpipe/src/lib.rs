//! RingPipe - SPSC Ring Buffers for Streaming Pipelines
//!
//! Fixed-capacity single-producer single-consumer ring buffers with an
//! explicit end-of-stream latch and *straight-run* accounting: the contiguous,
//! unwrapped span at the current read or write position, which lets a byte
//! source or sink transfer directly into the ring storage without an
//! intermediate copy.
//!
//! Each ring is shared by exactly two parties. The writer exclusively
//! advances `write_seq` and may latch `eos`; the reader exclusively advances
//! `read_seq`. Sequence numbers are unbounded `u64` counters published with
//! release/acquire ordering; physical slots are addressed as `seq % capacity`.
//!
//! # Variants
//!
//! - [`ScalarRing`] for `Copy` elements, with zero-copy [`ReadRun`] /
//!   [`WriteRun`] views ([`ByteRing`], [`CharRing`]).
//! - [`SlotRing`] for owned elements, transferring ownership on read
//!   ([`LineRing`]).
//!
//! # Example
//!
//! ```
//! use ringpipe::ByteRing;
//!
//! let ring = ByteRing::new(8).unwrap();
//! assert_eq!(ring.write_from(b"abc"), 3);
//! assert_eq!(ring.read(), Some(b'a'));
//!
//! // Zero-copy drain of the contiguous span
//! let run = ring.read_run();
//! assert_eq!(run.as_slice(), b"bc");
//! let n = run.len();
//! run.commit(n);
//!
//! ring.set_eos();
//! assert!(ring.is_drained());
//! assert!(!ring.write(b'x')); // writes after EOS have no effect
//! ```

mod error;
mod invariants;
mod run;
mod scalar;
mod seq;
mod slot;

pub use error::RingError;
pub use run::{ReadRun, WriteRun};
pub use scalar::{ByteRing, CharRing, ScalarRing};
pub use slot::{LineRing, SlotRing};
