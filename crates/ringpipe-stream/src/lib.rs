//! Cooperative Non-Blocking Streaming over RingPipe Buffers
//!
//! This crate composes the SPSC rings from [`ringpipe`] into byte →
//! character → line pipelines (and the reverse) driven by a cooperative
//! polling runner, for byte sources and sinks that can neither block nor say
//! whether their stream has ended.
//!
//! # Pieces
//!
//! - [`runner`]: the polling driver: *ready*/*done*/*action* over an
//!   arbitrary state, with yield-then-backoff throttling and deadlines.
//! - [`Agent`] / [`AgentDriver`]: the stage contract and its
//!   one-operation-at-a-time wrapper.
//! - Stage agents: [`ByteStreamReader`], [`ByteStreamWriter`],
//!   [`CharDecoder`], [`CharEncoder`], [`LineSplitter`], [`LineJoiner`],
//!   [`RingWatcher`].
//! - [`EosSource`]: overlays an end-of-stream probe on an opaque byte source
//!   (process liveness, known length, custom predicate).
//! - [`TextStreamReader`] / [`TextStreamWriter`]: composites that allocate
//!   the intermediate rings, wire the stages and run them on the tokio
//!   runtime, with [`LineStream`] / [`LineSink`] adapters for the
//!   `futures` ecosystem.
//!
//! # Example
//!
//! ```no_run
//! use ringpipe_stream::{EosSource, MemorySource, Options, TextStreamReader};
//!
//! # async fn demo() -> Result<(), ringpipe_stream::PipeError> {
//! let source = EosSource::sized(MemorySource::new(b"alpha\nbeta\n".to_vec()), 11);
//! let mut reader = TextStreamReader::spawn(source, Options::new())?;
//!
//! while let Some(line) = reader.read_line().await? {
//!     println!("{line}");
//! }
//! reader.finish().await?;
//! # Ok(())
//! # }
//! ```
//!
//! End of stream propagates exclusively along the ring chain: each stage, on
//! observing a drained input, latches EOS on its output. Failures terminate
//! the owning stage, latch its output ring and surface once on the driving
//! future; downstream consumers still see a normal end of stream.

mod agent;
mod charset;
mod codec;
mod config;
mod error;
mod lines;
mod reader;
pub mod runner;
mod source;
mod text;
mod watch;
mod writer;

pub use agent::{Agent, AgentDriver, AgentMode, AgentStatus};
pub use charset::{Charset, DecodeStep, Endian, MAX_SCALAR_BYTES};
pub use codec::{CharDecoder, CharEncoder};
pub use config::{LineBreak, Options, RunnerConfig};
pub use error::PipeError;
pub use lines::{is_line_terminator, LineJoiner, LineSplitter};
pub use reader::ByteStreamReader;
pub use source::{
    ByteSink, ByteSource, EosSource, MemorySink, MemorySource, ProcessHandle, ReadOutcome,
};
pub use text::{LineSink, LineStream, TextStreamReader, TextStreamWriter};
pub use watch::{RingWatcher, WatchTarget};
pub use writer::ByteStreamWriter;

// Ring types travel with the pipeline API.
pub use ringpipe::{ByteRing, CharRing, LineRing, ReadRun, RingError, ScalarRing, SlotRing, WriteRun};

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
