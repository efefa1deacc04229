//! Text-stream composites: source → bytes → characters → lines, and back.
//!
//! [`TextStreamReader`] and [`TextStreamWriter`] allocate the intermediate
//! rings, wire the three stage agents output-to-input, and run each stage as
//! its own task on the tokio runtime. End of stream travels exclusively along
//! the ring chain: each stage latches its output once its input is drained,
//! so the final ring reports a normal EOS no matter which stage ended the
//! stream, including a stage that ended it by failing. Stage errors are
//! collected by [`TextStreamReader::finish`] / [`TextStreamWriter::close`].

use crate::agent::{Agent, AgentDriver};
use crate::codec::{CharDecoder, CharEncoder};
use crate::config::{Options, RunnerConfig};
use crate::error::PipeError;
use crate::lines::{LineJoiner, LineSplitter};
use crate::reader::ByteStreamReader;
use crate::runner;
use crate::source::{ByteSink, ByteSource, EosSource};
use crate::writer::ByteStreamWriter;
use futures_core::Stream;
use futures_sink::Sink;
use pin_project_lite::pin_project;
use ringpipe::{ByteRing, CharRing, LineRing};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval};

type StageHandle = JoinHandle<Result<(), PipeError>>;

fn spawn_stage<A>(mut driver: AgentDriver<A>, cfg: RunnerConfig, stage: &'static str) -> StageHandle
where
    A: Agent + 'static,
{
    tokio::spawn(async move {
        let result = driver.run_to_done(&cfg).await;
        match result {
            Ok(_) => {
                tracing::debug!(stage, "pipeline stage drained");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(stage, %err, "pipeline stage failed");
                Err(err)
            }
        }
    })
}

async fn join_stages(stages: Vec<StageHandle>) -> Result<(), PipeError> {
    let mut first_error = None;
    for stage in stages {
        match stage.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(join_err) => {
                if first_error.is_none() {
                    first_error = Some(PipeError::Internal(Box::new(join_err)));
                }
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Read side of a text pipeline: an opaque byte source decoded and split
/// into lines.
///
/// Lines are pulled with [`read_line`](Self::read_line) (`Ok(None)` at end of
/// stream) or through the [`LineStream`] adapter. A stage failure latches EOS
/// down the chain, so readers observe a normal end of stream; the underlying
/// error is reported by [`finish`](Self::finish).
pub struct TextStreamReader {
    lines: Arc<LineRing>,
    runner: RunnerConfig,
    stages: Vec<StageHandle>,
}

impl std::fmt::Debug for TextStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStreamReader").finish_non_exhaustive()
    }
}

impl TextStreamReader {
    /// Wires source → byte ring → decoder → character ring → splitter →
    /// line ring and starts the three stage tasks.
    pub fn spawn<S>(source: EosSource<S>, options: Options) -> Result<Self, PipeError>
    where
        S: ByteSource + 'static,
    {
        options.validate()?;
        let bytes = Arc::new(ByteRing::new(options.byte_ring_capacity)?);
        let chars = Arc::new(CharRing::new(options.char_ring_capacity)?);
        let lines = Arc::new(LineRing::new(options.string_ring_capacity)?);

        let reader = AgentDriver::new(ByteStreamReader::new(source, Arc::clone(&bytes)));
        let decoder = AgentDriver::new(CharDecoder::new(
            Arc::clone(&bytes),
            Arc::clone(&chars),
            options.charset,
        ));
        let splitter = AgentDriver::new(LineSplitter::new(
            Arc::clone(&chars),
            Arc::clone(&lines),
            options.estimated_line_length,
        ));

        tracing::debug!(charset = %options.charset, "text reader pipeline starting");
        let stages = vec![
            spawn_stage(reader, options.runner.clone(), "byte-reader"),
            spawn_stage(decoder, options.runner.clone(), "char-decoder"),
            spawn_stage(splitter, options.runner.clone(), "line-splitter"),
        ];

        Ok(Self {
            lines,
            runner: options.runner,
            stages,
        })
    }

    /// The line ring this pipeline fills; useful for attaching a
    /// [`RingWatcher`](crate::RingWatcher) or draining manually.
    pub fn line_ring(&self) -> Arc<LineRing> {
        Arc::clone(&self.lines)
    }

    /// Next line, or `Ok(None)` once the stream has ended.
    pub async fn read_line(&mut self) -> Result<Option<String>, PipeError> {
        let mut ring = Arc::clone(&self.lines);
        runner::apply(
            &self.runner,
            &mut ring,
            |ring| ring.to_read() > 0 || ring.is_drained(),
            |ring| Ok(ring.read()),
        )
        .await
    }

    /// Converts the handle into a [`Stream`] of lines. The stage tasks keep
    /// running detached; a stage failure ends the stream early but silently,
    /// so prefer [`finish`](Self::finish) when the error matters.
    pub fn into_lines(self) -> LineStream {
        LineStream {
            ring: self.lines,
            poll_timer: interval(self.runner.retry_unit.max(std::time::Duration::from_millis(1))),
        }
    }

    /// Waits for every stage to settle and surfaces the first failure.
    pub async fn finish(self) -> Result<(), PipeError> {
        join_stages(self.stages).await
    }
}

pin_project! {
    /// Interval-polled [`Stream`] over a pipeline's line ring.
    ///
    /// The ring has no waker integration, so the stream re-checks it on a
    /// short timer; it yields every buffered line per tick and terminates
    /// when the ring is drained.
    pub struct LineStream {
        ring: Arc<LineRing>,
        #[pin]
        poll_timer: Interval,
    }
}

impl Stream for LineStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(line) = this.ring.read() {
                return Poll::Ready(Some(line));
            }
            if this.ring.is_drained() {
                return Poll::Ready(None);
            }
            match this.poll_timer.as_mut().poll_tick(cx) {
                Poll::Ready(_) => continue,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Write side of a text pipeline: lines joined, encoded and drained into an
/// opaque byte sink.
pub struct TextStreamWriter {
    lines: Arc<LineRing>,
    runner: RunnerConfig,
    stages: Vec<StageHandle>,
}

impl TextStreamWriter {
    /// Wires line ring → joiner → character ring → encoder → byte ring →
    /// sink and starts the three stage tasks.
    pub fn spawn<W>(sink: W, options: Options) -> Result<Self, PipeError>
    where
        W: ByteSink + 'static,
    {
        options.validate()?;
        let lines = Arc::new(LineRing::new(options.string_ring_capacity)?);
        let chars = Arc::new(CharRing::new(options.char_ring_capacity)?);
        let bytes = Arc::new(ByteRing::new(options.byte_ring_capacity)?);

        let joiner = AgentDriver::new(LineJoiner::new(
            Arc::clone(&lines),
            Arc::clone(&chars),
            options.line_break,
        ));
        let encoder = AgentDriver::new(CharEncoder::new(
            Arc::clone(&chars),
            Arc::clone(&bytes),
            options.charset,
        ));
        let writer = AgentDriver::new(ByteStreamWriter::new(Arc::clone(&bytes), sink));

        tracing::debug!(charset = %options.charset, "text writer pipeline starting");
        let stages = vec![
            spawn_stage(joiner, options.runner.clone(), "line-joiner"),
            spawn_stage(encoder, options.runner.clone(), "char-encoder"),
            spawn_stage(writer, options.runner.clone(), "byte-writer"),
        ];

        Ok(Self {
            lines,
            runner: options.runner,
            stages,
        })
    }

    /// Queues one line, waiting cooperatively while the line ring is full.
    pub async fn write_line(&mut self, line: impl Into<String>) -> Result<(), PipeError> {
        let mut state = (Arc::clone(&self.lines), Some(line.into()));
        runner::apply(
            &self.runner,
            &mut state,
            |(ring, _)| ring.to_write() > 0,
            |(ring, line)| match line.take() {
                Some(line) => ring
                    .write(line)
                    .map_err(|_| PipeError::InvalidArgument("line ring refused a checked write")),
                None => Ok(()),
            },
        )
        .await
    }

    /// Converts the handle into a [`Sink`] of lines.
    pub fn into_sink(self) -> LineSink {
        LineSink {
            ring: self.lines,
            poll_timer: interval(self.runner.retry_unit.max(std::time::Duration::from_millis(1))),
            pending: None,
            stages: self.stages,
        }
    }

    /// Ends the stream: latches EOS on the line ring, lets the chain drain
    /// into the sink, and surfaces the first stage failure.
    pub async fn close(self) -> Result<(), PipeError> {
        self.lines.set_eos();
        join_stages(self.stages).await
    }
}

pin_project! {
    /// Interval-polled [`Sink`] over a pipeline's line ring.
    ///
    /// A line that does not fit is parked and flushed when the joiner makes
    /// room; closing the sink latches EOS and waits for the whole chain to
    /// drain into the byte sink.
    pub struct LineSink {
        ring: Arc<LineRing>,
        #[pin]
        poll_timer: Interval,
        pending: Option<String>,
        stages: Vec<StageHandle>,
    }
}

impl LineSink {
    /// Tries to push the parked line, then reports whether the sink can take
    /// another. Registers the poll timer when it cannot.
    fn poll_room(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), PipeError>> {
        let mut this = self.project();
        loop {
            if let Some(line) = this.pending.take() {
                match this.ring.write(line) {
                    Ok(()) => {}
                    Err(back) => {
                        *this.pending = Some(back);
                        match this.poll_timer.as_mut().poll_tick(cx) {
                            Poll::Ready(_) => continue,
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                }
            }
            return Poll::Ready(Ok(()));
        }
    }
}

impl Sink<String> for LineSink {
    type Error = PipeError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.poll_room(cx)
    }

    fn start_send(self: Pin<&mut Self>, line: String) -> Result<(), Self::Error> {
        let this = self.project();
        match this.ring.write(line) {
            Ok(()) => Ok(()),
            // Ring momentarily full: park the line for the next flush.
            Err(back) => {
                *this.pending = Some(back);
                Ok(())
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.poll_room(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self.as_mut().poll_room(cx) {
            Poll::Ready(Ok(())) => {}
            other => return other,
        }
        let this = self.project();
        this.ring.set_eos();
        // Drain the stage tasks so the sink has everything before we report
        // closed.
        while let Some(stage) = this.stages.first_mut() {
            match Pin::new(stage).poll(cx) {
                Poll::Ready(result) => {
                    this.stages.remove(0);
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => return Poll::Ready(Err(err)),
                        Err(join_err) => {
                            return Poll::Ready(Err(PipeError::Internal(Box::new(join_err))))
                        }
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }
}
