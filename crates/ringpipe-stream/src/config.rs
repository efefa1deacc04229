//! Configuration for the driver and the text pipelines.

use crate::charset::Charset;
use crate::error::PipeError;
use std::time::Duration;

/// Tuning for the cooperative polling driver.
///
/// A negative poll re-schedules immediately on the work pool for the first
/// `immediate_retries` passes; after that, re-polls back off linearly
/// (`retries × retry_unit`, capped at `retry_cap`) on the timer so an idle
/// pipeline does not spin.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum wall time for one driver operation. `None` = no deadline.
    pub timeout: Option<Duration>,
    /// Consecutive negative polls that re-schedule without delay.
    ///
    /// Default: 4
    pub immediate_retries: u32,
    /// Backoff step once immediate retries are exhausted.
    ///
    /// Default: 10ms
    pub retry_unit: Duration,
    /// Upper bound on a single backoff delay.
    ///
    /// Default: 200ms
    pub retry_cap: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            immediate_retries: 4,
            retry_unit: Duration::from_millis(10),
            retry_cap: Duration::from_millis(200),
        }
    }
}

impl RunnerConfig {
    /// Sets the operation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the operation deadline.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Sets the number of undelayed re-polls.
    pub fn with_immediate_retries(mut self, retries: u32) -> Self {
        self.immediate_retries = retries;
        self
    }

    /// Sets the linear backoff step.
    pub fn with_retry_unit(mut self, unit: Duration) -> Self {
        self.retry_unit = unit;
        self
    }

    /// Sets the backoff ceiling.
    pub fn with_retry_cap(mut self, cap: Duration) -> Self {
        self.retry_cap = cap;
        self
    }
}

/// Line terminator written by the joiner after every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    /// `"\n"`
    #[default]
    Lf,
    /// `"\r"`
    Cr,
    /// `"\r\n"`
    CrLf,
    /// `"\r\n"` on Windows, `"\n"` elsewhere.
    Platform,
}

impl LineBreak {
    /// The terminator characters.
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::Cr => "\r",
            LineBreak::CrLf => "\r\n",
            LineBreak::Platform => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
        }
    }
}

/// Configuration for a text stream pipeline.
///
/// The ring capacities size the implicit byte/character/line rings a
/// [`TextStreamReader`](crate::TextStreamReader) or
/// [`TextStreamWriter`](crate::TextStreamWriter) allocates between its stages.
#[derive(Debug, Clone)]
pub struct Options {
    /// Driver tuning shared by every stage of the pipeline.
    pub runner: RunnerConfig,
    /// Character set for the decoder/encoder stage. Default: US-ASCII.
    pub charset: Charset,
    /// Terminator appended by the joiner. Default: `"\n"`.
    pub line_break: LineBreak,
    /// Initial capacity of the splitter's line accumulator. Default: 1024.
    pub estimated_line_length: usize,
    /// Slots in the implicit byte ring. Default: 2048.
    pub byte_ring_capacity: usize,
    /// Slots in the implicit character ring. Default: 1024.
    pub char_ring_capacity: usize,
    /// Slots in the implicit line ring. Default: 64.
    pub string_ring_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub fn new() -> Self {
        Self {
            runner: RunnerConfig::default(),
            charset: Charset::default(),
            line_break: LineBreak::default(),
            estimated_line_length: 1024,
            byte_ring_capacity: 2048,
            char_ring_capacity: 1024,
            string_ring_capacity: 64,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner.timeout = Some(timeout);
        self
    }

    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn with_estimated_line_length(mut self, chars: usize) -> Self {
        self.estimated_line_length = chars;
        self
    }

    pub fn with_byte_ring_capacity(mut self, slots: usize) -> Self {
        self.byte_ring_capacity = slots;
        self
    }

    pub fn with_char_ring_capacity(mut self, slots: usize) -> Self {
        self.char_ring_capacity = slots;
        self
    }

    pub fn with_string_ring_capacity(mut self, slots: usize) -> Self {
        self.string_ring_capacity = slots;
        self
    }

    /// Rejects unusable combinations before any ring is allocated.
    pub(crate) fn validate(&self) -> Result<(), PipeError> {
        if self.estimated_line_length == 0 {
            return Err(PipeError::InvalidArgument(
                "estimated line length must be positive",
            ));
        }
        if self.byte_ring_capacity == 0
            || self.char_ring_capacity == 0
            || self.string_ring_capacity == 0
        {
            return Err(PipeError::InvalidArgument(
                "ring capacities must be positive",
            ));
        }
        Ok(())
    }
}
