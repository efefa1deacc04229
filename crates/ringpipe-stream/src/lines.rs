//! Line splitter and joiner agents.
//!
//! The splitter turns a character stream into whole lines, honoring every
//! Unicode line terminator; the joiner is its inverse, interleaving one
//! configured terminator after each line.

use crate::agent::Agent;
use crate::config::LineBreak;
use crate::error::PipeError;
use ringpipe::{CharRing, LineRing};
use std::mem;
use std::sync::Arc;

/// `true` for every character that terminates a line: LF, VT, FF, CR, NEL,
/// LINE SEPARATOR and PARAGRAPH SEPARATOR. A LF immediately following a CR
/// belongs to the same terminator; no other pair combines.
pub fn is_line_terminator(c: char) -> bool {
    matches!(
        c,
        '\n' | '\u{000B}' | '\u{000C}' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Agent that splits a [`CharRing`] into lines on a [`LineRing`].
///
/// Every terminator flushes the accumulated line, even an empty one; the
/// CR of a CRLF pair flushes and the following LF is absorbed, including when
/// the two arrive in different polls. On drained input a non-empty remainder
/// is flushed as the final line, then EOS latches downstream.
pub struct LineSplitter {
    input: Arc<CharRing>,
    output: Arc<LineRing>,
    cur: String,
    estimated: usize,
    pending_lf: bool,
    finished: bool,
}

impl LineSplitter {
    /// `estimated_line_length` seeds the accumulator capacity.
    pub fn new(input: Arc<CharRing>, output: Arc<LineRing>, estimated_line_length: usize) -> Self {
        Self {
            input,
            output,
            cur: String::with_capacity(estimated_line_length),
            estimated: estimated_line_length,
            pending_lf: false,
            finished: false,
        }
    }

    fn flush(&mut self) -> Result<(), PipeError> {
        let line = mem::replace(&mut self.cur, String::with_capacity(self.estimated));
        self.output
            .write(line)
            .map_err(|_| PipeError::InvalidArgument("line ring refused a checked write"))
    }
}

impl Agent for LineSplitter {
    /// Lines emitted by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.input.is_drained() {
            // The final flush (if any) needs one output slot; the bare EOS
            // latch needs none.
            return self.cur.is_empty() || self.output.to_write() > 0;
        }
        self.input.to_read() > 0 && self.output.to_write() > 0
    }

    fn done(&mut self) -> bool {
        self.finished
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let mut emitted = 0;
        while self.output.to_write() > 0 {
            let Some(c) = self.input.read() else {
                break;
            };
            if self.pending_lf {
                self.pending_lf = false;
                if c == '\n' {
                    continue; // second half of CRLF
                }
            }
            if is_line_terminator(c) {
                self.pending_lf = c == '\r';
                self.flush()?;
                emitted += 1;
            } else {
                self.cur.push(c);
            }
        }

        if !self.finished && self.input.is_drained() {
            if !self.cur.is_empty() {
                if self.output.to_write() == 0 {
                    return Ok(emitted); // flush retries when space opens up
                }
                self.flush()?;
                emitted += 1;
            }
            self.output.set_eos();
            self.finished = true;
        }
        Ok(emitted)
    }

    fn abort(&mut self) {
        self.output.set_eos();
        self.finished = true;
    }
}

/// What the joiner hands out next.
enum JoinStep {
    Emit(char, usize),
    EnterTerminator,
    NextLine,
    Fetch,
}

/// Agent that joins a [`LineRing`] into a [`CharRing`], appending the
/// configured terminator after every line (the last included, which makes
/// join-then-split an identity on terminator-normalized text).
pub struct LineJoiner {
    input: Arc<LineRing>,
    output: Arc<CharRing>,
    terminator: &'static str,
    current: Option<String>,
    pos: usize,
    term_pos: usize,
    in_terminator: bool,
    finished: bool,
}

impl LineJoiner {
    pub fn new(input: Arc<LineRing>, output: Arc<CharRing>, line_break: LineBreak) -> Self {
        Self {
            input,
            output,
            terminator: line_break.as_str(),
            current: None,
            pos: 0,
            term_pos: 0,
            in_terminator: false,
            finished: false,
        }
    }

    fn next_step(&self) -> JoinStep {
        match &self.current {
            Some(line) if !self.in_terminator => match line[self.pos..].chars().next() {
                Some(c) => JoinStep::Emit(c, self.pos + c.len_utf8()),
                None => JoinStep::EnterTerminator,
            },
            Some(_) => match self.terminator[self.term_pos..].chars().next() {
                Some(c) => JoinStep::Emit(c, self.term_pos + c.len_utf8()),
                None => JoinStep::NextLine,
            },
            None => JoinStep::Fetch,
        }
    }
}

impl Agent for LineJoiner {
    /// Characters emitted by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.current.is_none() && self.input.is_drained() {
            return true;
        }
        self.output.to_write() > 0 && (self.current.is_some() || self.input.to_read() > 0)
    }

    fn done(&mut self) -> bool {
        self.finished
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let mut emitted = 0;
        while self.output.to_write() > 0 {
            match self.next_step() {
                JoinStep::Emit(c, next) => {
                    let ok = self.output.write(c);
                    debug_assert!(ok, "character ring space was checked before writing");
                    if self.in_terminator {
                        self.term_pos = next;
                    } else {
                        self.pos = next;
                    }
                    emitted += 1;
                }
                JoinStep::EnterTerminator => {
                    self.in_terminator = true;
                    self.term_pos = 0;
                }
                JoinStep::NextLine => {
                    self.current = None;
                    self.in_terminator = false;
                    self.pos = 0;
                }
                JoinStep::Fetch => match self.input.read() {
                    Some(line) => {
                        self.current = Some(line);
                        self.pos = 0;
                    }
                    None => break,
                },
            }
        }

        if !self.finished && self.current.is_none() && self.input.is_drained() {
            self.output.set_eos();
            self.finished = true;
        }
        Ok(emitted)
    }

    fn abort(&mut self) {
        self.output.set_eos();
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDriver;
    use crate::config::RunnerConfig;
    use std::time::Duration;

    async fn split_all(chars: &str, char_cap: usize, line_cap: usize) -> Vec<String> {
        let input = Arc::new(CharRing::new(char_cap).unwrap());
        let output = Arc::new(LineRing::new(line_cap).unwrap());
        let mut driver =
            AgentDriver::new(LineSplitter::new(Arc::clone(&input), Arc::clone(&output), 16));

        let feeder = tokio::spawn({
            let input = Arc::clone(&input);
            let chars = chars.to_string();
            async move {
                for c in chars.chars() {
                    while !input.write(c) {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                }
                input.set_eos();
            }
        });
        let collector = tokio::spawn({
            let output = Arc::clone(&output);
            async move {
                let mut lines = Vec::new();
                loop {
                    match output.read() {
                        Some(line) => lines.push(line),
                        None if output.is_drained() => break,
                        None => tokio::time::sleep(Duration::from_millis(1)).await,
                    }
                }
                lines
            }
        });

        driver.run_to_done(&RunnerConfig::default()).await.unwrap();
        feeder.await.unwrap();
        collector.await.unwrap()
    }

    async fn join_all(lines: &[&str], line_break: LineBreak, char_cap: usize) -> String {
        let input = Arc::new(LineRing::new(4).unwrap());
        let output = Arc::new(CharRing::new(char_cap).unwrap());
        let mut driver =
            AgentDriver::new(LineJoiner::new(Arc::clone(&input), Arc::clone(&output), line_break));

        let feeder = tokio::spawn({
            let input = Arc::clone(&input);
            let lines: Vec<String> = lines.iter().map(|s| (*s).to_string()).collect();
            async move {
                for line in lines {
                    let mut item = line;
                    loop {
                        match input.write(item) {
                            Ok(()) => break,
                            Err(back) => {
                                item = back;
                                tokio::time::sleep(Duration::from_millis(1)).await;
                            }
                        }
                    }
                }
                input.set_eos();
            }
        });
        let collector = tokio::spawn({
            let output = Arc::clone(&output);
            async move {
                let mut text = String::new();
                loop {
                    match output.read() {
                        Some(c) => text.push(c),
                        None if output.is_drained() => break,
                        None => tokio::time::sleep(Duration::from_millis(1)).await,
                    }
                }
                text
            }
        });

        driver.run_to_done(&RunnerConfig::default()).await.unwrap();
        feeder.await.unwrap();
        collector.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn splits_on_every_unicode_terminator() {
        let text = "one\ntwo\u{000B}three\u{000C}four\rfive\u{0085}six\u{2028}seven\u{2029}";
        let lines = split_all(text, 8, 4).await;
        assert_eq!(
            lines,
            vec!["one", "two", "three", "four", "five", "six", "seven"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn crlf_counts_once() {
        let lines = split_all("a\r\nb\r\nc", 4, 4).await;
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn crlf_split_across_polls_still_counts_once() {
        // a 1-slot character ring forces CR and LF through separate actions
        let lines = split_all("a\r\nb", 1, 4).await;
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn bare_cr_then_text_is_two_lines() {
        let lines = split_all("a\rb", 4, 4).await;
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_lines_survive() {
        let lines = split_all("\n\none\n\n", 4, 8).await;
        assert_eq!(lines, vec!["", "", "one", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn trailing_remainder_becomes_the_last_line() {
        let lines = split_all("one\ntail", 4, 4).await;
        assert_eq!(lines, vec!["one", "tail"]);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_terminator_sequence_from_rotation() {
        // ten lines separated by a rotation of every terminator convention;
        // CRLF must not produce a spurious empty line
        let lines = ["", "one", "", "", "two", "", "three", "", "", ""];
        let terminators = ["\r", "\n", "\r\n", "\u{0085}", "\u{2028}", "\u{2029}", "\r\n"];
        let mut text = String::new();
        for (i, line) in lines.iter().enumerate() {
            text.push_str(line);
            text.push_str(terminators[i % terminators.len()]);
        }

        let split = split_all(&text, 3, 4).await;
        assert_eq!(split, lines);
    }

    #[tokio::test(start_paused = true)]
    async fn joins_with_a_terminator_after_every_line() {
        let text = join_all(&["a", "", "b"], LineBreak::CrLf, 4).await;
        assert_eq!(text, "a\r\n\r\nb\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn join_then_split_round_trips() {
        let lines = ["", "one", "", "", "two", "", "three", "", "", ""];
        let joined = join_all(&lines, LineBreak::CrLf, 3).await;
        let split = split_all(&joined, 3, 4).await;
        assert_eq!(split, lines);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_yields_no_lines() {
        let lines = split_all("", 4, 4).await;
        assert_eq!(lines, Vec::<String>::new());
        let joined = join_all(&[], LineBreak::Lf, 4).await;
        assert_eq!(joined, "");
    }
}
