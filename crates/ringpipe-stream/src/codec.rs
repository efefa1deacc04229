//! Character decoder and encoder agents.
//!
//! Both operate between a byte ring and a character ring. A scalar's encoded
//! form can straddle the physical edge of the byte ring, where no linear view
//! of it exists, so each agent keeps a small linear scratch buffer: the
//! decoder siphons a split sequence into it byte by byte until a scalar
//! decodes, the encoder renders a scalar into it and dribbles the bytes out
//! as ring space allows. Everything that fits the straight run takes the
//! direct zero-copy path.

use crate::agent::Agent;
use crate::charset::{Charset, DecodeStep, Endian, MAX_SCALAR_BYTES};
use crate::error::PipeError;
use ringpipe::{ByteRing, CharRing};
use std::sync::Arc;

/// One resolved decoder step, after BOM handling.
enum Step {
    /// Emit `char` after consuming `usize` bytes.
    Emit(char, usize),
    /// Consume `usize` bytes without emitting (byte-order mark).
    Skip(usize),
    Incomplete,
    Malformed,
}

/// Agent that decodes a [`ByteRing`] into a [`CharRing`].
///
/// The main path decodes scalars straight out of the ring's contiguous
/// readable span. A sequence that runs past the end of that span is moved
/// into the scratch buffer (consuming those bytes keeps every ready action
/// progressing) and completed one byte at a time as more input arrives. Once
/// the input ring is drained the decoder latches EOS on the character ring;
/// a drained input that still owes bytes to an unfinished sequence is a
/// terminal [`PipeError::Decode`].
pub struct CharDecoder {
    input: Arc<ByteRing>,
    output: Arc<CharRing>,
    charset: Charset,
    endian: Endian,
    bom_pending: bool,
    scratch: [u8; MAX_SCALAR_BYTES],
    scratch_len: usize,
    finished: bool,
}

impl CharDecoder {
    pub fn new(input: Arc<ByteRing>, output: Arc<CharRing>, charset: Charset) -> Self {
        Self {
            input,
            output,
            charset,
            endian: charset.default_endian(),
            bom_pending: charset.senses_bom(),
            scratch: [0; MAX_SCALAR_BYTES],
            scratch_len: 0,
            finished: false,
        }
    }

    fn decode_error(&self) -> PipeError {
        PipeError::Decode {
            charset: self.charset,
        }
    }

    /// Resolves the next step at the front of `bytes`, sniffing the BOM
    /// first for the byte-order-sensing charset.
    fn next_step(&mut self, bytes: &[u8]) -> Step {
        if self.bom_pending {
            if bytes.len() < 2 {
                return Step::Incomplete;
            }
            // The BOM opportunity is over once two bytes have been seen.
            self.bom_pending = false;
            match [bytes[0], bytes[1]] {
                [0xFE, 0xFF] => {
                    self.endian = Endian::Big;
                    return Step::Skip(2);
                }
                [0xFF, 0xFE] => {
                    self.endian = Endian::Little;
                    return Step::Skip(2);
                }
                _ => {}
            }
        }
        match self.charset.decode_one(self.endian, bytes) {
            DecodeStep::Emit { ch, len } => Step::Emit(ch, len),
            DecodeStep::Incomplete => Step::Incomplete,
            DecodeStep::Malformed => Step::Malformed,
        }
    }

    fn publish(&self, ch: char) {
        let ok = self.output.write(ch);
        debug_assert!(ok, "character ring space was checked before decoding");
    }

    /// Removes a decoded prefix from the scratch buffer.
    fn consume_scratch(&mut self, n: usize) {
        self.scratch.copy_within(n..self.scratch_len, 0);
        self.scratch_len -= n;
    }
}

impl Agent for CharDecoder {
    /// Characters published by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.input.is_drained() {
            // Final latch needs no output space unless scratch still holds a
            // sequence that could complete into the ring.
            return self.scratch_len == 0 || self.output.to_write() > 0;
        }
        self.input.to_read() > 0 && self.output.to_write() > 0
    }

    fn done(&mut self) -> bool {
        self.finished
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let mut published = 0;
        while self.output.to_write() > 0 {
            if self.scratch_len > 0 {
                let buf = self.scratch;
                match self.next_step(&buf[..self.scratch_len]) {
                    Step::Emit(ch, len) => {
                        self.consume_scratch(len);
                        self.publish(ch);
                        published += 1;
                    }
                    Step::Skip(len) => self.consume_scratch(len),
                    Step::Incomplete => {
                        if self.scratch_len == MAX_SCALAR_BYTES {
                            return Err(self.decode_error());
                        }
                        match self.input.read() {
                            Some(b) => {
                                self.scratch[self.scratch_len] = b;
                                self.scratch_len += 1;
                            }
                            None if self.input.is_drained() => {
                                // No byte will ever complete this sequence.
                                return Err(self.decode_error());
                            }
                            None => break,
                        }
                    }
                    Step::Malformed => return Err(self.decode_error()),
                }
                continue;
            }

            // Main path: decode from the contiguous readable span.
            let run = self.input.read_run();
            let len = run.len();
            if len == 0 {
                break;
            }
            let take = len.min(MAX_SCALAR_BYTES);
            let mut head = [0u8; MAX_SCALAR_BYTES];
            head[..take].copy_from_slice(&run.as_slice()[..take]);
            drop(run);

            match self.next_step(&head[..take]) {
                Step::Emit(ch, n) => {
                    self.input.advance_read(n);
                    self.publish(ch);
                    published += 1;
                }
                Step::Skip(n) => {
                    self.input.advance_read(n);
                }
                Step::Incomplete => {
                    // The sequence runs past the available span; siphon it
                    // into scratch so it can complete across the wrap.
                    self.scratch[..take].copy_from_slice(&head[..take]);
                    self.scratch_len = take;
                    self.input.advance_read(take);
                }
                Step::Malformed => return Err(self.decode_error()),
            }
        }

        if !self.finished && self.input.is_drained() {
            if self.scratch_len > 0 && self.output.to_write() > 0 {
                // The scratch loop above already decided this sequence can
                // never complete.
                return Err(self.decode_error());
            }
            if self.scratch_len == 0 {
                self.output.set_eos();
                self.finished = true;
            }
        }
        Ok(published)
    }

    fn abort(&mut self) {
        self.output.set_eos();
        self.finished = true;
    }
}

/// Agent that encodes a [`CharRing`] into a [`ByteRing`].
///
/// Scalars whose encoded form fits the straight writable span are rendered
/// directly into the ring; otherwise the bytes are staged in the scratch
/// buffer and dribbled out one at a time, so progress continues across wraps
/// and through nearly-full rings. The byte-order-sensing charset emits a
/// big-endian BOM before the first scalar.
pub struct CharEncoder {
    input: Arc<CharRing>,
    output: Arc<ByteRing>,
    charset: Charset,
    endian: Endian,
    bom_pending: bool,
    scratch: [u8; MAX_SCALAR_BYTES],
    scratch_len: usize,
    scratch_pos: usize,
    finished: bool,
}

impl CharEncoder {
    pub fn new(input: Arc<CharRing>, output: Arc<ByteRing>, charset: Charset) -> Self {
        Self {
            input,
            output,
            charset,
            endian: charset.default_endian(),
            bom_pending: charset.senses_bom(),
            scratch: [0; MAX_SCALAR_BYTES],
            scratch_len: 0,
            scratch_pos: 0,
            finished: false,
        }
    }

    fn pending(&self) -> bool {
        self.scratch_pos < self.scratch_len
    }
}

impl Agent for CharEncoder {
    /// Bytes published by one action.
    type Output = usize;

    fn ready(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.input.is_drained() && !self.pending() {
            return true;
        }
        self.output.to_write() > 0 && (self.pending() || self.input.to_read() > 0)
    }

    fn done(&mut self) -> bool {
        self.finished
    }

    fn action(&mut self) -> Result<usize, PipeError> {
        let mut moved = 0;
        while self.output.to_write() > 0 {
            if self.pending() {
                while self.pending() && self.output.write(self.scratch[self.scratch_pos]) {
                    self.scratch_pos += 1;
                    moved += 1;
                }
                if self.pending() {
                    break;
                }
                self.scratch_len = 0;
                self.scratch_pos = 0;
                continue;
            }

            let Some(ch) = self.input.read() else {
                break;
            };

            let mut staged = [0u8; MAX_SCALAR_BYTES];
            let mut n = 0;
            if self.bom_pending {
                // Big-endian BOM ahead of the first scalar.
                staged[0] = 0xFE;
                staged[1] = 0xFF;
                n = 2;
                self.bom_pending = false;
            }
            let mut encoded = [0u8; MAX_SCALAR_BYTES];
            let enc_len = self.charset.encode_one(self.endian, ch, &mut encoded)?;
            staged[n..n + enc_len].copy_from_slice(&encoded[..enc_len]);
            n += enc_len;

            let mut run = self.output.write_run();
            if run.len() >= n {
                run.as_mut_slice()[..n].copy_from_slice(&staged[..n]);
                run.commit(n);
                moved += n;
            } else {
                drop(run);
                self.scratch = staged;
                self.scratch_len = n;
                self.scratch_pos = 0;
            }
        }

        if !self.finished && self.input.is_drained() && !self.pending() {
            self.output.set_eos();
            self.finished = true;
        }
        Ok(moved)
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

    fn rings(byte_cap: usize, char_cap: usize) -> (Arc<ByteRing>, Arc<CharRing>) {
        (
            Arc::new(ByteRing::new(byte_cap).unwrap()),
            Arc::new(CharRing::new(char_cap).unwrap()),
        )
    }

    async fn decode_all(
        charset: Charset,
        bytes: &[u8],
        byte_cap: usize,
        char_cap: usize,
    ) -> Result<String, PipeError> {
        let (bi, ci) = rings(byte_cap, char_cap);
        let mut driver = AgentDriver::new(CharDecoder::new(Arc::clone(&bi), Arc::clone(&ci), charset));

        let feeder = tokio::spawn({
            let bi = Arc::clone(&bi);
            let bytes = bytes.to_vec();
            async move {
                let mut sent = 0;
                while sent < bytes.len() {
                    sent += bi.write_from(&bytes[sent..]);
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
                bi.set_eos();
            }
        });
        let collector = tokio::spawn({
            let ci = Arc::clone(&ci);
            async move {
                let mut out = String::new();
                loop {
                    match ci.read() {
                        Some(c) => out.push(c),
                        None if ci.is_drained() => break,
                        None => tokio::time::sleep(std::time::Duration::from_millis(1)).await,
                    }
                }
                out
            }
        });

        let result = driver.run_to_done(&RunnerConfig::default()).await;
        feeder.await.unwrap();
        let out = collector.await.unwrap();
        result.map(|_| out)
    }

    #[tokio::test(start_paused = true)]
    async fn ascii_passes_through() {
        let out = decode_all(Charset::Ascii, b"plain text", 4, 4).await.unwrap();
        assert_eq!(out, "plain text");
    }

    #[tokio::test(start_paused = true)]
    async fn utf8_scalar_split_across_the_wrap() {
        // 3-slot ring: every multi-byte scalar eventually straddles the edge
        let text = "Бอ𝄞ДaГe";
        let out = decode_all(Charset::Utf8, text.as_bytes(), 3, 4).await.unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test(start_paused = true)]
    async fn utf16_with_bom_across_tiny_ring() {
        // "БаДаГе" as UTF-16 with a big-endian BOM: 14 bytes, 6 characters
        let text = "БаДаГе";
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(bytes.len(), 14);

        let out = decode_all(Charset::Utf16, &bytes, 3, 6).await.unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test(start_paused = true)]
    async fn utf16_little_endian_bom_flips_the_byte_order() {
        let text = "ab";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let out = decode_all(Charset::Utf16, &bytes, 8, 8).await.unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_input_is_terminal() {
        let err = decode_all(Charset::Utf8, &[0x61, 0xFF, 0x62], 8, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, PipeError::Decode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn truncated_trailing_scalar_is_terminal() {
        // lead byte of a 2-byte sequence, then EOS
        let err = decode_all(Charset::Utf8, &[0x61, 0xD0], 8, 8).await.unwrap_err();
        assert!(matches!(err, PipeError::Decode { .. }));
    }

    async fn encode_all(
        charset: Charset,
        text: &str,
        char_cap: usize,
        byte_cap: usize,
    ) -> Result<Vec<u8>, PipeError> {
        let (bo, ci) = rings(byte_cap, char_cap);
        let mut driver = AgentDriver::new(CharEncoder::new(Arc::clone(&ci), Arc::clone(&bo), charset));

        let feeder = tokio::spawn({
            let ci = Arc::clone(&ci);
            let text = text.to_string();
            async move {
                for c in text.chars() {
                    while !ci.write(c) {
                        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    }
                }
                ci.set_eos();
            }
        });
        let collector = tokio::spawn({
            let bo = Arc::clone(&bo);
            async move {
                let mut out = Vec::new();
                loop {
                    match bo.read() {
                        Some(b) => out.push(b),
                        None if bo.is_drained() => break,
                        None => tokio::time::sleep(std::time::Duration::from_millis(1)).await,
                    }
                }
                out
            }
        });

        let result = driver.run_to_done(&RunnerConfig::default()).await;
        feeder.await.unwrap();
        let out = collector.await.unwrap();
        result.map(|_| out)
    }

    #[tokio::test(start_paused = true)]
    async fn utf8_encode_through_a_tiny_ring() {
        let text = "Б𝄞e";
        let out = encode_all(Charset::Utf8, text, 2, 3).await.unwrap();
        assert_eq!(out, text.as_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn utf16_encode_emits_one_bom() {
        let out = encode_all(Charset::Utf16, "aБ", 4, 16).await.unwrap();
        let mut expected = vec![0xFE, 0xFF];
        for unit in "aБ".encode_utf16() {
            expected.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(out, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn ascii_encode_rejects_non_ascii() {
        let err = encode_all(Charset::Ascii, "naïve", 4, 8).await.unwrap_err();
        assert!(matches!(err, PipeError::Encode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn decode_then_encode_round_trips() {
        let text = "já là 𝄞";
        let bytes = text.as_bytes();
        let decoded = decode_all(Charset::Utf8, bytes, 5, 3).await.unwrap();
        let encoded = encode_all(Charset::Utf8, &decoded, 3, 5).await.unwrap();
        assert_eq!(encoded, bytes);
    }
}
