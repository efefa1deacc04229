//! Character-set primitives for the decoder and encoder agents.
//!
//! Each primitive handles exactly one scalar: `decode_one` inspects the front
//! of a byte slice and reports a decoded character, "need more bytes", or a
//! malformed sequence; `encode_one` renders a character into a small buffer.
//! The codec agents drive these over ring storage and own all the wrap-around
//! and scratch-buffer machinery, so the primitives here stay stateless.

use crate::error::PipeError;
use std::fmt;
use std::str::FromStr;

/// Largest encoded form any supported scalar can take; sizes the codec
/// scratch buffers.
pub const MAX_SCALAR_BYTES: usize = 8;

/// Supported character sets.
///
/// `Utf16` senses a leading byte-order mark on decode (big-endian when
/// absent) and emits a big-endian BOM on encode; the explicit `Utf16Le` /
/// `Utf16Be` variants never strip or produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Ascii,
    Utf8,
    Utf16,
    Utf16Le,
    Utf16Be,
}

/// Byte order for the UTF-16 variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Outcome of decoding one scalar from the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// One scalar decoded from the first `len` bytes.
    Emit { ch: char, len: usize },
    /// The slice ends inside a well-formed sequence; more bytes are needed.
    Incomplete,
    /// The bytes at the front can never begin a valid sequence.
    Malformed,
}

impl Charset {
    /// Byte order used before (or without) a BOM.
    pub fn default_endian(self) -> Endian {
        match self {
            Charset::Utf16Le => Endian::Little,
            _ => Endian::Big,
        }
    }

    /// `true` for the BOM-sensing UTF-16 variant.
    pub fn senses_bom(self) -> bool {
        self == Charset::Utf16
    }

    /// Decodes one scalar from the front of `bytes`.
    pub fn decode_one(self, endian: Endian, bytes: &[u8]) -> DecodeStep {
        match self {
            Charset::Ascii => decode_ascii(bytes),
            Charset::Utf8 => decode_utf8(bytes),
            Charset::Utf16 | Charset::Utf16Le | Charset::Utf16Be => decode_utf16(endian, bytes),
        }
    }

    /// Encodes `ch` into `out`, returning the encoded length.
    pub fn encode_one(
        self,
        endian: Endian,
        ch: char,
        out: &mut [u8; MAX_SCALAR_BYTES],
    ) -> Result<usize, PipeError> {
        match self {
            Charset::Ascii => {
                if ch.is_ascii() {
                    out[0] = ch as u8;
                    Ok(1)
                } else {
                    Err(PipeError::Encode { charset: self })
                }
            }
            Charset::Utf8 => Ok(ch.encode_utf8(&mut out[..4]).len()),
            Charset::Utf16 | Charset::Utf16Le | Charset::Utf16Be => {
                let mut units = [0u16; 2];
                let units = ch.encode_utf16(&mut units);
                for (i, unit) in units.iter().enumerate() {
                    let pair = match endian {
                        Endian::Little => unit.to_le_bytes(),
                        Endian::Big => unit.to_be_bytes(),
                    };
                    out[i * 2] = pair[0];
                    out[i * 2 + 1] = pair[1];
                }
                Ok(units.len() * 2)
            }
        }
    }
}

fn decode_ascii(bytes: &[u8]) -> DecodeStep {
    match bytes.first() {
        None => DecodeStep::Incomplete,
        Some(&b) if b < 0x80 => DecodeStep::Emit {
            ch: b as char,
            len: 1,
        },
        Some(_) => DecodeStep::Malformed,
    }
}

fn decode_utf8(bytes: &[u8]) -> DecodeStep {
    let Some(&lead) = bytes.first() else {
        return DecodeStep::Incomplete;
    };
    let need = match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return DecodeStep::Malformed,
    };
    if bytes.len() < need {
        // Could still be malformed once the rest arrives; from_utf8 on the
        // partial prefix distinguishes "truncated" from "impossible".
        return match std::str::from_utf8(&bytes[..bytes.len().min(need)]) {
            Err(e) if e.error_len().is_some() => DecodeStep::Malformed,
            _ => DecodeStep::Incomplete,
        };
    }
    match std::str::from_utf8(&bytes[..need]) {
        Ok(s) => match s.chars().next() {
            Some(ch) => DecodeStep::Emit { ch, len: need },
            None => DecodeStep::Malformed,
        },
        Err(_) => DecodeStep::Malformed,
    }
}

fn decode_utf16(endian: Endian, bytes: &[u8]) -> DecodeStep {
    if bytes.len() < 2 {
        return DecodeStep::Incomplete;
    }
    let unit = |i: usize| match endian {
        Endian::Little => u16::from_le_bytes([bytes[i], bytes[i + 1]]),
        Endian::Big => u16::from_be_bytes([bytes[i], bytes[i + 1]]),
    };
    let hi = unit(0);
    match hi {
        0xD800..=0xDBFF => {
            if bytes.len() < 4 {
                return DecodeStep::Incomplete;
            }
            let lo = unit(2);
            if !(0xDC00..=0xDFFF).contains(&lo) {
                return DecodeStep::Malformed;
            }
            let scalar =
                0x10000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(lo) - 0xDC00);
            match char::from_u32(scalar) {
                Some(ch) => DecodeStep::Emit { ch, len: 4 },
                None => DecodeStep::Malformed,
            }
        }
        // Lone low surrogate can never begin a scalar.
        0xDC00..=0xDFFF => DecodeStep::Malformed,
        _ => match char::from_u32(u32::from(hi)) {
            Some(ch) => DecodeStep::Emit { ch, len: 2 },
            None => DecodeStep::Malformed,
        },
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Charset::Ascii => "US-ASCII",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16 => "UTF-16",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
        };
        f.write_str(name)
    }
}

impl FromStr for Charset {
    type Err = PipeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "US-ASCII" | "ASCII" => Ok(Charset::Ascii),
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            "UTF-16" | "UTF16" => Ok(Charset::Utf16),
            "UTF-16LE" | "UTF16LE" => Ok(Charset::Utf16Le),
            "UTF-16BE" | "UTF16BE" => Ok(Charset::Utf16Be),
            _ => Err(PipeError::InvalidArgument("unrecognized character set")),
        }
    }
}
