//! Term literal codec
//!
//! Grammar: `SURFACE [ '#' START '-' END ] [ '$' PAYLOAD ]`, where PAYLOAD is
//! either plain UTF-8 text or a run of typed values `<b>`, `<s>`, `<i>`, `<l>`
//! (i8, i16, i32, i64) encoded big-endian.

use super::error::CorpusDataError;
use super::payload::PayloadBuffer;
use super::ParseMode;
use crate::config::compile_time::codec::{MAX_OFFSET, MAX_PAYLOAD_SIZE, MAX_TERM_TEXT_LENGTH};
use crate::logging::codes;
use crate::log_warning;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const OFFSET_SEPARATOR: char = '#';
const PAYLOAD_SEPARATOR: char = '$';
const PREFIX_SEPARATOR: char = ':';
const UNDECODABLE_MARKER: &str = "<?>";

/// One annotation atom: surface text, optional character offsets, optional payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    text: String,
    start: u32,
    end: u32,
    payload: Option<Vec<u8>>,
}

impl Term {
    /// Term with the given surface text and no offsets or payload
    pub fn new(text: impl Into<String>) -> Result<Self, CorpusDataError> {
        let text = text.into();
        validate_text(&text)?;
        Ok(Self {
            text,
            start: 0,
            end: 0,
            payload: None,
        })
    }

    /// Parse a term literal
    pub fn parse(raw: &str, mode: ParseMode) -> Result<Self, CorpusDataError> {
        let (head, payload_literal) = match raw.split_once(PAYLOAD_SEPARATOR) {
            Some((head, payload)) => (head, Some(payload)),
            None => (raw, None),
        };
        let (surface, offset_literal) = match head.split_once(OFFSET_SEPARATOR) {
            Some((surface, offsets)) => (surface, Some(offsets)),
            None => (head, None),
        };

        let mut term = Term::new(surface)?;

        if let Some(literal) = offset_literal {
            match parse_offsets(literal) {
                Ok((start, end)) => {
                    term.start = start;
                    term.end = end;
                }
                Err(err) => drop_or_reject(err, mode, raw, "offsets")?,
            }
        }

        if let Some(literal) = payload_literal {
            match parse_payload(literal) {
                Ok(payload) => term.set_payload(payload)?,
                Err(err) => drop_or_reject(err, mode, raw, "payload")?,
            }
        }

        Ok(term)
    }

    /// Same as parsing `prefix:surface`
    pub fn with_prefix(prefix: char, surface: &str) -> Result<Self, CorpusDataError> {
        Self::parse(&format!("{}{}{}", prefix, PREFIX_SEPARATOR, surface), ParseMode::Strict)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), CorpusDataError> {
        let text = text.into();
        validate_text(&text)?;
        self.text = text;
        Ok(())
    }

    /// Annotation layer before the first `:` (`s` in `s:den`)
    pub fn prefix(&self) -> Option<&str> {
        self.text.split_once(PREFIX_SEPARATOR).map(|(prefix, _)| prefix)
    }

    /// Surface after the layer prefix (`den` in `s:den`), or the whole text
    pub fn value(&self) -> &str {
        self.text
            .split_once(PREFIX_SEPARATOR)
            .map_or(self.text.as_str(), |(_, value)| value)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// `start == end` means no offsets are carried
    pub fn has_offsets(&self) -> bool {
        self.start != self.end
    }

    pub fn offsets(&self) -> Option<(u32, u32)> {
        self.has_offsets().then_some((self.start, self.end))
    }

    pub fn set_offsets(&mut self, start: u32, end: u32) -> Result<(), CorpusDataError> {
        check_offsets(start as u64, end as u64)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn clear_offsets(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) -> Result<(), CorpusDataError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CorpusDataError::PayloadTooLarge {
                size: payload.len(),
            });
        }
        self.payload = Some(payload);
        Ok(())
    }

    pub fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Rendering without the offset segment
    pub fn to_string_short(&self) -> String {
        let mut out = self.text.clone();
        self.write_payload(&mut out);
        out
    }

    /// Position order: `(end, start)` ascending.
    ///
    /// A term without payload compares equal to everything, so this is not a
    /// total order and must not be handed to `sort_by`. `Token::sort` uses
    /// [`Term::sort_key`] instead.
    pub fn cmp_position(&self, other: &Term) -> Ordering {
        match (self.sort_key(), other.sort_key()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        }
    }

    /// `(end, start)` for payload-bearing terms, `None` for terms that keep their slot
    pub fn sort_key(&self) -> Option<(u32, u32)> {
        self.payload.as_ref().map(|_| (self.end, self.start))
    }

    fn write_payload(&self, out: &mut String) {
        let Some(payload) = &self.payload else {
            return;
        };
        out.push(PAYLOAD_SEPARATOR);
        match std::str::from_utf8(payload) {
            Ok(text) => out.push_str(text),
            Err(_) => {
                out.push_str(UNDECODABLE_MARKER);
                let bytes: Vec<String> = payload.iter().map(|b| b.to_string()).collect();
                out.push_str(&bytes.join(","));
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = self.text.clone();
        if self.has_offsets() {
            out.push_str(&format!("{}{}-{}", OFFSET_SEPARATOR, self.start, self.end));
        }
        self.write_payload(&mut out);
        f.write_str(&out)
    }
}

impl FromStr for Term {
    type Err = CorpusDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Term::parse(s, ParseMode::Strict)
    }
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

fn validate_text(text: &str) -> Result<(), CorpusDataError> {
    if text.is_empty() {
        return Err(CorpusDataError::EmptyTermText);
    }
    if text.len() > MAX_TERM_TEXT_LENGTH {
        return Err(CorpusDataError::TermTooLong { length: text.len() });
    }
    Ok(())
}

pub(crate) fn drop_or_reject(
    err: CorpusDataError,
    mode: ParseMode,
    raw: &str,
    field: &str,
) -> Result<(), CorpusDataError> {
    if mode == ParseMode::Strict || !err.is_droppable() {
        return Err(err);
    }
    log_warning!(codes::codec::LENIENT_FIELD_DROPPED, "Dropped malformed term field",
        "field" => field,
        "term" => raw,
        "reason" => err
    );
    Ok(())
}

fn parse_offset_value(digits: &str, literal: &str) -> Result<u64, CorpusDataError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CorpusDataError::MalformedOffset {
            literal: literal.to_string(),
        });
    }
    // All digits, so the only failure left is overflow
    Ok(digits.parse().unwrap_or(u64::MAX))
}

pub(crate) fn check_offsets(start: u64, end: u64) -> Result<(u32, u32), CorpusDataError> {
    for value in [start, end] {
        if value > MAX_OFFSET as u64 {
            return Err(CorpusDataError::OffsetOutOfRange { value });
        }
    }
    if start > end {
        return Err(CorpusDataError::InvertedOffset {
            start: start as u32,
            end: end as u32,
        });
    }
    Ok((start as u32, end as u32))
}

pub(crate) fn parse_offsets(literal: &str) -> Result<(u32, u32), CorpusDataError> {
    let (start, end) =
        literal
            .split_once('-')
            .ok_or_else(|| CorpusDataError::MalformedOffset {
                literal: literal.to_string(),
            })?;
    let start = parse_offset_value(start, literal)?;
    let end = parse_offset_value(end, literal)?;
    check_offsets(start, end)
}

/// Type marker at the start of `s`, e.g. `i` for `<i>42`
fn marker_at(s: &str) -> Option<char> {
    match s.as_bytes() {
        [b'<', marker @ (b'b' | b's' | b'i' | b'l'), b'>', ..] => Some(*marker as char),
        _ => None,
    }
}

fn parse_payload(literal: &str) -> Result<Vec<u8>, CorpusDataError> {
    if marker_at(literal).is_none() {
        return Ok(literal.as_bytes().to_vec());
    }

    let mut buffer = PayloadBuffer::new();
    let mut rest = literal;

    while let Some(marker) = marker_at(rest) {
        let body = &rest[3..];
        let value_end = body
            .match_indices('<')
            .map(|(index, _)| index)
            .find(|&index| marker_at(&body[index..]).is_some())
            .unwrap_or(body.len());
        let value = &body[..value_end];

        let malformed = || CorpusDataError::MalformedPayload {
            marker,
            value: value.to_string(),
        };
        match marker {
            'b' => buffer.put_i8(value.parse().map_err(|_| malformed())?),
            's' => buffer.put_i16(value.parse().map_err(|_| malformed())?),
            'i' => buffer.put_i32(value.parse().map_err(|_| malformed())?),
            _ => buffer.put_i64(value.parse().map_err(|_| malformed())?),
        };

        rest = &body[value_end..];
    }

    Ok(buffer.into_bytes())
}
