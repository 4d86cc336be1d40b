//! Structured errors for malformed annotation data

use crate::config::compile_time::{codec::*, stream::*};
use crate::logging::{codes, Code};

/// Rejected term, token or stream literal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorpusDataError {
    #[error("Term text is empty")]
    EmptyTermText,

    #[error("Malformed offset '{literal}': expected START-END with non-negative integers")]
    MalformedOffset { literal: String },

    #[error("Inverted offset: start {start} lies after end {end}")]
    InvertedOffset { start: u32, end: u32 },

    #[error("Offset {value} out of range (max {MAX_OFFSET})")]
    OffsetOutOfRange { value: u64 },

    #[error("Malformed payload value '{value}' for type marker <{marker}>")]
    MalformedPayload { marker: char, value: String },

    #[error("Term text too long: {length} bytes (max {MAX_TERM_TEXT_LENGTH})")]
    TermTooLong { length: usize },

    #[error("Payload too large: {size} bytes (max {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge { size: usize },

    #[error("Too many terms in token: {count} (max {MAX_TERMS_PER_TOKEN})")]
    TooManyTerms { count: usize },

    #[error("Too many tokens in stream: {count} (max {MAX_TOKENS_PER_STREAM})")]
    TooManyTokens { count: usize },

    #[error("Stream literal too large: {size} bytes (max {MAX_LITERAL_SIZE})")]
    LiteralTooLarge { size: usize },

    #[error("Token '{literal}' contains no terms")]
    EmptyToken { literal: String },

    #[error("Unexpected text '{text}' outside of token brackets at byte {offset}")]
    StrayStreamText { offset: usize, text: String },

    #[error("Cannot attach metadata '{key}': stream has no tokens")]
    NoTokenForMeta { key: String },
}

impl CorpusDataError {
    pub fn error_code(&self) -> Code {
        match self {
            CorpusDataError::EmptyTermText => codes::codec::EMPTY_TERM_TEXT,
            CorpusDataError::MalformedOffset { .. } => codes::codec::MALFORMED_OFFSET,
            CorpusDataError::InvertedOffset { .. } => codes::codec::INVERTED_OFFSET,
            CorpusDataError::OffsetOutOfRange { .. } => codes::codec::OFFSET_OUT_OF_RANGE,
            CorpusDataError::MalformedPayload { .. } => codes::codec::MALFORMED_PAYLOAD,
            CorpusDataError::TermTooLong { .. } => codes::codec::TERM_TOO_LONG,
            CorpusDataError::PayloadTooLarge { .. } => codes::codec::PAYLOAD_TOO_LARGE,
            CorpusDataError::TooManyTerms { .. } => codes::token::TOO_MANY_TERMS,
            CorpusDataError::EmptyToken { .. } => codes::token::EMPTY_TOKEN,
            CorpusDataError::TooManyTokens { .. } => codes::stream::TOO_MANY_TOKENS,
            CorpusDataError::LiteralTooLarge { .. } => codes::stream::LITERAL_TOO_LARGE,
            CorpusDataError::StrayStreamText { .. } => codes::stream::STRAY_STREAM_TEXT,
            CorpusDataError::NoTokenForMeta { .. } => codes::stream::NO_TOKEN_FOR_META,
        }
    }

    /// Numeric error code, e.g. 102 for a malformed offset
    pub fn code(&self) -> u32 {
        self.error_code().number()
    }

    /// Offset and payload problems are the only ones lenient parsing may drop
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            CorpusDataError::MalformedOffset { .. }
                | CorpusDataError::InvertedOffset { .. }
                | CorpusDataError::OffsetOutOfRange { .. }
                | CorpusDataError::MalformedPayload { .. }
        )
    }
}
