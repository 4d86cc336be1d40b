//! Replayable token stream with a positional pull protocol
//!
//! The stream keeps a single `(token, term)` cursor. Each pull yields the
//! current term's text, its position increment (1 for the first term of a
//! token, 0 for the rest) and its emitted payload. Running past the last
//! term resets the cursor and reports the end, so the stream can be read
//! again without an explicit reset.

use super::token::Token;
use crate::codec::{CorpusDataError, ParseMode, PayloadBuffer, Term};
use crate::config::compile_time::stream::{MAX_LITERAL_SIZE, MAX_TOKENS_PER_STREAM};
use crate::config::RuntimeConfig;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success, log_warning};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Surface prefix of metadata terms
pub const META_PREFIX: char = '-';

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("static token group pattern"))
}

// ============================================================================
// PULLED POSTING
// ============================================================================

/// One pulled term as the index sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTerm {
    /// Full surface including the layer prefix (`s:den`)
    pub text: String,
    pub position_increment: u32,
    /// `[start i32 BE][end i32 BE]` when the term has offsets, then the term payload
    pub payload: Option<Vec<u8>>,
}

impl IndexedTerm {
    fn from_term(term: &Term, position_increment: u32) -> Self {
        let payload = match (term.offsets(), term.payload()) {
            (None, None) => None,
            (offsets, payload) => {
                let mut buffer = PayloadBuffer::new();
                if let Some((start, end)) = offsets {
                    // Offsets are bounded by i32::MAX, so the u32 bytes equal the i32 bytes
                    buffer.put_bytes(&start.to_be_bytes());
                    buffer.put_bytes(&end.to_be_bytes());
                }
                if let Some(payload) = payload {
                    buffer.put_bytes(payload);
                }
                Some(buffer.into_bytes())
            }
        };

        Self {
            text: term.text().to_string(),
            position_increment,
            payload,
        }
    }

    /// Surface without the layer prefix (`den` for `s:den`)
    pub fn value(&self) -> &str {
        self.text
            .split_once(':')
            .map_or(self.text.as_str(), |(_, value)| value)
    }
}

/// Source of postings for an indexing backend
pub trait PostingSource {
    /// Next posting, or `None` at the end of the source
    fn next_posting(&mut self) -> Option<IndexedTerm>;

    /// Rewind to the first posting
    fn reset(&mut self);
}

/// Rewind `source` and pull it to completion
pub fn drain_postings<S: PostingSource + ?Sized>(source: &mut S) -> Vec<IndexedTerm> {
    source.reset();
    std::iter::from_fn(|| source.next_posting()).collect()
}

// ============================================================================
// METADATA VALUES
// ============================================================================

/// Typed value attached to the stream by [`TokenStream::add_meta`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Text(String),
    Bytes(Vec<u8>),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl MetaValue {
    fn to_payload(&self) -> Vec<u8> {
        let mut buffer = PayloadBuffer::new();
        match self {
            MetaValue::Text(text) => buffer.put_bytes(text.as_bytes()),
            MetaValue::Bytes(bytes) => buffer.put_bytes(bytes),
            MetaValue::Short(value) => buffer.put_i16(*value),
            MetaValue::Int(value) => buffer.put_i32(*value),
            MetaValue::Long(value) => buffer.put_i64(*value),
        };
        buffer.into_bytes()
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<Vec<u8>> for MetaValue {
    fn from(value: Vec<u8>) -> Self {
        MetaValue::Bytes(value)
    }
}

impl From<i16> for MetaValue {
    fn from(value: i16) -> Self {
        MetaValue::Short(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        MetaValue::Int(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Long(value)
    }
}

// ============================================================================
// TOKEN STREAM
// ============================================================================

/// Ordered tokens plus a single pull cursor. Not meant for concurrent readers.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    token_index: usize,
    term_index: usize,
    sort_terms_on_emit: bool,
}

impl TokenStream {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            token_index: 0,
            term_index: 0,
            sort_terms_on_emit: true,
        }
    }

    /// Whether each token is sorted when the cursor reaches it (default on)
    pub fn set_sort_terms_on_emit(&mut self, sort: bool) {
        self.sort_terms_on_emit = sort;
    }

    pub fn add_token(&mut self, token: Token) -> Result<&mut Self, CorpusDataError> {
        if self.tokens.len() >= MAX_TOKENS_PER_STREAM {
            return Err(CorpusDataError::TooManyTokens {
                count: self.tokens.len() + 1,
            });
        }
        self.tokens.push(token);
        Ok(self)
    }

    /// Append one token made of the given terms
    pub fn add_terms(
        &mut self,
        terms: impl IntoIterator<Item = Term>,
    ) -> Result<&mut Self, CorpusDataError> {
        self.add_token(Token::from_terms(terms)?)
    }

    /// Append one token parsed from term literals; empty strings are skipped
    pub fn add_surfaces<S: AsRef<str>>(
        &mut self,
        surfaces: &[S],
    ) -> Result<&mut Self, CorpusDataError> {
        self.add_token(Token::from_surfaces(surfaces, ParseMode::Strict)?)
    }

    /// Attach `-:key` with a typed payload to the first token.
    ///
    /// Unlike every other mutation this changes an existing token instead of
    /// appending one, so the metadata shares position 0 with the first word.
    pub fn add_meta(
        &mut self,
        key: &str,
        value: impl Into<MetaValue>,
    ) -> Result<&mut Self, CorpusDataError> {
        let mut term = Term::with_prefix(META_PREFIX, key)?;
        term.set_payload(value.into().to_payload())?;

        let first = self
            .tokens
            .first_mut()
            .ok_or_else(|| CorpusDataError::NoTokenForMeta {
                key: key.to_string(),
            })?;
        first.add(term)?;
        Ok(self)
    }

    /// Pull the next term, or `None` once the stream is exhausted.
    ///
    /// Exhaustion resets the cursor to the first term.
    pub fn next_term(&mut self) -> Option<IndexedTerm> {
        loop {
            let Some(token) = self.tokens.get_mut(self.token_index) else {
                self.reset();
                return None;
            };

            if self.term_index == 0 && self.sort_terms_on_emit {
                token.sort();
            }

            match token.get(self.term_index) {
                Some(term) => {
                    let increment = u32::from(self.term_index == 0);
                    let posting = IndexedTerm::from_term(term, increment);
                    self.term_index += 1;
                    return Some(posting);
                }
                None => {
                    self.token_index += 1;
                    self.term_index = 0;
                }
            }
        }
    }

    /// Move the cursor back to the first term; content is kept
    pub fn reset(&mut self) {
        self.token_index = 0;
        self.term_index = 0;
    }

    /// Every posting from the start, leaving the cursor reset
    pub fn postings(&mut self) -> Vec<IndexedTerm> {
        let postings = drain_postings(self);
        log_success!(codes::success::STREAM_DRAINED, "Token stream drained",
            "tokens" => self.tokens.len(),
            "postings" => postings.len()
        );
        postings
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Token> {
        self.tokens.get_mut(index)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    // === LITERAL PARSING ===

    /// Parse a stream literal, failing on the first malformed group
    pub fn parse(literal: &str, mode: ParseMode) -> Result<Self, CorpusDataError> {
        let mut stream = Self::new();
        if let Some(err) = stream.extend_from_literal(literal, mode, false).into_iter().next() {
            return Err(err);
        }
        log_success!(codes::success::STREAM_PARSED, "Token stream parsed",
            "tokens" => stream.len()
        );
        Ok(stream)
    }

    /// Parse a stream literal, skipping malformed groups and stray text.
    ///
    /// Returns the stream built from the well-formed groups together with
    /// the errors of everything that was skipped.
    pub fn parse_skipping(literal: &str, mode: ParseMode) -> (Self, Vec<CorpusDataError>) {
        let mut stream = Self::new();
        let skipped = stream.extend_from_literal(literal, mode, true);
        log_success!(codes::success::STREAM_PARSED, "Token stream parsed",
            "tokens" => stream.len(),
            "skipped" => skipped.len()
        );
        (stream, skipped)
    }

    /// Parse following the runtime preferences for mode, skipping and sorting
    pub fn parse_with_config(
        literal: &str,
        config: &RuntimeConfig,
    ) -> Result<(Self, Vec<CorpusDataError>), CorpusDataError> {
        let mode = config.codec.parse_mode;
        let result = if config.stream.skip_malformed_groups {
            Ok(Self::parse_skipping(literal, mode))
        } else {
            Self::parse(literal, mode).map(|stream| (stream, Vec::new()))
        };

        match result {
            Ok((mut stream, skipped)) => {
                stream.set_sort_terms_on_emit(config.stream.sort_terms_on_emit);
                Ok((stream, skipped))
            }
            Err(err) => {
                if config.codec.log_rejected_terms {
                    log_error!(err.error_code(), "Rejected stream literal",
                        "reason" => err,
                        "bytes" => literal.len()
                    );
                }
                Err(err)
            }
        }
    }

    /// Append the groups of `literal`; returns the errors met.
    ///
    /// Without `skip` parsing stops at the first error and nothing of the
    /// literal is kept. Whitespace between groups is ignored.
    fn extend_from_literal(
        &mut self,
        literal: &str,
        mode: ParseMode,
        skip: bool,
    ) -> Vec<CorpusDataError> {
        if literal.len() > MAX_LITERAL_SIZE {
            return vec![CorpusDataError::LiteralTooLarge {
                size: literal.len(),
            }];
        }

        let mut parsed = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = 0;

        let gaps_and_groups = group_pattern()
            .captures_iter(literal)
            .filter_map(|captures| Some((captures.get(0)?, captures.get(1)?)))
            .map(|(whole, inner)| (Some((whole, inner)), whole.start()))
            .chain(std::iter::once((None, literal.len())));

        for (group, gap_end) in gaps_and_groups {
            let gap = &literal[cursor..gap_end];
            if !gap.trim().is_empty() {
                errors.push(CorpusDataError::StrayStreamText {
                    offset: cursor,
                    text: gap.to_string(),
                });
                if !skip {
                    return errors;
                }
            }

            let Some((whole, inner)) = group else {
                break;
            };
            cursor = whole.end();

            match Token::parse(inner.as_str(), mode) {
                Ok(token) => parsed.push(token),
                Err(err) => {
                    errors.push(err);
                    if !skip {
                        return errors;
                    }
                }
            }
        }

        if skip {
            for err in &errors {
                log_warning!(codes::stream::GROUP_SKIPPED, "Skipped malformed stream group",
                    "reason" => err,
                    "code" => err.error_code()
                );
            }
        }

        for token in parsed {
            if let Err(err) = self.add_token(token) {
                errors.push(err);
                break;
            }
        }

        log_debug!("Stream literal processed",
            "bytes" => literal.len(),
            "tokens" => self.tokens.len(),
            "errors" => errors.len()
        );

        errors
    }
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

impl PostingSource for TokenStream {
    fn next_posting(&mut self) -> Option<IndexedTerm> {
        self.next_term()
    }

    fn reset(&mut self) {
        TokenStream::reset(self);
    }
}

impl FromStr for TokenStream {
    type Err = CorpusDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenStream::parse(s, ParseMode::Strict)
    }
}

impl fmt::Display for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn increments(stream: &mut TokenStream) -> Vec<u32> {
        stream
            .postings()
            .into_iter()
            .map(|posting| posting.position_increment)
            .collect()
    }

    #[test]
    fn test_single_token_scenario() {
        let mut stream: TokenStream = "[s:den#0-3|i:den|p:DET]".parse().unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.get(0).unwrap().len(), 3);

        let first = stream.next_term().unwrap();
        assert_eq!(first.text, "s:den");
        assert_eq!(first.value(), "den");
        assert_eq!(first.position_increment, 1);
        assert_eq!(first.payload, Some(vec![0, 0, 0, 0, 0, 0, 0, 3]));

        let second = stream.next_term().unwrap();
        assert_eq!(second.text, "i:den");
        assert_eq!(second.value(), "den");
        assert_eq!(second.position_increment, 0);
        assert_eq!(second.payload, None);

        let third = stream.next_term().unwrap();
        assert_eq!(third.text, "p:DET");
        assert_eq!(third.position_increment, 0);
        assert_eq!(third.payload, None);

        assert_eq!(stream.next_term(), None);
    }

    #[test]
    fn test_position_increment_pattern() {
        let mut stream = TokenStream::new();
        stream.add_surfaces(&["s:a", "i:a"]).unwrap();
        stream.add_surfaces(&["s:b"]).unwrap();
        stream.add_surfaces(&["s:c", "i:c", "p:X"]).unwrap();

        assert_eq!(increments(&mut stream), vec![1, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_exhaustion_resets_cursor() {
        let mut stream: TokenStream = "[a|b][c]".parse().unwrap();

        let first_pass: Vec<String> =
            std::iter::from_fn(|| stream.next_term()).map(|p| p.text).collect();
        let second_pass: Vec<String> =
            std::iter::from_fn(|| stream.next_term()).map(|p| p.text).collect();

        assert_eq!(first_pass, vec!["a", "b", "c"]);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_explicit_reset_mid_stream() {
        let mut stream: TokenStream = "[a|b][c]".parse().unwrap();
        stream.next_term();
        stream.next_term();
        stream.reset();

        let posting = stream.next_term().unwrap();
        assert_eq!(posting.text, "a");
        assert_eq!(posting.position_increment, 1);
    }

    #[test]
    fn test_empty_stream_reports_end() {
        let mut stream = TokenStream::new();
        assert_eq!(stream.next_term(), None);
        assert!(stream.postings().is_empty());
    }

    #[test]
    fn test_payload_without_offsets_and_empty_payload() {
        let mut stream: TokenStream = "[a$xy|b$|c]".parse().unwrap();
        let postings = stream.postings();

        assert_eq!(postings[0].payload, Some(b"xy".to_vec()));
        assert_eq!(postings[1].payload, Some(Vec::new()));
        assert_eq!(postings[2].payload, None);
    }

    #[test]
    fn test_offsets_precede_payload() {
        let mut stream: TokenStream = "[a#1-2$<b>7]".parse().unwrap();
        let postings = stream.postings();
        assert_eq!(postings[0].payload, Some(vec![0, 0, 0, 1, 0, 0, 0, 2, 7]));
    }

    #[test]
    fn test_tokens_are_sorted_on_emit() {
        let mut stream: TokenStream = "[late#4-9$x|bare|early#0-2$x]".parse().unwrap();
        let texts: Vec<String> = stream.postings().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["early", "bare", "late"]);

        let mut unsorted: TokenStream = "[late#4-9$x|bare|early#0-2$x]".parse().unwrap();
        unsorted.set_sort_terms_on_emit(false);
        let texts: Vec<String> = unsorted.postings().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["late", "bare", "early"]);
    }

    #[test]
    fn test_pull_rereads_current_term_values() {
        let mut stream: TokenStream = "[a]".parse().unwrap();
        assert_eq!(stream.postings()[0].payload, None);

        stream
            .get_mut(0)
            .and_then(|token| token.get_mut(0))
            .unwrap()
            .set_offsets(2, 4)
            .unwrap();
        assert_eq!(
            stream.postings()[0].payload,
            Some(vec![0, 0, 0, 2, 0, 0, 0, 4])
        );
    }

    #[test]
    fn test_add_meta_extends_first_token() {
        let mut stream: TokenStream = "[s:a][s:b]".parse().unwrap();
        stream.add_meta("tokens", 2i32).unwrap();
        stream.add_meta("title", "Der Baum").unwrap();

        assert_eq!(stream.len(), 2);
        let first = stream.get(0).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first.get(1).unwrap().text(), "-:tokens");
        assert_eq!(first.get(1).unwrap().payload(), Some(&[0, 0, 0, 2][..]));
        assert_eq!(first.get(2).unwrap().payload(), Some(&b"Der Baum"[..]));

        assert_eq!(increments(&mut stream), vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_add_meta_typed_values() {
        let mut stream: TokenStream = "[s:a]".parse().unwrap();
        stream.add_meta("s", 1i16).unwrap();
        stream.add_meta("l", -1i64).unwrap();
        stream.add_meta("raw", vec![9u8, 8]).unwrap();

        let token = stream.get(0).unwrap();
        assert_eq!(token.get(1).unwrap().payload(), Some(&[0, 1][..]));
        assert_eq!(token.get(2).unwrap().payload(), Some(&[0xFF; 8][..]));
        assert_eq!(token.get(3).unwrap().payload(), Some(&[9, 8][..]));
    }

    #[test]
    fn test_add_meta_needs_a_token() {
        let mut stream = TokenStream::new();
        assert_matches!(
            stream.add_meta("tokens", 0i32),
            Err(CorpusDataError::NoTokenForMeta { key }) if key == "tokens"
        );
    }

    #[test]
    fn test_strict_parse_rejects_whole_literal() {
        assert_matches!(
            TokenStream::from_str("[a][b#x-1][c]"),
            Err(CorpusDataError::MalformedOffset { .. })
        );
        assert_matches!(
            TokenStream::from_str("[a]oops[c]"),
            Err(CorpusDataError::StrayStreamText { offset: 3, .. })
        );
        assert_matches!(
            TokenStream::from_str("[a][]"),
            Err(CorpusDataError::EmptyToken { .. })
        );
    }

    #[test]
    fn test_skipping_parse_keeps_good_groups() {
        let (mut stream, skipped) =
            TokenStream::parse_skipping("[a][b#x-1]junk[c|d]", ParseMode::Strict);

        assert_eq!(stream.len(), 2);
        assert_eq!(skipped.len(), 2);
        assert_matches!(skipped[0], CorpusDataError::MalformedOffset { .. });
        assert_matches!(skipped[1], CorpusDataError::StrayStreamText { .. });
        assert_eq!(increments(&mut stream), vec![1, 1, 0]);
    }

    #[test]
    fn test_whitespace_between_groups_is_allowed() {
        let stream: TokenStream = "[a]\n[b]\n".parse().unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_parse_with_config() {
        let mut config = RuntimeConfig::default();
        config.codec.parse_mode = ParseMode::Lenient;
        config.stream.skip_malformed_groups = false;
        config.stream.sort_terms_on_emit = false;

        let (mut stream, skipped) =
            TokenStream::parse_with_config("[b#4-5$x|a#x-1$y]", &config).unwrap();
        assert!(skipped.is_empty());

        let texts: Vec<String> = stream.postings().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["b", "a"]);

        config.stream.skip_malformed_groups = true;
        config.codec.parse_mode = ParseMode::Strict;
        let (stream, skipped) = TokenStream::parse_with_config("[a][#1-2]", &config).unwrap();
        assert_eq!(stream.len(), 1);
        assert_matches!(skipped[0], CorpusDataError::EmptyTermText);
    }

    #[test]
    fn test_display_round_trip() {
        let literal = "[(0-3)s:den#0-3|i:den][s:Baum#4-8$lemma|p:NN]";
        let stream: TokenStream = literal.parse().unwrap();
        assert_eq!(stream.to_string(), literal);

        let reparsed: TokenStream = stream.to_string().parse().unwrap();
        assert_eq!(reparsed.tokens(), stream.tokens());
    }

    #[test]
    fn test_posting_source_trait() {
        let mut stream: TokenStream = "[a|b]".parse().unwrap();
        stream.next_term();

        let source: &mut dyn PostingSource = &mut stream;
        let postings = drain_postings(source);
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].text, "a");
    }
}
