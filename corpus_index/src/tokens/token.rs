//! Terms sharing one text position

use crate::codec::term::{check_offsets, drop_or_reject, parse_offsets};
use crate::codec::{CorpusDataError, ParseMode, Term};
use crate::config::compile_time::stream::MAX_TERMS_PER_TOKEN;
use std::fmt;
use std::str::FromStr;

const TERM_SEPARATOR: char = '|';

/// A non-empty group of terms anchored at one position.
///
/// Terms keep insertion order until [`Token::sort`] is called. Sorting is
/// memoized and invalidated by every mutation.
#[derive(Debug, Clone)]
pub struct Token {
    terms: Vec<Term>,
    start: u32,
    end: u32,
    sorted: bool,
}

impl Token {
    pub fn new(term: Term) -> Self {
        Self {
            terms: vec![term],
            start: 0,
            end: 0,
            sorted: false,
        }
    }

    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Result<Self, CorpusDataError> {
        let terms: Vec<Term> = terms.into_iter().collect();
        if terms.is_empty() {
            return Err(CorpusDataError::EmptyToken {
                literal: String::new(),
            });
        }
        if terms.len() > MAX_TERMS_PER_TOKEN {
            return Err(CorpusDataError::TooManyTerms { count: terms.len() });
        }
        Ok(Self {
            terms,
            start: 0,
            end: 0,
            sorted: false,
        })
    }

    /// Parse each surface as a term literal; empty strings are skipped
    pub fn from_surfaces<S: AsRef<str>>(
        surfaces: &[S],
        mode: ParseMode,
    ) -> Result<Self, CorpusDataError> {
        let surfaces: Vec<&str> = surfaces.iter().map(|s| s.as_ref()).collect();
        let terms = surfaces
            .iter()
            .filter(|surface| !surface.is_empty())
            .map(|surface| Term::parse(surface, mode))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_terms(terms).map_err(|err| match err {
            CorpusDataError::EmptyToken { .. } => CorpusDataError::EmptyToken {
                literal: surfaces.join("|"),
            },
            other => other,
        })
    }

    /// Parse `[(START-END)a|b]`; brackets and the offset group are optional
    pub fn parse(literal: &str, mode: ParseMode) -> Result<Self, CorpusDataError> {
        let body = literal
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(literal);

        let (offsets, terms) = match body
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
        {
            Some((offsets, terms)) if is_offset_pair(offsets) => (Some(offsets), terms),
            _ => (None, body),
        };

        let surfaces: Vec<&str> = terms.split(TERM_SEPARATOR).collect();
        let mut token = Self::from_surfaces(&surfaces, mode).map_err(|err| match err {
            CorpusDataError::EmptyToken { .. } => CorpusDataError::EmptyToken {
                literal: literal.to_string(),
            },
            other => other,
        })?;

        if let Some(offsets) = offsets {
            match parse_offsets(offsets) {
                Ok((start, end)) => {
                    token.start = start;
                    token.end = end;
                }
                Err(err) => drop_or_reject(err, mode, literal, "token offsets")?,
            }
        }

        Ok(token)
    }

    /// Append a term; chainable
    pub fn add(&mut self, term: Term) -> Result<&mut Self, CorpusDataError> {
        if self.terms.len() >= MAX_TERMS_PER_TOKEN {
            return Err(CorpusDataError::TooManyTerms {
                count: self.terms.len() + 1,
            });
        }
        self.terms.push(term);
        self.sorted = false;
        Ok(self)
    }

    /// Parse and append a term literal; an empty surface is a no-op
    pub fn add_surface(&mut self, surface: &str) -> Result<&mut Self, CorpusDataError> {
        if surface.is_empty() {
            return Ok(self);
        }
        self.add(surface.parse()?)
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.terms.get(index)
    }

    /// Mutable access; the token counts as unsorted afterwards
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Term> {
        self.sorted = false;
        self.terms.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Token-level offsets from the `(START-END)` group prefix
    pub fn offsets(&self) -> Option<(u32, u32)> {
        (self.start != self.end).then_some((self.start, self.end))
    }

    pub fn set_offsets(&mut self, start: u32, end: u32) -> Result<(), CorpusDataError> {
        check_offsets(start as u64, end as u64)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Put payload-bearing terms in `(end, start)` order.
    ///
    /// Terms without payload keep their slot; the payload-bearing terms are
    /// stably sorted among the remaining slots. Idempotent until the next mutation.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }

        let order = self.sorted_order();
        let mut slots: Vec<Option<Term>> = std::mem::take(&mut self.terms)
            .into_iter()
            .map(Some)
            .collect();
        self.terms = order.into_iter().filter_map(|i| slots[i].take()).collect();
        self.sorted = true;
    }

    /// Permutation that `sort` applies, as source indices per target slot
    fn sorted_order(&self) -> Vec<usize> {
        let slots: Vec<usize> = (0..self.terms.len())
            .filter(|&i| self.terms[i].has_payload())
            .collect();

        let mut by_key = slots.clone();
        by_key.sort_by_key(|&i| self.terms[i].sort_key());

        let mut order: Vec<usize> = (0..self.terms.len()).collect();
        for (slot, source) in slots.into_iter().zip(by_key) {
            order[slot] = source;
        }
        order
    }

    fn render(&self, short: bool) -> String {
        let order = if self.sorted {
            (0..self.terms.len()).collect()
        } else {
            self.sorted_order()
        };

        let rendered: Vec<String> = order
            .into_iter()
            .map(|i| {
                let term = &self.terms[i];
                if short {
                    term.to_string_short()
                } else {
                    term.to_string()
                }
            })
            .collect();

        match self.offsets() {
            Some((start, end)) => format!("[({}-{}){}]", start, end, rendered.join("|")),
            None => format!("[{}]", rendered.join("|")),
        }
    }

    /// Rendering with term offsets left out
    pub fn to_string_short(&self) -> String {
        self.render(true)
    }
}

/// `DIGITS-DIGITS`, the only shape accepted as a token offset group
fn is_offset_pair(text: &str) -> bool {
    let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    text.split_once('-')
        .is_some_and(|(start, end)| is_number(start) && is_number(end))
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms && self.start == other.start && self.end == other.end
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl FromStr for Token {
    type Err = CorpusDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::parse(s, ParseMode::Strict)
    }
}

impl<'a> IntoIterator for &'a Token {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn term(literal: &str) -> Term {
        literal.parse().unwrap()
    }

    fn texts(token: &Token) -> Vec<&str> {
        token.iter().map(Term::text).collect()
    }

    #[test]
    fn test_parse_bracketed_and_bare() {
        let bracketed: Token = "[s:den#0-3|i:den|p:DET]".parse().unwrap();
        let bare: Token = "s:den#0-3|i:den|p:DET".parse().unwrap();

        assert_eq!(bracketed, bare);
        assert_eq!(bracketed.len(), 3);
        assert_eq!(bracketed.get(0).unwrap().offsets(), Some((0, 3)));
        assert!(bracketed.get(3).is_none());
    }

    #[test]
    fn test_empty_surfaces_are_skipped() {
        let token = Token::from_surfaces(&["a", "", "b"], ParseMode::Strict).unwrap();
        assert_eq!(texts(&token), vec!["a", "b"]);

        let mut token = Token::new(term("a"));
        token.add_surface("").unwrap();
        assert_eq!(token.len(), 1);
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert_matches!(
            Token::from_surfaces(&["", ""], ParseMode::Strict),
            Err(CorpusDataError::EmptyToken { .. })
        );
        assert_matches!(
            Token::from_str("[]"),
            Err(CorpusDataError::EmptyToken { literal }) if literal == "[]"
        );
        assert_matches!(
            Token::from_terms(Vec::new()),
            Err(CorpusDataError::EmptyToken { .. })
        );
    }

    #[test]
    fn test_token_offsets() {
        let token: Token = "[(4-9)s:Haus|p:NN]".parse().unwrap();
        assert_eq!(token.offsets(), Some((4, 9)));
        assert_eq!(token.to_string(), "[(4-9)s:Haus|p:NN]");

        assert_matches!(
            Token::from_str("[(9-4)s:Haus]"),
            Err(CorpusDataError::InvertedOffset { .. })
        );

        let lenient = Token::parse("[(4-99999999999)s:Haus]", ParseMode::Lenient).unwrap();
        assert_eq!(lenient.offsets(), None);
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient.get(0).unwrap().text(), "s:Haus");
    }

    #[test]
    fn test_parenthesized_surface_is_not_an_offset_group() {
        let token: Token = "[(a)b|p:X]".parse().unwrap();
        assert_eq!(token.offsets(), None);
        assert_eq!(token.len(), 2);
        assert_eq!(token.get(0).unwrap().text(), "(a)b");

        let token: Token = "[(1-2)(x)|p:X]".parse().unwrap();
        assert_eq!(token.offsets(), Some((1, 2)));
        assert_eq!(token.get(0).unwrap().text(), "(x)");

        let token: Token = "[(x-4)s:Haus]".parse().unwrap();
        assert_eq!(token.offsets(), None);
        assert_eq!(token.get(0).unwrap().text(), "(x-4)s:Haus");
    }

    #[test]
    fn test_sort_orders_by_end_then_start() {
        let mut token = Token::new(term("a#2-5$x"));
        token.add(term("b#1-5$x")).unwrap();
        token.add(term("c#0-3$x")).unwrap();

        token.sort();
        assert_eq!(texts(&token), vec!["c", "b", "a"]);
        assert!(token.is_sorted());
    }

    #[test]
    fn test_sort_leaves_payloadless_terms_in_place() {
        let mut token = Token::new(term("a#2-5$x"));
        token.add(term("bare#9-12")).unwrap();
        token.add(term("b#1-5$x")).unwrap();

        token.sort();
        assert_eq!(texts(&token), vec!["b", "bare", "a"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut token = Token::new(term("first#1-2$x"));
        token.add(term("second#1-2$y")).unwrap();
        token.add(term("early$z")).unwrap();

        token.sort();
        assert_eq!(texts(&token), vec!["early", "first", "second"]);
    }

    #[test]
    fn test_add_invalidates_sort() {
        let mut token = Token::new(term("a#2-5$x"));
        token.sort();
        assert!(token.is_sorted());

        token.add(term("b#0-1$x")).unwrap();
        assert!(!token.is_sorted());

        token.sort();
        assert_eq!(texts(&token), vec!["b", "a"]);
    }

    #[test]
    fn test_display_renders_sorted_view_without_mutating() {
        let mut token = Token::new(term("a#2-5$x"));
        token.add(term("b#1-5$y")).unwrap();

        assert_eq!(token.to_string(), "[b#1-5$y|a#2-5$x]");
        assert_eq!(token.to_string_short(), "[b$y|a$x]");
        assert_eq!(texts(&token), vec!["a", "b"]);
        assert!(!token.is_sorted());
    }

    #[test]
    fn test_add_is_chainable() {
        let mut token = Token::new(term("a"));
        token.add(term("b")).unwrap().add(term("c")).unwrap();
        assert_eq!(texts(&token), vec!["a", "b", "c"]);
    }
}
