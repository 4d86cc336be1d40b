//! Token model and token stream
//!
//! A [`Token`] groups the terms that share one text position, a
//! [`TokenStream`] orders tokens and feeds them to an index one term at a
//! time.
//!
//! ## Stream literal
//!
//! Tokens are written as bracket groups concatenated without separator:
//!
//! ```text
//! [(0-3)s:den#0-3|i:den|p:DET][s:Baum#4-8|i:baum|p:NN]
//! ```
//!
//! The optional `(START-END)` prefix sets the token's own offsets, the
//! pipe-separated entries are term literals (see [`crate::codec::Term`]).
//!
//! ## Pull protocol
//!
//! [`TokenStream::next_term`] yields an [`IndexedTerm`] per term. The first
//! term of each token has position increment 1, later ones 0. Term offsets
//! travel in the payload as two big-endian `i32` values ahead of the term's
//! own payload bytes.

pub mod token;
pub mod token_stream;

pub use token::Token;
pub use token_stream::{
    drain_postings, IndexedTerm, MetaValue, PostingSource, TokenStream, META_PREFIX,
};
