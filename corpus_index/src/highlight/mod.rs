//! Highlight combination
//!
//! The search layer reports highlight spans as open/close events per class
//! number, interleaved with the document text. Spans may overlap without
//! nesting. [`HighlightCombinator`] rewrites the events into a properly
//! nested sequence, [`render`] turns that into bracket or HTML markup.

pub mod combinator;
pub mod element;
pub mod render;

pub use combinator::HighlightCombinator;
pub use element::HighlightElement;
pub use render::{render, Notation};
