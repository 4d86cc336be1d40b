//! Virtual corpus cache
//!
//! A virtual corpus is a user-defined subset of the indexed documents. Its
//! membership is precomputed per index leaf (segment) as a [`DocBits`]
//! vector and cached under the leaf's fingerprint.

pub mod bits;
pub mod error;
pub mod store;

pub use bits::DocBits;
pub use error::CacheError;
pub use store::{LeafBits, VirtualCorpusCache};
