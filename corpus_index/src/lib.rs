// Internal modules
pub mod codec;
pub mod config;
pub mod highlight;
#[macro_use]
pub mod logging;
pub mod tokens;
pub mod vc_cache;

// Re-export key types for library consumers
pub use codec::{CorpusDataError, ParseMode, PayloadBuffer, Term};
pub use highlight::{HighlightCombinator, HighlightElement, Notation};
pub use tokens::{IndexedTerm, MetaValue, PostingSource, Token, TokenStream};
pub use vc_cache::{CacheError, DocBits, VirtualCorpusCache};
