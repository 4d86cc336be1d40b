//! Term codec: parsing and rendering of single annotation atoms

pub mod error;
pub mod payload;
pub mod term;

pub use error::CorpusDataError;
pub use payload::PayloadBuffer;
pub use term::Term;

use serde::{Deserialize, Serialize};

/// How the codec treats malformed offsets and typed payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// Reject the whole term
    #[default]
    Strict,
    /// Keep the term, drop the malformed field and log a warning
    Lenient,
}
