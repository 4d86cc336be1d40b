//! Fixed-length document bit vector

use super::error::CacheError;
use std::path::Path;

const WORD_BITS: usize = 64;
const HEADER_LEN: usize = 8;

/// One bit per document of a segment; set bits are the documents inside
/// the virtual corpus.
///
/// Bit `i` lives in word `i / 64` at position `i % 64`. Bits past `len` in
/// the last word are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocBits {
    words: Vec<u64>,
    len: usize,
}

impl DocBits {
    /// All bits unset
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new(len);
        for index in indices {
            bits.set(index);
        }
        bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set bit `index`; out of range indices are ignored
    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        }
    }

    pub fn clear(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
        }
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Number of set bits
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let mut rest = word;
                std::iter::from_fn(move || {
                    if rest == 0 {
                        return None;
                    }
                    let bit = rest.trailing_zeros() as usize;
                    rest &= rest - 1;
                    Some(word_index * WORD_BITS + bit)
                })
            })
    }

    /// Little-endian `u64` bit length followed by the little-endian words
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.words.len() * 8);
        bytes.extend_from_slice(&(self.len as u64).to_le_bytes());
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Decode bytes written by [`DocBits::to_bytes`]; `path` only labels errors
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self, CacheError> {
        let corrupt = |reason: String| CacheError::CorruptEntry {
            path: path.to_path_buf(),
            reason,
        };

        let (header, body) = match bytes.split_first_chunk::<HEADER_LEN>() {
            Some(split) => split,
            None => return Err(corrupt(format!("{} byte file has no header", bytes.len()))),
        };

        let len = usize::try_from(u64::from_le_bytes(*header))
            .map_err(|_| corrupt("bit length does not fit in memory".to_string()))?;
        let word_count = len.div_ceil(WORD_BITS);
        if body.len() != word_count * 8 {
            return Err(corrupt(format!(
                "expected {} words for {} bits, found {} bytes",
                word_count,
                len,
                body.len()
            )));
        }

        let mut words: Vec<u64> = body
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }

        Ok(Self { words, len })
    }
}
