use crate::logging::{codes, Code};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid virtual corpus id '{id}'")]
    InvalidVcId { id: String },

    #[error("Invalid leaf fingerprint '{fingerprint}'")]
    InvalidFingerprint { fingerprint: String },

    #[error("Cache I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {}: {reason}", path.display())]
    CorruptEntry { path: PathBuf, reason: String },

    #[error("Cache manifest {} unreadable: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CacheError {
    pub fn error_code(&self) -> Code {
        match self {
            CacheError::InvalidVcId { .. } | CacheError::InvalidFingerprint { .. } => {
                codes::cache::INVALID_VC_ID
            }
            CacheError::Io { .. } => codes::cache::CACHE_IO_ERROR,
            CacheError::CorruptEntry { .. } => codes::cache::CORRUPT_CACHE_ENTRY,
            CacheError::Manifest { .. } => codes::cache::MANIFEST_ERROR,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}
