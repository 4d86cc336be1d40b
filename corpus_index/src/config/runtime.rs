// RUNTIME PREFERENCES (User Experience)

use crate::codec::ParseMode;
use crate::logging::{codes, Code};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecPreferences {
    /// Strict parsing rejects malformed offsets and typed payloads,
    /// lenient parsing drops them with a warning
    pub parse_mode: ParseMode,

    /// Whether to log every rejected term literal
    pub log_rejected_terms: bool,
}

impl Default for CodecPreferences {
    fn default() -> Self {
        Self {
            parse_mode: env::var(env_vars::CODEC_PARSE_MODE)
                .ok()
                .and_then(|v| parse_mode_from_str(&v))
                .unwrap_or(ParseMode::Strict),
            log_rejected_terms: env::var(env_vars::CODEC_LOG_REJECTED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPreferences {
    /// Whether tokens are sorted into canonical term order before emission
    pub sort_terms_on_emit: bool,

    /// Whether literal parsing skips malformed bracket groups instead of failing
    pub skip_malformed_groups: bool,
}

impl Default for StreamPreferences {
    fn default() -> Self {
        Self {
            sort_terms_on_emit: env::var(env_vars::STREAM_SORT_TERMS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            skip_malformed_groups: env::var(env_vars::STREAM_SKIP_MALFORMED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightPreferences {
    /// Whether unmatched closes are reported as warnings
    pub log_imbalance: bool,
}

impl Default for HighlightPreferences {
    fn default() -> Self {
        Self {
            log_imbalance: env::var(env_vars::HIGHLIGHT_LOG_IMBALANCE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePreferences {
    /// Root directory of the on-disk virtual corpus cache
    pub directory: PathBuf,

    /// Number of virtual corpora held in memory
    pub capacity: usize,
}

impl Default for CachePreferences {
    fn default() -> Self {
        Self {
            directory: env::var(env_vars::CACHE_DIRECTORY)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("vc-cache")),
            capacity: env::var(env_vars::CACHE_CAPACITY)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::config::compile_time::cache::DEFAULT_CAPACITY),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to attach the current document id to log events
    pub include_document_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var(env_vars::LOGGING_ENABLE_CONSOLE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            include_document_context: env::var(env_vars::LOGGING_INCLUDE_DOCUMENT_CONTEXT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel for compatibility
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

fn parse_mode_from_str(mode: &str) -> Option<ParseMode> {
    match mode.to_lowercase().as_str() {
        "strict" => Some(ParseMode::Strict),
        "lenient" => Some(ParseMode::Lenient),
        _ => None,
    }
}

/// Errors raised while loading a runtime configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn error_code(&self) -> Code {
        codes::system::CONFIGURATION_ERROR
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub codec: CodecPreferences,
    pub stream: StreamPreferences,
    pub highlight: HighlightPreferences,
    pub cache: CachePreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Load preferences from a TOML file; missing sections keep their defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Codec
    pub const CODEC_PARSE_MODE: &str = "CORPUS_CODEC_PARSE_MODE";
    pub const CODEC_LOG_REJECTED: &str = "CORPUS_CODEC_LOG_REJECTED";

    // Stream
    pub const STREAM_SORT_TERMS: &str = "CORPUS_STREAM_SORT_TERMS";
    pub const STREAM_SKIP_MALFORMED: &str = "CORPUS_STREAM_SKIP_MALFORMED";

    // Highlight
    pub const HIGHLIGHT_LOG_IMBALANCE: &str = "CORPUS_HIGHLIGHT_LOG_IMBALANCE";

    // Cache
    pub const CACHE_DIRECTORY: &str = "CORPUS_CACHE_DIRECTORY";
    pub const CACHE_CAPACITY: &str = "CORPUS_CACHE_CAPACITY";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "CORPUS_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "CORPUS_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "CORPUS_LOGGING_MIN_LEVEL";
    pub const LOGGING_INCLUDE_DOCUMENT_CONTEXT: &str = "CORPUS_LOGGING_INCLUDE_DOCUMENT_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("2"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_parse_mode_parsing() {
        assert_eq!(parse_mode_from_str("Strict"), Some(ParseMode::Strict));
        assert_eq!(parse_mode_from_str("lenient"), Some(ParseMode::Lenient));
        assert_eq!(parse_mode_from_str("sloppy"), None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [codec]
            parse_mode = "Lenient"

            [cache]
            capacity = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.codec.parse_mode, ParseMode::Lenient);
        assert_eq!(config.cache.capacity, 12);
        assert!(!config.cache.directory.as_os_str().is_empty());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = RuntimeConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(err.error_code(), codes::system::CONFIGURATION_ERROR);
    }

    #[test]
    fn test_env_var_names_exist() {
        assert!(!env_vars::CODEC_PARSE_MODE.is_empty());
        assert!(!env_vars::CACHE_CAPACITY.is_empty());
        assert!(!env_vars::LOGGING_MIN_LEVEL.is_empty());
    }
}
