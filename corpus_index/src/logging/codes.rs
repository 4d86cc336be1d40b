//! Consolidated event codes and classification system
//!
//! Single source of truth for all codes, their metadata, and classification functions.
//! This module combines code constants with their behavioral metadata in one place.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for error, warning and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Numeric part of the code (`E102` -> 102, `ERR003` -> 3)
    pub fn number(&self) -> u32 {
        self.0
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap_or(0)
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
    pub const CONFIGURATION_ERROR: Code = Code::new("ERR003");
}

/// Term codec error codes
pub mod codec {
    use super::Code;

    pub const EMPTY_TERM_TEXT: Code = Code::new("E101");
    pub const MALFORMED_OFFSET: Code = Code::new("E102");
    pub const INVERTED_OFFSET: Code = Code::new("E103");
    pub const OFFSET_OUT_OF_RANGE: Code = Code::new("E104");
    pub const MALFORMED_PAYLOAD: Code = Code::new("E105");
    pub const TERM_TOO_LONG: Code = Code::new("E106");
    pub const PAYLOAD_TOO_LARGE: Code = Code::new("E107");

    // Lenient mode keeps the term but drops the malformed part
    pub const LENIENT_FIELD_DROPPED: Code = Code::new("W101");
}

/// Token model error codes
pub mod token {
    use super::Code;

    pub const EMPTY_TOKEN: Code = Code::new("E201");
    pub const TOO_MANY_TERMS: Code = Code::new("E202");
}

/// Token stream error codes
pub mod stream {
    use super::Code;

    pub const STRAY_STREAM_TEXT: Code = Code::new("E301");
    pub const TOO_MANY_TOKENS: Code = Code::new("E302");
    pub const NO_TOKEN_FOR_META: Code = Code::new("E303");
    pub const LITERAL_TOO_LARGE: Code = Code::new("E304");

    pub const GROUP_SKIPPED: Code = Code::new("W301");
}

/// Highlight combination codes
pub mod highlight {
    use super::Code;

    pub const UNMATCHED_CLOSE: Code = Code::new("W401");
    pub const BALANCE_DEPTH_EXCEEDED: Code = Code::new("W402");
}

/// Virtual corpus cache error codes
pub mod cache {
    use super::Code;

    pub const INVALID_VC_ID: Code = Code::new("E501");
    pub const CACHE_IO_ERROR: Code = Code::new("E502");
    pub const CORRUPT_CACHE_ENTRY: Code = Code::new("E503");
    pub const MANIFEST_ERROR: Code = Code::new("E504");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    // Codec and stream
    pub const TERM_PARSED: Code = Code::new("I010");
    pub const STREAM_PARSED: Code = Code::new("I020");
    pub const STREAM_DRAINED: Code = Code::new("I021");

    // Highlighting
    pub const HIGHLIGHT_COMBINED: Code = Code::new("I040");

    // Cache
    pub const CACHE_STORED: Code = Code::new("I050");
    pub const CACHE_RETRIEVED: Code = Code::new("I051");
    pub const CACHE_CLEANED: Code = Code::new("I052");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

/// Initialize and get the error registry
fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            // System errors
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Critical internal system error",
                "File a bug report with the failing input",
            ),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "System initialization failure",
                "Check logging configuration and initialization order",
            ),
            ErrorMetadata::new(
                "ERR003",
                "System",
                Severity::High,
                false,
                true,
                "Runtime configuration could not be loaded",
                "Check the configuration file path and TOML syntax",
            ),
            // Codec errors
            ErrorMetadata::new(
                "E101",
                "Codec",
                Severity::High,
                false,
                false,
                "Term literal has an empty surface text",
                "Remove the empty term from the annotation output",
            ),
            ErrorMetadata::new(
                "E102",
                "Codec",
                Severity::High,
                false,
                false,
                "Term offset segment is not of the form START-END",
                "Emit offsets as two non-negative integers separated by '-'",
            ),
            ErrorMetadata::new(
                "E103",
                "Codec",
                Severity::High,
                false,
                false,
                "Term start offset lies after its end offset",
                "Check the character offsets produced by the annotation tool",
            ),
            ErrorMetadata::new(
                "E104",
                "Codec",
                Severity::High,
                false,
                false,
                "Term offset does not fit the 32-bit offset field",
                "Split the document or reduce offsets below the configured maximum",
            ),
            ErrorMetadata::new(
                "E105",
                "Codec",
                Severity::High,
                false,
                false,
                "Typed payload value does not parse as its declared type",
                "Check <b>/<s>/<i>/<l> payload values against their numeric range",
            ),
            ErrorMetadata::new(
                "E106",
                "Codec",
                Severity::Medium,
                false,
                false,
                "Term surface text exceeds the maximum length",
                "Shorten the annotation value or raise max_term_text_length",
            ),
            ErrorMetadata::new(
                "E107",
                "Codec",
                Severity::Medium,
                false,
                false,
                "Term payload exceeds the maximum size",
                "Reduce the payload or raise max_payload_size",
            ),
            ErrorMetadata::new(
                "W101",
                "Codec",
                Severity::Low,
                true,
                false,
                "Lenient parsing dropped a malformed offset or payload",
                "Switch to strict parsing to reject the document instead",
            ),
            // Token errors
            ErrorMetadata::new(
                "E201",
                "Token",
                Severity::High,
                false,
                false,
                "Token literal contains no terms",
                "Every token must carry at least one term",
            ),
            ErrorMetadata::new(
                "E202",
                "Token",
                Severity::Medium,
                false,
                false,
                "Token exceeds the maximum number of terms",
                "Reduce the annotations per position or raise max_terms_per_token",
            ),
            // Stream errors
            ErrorMetadata::new(
                "E301",
                "Stream",
                Severity::High,
                false,
                false,
                "Stream literal contains text outside of bracket groups",
                "Concatenate [..] groups without separators",
            ),
            ErrorMetadata::new(
                "E302",
                "Stream",
                Severity::Medium,
                false,
                true,
                "Stream exceeds the maximum number of tokens",
                "Split the document or raise max_tokens_per_stream",
            ),
            ErrorMetadata::new(
                "E303",
                "Stream",
                Severity::Medium,
                true,
                false,
                "Metadata requires at least one token in the stream",
                "Add tokens before attaching metadata",
            ),
            ErrorMetadata::new(
                "E304",
                "Stream",
                Severity::Medium,
                false,
                true,
                "Stream literal exceeds the maximum size",
                "Split the document or raise max_literal_size",
            ),
            ErrorMetadata::new(
                "W301",
                "Stream",
                Severity::Low,
                true,
                false,
                "Malformed bracket group skipped",
                "Inspect the skipped group in the annotation output",
            ),
            // Highlight warnings
            ErrorMetadata::new(
                "W401",
                "Highlight",
                Severity::Low,
                true,
                false,
                "Close event without a matching open highlight class",
                "Check the highlight spans reported by the search layer",
            ),
            ErrorMetadata::new(
                "W402",
                "Highlight",
                Severity::Low,
                true,
                false,
                "Highlight nesting exceeds the maximum balance depth",
                "Reduce the number of overlapping highlight classes",
            ),
            // Cache errors
            ErrorMetadata::new(
                "E501",
                "Cache",
                Severity::Medium,
                false,
                false,
                "Virtual corpus id is not a valid cache key",
                "Use ids made of letters, digits, '_', '.', ':' and '-'",
            ),
            ErrorMetadata::new(
                "E502",
                "Cache",
                Severity::High,
                true,
                false,
                "Cache directory could not be read or written",
                "Check permissions and free space of the cache directory",
            ),
            ErrorMetadata::new(
                "E503",
                "Cache",
                Severity::Medium,
                true,
                false,
                "Cached bit vector file is truncated or corrupt",
                "Delete the virtual corpus from the cache and recompute it",
            ),
            ErrorMetadata::new(
                "E504",
                "Cache",
                Severity::Medium,
                true,
                false,
                "Cache manifest could not be serialized or deserialized",
                "Delete the virtual corpus from the cache and recompute it",
            ),
            // Success codes
            ErrorMetadata::new(
                "I004",
                "System",
                Severity::Low,
                true,
                false,
                "Logging system initialized",
                "No action required",
            ),
            ErrorMetadata::new(
                "I010",
                "Codec",
                Severity::Low,
                true,
                false,
                "Term literal parsed",
                "No action required",
            ),
            ErrorMetadata::new(
                "I020",
                "Stream",
                Severity::Low,
                true,
                false,
                "Stream literal parsed",
                "No action required",
            ),
            ErrorMetadata::new(
                "I021",
                "Stream",
                Severity::Low,
                true,
                false,
                "Stream drained by consumer",
                "No action required",
            ),
            ErrorMetadata::new(
                "I040",
                "Highlight",
                Severity::Low,
                true,
                false,
                "Highlight events combined into a nested structure",
                "No action required",
            ),
            ErrorMetadata::new(
                "I050",
                "Cache",
                Severity::Low,
                true,
                false,
                "Virtual corpus leaf stored",
                "No action required",
            ),
            ErrorMetadata::new(
                "I051",
                "Cache",
                Severity::Low,
                true,
                false,
                "Virtual corpus retrieved",
                "No action required",
            ),
            ErrorMetadata::new(
                "I052",
                "Cache",
                Severity::Low,
                true,
                false,
                "Stale virtual corpus leaves removed",
                "No action required",
            ),
        ];

        entries
            .into_iter()
            .map(|metadata| (metadata.code, metadata))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get category from code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_number() {
        assert_eq!(codec::MALFORMED_OFFSET.number(), 102);
        assert_eq!(system::CONFIGURATION_ERROR.number(), 3);
        assert_eq!(highlight::UNMATCHED_CLOSE.number(), 401);
    }

    #[test]
    fn test_every_constant_is_registered() {
        let all = [
            system::INTERNAL_ERROR,
            system::INITIALIZATION_FAILURE,
            system::CONFIGURATION_ERROR,
            codec::EMPTY_TERM_TEXT,
            codec::MALFORMED_OFFSET,
            codec::INVERTED_OFFSET,
            codec::OFFSET_OUT_OF_RANGE,
            codec::MALFORMED_PAYLOAD,
            codec::TERM_TOO_LONG,
            codec::PAYLOAD_TOO_LARGE,
            codec::LENIENT_FIELD_DROPPED,
            token::EMPTY_TOKEN,
            token::TOO_MANY_TERMS,
            stream::STRAY_STREAM_TEXT,
            stream::TOO_MANY_TOKENS,
            stream::NO_TOKEN_FOR_META,
            stream::LITERAL_TOO_LARGE,
            stream::GROUP_SKIPPED,
            highlight::UNMATCHED_CLOSE,
            highlight::BALANCE_DEPTH_EXCEEDED,
            cache::INVALID_VC_ID,
            cache::CACHE_IO_ERROR,
            cache::CORRUPT_CACHE_ENTRY,
            cache::MANIFEST_ERROR,
            success::SYSTEM_INITIALIZATION_COMPLETED,
            success::TERM_PARSED,
            success::STREAM_PARSED,
            success::STREAM_DRAINED,
            success::HIGHLIGHT_COMBINED,
            success::CACHE_STORED,
            success::CACHE_RETRIEVED,
            success::CACHE_CLEANED,
        ];

        for code in all {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(get_category("E102"), "Codec");
        assert_eq!(get_severity("ERR001"), Severity::Critical);
        assert!(requires_halt("ERR001"));
        assert!(is_recoverable("W401"));
        assert_eq!(get_description("X999"), "Unknown error");
        assert_eq!(get_action("X999"), "No specific action available");
    }
}
