//! Configuration module for logging
//!
//! Buffer limits come from the generated compile-time constants, output
//! choices from the runtime logging preferences.

use crate::config::compile_time::logging::*;
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;

// ============================================================================
// RUNTIME PREFERENCES STORAGE
// ============================================================================

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Initialize runtime preferences
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Runtime preferences already initialized")?;

    Ok(())
}

/// Get runtime preferences (with fallback to defaults)
fn get_runtime_preferences() -> LoggingPreferences {
    RUNTIME_PREFERENCES.get().cloned().unwrap_or_default()
}

// ============================================================================
// CONFIGURATION ACCESS FUNCTIONS
// ============================================================================

/// Get minimum log level
pub fn get_min_log_level() -> EventsLogLevel {
    get_runtime_preferences().min_log_level.to_events_log_level()
}

/// Check if structured logging is enabled
pub fn use_structured_logging() -> bool {
    get_runtime_preferences().use_structured_logging
}

/// Check if console logging is enabled
pub fn use_console_logging() -> bool {
    get_runtime_preferences().enable_console_logging
}

/// Check if events should carry the current document id
pub fn include_document_context() -> bool {
    get_runtime_preferences().include_document_context
}

/// Get in-memory event buffer size
pub fn get_error_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Get maximum collected errors per document
pub fn get_max_error_collection() -> usize {
    MAX_ERROR_COLLECTION
}

/// Get maximum log events per document
pub fn get_max_log_events_per_document() -> usize {
    MAX_LOG_EVENTS_PER_DOCUMENT
}

/// Get maximum log message length
pub fn get_max_message_length() -> usize {
    MAX_LOG_MESSAGE_LENGTH
}

/// Truncate a message to the configured maximum length on a char boundary
pub fn truncate_message(message: &str) -> &str {
    let max = get_max_message_length();
    if message.len() <= max {
        return message;
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_generated() {
        assert!(get_error_buffer_size() >= get_max_log_events_per_document());
        assert!(get_max_error_collection() > 0);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");

        let long = "é".repeat(get_max_message_length());
        let truncated = truncate_message(&long);
        assert!(truncated.len() <= get_max_message_length());
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
