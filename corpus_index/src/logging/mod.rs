//! Global logging module for the corpus index
//!
//! Provides thread-safe global logging with per-document event collection
//! and a macro interface. Until one of the init functions is called every
//! macro is a no-op, so library users who never initialize logging pay
//! nothing for it.

pub mod codes;
pub mod collector;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use collector::{DocumentContext, ErrorCollector, ProcessingSummary};
pub use events::{LogEvent, LogLevel};
#[cfg(feature = "log-facade")]
pub use service::FacadeLogger;
pub use service::{
    ConsoleLogger, Logger, LoggingService, MemoryLogger, MultiLogger, StructuredLogger,
};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();
static GLOBAL_ERROR_COLLECTOR: OnceLock<Arc<ErrorCollector>> = OnceLock::new();

thread_local! {
    static DOCUMENT_CONTEXT: RefCell<Option<DocumentContext>> = const { RefCell::new(None) };
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging from the runtime logging preferences
pub fn init_global_logging() -> Result<(), String> {
    init_global_logging_with_service(Arc::new(service::create_configured_service()))
}

/// Initialize with a caller-built service
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    install_service(&GLOBAL_LOGGER, service.clone())?;

    // A second collector would split the batch report, keep the first one
    let _ = GLOBAL_ERROR_COLLECTOR.set(Arc::new(ErrorCollector::new()));

    service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));

    Ok(())
}

/// A second install is reported through the logger already in place
fn install_service(
    slot: &OnceLock<Arc<LoggingService>>,
    service: Arc<LoggingService>,
) -> Result<(), String> {
    slot.set(service).map_err(|_| {
        let message = "Global logger already initialized";
        if let Some(existing) = slot.get() {
            existing.log_error(codes::system::INITIALIZATION_FAILURE, message);
        }
        format!("[{}] {}", codes::system::INITIALIZATION_FAILURE, message)
    })
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

// ============================================================================
// GLOBAL ACCESS
// ============================================================================

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// Safe access to global error collector
pub fn try_get_global_error_collector() -> Option<&'static ErrorCollector> {
    GLOBAL_ERROR_COLLECTOR
        .get()
        .map(|collector| collector.as_ref())
}

/// Whether debug events would reach the global logger
pub fn debug_enabled() -> bool {
    try_get_global_logger().is_some_and(|logger| logger.should_log(LogLevel::Debug))
}

// ============================================================================
// DOCUMENT CONTEXT MANAGEMENT
// ============================================================================

/// Set document context for current thread
pub fn set_document_context(document_id: &str, ordinal: usize) {
    let context = DocumentContext::new(document_id, ordinal);

    if let Some(collector) = try_get_global_error_collector() {
        collector.record_document(&context);
    }

    DOCUMENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = Some(context);
    });
}

/// Clear document context for current thread
pub fn clear_document_context() {
    DOCUMENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = None;
    });
}

/// Run `f` with a document context; events raised inside are attributed to the document
pub fn with_document_context<F, R>(document_id: &str, ordinal: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    set_document_context(document_id, ordinal);
    let result = f();
    clear_document_context();
    result
}

pub fn get_current_document_context() -> Option<DocumentContext> {
    DOCUMENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn build_event(mut event: LogEvent, context: Vec<(&str, &str)>) -> LogEvent {
    event.message = config::truncate_message(&event.message).to_string();

    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if config::include_document_context() {
        if let Some(document) = get_current_document_context() {
            event = event.with_document(&document.document_id);
        }
    }

    event
}

fn dispatch(event: LogEvent) {
    if event.is_error() || event.is_warning() {
        if let (Some(document), Some(collector)) =
            (get_current_document_context(), try_get_global_error_collector())
        {
            collector.record_event(&document.document_id, event.clone());
        }
    }

    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

/// Used by `log_error!`
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(build_event(LogEvent::error(code, message), context));
}

/// Used by `log_warning!`
pub fn log_warning_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(build_event(LogEvent::warning_with_code(code, message), context));
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(build_event(LogEvent::success(code, message), context));
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(build_event(LogEvent::info(message), context));
}

/// Used by `log_debug!`
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(build_event(LogEvent::debug(message), context));
}

// ============================================================================
// BATCH REPORTING
// ============================================================================

pub fn get_processing_summary() -> ProcessingSummary {
    try_get_global_error_collector()
        .map(|collector| collector.get_summary())
        .unwrap_or_default()
}

pub fn get_document_errors(document_id: &str) -> Vec<LogEvent> {
    try_get_global_error_collector()
        .map(|collector| collector.get_document_errors(document_id))
        .unwrap_or_default()
}

/// Grouped error report, or `None` when logging was never initialized
pub fn processing_report() -> Option<String> {
    try_get_global_error_collector().map(collector::format_report)
}

pub fn clear_error_collection() {
    if let Some(collector) = try_get_global_error_collector() {
        collector.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_context_management() {
        assert!(get_current_document_context().is_none());

        set_document_context("doc-1", 1);
        let context = get_current_document_context();
        assert_eq!(context.map(|c| c.document_id), Some("doc-1".to_string()));

        clear_document_context();
        assert!(get_current_document_context().is_none());
    }

    #[test]
    fn test_with_document_context() {
        let result = with_document_context("doc-2", 2, || {
            let context = get_current_document_context();
            assert_eq!(context.map(|c| c.ordinal), Some(2));
            42
        });

        assert_eq!(result, 42);
        assert!(get_current_document_context().is_none());
    }

    #[test]
    fn test_second_install_is_reported() {
        let slot = OnceLock::new();
        let (multi, memory) = MultiLogger::new(LogLevel::Debug).with_memory();
        let first = Arc::new(LoggingService::new(Arc::new(multi), LogLevel::Debug));
        install_service(&slot, first).unwrap();

        let second = Arc::new(LoggingService::new(
            Arc::new(MemoryLogger::new()),
            LogLevel::Debug,
        ));
        let err = install_service(&slot, second).unwrap_err();

        assert!(err.starts_with("[ERR002]"));
        assert!(memory.has_event_with_code(codes::system::INITIALIZATION_FAILURE));
    }

    #[test]
    fn test_build_event_attaches_context() {
        let event = with_document_context("doc-3", 3, || {
            build_event(
                LogEvent::error(codes::codec::EMPTY_TERM_TEXT, "empty"),
                vec![("literal", "#0-1")],
            )
        });

        assert_eq!(event.context.get("literal"), Some(&"#0-1".to_string()));
        assert_eq!(event.document.as_deref(), Some("doc-3"));
    }
}
