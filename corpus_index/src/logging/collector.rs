//! Per-document event collection for batch indexing
//!
//! Events raised while a document context is active are grouped by document
//! id so a batch run can report which documents were rejected and why.

use super::events::LogEvent;
use crate::config::compile_time::logging::MAX_LOG_EVENTS_PER_DOCUMENT;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

// ============================================================================
// DOCUMENT CONTEXT
// ============================================================================

/// Document currently being analyzed on this thread
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub document_id: String,
    pub ordinal: usize,
    pub start_time: Instant,
}

impl DocumentContext {
    pub fn new(document_id: impl Into<String>, ordinal: usize) -> Self {
        Self {
            document_id: document_id.into(),
            ordinal,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// ============================================================================
// PROCESSING SUMMARY
// ============================================================================

/// Summary of a batch run
#[derive(Debug, Clone, Default)]
pub struct ProcessingSummary {
    pub total_documents: usize,
    pub clean_documents: usize,
    pub failed_documents: usize,
    pub documents_with_warnings: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_processing_time: Duration,
}

impl ProcessingSummary {
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.total_warnings > 0
    }
}

// ============================================================================
// ERROR COLLECTOR
// ============================================================================

/// Thread-safe event collector keyed by document id
pub struct ErrorCollector {
    document_events: Mutex<BTreeMap<String, Vec<LogEvent>>>,
    processing_start: Instant,
    max_events_per_document: usize,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::with_limit(MAX_LOG_EVENTS_PER_DOCUMENT)
    }

    pub fn with_limit(max_events_per_document: usize) -> Self {
        Self {
            document_events: Mutex::new(BTreeMap::new()),
            processing_start: Instant::now(),
            max_events_per_document,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<LogEvent>>> {
        self.document_events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a document so clean documents show up in the summary
    pub fn record_document(&self, context: &DocumentContext) {
        self.lock().entry(context.document_id.clone()).or_default();
    }

    /// Record an event for a document; past the limit a single overflow warning is kept
    pub fn record_event(&self, document_id: &str, event: LogEvent) {
        let mut documents = self.lock();
        let events = documents.entry(document_id.to_string()).or_default();

        if events.len() < self.max_events_per_document {
            events.push(event);
        } else if events.len() == self.max_events_per_document {
            events.push(LogEvent::warning(&format!(
                "Too many events for document (limit: {})",
                self.max_events_per_document
            )));
        }
    }

    pub fn get_document_events(&self, document_id: &str) -> Vec<LogEvent> {
        self.lock().get(document_id).cloned().unwrap_or_default()
    }

    pub fn get_document_errors(&self, document_id: &str) -> Vec<LogEvent> {
        self.lock()
            .get(document_id)
            .map(|events| events.iter().filter(|e| e.is_error()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn document_has_errors(&self, document_id: &str) -> bool {
        self.lock()
            .get(document_id)
            .is_some_and(|events| events.iter().any(|e| e.is_error()))
    }

    pub fn get_summary(&self) -> ProcessingSummary {
        let documents = self.lock();

        let mut summary = ProcessingSummary {
            total_documents: documents.len(),
            total_processing_time: self.processing_start.elapsed(),
            ..ProcessingSummary::default()
        };

        for events in documents.values() {
            let errors = events.iter().filter(|e| e.is_error()).count();
            let warnings = events.iter().filter(|e| e.is_warning()).count();

            if errors > 0 {
                summary.failed_documents += 1;
            } else if warnings > 0 {
                summary.documents_with_warnings += 1;
            } else {
                summary.clean_documents += 1;
            }

            summary.total_errors += errors;
            summary.total_warnings += warnings;
        }

        summary
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the collected errors and warnings grouped per document
pub fn format_report(collector: &ErrorCollector) -> String {
    let documents = collector.lock().clone();
    let mut output = String::new();

    for (document_id, events) in &documents {
        for event in events.iter().filter(|e| e.is_error() || e.is_warning()) {
            let kind = if event.is_error() { "error" } else { "warning" };
            output.push_str(&format!(
                "{}[{}]: {}\n  --> {}\n",
                kind, event.code, event.message, document_id
            ));
        }
    }

    let summary = collector.get_summary();
    output.push_str(&format!(
        "{} documents: {} clean, {} with warnings, {} failed ({} errors, {} warnings)",
        summary.total_documents,
        summary.clean_documents,
        summary.documents_with_warnings,
        summary.failed_documents,
        summary.total_errors,
        summary.total_warnings
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_summary_classifies_documents() {
        let collector = ErrorCollector::new();

        collector.record_document(&DocumentContext::new("clean", 0));
        collector.record_event(
            "broken",
            LogEvent::error(codes::stream::STRAY_STREAM_TEXT, "stray text"),
        );
        collector.record_event(
            "noisy",
            LogEvent::warning_with_code(codes::stream::GROUP_SKIPPED, "skipped"),
        );

        let summary = collector.get_summary();
        assert_eq!(summary.total_documents, 3);
        assert_eq!(summary.clean_documents, 1);
        assert_eq!(summary.failed_documents, 1);
        assert_eq!(summary.documents_with_warnings, 1);
        assert!(collector.document_has_errors("broken"));
        assert!(!collector.document_has_errors("noisy"));
    }

    #[test]
    fn test_event_limit() {
        let collector = ErrorCollector::with_limit(2);
        for i in 0..5 {
            collector.record_event("doc", LogEvent::info(&format!("event {}", i)));
        }

        let events = collector.get_document_events("doc");
        assert_eq!(events.len(), 3);
        assert!(events[2].is_warning());
    }

    #[test]
    fn test_report_format() {
        let collector = ErrorCollector::new();
        collector.record_event(
            "doc-7",
            LogEvent::error(codes::codec::INVERTED_OFFSET, "start after end"),
        );

        let report = format_report(&collector);
        assert!(report.contains("error[E103]: start after end"));
        assert!(report.contains("--> doc-7"));
        assert!(report.ends_with("1 failed (1 errors, 0 warnings)"));
    }
}
