//! Per-file event collection with cargo-style output
//!
//! Grammar definition files and message files both report through here, so a
//! run over a version directory and a batch of messages ends in one summary.

use super::events::LogEvent;
use crate::config::compile_time::logging::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

// ============================================================================
// FILE PROCESSING CONTEXT
// ============================================================================

/// Context information for file processing
#[derive(Debug, Clone)]
pub struct FileProcessingContext {
    pub file_path: PathBuf,
    pub file_id: usize,
    pub start_time: Instant,
}

impl FileProcessingContext {
    pub fn new(file_path: PathBuf, file_id: usize) -> Self {
        Self {
            file_path,
            file_id,
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

/// Summary of collected results
#[derive(Debug, Clone, Default)]
pub struct ProcessingSummary {
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub files_with_warnings: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_processing_time: Duration,
    pub average_file_time: Duration,
}

impl ProcessingSummary {
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }
}

// ============================================================================
// ERROR COLLECTOR
// ============================================================================

/// Thread-safe event collector keyed by file
pub struct ErrorCollector {
    file_events: Mutex<BTreeMap<PathBuf, Vec<LogEvent>>>,
    file_contexts: Mutex<BTreeMap<PathBuf, FileProcessingContext>>,
    processing_start: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self {
            file_events: Mutex::new(BTreeMap::new()),
            file_contexts: Mutex::new(BTreeMap::new()),
            processing_start: Instant::now(),
        }
    }

    /// Record an event for a specific file. Files beyond `MAX_ERROR_COLLECTION`
    /// and events beyond `MAX_LOG_EVENTS_PER_FILE` are dropped; the first
    /// dropped event of a file is replaced by one overflow warning.
    pub fn record_event(&self, file_path: &Path, event: LogEvent) {
        let mut events = lock(&self.file_events);

        if !events.contains_key(file_path) && events.len() >= MAX_ERROR_COLLECTION {
            return;
        }

        let file_events = events.entry(file_path.to_path_buf()).or_default();

        if file_events.len() < MAX_LOG_EVENTS_PER_FILE {
            file_events.push(event);
        } else if file_events.len() == MAX_LOG_EVENTS_PER_FILE {
            file_events.push(LogEvent::warning(&format!(
                "Too many events for file (limit: {})",
                MAX_LOG_EVENTS_PER_FILE
            )));
        }
    }

    pub fn record_file_context(&self, context: FileProcessingContext) {
        lock(&self.file_contexts).insert(context.file_path.clone(), context);
    }

    pub fn get_all_file_events(&self) -> BTreeMap<PathBuf, Vec<LogEvent>> {
        lock(&self.file_events).clone()
    }

    pub fn get_summary(&self) -> ProcessingSummary {
        let events = lock(&self.file_events);
        let contexts = lock(&self.file_contexts);

        let mut summary = ProcessingSummary {
            total_files: events.len(),
            total_processing_time: self.processing_start.elapsed(),
            ..Default::default()
        };

        let mut total_file_time = Duration::ZERO;
        let mut file_count_with_timing = 0u32;

        for (file_path, file_events) in events.iter() {
            let errors = file_events.iter().filter(|e| e.is_error()).count();
            let warnings = file_events.iter().filter(|e| e.is_warning()).count();

            if errors > 0 {
                summary.failed_files += 1;
            } else if warnings > 0 {
                summary.files_with_warnings += 1;
            } else {
                summary.successful_files += 1;
            }
            summary.total_errors += errors;
            summary.total_warnings += warnings;

            if let Some(context) = contexts.get(file_path) {
                total_file_time += context.elapsed();
                file_count_with_timing += 1;
            }
        }

        if file_count_with_timing > 0 {
            summary.average_file_time = total_file_time / file_count_with_timing;
        }

        summary
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CARGO-STYLE FORMATTING
// ============================================================================

fn location(file_path: &Path, event: &LogEvent) -> String {
    event
        .span
        .as_ref()
        .map(|s| {
            format!(
                " --> {}:{}:{}",
                file_path.display(),
                s.start.line,
                s.start.column
            )
        })
        .unwrap_or_default()
}

fn push_context(output: &mut String, event: &LogEvent) {
    let mut keys: Vec<_> = event
        .context
        .keys()
        .filter(|k| k.as_str() != "file" && k.as_str() != "file_id")
        .collect();
    keys.sort();
    for key in keys {
        output.push_str(&format!("  = {}: {}\n", key, event.context[key]));
    }
}

/// Format errors in cargo-style output
pub fn format_cargo_style_errors(collector: &ErrorCollector) -> String {
    let mut output = String::new();

    for (file_path, events) in &collector.get_all_file_events() {
        let error_events: Vec<_> = events.iter().filter(|e| e.is_error()).collect();
        let warning_events: Vec<_> = events.iter().filter(|e| e.is_warning()).collect();

        if error_events.is_empty() && warning_events.is_empty() {
            continue;
        }

        output.push_str(&format!("Checking {}...\n", file_path.display()));

        for event in error_events {
            output.push_str(&format!(
                "error[{}]: {}{}\n",
                event.code.as_str(),
                event.message,
                location(file_path, event)
            ));
            output.push_str(&format!(
                "  = severity: {}, category: {}\n",
                event.severity(),
                event.category()
            ));
            push_context(&mut output, event);

            let action = event.recommended_action();
            if action != "No specific action available" {
                output.push_str(&format!("  = help: {}\n", action));
            }
        }

        for event in warning_events {
            output.push_str(&format!(
                "warning[{}]: {}{}\n",
                event.code.as_str(),
                event.message,
                location(file_path, event)
            ));
            push_context(&mut output, event);
        }

        output.push('\n');
    }

    let summary = collector.get_summary();

    if summary.total_errors > 0 {
        output.push_str(&format!("\nTotal errors: {}\n", summary.total_errors));
    }
    if summary.total_warnings > 0 {
        output.push_str(&format!("Total warnings: {}\n", summary.total_warnings));
    }
    if summary.has_errors() || summary.total_warnings > 0 {
        output.push_str(&format!(
            "Finished in {:.2?} ({:.2?} per reporting file)\n",
            summary.total_processing_time, summary.average_file_time
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;
    use crate::utils::{Position, Span};

    #[test]
    fn test_error_collector_basic() {
        let collector = ErrorCollector::new();
        let file_path = PathBuf::from("adt_a01.hl7");

        collector.record_event(
            &file_path,
            LogEvent::error(codes::parsing::MISSING_HEADER, "Message must begin with MSH."),
        );

        collector.record_event(
            &file_path,
            LogEvent::warning_with_code(codes::parsing::EXCESS_FIELDS, "Excess fields"),
        );

        let events = collector.get_all_file_events().remove(&file_path).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_error());
        assert!(events[1].is_warning());
    }

    #[test]
    fn test_processing_summary() {
        let collector = ErrorCollector::new();
        let file1 = PathBuf::from("segments.json");
        let file2 = PathBuf::from("adt_a01.hl7");
        let file3 = PathBuf::from("adt_a04.hl7");

        collector.record_event(
            &file1,
            LogEvent::error(codes::grammar::REDEFINITION, "Redefinition"),
        );
        collector.record_event(
            &file2,
            LogEvent::warning_with_code(codes::parsing::EXCESS_FIELDS, "Excess"),
        );
        collector.record_event(
            &file3,
            LogEvent::success(codes::success::MESSAGE_PARSED, "Parsed"),
        );

        let summary = collector.get_summary();
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.failed_files, 1);
        assert_eq!(summary.files_with_warnings, 1);
        assert_eq!(summary.successful_files, 1);
        assert!(summary.has_errors());
    }

    #[test]
    fn test_per_file_event_limit() {
        let collector = ErrorCollector::new();
        let file_path = PathBuf::from("flood.hl7");

        for _ in 0..MAX_LOG_EVENTS_PER_FILE + 5 {
            collector.record_event(
                &file_path,
                LogEvent::error(codes::parsing::UNKNOWN_SEGMENT, "Unknown segment"),
            );
        }

        let events = collector.get_all_file_events().remove(&file_path).unwrap();
        assert_eq!(events.len(), MAX_LOG_EVENTS_PER_FILE + 1);
        assert!(events.last().unwrap().is_warning());
    }

    #[test]
    fn test_cargo_style_output() {
        let collector = ErrorCollector::new();
        let file_path = PathBuf::from("adt_a01.hl7");

        collector.record_event(
            &file_path,
            LogEvent::error(codes::parsing::UNKNOWN_SEGMENT, "Unknown segment 'ZZZ'.")
                .with_span(Span::at(Position::new(40, 3, 1), 3))
                .with_context("segment", "ZZZ"),
        );

        let output = format_cargo_style_errors(&collector);
        assert!(output.contains("Checking adt_a01.hl7..."));
        assert!(output.contains("error[P006]: Unknown segment 'ZZZ'. --> adt_a01.hl7:3:1"));
        assert!(output.contains("  = segment: ZZZ"));
        assert!(output.contains("Total errors: 1"));
    }
}
