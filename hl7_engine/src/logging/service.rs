//! Logging service and logger backends

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use std::sync::{Arc, Mutex, MutexGuard};

pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Level filter in front of one logger backend
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    /// Backend and level chosen from the runtime logging preferences
    pub fn with_config() -> Self {
        let min_level = config::get_min_log_level();
        let logger: Arc<dyn Logger> = if !config::use_console_logging() {
            Arc::new(SilentLogger)
        } else if config::use_structured_logging() {
            Arc::new(StructuredLogger)
        } else {
            Arc::new(ConsoleLogger)
        };

        Self::new(logger, min_level)
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }
}

/// Used when console output is disabled
pub struct SilentLogger;

impl Logger for SilentLogger {
    fn log(&self, _event: &LogEvent) {}
}

/// One text line per event; errors go to stderr
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        match event.level {
            LogLevel::Error => eprintln!("{}", event.format()),
            _ => println!("{}", event.format()),
        }
    }
}

/// One JSON object per event, for log shippers
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        let output = event.format_json().unwrap_or_else(|_| event.format());
        match event.level {
            LogLevel::Error => eprintln!("{}", output),
            _ => println!("{}", output),
        }
    }
}

/// Keeps the most recent events in memory, bounded by the log buffer size
#[derive(Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned buffer still holds valid events
    fn lock_events(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.lock_events().clone()
    }

    pub fn event_count(&self) -> usize {
        self.lock_events().len()
    }

    pub fn events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.lock_events()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock_events().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock_events();

        let max_events = config::get_error_buffer_size();
        if events.len() >= max_events {
            let remove_count = events.len() - max_events + 1;
            events.drain(0..remove_count);
        }

        events.push(event.clone());
    }
}

pub fn create_configured_service() -> LoggingService {
    LoggingService::with_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_memory_logger() {
        let logger = MemoryLogger::new();

        logger.log(&LogEvent::info("Loading version 2.3"));
        logger.log(&LogEvent::error(
            codes::grammar::UNRESOLVED_REFERENCE,
            "'EVN.1 - Event Type Code' specifies type ID, which does not exist.",
        ));

        assert_eq!(logger.event_count(), 2);
        assert_eq!(
            logger
                .events_with_code(codes::grammar::UNRESOLVED_REFERENCE)
                .len(),
            1
        );

        logger.clear();
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_level_filtering() {
        let logger = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(logger.clone(), LogLevel::Warning);

        service.log_event(LogEvent::debug("Fitting ADT A01.2"));
        service.log_event(LogEvent::info("Loading version 2.3"));
        service.log_event(LogEvent::warning_with_code(
            codes::parsing::EXCESS_FIELDS,
            "Excess fields",
        ));
        service.log_event(LogEvent::error(codes::parsing::UNKNOWN_SEGMENT, "ZZZ"));

        let levels: Vec<_> = logger.events().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Error]);
    }

    #[test]
    fn test_context_is_kept() {
        let logger = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(logger.clone(), LogLevel::Debug);

        service.log_event(
            LogEvent::success(codes::success::DEFINITIONS_CONSUMED, "Consumed")
                .with_context("entities", "42"),
        );

        let events = logger.events();
        assert_eq!(events[0].context.get("entities"), Some(&"42".to_string()));
    }
}
