//! Message pipeline: size limits, parsing, statistics and diagnostic logging

mod error;
mod result;
mod stats;

pub use error::PipelineError;
pub use result::PipelineResult;
pub use stats::ParseStats;

use crate::config::compile_time::parsing::{MAX_MESSAGE_SIZE, MAX_SEGMENTS_PER_MESSAGE};
use crate::config::runtime::{FileProcessorPreferences, ParserPreferences};
use crate::file_processor::FileProcessor;
use crate::logging;
use crate::parser::{message::split_segments, MessageParser, ParsedMessage};
use crate::registry::Grammar;
use crate::{log_debug, log_error, log_warning};
use std::path::Path;
use std::time::Instant;

/// Parse message text with default parser preferences
pub fn parse_message_text(grammar: &Grammar, text: &str) -> Result<PipelineResult, PipelineError> {
    parse_message_text_with_preferences(grammar, text, &ParserPreferences::default())
}

pub fn parse_message_text_with_preferences(
    grammar: &Grammar,
    text: &str,
    preferences: &ParserPreferences,
) -> Result<PipelineResult, PipelineError> {
    let start_time = Instant::now();

    check_limits(text, preferences)?;

    let message = MessageParser::with_preferences(grammar, preferences.clone()).parse(text);
    Ok(PipelineResult::new(message, start_time.elapsed()))
}

/// Read and parse one message file with default preferences
pub fn parse_message_file(
    grammar: &Grammar,
    path: impl AsRef<Path>,
) -> Result<PipelineResult, PipelineError> {
    parse_message_file_with_preferences(
        grammar,
        path,
        &ParserPreferences::default(),
        &FileProcessorPreferences::default(),
    )
}

/// Read and parse one message file. Runs under a logging file context for
/// `path` unless the caller already set one.
pub fn parse_message_file_with_preferences(
    grammar: &Grammar,
    path: impl AsRef<Path>,
    parser_preferences: &ParserPreferences,
    file_preferences: &FileProcessorPreferences,
) -> Result<PipelineResult, PipelineError> {
    let path = path.as_ref();
    let run = || -> Result<PipelineResult, PipelineError> {
        let display = path.display().to_string();
        log_debug!("Parsing message file", "file" => display.as_str());

        let file = FileProcessor::from_preferences(file_preferences).process_file(path)?;
        let result = parse_message_text_with_preferences(grammar, &file.source, parser_preferences)
            .inspect_err(|e| {
                log_error!(e.error_code(), &e.to_string(), "file" => display.as_str());
            })?
            .with_file_metadata(file.metadata);

        log_diagnostics(&result.message);
        result.log_success(&display);
        Ok(result)
    };

    match logging::get_current_file_context() {
        Some(_) => run(),
        None => logging::with_file_context(path.to_path_buf(), 0, run),
    }
}

fn check_limits(text: &str, preferences: &ParserPreferences) -> Result<(), PipelineError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(PipelineError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let count = split_segments(text, preferences.accept_line_feeds).len();
    if count > MAX_SEGMENTS_PER_MESSAGE {
        return Err(PipelineError::TooManySegments {
            count,
            max: MAX_SEGMENTS_PER_MESSAGE,
        });
    }

    Ok(())
}

/// Send the message-level diagnostics to the global logger: errors for the
/// fatal ones, warnings for the rest
fn log_diagnostics(message: &ParsedMessage) {
    let message_type = message.message_type.as_deref().unwrap_or("unknown");
    for diagnostic in message.status.fatal() {
        log_error!(diagnostic.code, &diagnostic.message, "message_type" => message_type);
    }
    for diagnostic in message.status.warnings() {
        log_warning!(diagnostic.code, &diagnostic.message, "message_type" => message_type);
    }
}
