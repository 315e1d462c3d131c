use super::stats::ParseStats;
use crate::diagnostics::Outcome;
use crate::file_processor::FileMetadata;
use crate::logging::codes;
use crate::parser::ParsedMessage;
use crate::log_success;
use std::time::Duration;

/// One parsed message with its statistics
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub message: ParsedMessage,
    pub stats: ParseStats,
    /// Present when the message came from a file
    pub file_metadata: Option<FileMetadata>,
    pub processing_duration: Duration,
}

impl PipelineResult {
    pub fn new(message: ParsedMessage, processing_duration: Duration) -> Self {
        let stats = ParseStats::from_message(&message);
        Self {
            message,
            stats,
            file_metadata: None,
            processing_duration,
        }
    }

    pub fn with_file_metadata(mut self, metadata: FileMetadata) -> Self {
        self.file_metadata = Some(metadata);
        self
    }

    pub fn outcome(&self) -> Outcome {
        self.message.outcome()
    }

    pub fn is_well_formed(&self) -> bool {
        self.message.status.is_well_formed()
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message.message_type.as_deref()
    }

    pub fn log_success(&self, source: &str) {
        log_success!(
            codes::success::MESSAGE_PARSED,
            "Message parsed",
            "source" => source,
            "message_type" => self.message_type().unwrap_or("unknown"),
            "outcome" => self.outcome(),
            "segments" => self.stats.segments,
            "diagnostics" => self.stats.diagnostics,
            "duration_ms" => format!("{:.2}", self.processing_duration.as_secs_f64() * 1000.0)
        );
    }
}
