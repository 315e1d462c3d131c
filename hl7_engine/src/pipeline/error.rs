use crate::file_processor::FileProcessorError;
use crate::logging::codes;

/// Pipeline processing errors. Parse problems inside a message are
/// diagnostics on the parse tree, never pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Message has too many segments: {count} (max: {max})")]
    TooManySegments { count: usize, max: usize },
}

impl PipelineError {
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::FileProcessing(e) => e.error_code(),
            Self::MessageTooLarge { .. } | Self::TooManySegments { .. } => {
                codes::parsing::MESSAGE_TOO_LARGE
            }
        }
    }
}
