//! # File Processor Module
//!
//! Reads grammar definition files and message files with validation against
//! the compile-time size limit.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hl7_engine::file_processor;
//!
//! let result = file_processor::process_file("messages/adt_a01.hl7")?;
//! println!("{} lines", result.metadata.line_count);
//! # Ok::<(), hl7_engine::file_processor::FileProcessorError>(())
//! ```

pub mod processor;

pub use processor::{FileMetadata, FileProcessingResult, FileProcessor, FileProcessorError};

use std::path::Path;

/// Process a file with default settings
pub fn process_file(file_path: impl AsRef<Path>) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::new().process_file(file_path)
}

/// Check if an error should halt processing
pub fn should_halt_on_error(error: &FileProcessorError) -> bool {
    error.requires_halt()
}
