//! File processor for grammar definition files and message files

use crate::config::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success};
use std::fs;
use std::path::{Path, PathBuf};

/// File processor specific errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File is empty: {path}")]
    EmptyFile { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid UTF-8 encoding in file: {path}")]
    InvalidEncoding { path: String },

    #[error("I/O error reading file: {message}")]
    IoError { message: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },
}

impl FileProcessorError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            FileProcessorError::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            FileProcessorError::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            FileProcessorError::EmptyFile { .. } => codes::file_processing::EMPTY_FILE,
            FileProcessorError::PermissionDenied { .. } => {
                codes::file_processing::PERMISSION_DENIED
            }
            FileProcessorError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            FileProcessorError::IoError { .. } => codes::file_processing::IO_ERROR,
            FileProcessorError::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
        }
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }

    fn from_io(path: &Path, error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FileProcessorError::FileNotFound {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => FileProcessorError::PermissionDenied {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::InvalidData => FileProcessorError::InvalidEncoding {
                path: path.display().to_string(),
            },
            _ => FileProcessorError::IoError {
                message: format!("{}: {}", path.display(), error),
            },
        }
    }
}

/// File metadata collected during processing
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Canonical file path
    pub path: PathBuf,
    pub size: u64,
    /// Lowercased extension, if any
    pub extension: Option<String>,
    /// Lines separated by carriage returns, line feeds, or both
    pub line_count: usize,
    pub modified: Option<std::time::SystemTime>,
}

impl FileMetadata {
    pub fn human_readable_size(&self) -> String {
        human_readable(self.size)
    }

    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension
            .as_deref()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

fn human_readable(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut scaled = size as f64;
    let mut unit_index = 0;

    while scaled >= 1024.0 && unit_index < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[unit_index])
    } else {
        format!("{:.2} {}", scaled, UNITS[unit_index])
    }
}

/// Count lines the way message files are written in practice: `\r`, `\n`
/// and `\r\n` all terminate a line.
fn count_lines(content: &str) -> usize {
    content
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .count()
}

/// File contents plus metadata
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: std::time::Duration,
}

impl FileProcessingResult {
    pub fn char_count(&self) -> usize {
        self.source.chars().count()
    }

    pub fn is_effectively_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Characters per millisecond
    pub fn processing_rate(&self) -> f64 {
        let duration_ms = self.processing_duration.as_secs_f64() * 1000.0;
        if duration_ms > 0.0 {
            self.char_count() as f64 / duration_ms
        } else {
            0.0
        }
    }
}

/// Reads definition and message files under the compile-time size limit
pub struct FileProcessor {
    pub enable_performance_logging: bool,
    pub reject_empty_files: bool,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            enable_performance_logging: true,
            reject_empty_files: true,
        }
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            enable_performance_logging: prefs.enable_performance_logging,
            reject_empty_files: prefs.reject_empty_files,
        }
    }

    pub fn with_performance_logging(mut self, enabled: bool) -> Self {
        self.enable_performance_logging = enabled;
        self
    }

    pub fn with_empty_files_rejected(mut self, rejected: bool) -> Self {
        self.reject_empty_files = rejected;
        self
    }

    pub fn max_file_size() -> u64 {
        MAX_FILE_SIZE
    }

    /// Read `file_path` and return its contents with metadata
    pub fn process_file(
        &self,
        file_path: impl AsRef<Path>,
    ) -> Result<FileProcessingResult, FileProcessorError> {
        let start_time = std::time::Instant::now();
        let display = file_path.as_ref().display().to_string();

        log_debug!("Starting file processing", "file" => display.as_str());

        let path = self.validate_path(file_path.as_ref(), &display)?;
        let mut metadata = self.get_metadata(&path)?;
        self.validate_file(&metadata, &display)?;
        let source = self.read_file(&path, &display)?;

        if self.reject_empty_files && source.trim().is_empty() {
            let error = FileProcessorError::EmptyFile {
                path: display.clone(),
            };
            log_error!(error.error_code(), "File contains only whitespace",
                "file" => display.as_str());
            return Err(error);
        }

        metadata.line_count = count_lines(&source);

        let result = FileProcessingResult {
            source,
            metadata,
            processing_duration: start_time.elapsed(),
        };

        self.log_processing_success(&result, &display);
        Ok(result)
    }

    fn log_processing_success(&self, result: &FileProcessingResult, file_path: &str) {
        let size_str = result.metadata.size.to_string();
        let lines_str = result.metadata.line_count.to_string();
        let duration_str = format!("{:.2}", result.processing_duration.as_secs_f64() * 1000.0);

        if self.enable_performance_logging {
            let rate_str = format!("{:.2}", result.processing_rate());
            let human_size = result.metadata.human_readable_size();
            let is_large_str = result.metadata.is_large_file().to_string();
            log_success!(
                codes::success::FILE_PROCESSING_SUCCESS,
                "File processed successfully with performance metrics",
                "file" => file_path,
                "size_bytes" => size_str.as_str(),
                "size_human" => human_size.as_str(),
                "lines" => lines_str.as_str(),
                "duration_ms" => duration_str.as_str(),
                "chars_per_ms" => rate_str.as_str(),
                "is_large_file" => is_large_str.as_str()
            );
        } else {
            log_success!(
                codes::success::FILE_PROCESSING_SUCCESS,
                "File processed successfully",
                "file" => file_path,
                "size_bytes" => size_str.as_str(),
                "lines" => lines_str.as_str()
            );
        }
    }

    fn validate_path(&self, path: &Path, display: &str) -> Result<PathBuf, FileProcessorError> {
        if path.as_os_str().is_empty() {
            let error = FileProcessorError::InvalidPath {
                path: display.to_string(),
            };
            log_error!(error.error_code(), "Empty file path provided");
            return Err(error);
        }

        if !path.exists() {
            let error = FileProcessorError::FileNotFound {
                path: display.to_string(),
            };
            log_error!(error.error_code(), "File not found", "path" => display);
            return Err(error);
        }

        if !path.is_file() {
            let error = FileProcessorError::InvalidPath {
                path: display.to_string(),
            };
            log_error!(error.error_code(), "Path is not a file", "path" => display);
            return Err(error);
        }

        path.canonicalize().map_err(|e| {
            let error = FileProcessorError::from_io(path, &e);
            let io_error_str = e.to_string();
            log_error!(error.error_code(), "Failed to canonicalize path",
                "path" => display,
                "io_error" => io_error_str.as_str());
            error
        })
    }

    fn get_metadata(&self, path: &Path) -> Result<FileMetadata, FileProcessorError> {
        let metadata = fs::metadata(path).map_err(|e| {
            let error = FileProcessorError::from_io(path, &e);
            let path_str = path.display().to_string();
            let io_error_str = e.to_string();
            log_error!(error.error_code(), "Failed to read file metadata",
                "path" => path_str.as_str(),
                "io_error" => io_error_str.as_str());
            error
        })?;

        let file_metadata = FileMetadata {
            path: path.to_path_buf(),
            size: metadata.len(),
            extension: path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|s| s.to_lowercase()),
            line_count: 0,
            modified: metadata.modified().ok(),
        };

        let size_str = file_metadata.size.to_string();
        let ext_str = file_metadata.extension.as_deref().unwrap_or("none");
        log_debug!("File metadata collected",
            "size_bytes" => size_str.as_str(),
            "extension" => ext_str);

        Ok(file_metadata)
    }

    fn validate_file(&self, metadata: &FileMetadata, file_path: &str) -> Result<(), FileProcessorError> {
        if metadata.size > MAX_FILE_SIZE {
            let error = FileProcessorError::FileTooLarge {
                size: metadata.size,
                max_size: MAX_FILE_SIZE,
            };
            let human_size = metadata.human_readable_size();
            let human_limit = human_readable(MAX_FILE_SIZE);
            log_error!(error.error_code(), "File exceeds compile-time maximum size limit",
                "file" => file_path,
                "size_human" => human_size.as_str(),
                "limit_human" => human_limit.as_str());
            return Err(error);
        }

        if metadata.size == 0 && self.reject_empty_files {
            let error = FileProcessorError::EmptyFile {
                path: file_path.to_string(),
            };
            log_error!(error.error_code(), "File is empty", "file" => file_path);
            return Err(error);
        }

        Ok(())
    }

    fn read_file(&self, path: &Path, file_path: &str) -> Result<String, FileProcessorError> {
        fs::read_to_string(path).map_err(|e| {
            let error = FileProcessorError::from_io(path, &e);
            let io_error_str = e.to_string();
            log_error!(error.error_code(), "Failed to read file",
                "file" => file_path,
                "io_error" => io_error_str.as_str());
            error
        })
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_process_message_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("adt.hl7");
        let content = "MSH|^~\\&|||||||ADT^A01\rEVN|A01\r";
        fs::write(&file_path, content).unwrap();

        let result = FileProcessor::new().process_file(&file_path).unwrap();

        assert_eq!(result.source, content);
        assert_eq!(result.metadata.line_count, 2);
        assert!(result.metadata.has_extension("HL7"));
        assert_eq!(result.char_count(), content.chars().count());
    }

    #[test]
    fn test_line_count_mixed_terminators() {
        assert_eq!(count_lines("a\r\nb\nc\rd"), 4);
        assert_eq!(count_lines(""), 0);
    }

    #[test]
    fn test_file_not_found() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(dir.path().join("missing.hl7"));
        assert_matches!(result, Err(FileProcessorError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_invalid_path() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(dir.path());
        assert_matches!(result, Err(FileProcessorError::InvalidPath { .. }));
    }

    #[test]
    fn test_compile_time_file_size_limit() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("large.hl7");
        fs::write(&file_path, "a".repeat((MAX_FILE_SIZE + 1) as usize)).unwrap();

        let result = FileProcessor::new().process_file(&file_path);
        assert_matches!(
            result,
            Err(FileProcessorError::FileTooLarge { size, max_size })
                if size > MAX_FILE_SIZE && max_size == MAX_FILE_SIZE
        );
    }

    #[test]
    fn test_empty_files() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.json");
        let blank = dir.path().join("blank.json");
        fs::write(&empty, "").unwrap();
        fs::write(&blank, "  \n").unwrap();

        let strict = FileProcessor::new();
        assert_matches!(strict.process_file(&empty), Err(FileProcessorError::EmptyFile { .. }));
        assert_matches!(strict.process_file(&blank), Err(FileProcessorError::EmptyFile { .. }));

        let lenient = FileProcessor::new().with_empty_files_rejected(false);
        assert!(lenient.process_file(&empty).unwrap().is_effectively_empty());
    }

    #[test]
    fn test_invalid_utf8() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("latin1.hl7");
        fs::write(&file_path, [b'M', b'S', b'H', 0xff, 0xfe]).unwrap();

        let result = FileProcessor::new().process_file(&file_path);
        assert_matches!(result, Err(FileProcessorError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_error_classification() {
        let error = FileProcessorError::FileNotFound {
            path: "adt.hl7".to_string(),
        };
        assert_eq!(error.error_code().as_str(), "E005");
        assert_eq!(error.severity(), "High");
        assert!(!error.is_recoverable());

        let empty = FileProcessorError::EmptyFile {
            path: "adt.hl7".to_string(),
        };
        assert!(empty.is_recoverable());
    }

    #[test]
    fn test_from_preferences() {
        let prefs = FileProcessorPreferences {
            enable_performance_logging: false,
            reject_empty_files: false,
        };
        let processor = FileProcessor::from_preferences(&prefs);
        assert!(!processor.enable_performance_logging);
        assert!(!processor.reject_empty_files);
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable(512), "512 B");
        assert_eq!(human_readable(2048), "2.00 KB");
    }
}
