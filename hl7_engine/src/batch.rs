//! Batch parsing of message directories
//!
//! Discovers message files in a directory and parses each against one shared,
//! immutable grammar, sequentially or on worker threads. Every file is parsed
//! under its own logging file context so the error collector can produce a
//! cargo-style summary afterwards.

use crate::config::compile_time::batch_processing::{
    MAX_FILES_PER_BATCH, MAX_WORKER_THREADS,
};
use crate::config::runtime::{BatchPreferences, FileProcessorPreferences, ParserPreferences};
use crate::logging::{self, codes};
use crate::pipeline::{self, PipelineError, PipelineResult};
use crate::registry::Grammar;
use crate::{log_debug, log_error, log_info, log_success, log_warning};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

/// Batch processing configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    /// Stop after the first file that fails to parse or parses malformed
    pub fail_fast: bool,
    /// Extensions, without the dot, that mark message files
    pub message_extensions: Vec<String>,
    pub parser: ParserPreferences,
    pub file_processor: FileProcessorPreferences,
}

impl BatchConfig {
    pub fn from_preferences(preferences: &BatchPreferences) -> Self {
        let available = thread::available_parallelism()
            .map(|n| n.get().min(8))
            .unwrap_or(4);
        Self {
            max_threads: preferences
                .threads
                .unwrap_or(available)
                .clamp(1, MAX_WORKER_THREADS),
            recursive: true,
            max_files: None,
            progress_reporting: false,
            fail_fast: false,
            message_extensions: preferences.message_extensions.clone(),
            parser: ParserPreferences::default(),
            file_processor: FileProcessorPreferences::default(),
        }
    }

    pub fn sequential(mut self) -> Self {
        self.max_threads = 1;
        self
    }

    fn is_message_file(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    self.message_extensions
                        .iter()
                        .any(|wanted| wanted.eq_ignore_ascii_case(ext))
                })
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_preferences(&BatchPreferences::default())
    }
}

/// Batch processing results, sorted by path
#[derive(Debug, Default)]
pub struct BatchResults {
    /// Files that were read and parsed, well-formed or not
    pub successful_files: Vec<(PathBuf, PipelineResult)>,
    /// Files the pipeline rejected before parsing
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    pub fn well_formed_count(&self) -> usize {
        self.successful_files
            .iter()
            .filter(|(_, result)| result.is_well_formed())
            .count()
    }

    pub fn malformed_count(&self) -> usize {
        self.success_count() - self.well_formed_count()
    }

    /// Share of processed files the pipeline accepted
    pub fn success_rate(&self) -> f64 {
        self.rate(self.success_count())
    }

    /// Share of processed files that parsed well-formed
    pub fn well_formed_rate(&self) -> f64 {
        self.rate(self.well_formed_count())
    }

    fn rate(&self, count: usize) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            count as f64 / self.files_processed as f64
        }
    }

    /// True when every processed file parsed well-formed
    pub fn all_well_formed(&self) -> bool {
        self.failed_files.is_empty() && self.malformed_count() == 0
    }

    pub fn add_success(&mut self, file_path: PathBuf, result: PipelineResult) {
        self.successful_files.push((file_path, result));
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    pub fn merge(&mut self, other: BatchResults) {
        self.successful_files.extend(other.successful_files);
        self.failed_files.extend(other.failed_files);
        self.files_processed += other.files_processed;
    }

    fn sort(&mut self) {
        self.successful_files.sort_by(|a, b| a.0.cmp(&b.0));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch parsing completed: {} files processed, {} well-formed ({:.1}%), {} malformed, {} failed, {:.2}s total",
            self.files_processed,
            self.well_formed_count(),
            self.well_formed_rate() * 100.0,
            self.malformed_count(),
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

/// Batch processing errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No message files found in directory: {path}")]
    NoFilesFound { path: String },

    #[error("Too many files found: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("IO error during directory traversal: {error}")]
    IoError { error: String },

    #[error("Worker thread error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    pub fn error_code(&self) -> codes::Code {
        match self {
            BatchError::DirectoryNotFound { .. } => codes::batch::DIRECTORY_NOT_FOUND,
            BatchError::NoFilesFound { .. } | BatchError::TooManyFiles { .. } => {
                codes::batch::NO_MESSAGE_FILES
            }
            BatchError::IoError { .. } => codes::file_processing::IO_ERROR,
            BatchError::ThreadError { .. } => codes::batch::WORKER_FAILURE,
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Discover message files in a directory, sorted by path
pub fn discover_message_files(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<Vec<PathBuf>, BatchError> {
    log_info!("Starting file discovery",
        "directory" => dir_path.display(),
        "recursive" => config.recursive
    );

    if !dir_path.is_dir() {
        let error = BatchError::DirectoryNotFound {
            path: dir_path.display().to_string(),
        };
        log_error!(error.error_code(), "Message directory not found",
            "directory" => dir_path.display()
        );
        return Err(error);
    }

    let mut files = Vec::new();
    visit_directory(dir_path, &mut files, config)?;

    if files.is_empty() {
        let error = BatchError::NoFilesFound {
            path: dir_path.display().to_string(),
        };
        log_error!(error.error_code(), "No message files found",
            "directory" => dir_path.display(),
            "extensions" => config.message_extensions.join(",")
        );
        return Err(error);
    }

    files.sort();

    if let Some(max_files) = config.max_files {
        if files.len() > max_files {
            log_warning!(codes::batch::NO_MESSAGE_FILES, "Reached maximum file limit",
                "files_found" => files.len(),
                "limit" => max_files
            );
            files.truncate(max_files);
        }
    }

    if files.len() > MAX_FILES_PER_BATCH {
        return Err(BatchError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES_PER_BATCH,
        });
    }

    log_success!(
        codes::success::FILE_VALIDATION_PASSED,
        "File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display()
    );

    Ok(files)
}

fn visit_directory(
    dir_path: &Path,
    files: &mut Vec<PathBuf>,
    config: &BatchConfig,
) -> Result<(), BatchError> {
    let entries = fs::read_dir(dir_path).map_err(|e| BatchError::IoError {
        error: format!("{}: {}", dir_path.display(), e),
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| BatchError::IoError {
                error: e.to_string(),
            })?
            .path();

        if path.is_dir() {
            if config.recursive {
                visit_directory(&path, files, config)?;
            }
        } else if config.is_message_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

/// Parse one file under its own file context and record the outcome.
/// Returns false when the file counts as a failure.
fn process_one(
    grammar: &Grammar,
    file_path: &Path,
    file_id: usize,
    config: &BatchConfig,
    results: &mut BatchResults,
) -> bool {
    logging::with_file_context(file_path.to_path_buf(), file_id, || {
        match pipeline::parse_message_file_with_preferences(
            grammar,
            file_path,
            &config.parser,
            &config.file_processor,
        ) {
            Ok(result) => {
                let well_formed = result.is_well_formed();
                results.add_success(file_path.to_path_buf(), result);
                well_formed
            }
            Err(error) => {
                log_error!(error.error_code(), "Message file could not be parsed",
                    "file" => file_path.display(),
                    "error" => &error
                );
                results.add_failure(file_path.to_path_buf(), error);
                false
            }
        }
    })
}

/// Parse `files` one after another
pub fn process_files_sequential(
    grammar: &Grammar,
    files: &[PathBuf],
    config: &BatchConfig,
) -> BatchResults {
    let mut results = BatchResults::new();

    for (file_id, file_path) in files.iter().enumerate() {
        if config.progress_reporting {
            println!(
                "Parsing file {} of {}: {}",
                file_id + 1,
                files.len(),
                file_path.display()
            );
        }

        let passed = process_one(grammar, file_path, file_id, config, &mut results);
        if !passed && config.fail_fast {
            log_warning!(codes::batch::WORKER_FAILURE, "Fail-fast mode enabled, stopping batch parsing",
                "file" => file_path.display()
            );
            break;
        }
    }

    results
}

/// Parse `files` on up to `config.max_threads` workers sharing `grammar`
pub fn process_files_parallel(
    grammar: &Arc<Grammar>,
    files: &[PathBuf],
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let mut results = BatchResults::new();
    let chunk_size = calculate_chunk_size(files.len(), config.max_threads);

    log_debug!("Parallel processing configuration",
        "total_files" => files.len(),
        "chunk_size" => chunk_size,
        "threads" => config.max_threads
    );

    for (chunk_index, chunk) in files.chunks(chunk_size).enumerate() {
        let chunk_results =
            process_chunk_parallel(grammar, chunk, chunk_index * chunk_size, config)?;
        let chunk_failed = chunk_results.failure_count() > 0
            || chunk_results
                .successful_files
                .iter()
                .any(|(_, result)| !result.is_well_formed());
        results.merge(chunk_results);

        if config.fail_fast && chunk_failed {
            log_warning!(codes::batch::WORKER_FAILURE, "Fail-fast mode enabled, stopping batch parsing");
            break;
        }
    }

    Ok(results)
}

fn lock(results: &Mutex<BatchResults>) -> MutexGuard<'_, BatchResults> {
    results.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn process_chunk_parallel(
    grammar: &Arc<Grammar>,
    files: &[PathBuf],
    first_file_id: usize,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let results = Arc::new(Mutex::new(BatchResults::new()));
    let threads = config.max_threads.max(1);
    let files_per_thread = files.len().div_ceil(threads);

    let mut handles = Vec::new();
    for (thread_id, thread_files) in files.chunks(files_per_thread.max(1)).enumerate() {
        let thread_files = thread_files.to_vec();
        let start_idx = first_file_id + thread_id * files_per_thread;
        let grammar = Arc::clone(grammar);
        let results = Arc::clone(&results);
        let config = config.clone();

        handles.push(thread::spawn(move || {
            let mut local = BatchResults::new();
            for (offset, file_path) in thread_files.iter().enumerate() {
                process_one(&grammar, file_path, start_idx + offset, &config, &mut local);
            }
            lock(&results).merge(local);
        }));
    }

    for handle in handles {
        handle.join().map_err(|_| {
            let error = BatchError::ThreadError {
                message: "Worker panicked during parsing".to_string(),
            };
            log_error!(error.error_code(), "Batch worker thread failed");
            error
        })?;
    }

    let results = Arc::try_unwrap(results).map_err(|_| BatchError::ThreadError {
        message: "Failed to collect results from workers".to_string(),
    })?;
    Ok(results
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner()))
}

fn calculate_chunk_size(file_count: usize, max_threads: usize) -> usize {
    const MIN_CHUNK_SIZE: usize = 1;
    const MAX_CHUNK_SIZE: usize = 50;

    file_count
        .div_ceil(max_threads.max(1))
        .clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Discover and parse every message file in `dir_path`
pub fn process_directory_with_config(
    grammar: Arc<Grammar>,
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();

    log_info!("Starting batch parsing",
        "directory" => dir_path.display(),
        "threads" => config.max_threads
    );

    let files = discover_message_files(dir_path, config)?;

    let mut results = if config.max_threads <= 1 {
        process_files_sequential(&grammar, &files, config)
    } else {
        process_files_parallel(&grammar, &files, config)?
    };
    results.files_discovered = files.len();
    results.processing_duration = start_time.elapsed();
    results.sort();

    log_success!(
        codes::success::BATCH_COMPLETED,
        "Batch parsing completed",
        "files_processed" => results.files_processed,
        "well_formed" => results.well_formed_count(),
        "malformed" => results.malformed_count(),
        "failed" => results.failure_count(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

/// Parse a directory with the default configuration
pub fn process_directory(grammar: Arc<Grammar>, dir_path: &Path) -> Result<BatchResults, BatchError> {
    process_directory_with_config(grammar, dir_path, &BatchConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::sample_grammar;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|2.3";

    fn admit(event: &str) -> String {
        format!("{}\rEVN|{}|20240101|20240102", HEADER, event)
    }

    fn config(threads: usize) -> BatchConfig {
        BatchConfig {
            max_threads: threads,
            message_extensions: vec!["hl7".to_string()],
            ..BatchConfig::default()
        }
    }

    fn write_messages(dir: &Path) {
        fs::create_dir(dir.join("nested")).unwrap();
        fs::write(dir.join("a.hl7"), admit("A01")).unwrap();
        fs::write(dir.join("b.hl7"), admit("A04")).unwrap();
        fs::write(dir.join("c.hl7"), "EVN|A01|1|2").unwrap();
        fs::write(dir.join("nested/d.hl7"), admit("A01")).unwrap();
        fs::write(dir.join("notes.md"), "not a message").unwrap();
    }

    #[test]
    fn test_file_discovery() {
        let dir = tempdir().unwrap();
        write_messages(dir.path());

        let files = discover_message_files(dir.path(), &config(1)).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));

        let flat = BatchConfig {
            recursive: false,
            ..config(1)
        };
        assert_eq!(discover_message_files(dir.path(), &flat).unwrap().len(), 3);

        let limited = BatchConfig {
            max_files: Some(2),
            ..config(1)
        };
        assert_eq!(discover_message_files(dir.path(), &limited).unwrap().len(), 2);
    }

    #[test]
    fn test_discovery_errors() {
        let dir = tempdir().unwrap();
        assert_matches!(
            discover_message_files(&dir.path().join("missing"), &config(1)),
            Err(BatchError::DirectoryNotFound { .. })
        );
        fs::write(dir.path().join("readme.txt"), "x").unwrap();
        let error = discover_message_files(dir.path(), &config(1)).unwrap_err();
        assert_matches!(error, BatchError::NoFilesFound { .. });
        assert_eq!(error.error_code(), codes::batch::NO_MESSAGE_FILES);
    }

    #[test]
    fn test_sequential_batch() {
        let dir = tempdir().unwrap();
        write_messages(dir.path());
        let grammar = Arc::new(sample_grammar());

        let results = process_directory_with_config(grammar, dir.path(), &config(1)).unwrap();
        assert_eq!(results.files_discovered, 4);
        assert_eq!(results.files_processed, 4);
        assert_eq!(results.success_count(), 4);
        assert_eq!(results.well_formed_count(), 3);
        assert_eq!(results.malformed_count(), 1);
        assert!((results.well_formed_rate() - 0.75).abs() < f64::EPSILON);
        assert!(!results.all_well_formed());
        assert!(results.summary().contains("1 malformed"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempdir().unwrap();
        write_messages(dir.path());
        let grammar = Arc::new(sample_grammar());

        let sequential =
            process_directory_with_config(Arc::clone(&grammar), dir.path(), &config(1)).unwrap();
        let parallel = process_directory_with_config(grammar, dir.path(), &config(3)).unwrap();

        let outcomes = |results: &BatchResults| {
            results
                .successful_files
                .iter()
                .map(|(path, result)| (path.clone(), result.outcome()))
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(&sequential), outcomes(&parallel));
    }

    #[test]
    fn test_fail_fast_stops_sequential_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.hl7"), "EVN|A01|1|2").unwrap();
        fs::write(dir.path().join("b.hl7"), admit("A01")).unwrap();
        let grammar = Arc::new(sample_grammar());

        let fail_fast = BatchConfig {
            fail_fast: true,
            ..config(1)
        };
        let results = process_directory_with_config(grammar, dir.path(), &fail_fast).unwrap();
        assert_eq!(results.files_processed, 1);
        assert_eq!(results.files_discovered, 2);
    }

    #[test]
    fn test_pipeline_failures_are_recorded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.hl7"), admit("A01")).unwrap();
        fs::write(dir.path().join("empty.hl7"), "").unwrap();
        let grammar = Arc::new(sample_grammar());

        let results = process_directory_with_config(grammar, dir.path(), &config(2)).unwrap();
        assert_eq!(results.failure_count(), 1);
        assert_matches!(results.failed_files[0].1, PipelineError::FileProcessing(_));
        assert!((results.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_chunk_size_calculation() {
        assert_eq!(calculate_chunk_size(100, 4), 25);
        assert_eq!(calculate_chunk_size(10, 4), 3);
        assert_eq!(calculate_chunk_size(1, 4), 1);
        assert_eq!(calculate_chunk_size(200, 4), 50);
        assert_eq!(calculate_chunk_size(0, 4), 1);
    }

    #[test]
    fn test_config_from_preferences() {
        let preferences = BatchPreferences {
            message_extensions: vec!["hl7".to_string()],
            threads: Some(MAX_WORKER_THREADS + 10),
        };
        let config = BatchConfig::from_preferences(&preferences);
        assert_eq!(config.max_threads, MAX_WORKER_THREADS);
        assert_eq!(config.clone().sequential().max_threads, 1);
    }
}
