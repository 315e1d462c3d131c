// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProcessorPreferences {
    /// Whether to enable detailed performance logging
    pub enable_performance_logging: bool,

    /// Whether empty files are rejected
    pub reject_empty_files: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            enable_performance_logging: env::var("HL7_ENABLE_PERFORMANCE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            reject_empty_files: env::var("HL7_REJECT_EMPTY_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarPreferences {
    /// Whether each grammar error is sent to the global logger as it is recorded
    pub log_each_error: bool,

    /// Whether consumption stops once `MAX_GRAMMAR_ERRORS` is reached
    pub stop_at_error_limit: bool,
}

impl Default for GrammarPreferences {
    fn default() -> Self {
        Self {
            log_each_error: env::var("HL7_GRAMMAR_LOG_EACH_ERROR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            stop_at_error_limit: env::var("HL7_GRAMMAR_STOP_AT_ERROR_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserPreferences {
    /// Flag primitive values longer than their slot's length
    pub check_lengths: bool,

    /// Flag values missing from the slot's table
    pub check_table_values: bool,

    /// Flag populated withdrawn slots
    pub flag_withdrawn_fields: bool,

    /// Report fields beyond the segment's declared constituents
    pub report_excess_fields: bool,

    /// Accept LF and CRLF as segment separators in addition to CR
    pub accept_line_feeds: bool,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            check_lengths: env::var("HL7_PARSER_CHECK_LENGTHS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            check_table_values: env::var("HL7_PARSER_CHECK_TABLE_VALUES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            flag_withdrawn_fields: env::var("HL7_PARSER_FLAG_WITHDRAWN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            report_excess_fields: env::var("HL7_PARSER_REPORT_EXCESS_FIELDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            accept_line_feeds: env::var("HL7_PARSER_ACCEPT_LINE_FEEDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

impl ParserPreferences {
    /// Core parsing only: no content checks, CR separators only
    pub fn strict_core() -> Self {
        Self {
            check_lengths: false,
            check_table_values: false,
            flag_withdrawn_fields: false,
            report_excess_fields: true,
            accept_line_feeds: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderPreferences {
    /// Extension of grammar definition files
    pub definition_extension: String,

    /// Whether version directories are searched recursively
    pub recursive: bool,
}

impl Default for LoaderPreferences {
    fn default() -> Self {
        Self {
            definition_extension: env::var("HL7_LOADER_DEFINITION_EXTENSION")
                .unwrap_or_else(|_| super::constants::grammar::DEFINITION_EXTENSION.to_string()),
            recursive: env::var("HL7_LOADER_RECURSIVE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPreferences {
    /// Extensions treated as message files (comma separated in the environment)
    pub message_extensions: Vec<String>,

    /// Preferred worker thread count, capped by `MAX_WORKER_THREADS`
    pub threads: Option<usize>,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            message_extensions: env::var("HL7_BATCH_MESSAGE_EXTENSIONS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|ext| ext.trim().trim_start_matches('.').to_string())
                        .filter(|ext| !ext.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["hl7".to_string(), "txt".to_string()]),
            threads: env::var("HL7_BATCH_THREADS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Minimum level that reaches the logger
    pub min_log_level: LogLevel,

    /// Whether to include performance metrics in logs
    pub log_performance_events: bool,

    /// Whether to enable cargo-style error reporting
    pub enable_cargo_style_output: bool,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("HL7_LOGGING_USE_STRUCTURED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var("HL7_LOGGING_ENABLE_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var("HL7_LOGGING_MIN_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            log_performance_events: env::var("HL7_LOGGING_LOG_PERFORMANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            enable_cargo_style_output: env::var("HL7_LOGGING_CARGO_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_file_context: env::var("HL7_LOGGING_INCLUDE_FILE_CONTEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub grammar: GrammarPreferences,
    pub parser: ParserPreferences,
    pub loader: LoaderPreferences,
    pub batch: BatchPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Load preferences from a TOML file. Absent sections fall back to their
    /// environment-driven defaults; a present section must be complete.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| format!("Invalid configuration in {}: {}", path.display(), e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // File Processor
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "HL7_ENABLE_PERFORMANCE_LOGGING";
    pub const REJECT_EMPTY_FILES: &str = "HL7_REJECT_EMPTY_FILES";

    // Grammar
    pub const GRAMMAR_LOG_EACH_ERROR: &str = "HL7_GRAMMAR_LOG_EACH_ERROR";
    pub const GRAMMAR_STOP_AT_ERROR_LIMIT: &str = "HL7_GRAMMAR_STOP_AT_ERROR_LIMIT";

    // Parser
    pub const PARSER_CHECK_LENGTHS: &str = "HL7_PARSER_CHECK_LENGTHS";
    pub const PARSER_CHECK_TABLE_VALUES: &str = "HL7_PARSER_CHECK_TABLE_VALUES";
    pub const PARSER_FLAG_WITHDRAWN: &str = "HL7_PARSER_FLAG_WITHDRAWN";
    pub const PARSER_REPORT_EXCESS_FIELDS: &str = "HL7_PARSER_REPORT_EXCESS_FIELDS";
    pub const PARSER_ACCEPT_LINE_FEEDS: &str = "HL7_PARSER_ACCEPT_LINE_FEEDS";

    // Loader
    pub const LOADER_DEFINITION_EXTENSION: &str = "HL7_LOADER_DEFINITION_EXTENSION";
    pub const LOADER_RECURSIVE: &str = "HL7_LOADER_RECURSIVE";

    // Batch
    pub const BATCH_MESSAGE_EXTENSIONS: &str = "HL7_BATCH_MESSAGE_EXTENSIONS";
    pub const BATCH_THREADS: &str = "HL7_BATCH_THREADS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "HL7_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "HL7_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "HL7_LOGGING_MIN_LEVEL";
    pub const LOGGING_LOG_PERFORMANCE: &str = "HL7_LOGGING_LOG_PERFORMANCE";
    pub const LOGGING_CARGO_STYLE: &str = "HL7_LOGGING_CARGO_STYLE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "HL7_LOGGING_INCLUDE_FILE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("0"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("warning"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("info"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("3"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_env_var_names_exist() {
        assert!(env_vars::PARSER_CHECK_LENGTHS.starts_with("HL7_"));
        assert!(env_vars::LOGGING_MIN_LEVEL.starts_with("HL7_"));
        assert!(env_vars::BATCH_MESSAGE_EXTENSIONS.starts_with("HL7_"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [parser]
            check_lengths = false
            check_table_values = false
            flag_withdrawn_fields = true
            report_excess_fields = true
            accept_line_feeds = true
            "#,
        )
        .unwrap();

        assert!(!config.parser.check_lengths);
        assert!(config.parser.accept_line_feeds);
        assert!(!config.loader.definition_extension.is_empty());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }
}
