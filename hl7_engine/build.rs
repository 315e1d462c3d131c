// build.rs - TOML-driven constant generation for engine limits
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    file_processing: FileProcessingLimits,
    grammar: GrammarLimits,
    parsing: ParsingLimits,
    batch_processing: BatchProcessingLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct FileProcessingLimits {
    max_file_size: u64,
    large_file_threshold: u64,
}

#[derive(serde::Deserialize)]
struct GrammarLimits {
    max_definition_files: usize,
    max_entities_per_grammar: usize,
    max_constituents_per_entity: usize,
    max_group_depth: usize,
    max_grammar_errors: usize,
}

#[derive(serde::Deserialize)]
struct ParsingLimits {
    max_message_size: usize,
    max_segments_per_message: usize,
}

#[derive(serde::Deserialize)]
struct BatchProcessingLimits {
    max_worker_threads: usize,
    max_files_per_batch: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    max_error_collection: usize,
    log_buffer_size: usize,
    max_log_message_length: usize,
    max_log_events_per_file: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=HL7_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=HL7_CONFIG_DIR");

    let profile = env::var("HL7_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("HL7_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Workspace root is the parent of the hl7_engine directory
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_FILE_SIZE: u64 = 1_000_000_000;
    const ABSOLUTE_MAX_MESSAGE_SIZE: usize = 100_000_000;
    const ABSOLUTE_MAX_GROUP_DEPTH: usize = 256;

    if config.file_processing.max_file_size > ABSOLUTE_MAX_FILE_SIZE {
        panic!("LIMITS: max_file_size exceeds absolute maximum");
    }

    if config.file_processing.large_file_threshold > config.file_processing.max_file_size {
        panic!("LIMITS: large_file_threshold exceeds max_file_size");
    }

    if config.parsing.max_message_size > ABSOLUTE_MAX_MESSAGE_SIZE {
        panic!("LIMITS: max_message_size exceeds absolute maximum");
    }

    if config.grammar.max_group_depth == 0 || config.grammar.max_group_depth > ABSOLUTE_MAX_GROUP_DEPTH
    {
        panic!("LIMITS: max_group_depth must be between 1 and {}", ABSOLUTE_MAX_GROUP_DEPTH);
    }

    if config.grammar.max_constituents_per_entity == 0 {
        panic!("LIMITS: max_constituents_per_entity must be positive");
    }

    if config.batch_processing.max_worker_threads == 0 {
        panic!("LIMITS: max_worker_threads must be positive");
    }

    if config.logging.max_log_events_per_file > config.logging.log_buffer_size {
        panic!("LIMITS: max_log_events_per_file exceeds log_buffer_size");
    }

    if profile == "production" && config.parsing.max_message_size > 10_000_000 {
        panic!("PRODUCTION: max_message_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod file_processing {{
        pub const MAX_FILE_SIZE: u64 = {};
        pub const LARGE_FILE_THRESHOLD: u64 = {};
    }}

    pub mod grammar {{
        pub const MAX_DEFINITION_FILES: usize = {};
        pub const MAX_ENTITIES_PER_GRAMMAR: usize = {};
        pub const MAX_CONSTITUENTS_PER_ENTITY: usize = {};
        pub const MAX_GROUP_DEPTH: usize = {};
        pub const MAX_GRAMMAR_ERRORS: usize = {};
    }}

    pub mod parsing {{
        pub const MAX_MESSAGE_SIZE: usize = {};
        pub const MAX_SEGMENTS_PER_MESSAGE: usize = {};
    }}

    pub mod batch_processing {{
        pub const MAX_WORKER_THREADS: usize = {};
        pub const MAX_FILES_PER_BATCH: usize = {};
    }}

    pub mod logging {{
        pub const MAX_ERROR_COLLECTION: usize = {};
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
        pub const MAX_LOG_EVENTS_PER_FILE: usize = {};
    }}
}}
"#,
        profile,
        // File Processing
        config.file_processing.max_file_size,
        config.file_processing.large_file_threshold,
        // Grammar
        config.grammar.max_definition_files,
        config.grammar.max_entities_per_grammar,
        config.grammar.max_constituents_per_entity,
        config.grammar.max_group_depth,
        config.grammar.max_grammar_errors,
        // Parsing
        config.parsing.max_message_size,
        config.parsing.max_segments_per_message,
        // Batch Processing
        config.batch_processing.max_worker_threads,
        config.batch_processing.max_files_per_batch,
        // Logging
        config.logging.max_error_collection,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
        config.logging.max_log_events_per_file,
    );

    fs::write(output_path, constants_code).unwrap();
}
