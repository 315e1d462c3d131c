//! Consolidated error codes and classification system
//!
//! Single source of truth for all error codes, their metadata, and classification functions.
//! Grammar (G), parsing (P), loader (L), and batch (B) families sit next to the
//! system and file-processing families; success codes use the I prefix.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Critical" => Some(Severity::Critical),
            "High" => Some(Severity::High),
            "Medium" => Some(Severity::Medium),
            "Low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub const fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// File processing error codes
pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const EMPTY_FILE: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
}

/// Grammar definition and finalization error codes
pub mod grammar {
    use super::Code;

    // Definition keys
    pub const INVALID_DEFINITION_KEY: Code = Code::new("G001");
    pub const UNKNOWN_METATYPE: Code = Code::new("G002");
    pub const REDEFINITION: Code = Code::new("G003");

    // Body fields
    pub const INVALID_FIELD_TYPE: Code = Code::new("G004");
    pub const MISSING_FIELD: Code = Code::new("G005");
    pub const INVALID_FIELD_VALUE: Code = Code::new("G006");
    pub const OUT_OF_RANGE: Code = Code::new("G007");
    pub const REPEATABILITY_NOT_ALLOWED: Code = Code::new("G008");
    pub const SEGMENT_GROUP_NOT_ALLOWED: Code = Code::new("G009");

    // Finalization
    pub const UNRESOLVED_REFERENCE: Code = Code::new("G010");
    pub const METATYPE_MISMATCH: Code = Code::new("G011");
    pub const LENGTH_INCONSISTENCY: Code = Code::new("G012");

    // Documents and limits
    pub const INVALID_DEFINITION_DOCUMENT: Code = Code::new("G013");
    pub const LIMIT_EXCEEDED: Code = Code::new("G014");

    // Path lookup
    pub const MALFORMED_PATH: Code = Code::new("G015");
    pub const UNKNOWN_TYPE_ID: Code = Code::new("G016");
    pub const NOT_INDEXABLE: Code = Code::new("G017");
    pub const ORDINAL_OUT_OF_RANGE: Code = Code::new("G018");
}

/// Message parsing diagnostic codes
pub mod parsing {
    use super::Code;

    // Structural, fatal to the node they occur in
    pub const MESSAGE_TOO_SHORT: Code = Code::new("P001");
    pub const MISSING_HEADER: Code = Code::new("P002");
    pub const HEADER_UNPARSEABLE: Code = Code::new("P003");
    pub const UNKNOWN_MESSAGE_TYPE: Code = Code::new("P004");
    pub const SEGMENT_TOO_SHORT: Code = Code::new("P005");
    pub const UNKNOWN_SEGMENT: Code = Code::new("P006");
    pub const UNKNOWN_CONSTITUENT_TYPE: Code = Code::new("P007");

    // Content
    pub const REQUIRED_FIELD_MISSING: Code = Code::new("P008");
    pub const EXCESS_REPETITIONS: Code = Code::new("P009");
    pub const LENGTH_EXCEEDED: Code = Code::new("P010");
    pub const TABLE_VALUE_UNKNOWN: Code = Code::new("P011");
    pub const WITHDRAWN_FIELD_PRESENT: Code = Code::new("P012");

    // Propagation from children
    pub const CHILD_MALFORMED: Code = Code::new("P013");
    pub const CHILD_DIAGNOSTICS: Code = Code::new("P014");

    // Template fitting
    pub const MISSING_SEGMENT: Code = Code::new("P015");
    pub const UNEXPECTED_SEGMENT: Code = Code::new("P016");
    pub const EXCESS_FIELDS: Code = Code::new("P017");
    pub const NESTING_TOO_DEEP: Code = Code::new("P018");
    pub const MESSAGE_TOO_LARGE: Code = Code::new("P019");
}

/// Grammar version loader error codes
pub mod loader {
    use super::Code;

    pub const VERSION_DIRECTORY_NOT_FOUND: Code = Code::new("L001");
    pub const NO_DEFINITION_FILES: Code = Code::new("L002");
    pub const INVALID_JSON: Code = Code::new("L003");
}

/// Batch processing error codes
pub mod batch {
    use super::Code;

    pub const DIRECTORY_NOT_FOUND: Code = Code::new("B001");
    pub const NO_MESSAGE_FILES: Code = Code::new("B002");
    pub const WORKER_FAILURE: Code = Code::new("B003");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    // General success codes
    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    // File processing success codes
    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const FILE_VALIDATION_PASSED: Code = Code::new("I007");

    // Grammar success codes
    pub const DEFINITIONS_CONSUMED: Code = Code::new("I010");
    pub const GRAMMAR_VALIDATED: Code = Code::new("I011");
    pub const GRAMMAR_FINALIZED: Code = Code::new("I012");
    pub const GRAMMAR_VERSION_LOADED: Code = Code::new("I013");

    // Parsing success codes
    pub const MESSAGE_PARSED: Code = Code::new("I020");
    pub const BATCH_COMPLETED: Code = Code::new("I021");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

const METADATA: &[ErrorMetadata] = &[
    // System
    ErrorMetadata::new(
        "ERR001",
        "System",
        Severity::Critical,
        false,
        true,
        "Internal engine error",
        "Report the failure with the input that triggered it",
    ),
    ErrorMetadata::new(
        "ERR002",
        "System",
        Severity::Critical,
        false,
        true,
        "Engine initialization failed",
        "Check runtime configuration and environment variables",
    ),
    // File processing
    ErrorMetadata::new(
        "E005",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "File not found",
        "Check that the path exists and is spelled correctly",
    ),
    ErrorMetadata::new(
        "E007",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "File exceeds the configured size limit",
        "Split the input or raise max_file_size in the build profile",
    ),
    ErrorMetadata::new(
        "E008",
        "FileProcessing",
        Severity::Medium,
        true,
        false,
        "File is empty",
        "Provide a file with content",
    ),
    ErrorMetadata::new(
        "E009",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "Permission denied",
        "Check file permissions",
    ),
    ErrorMetadata::new(
        "E010",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "File is not valid UTF-8",
        "Convert the file to UTF-8",
    ),
    ErrorMetadata::new(
        "E011",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "I/O error while reading file",
        "Retry the operation or check the storage device",
    ),
    ErrorMetadata::new(
        "E012",
        "FileProcessing",
        Severity::High,
        false,
        false,
        "Path is not a regular file",
        "Pass a file path rather than a directory",
    ),
    // Grammar
    ErrorMetadata::new(
        "G001",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Definition key is not of the form '<metatype> <type-id>'",
        "Rename the key, e.g. 'SEGMENT EVN'",
    ),
    ErrorMetadata::new(
        "G002",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Unknown metatype in definition key",
        "Use MESSAGE, SEGMENT, COMPOSITE, SUBCOMPOSITE, PRIMITIVE, or TABLE",
    ),
    ErrorMetadata::new(
        "G003",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Type id defined more than once",
        "Remove or rename one of the definitions",
    ),
    ErrorMetadata::new(
        "G004",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Definition field has the wrong JSON type",
        "Correct the field's type in the definition body",
    ),
    ErrorMetadata::new(
        "G005",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Mandatory definition field is missing",
        "Add the field to the definition body",
    ),
    ErrorMetadata::new(
        "G006",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Definition field has an invalid value",
        "Use one of the documented values for the field",
    ),
    ErrorMetadata::new(
        "G007",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Numeric definition field is out of range",
        "Use a value inside the documented range",
    ),
    ErrorMetadata::new(
        "G008",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Repeatability specified where it is not allowed",
        "Remove 'repeatability' from composite and subcomposite constituents",
    ),
    ErrorMetadata::new(
        "G009",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Segment group outside a message",
        "Only message constituents may carry nested 'constituents'",
    ),
    ErrorMetadata::new(
        "G010",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Constituent references a type that does not exist",
        "Define the referenced type or correct the reference",
    ),
    ErrorMetadata::new(
        "G011",
        "Grammar",
        Severity::Medium,
        true,
        false,
        "Constituent references a type of a disallowed metatype",
        "Reference a type of one of the allowed metatypes",
    ),
    ErrorMetadata::new(
        "G012",
        "Grammar",
        Severity::Low,
        true,
        false,
        "Declared lengths are inconsistent",
        "Reconcile the explicit, table, and type lengths",
    ),
    ErrorMetadata::new(
        "G013",
        "Grammar",
        Severity::High,
        true,
        false,
        "Definition document is not a JSON object",
        "Fix the document syntax",
    ),
    ErrorMetadata::new(
        "G014",
        "Grammar",
        Severity::High,
        true,
        false,
        "Grammar exceeds a configured limit",
        "Raise the grammar limits in the build profile",
    ),
    ErrorMetadata::new(
        "G015",
        "Grammar",
        Severity::Low,
        true,
        false,
        "Lookup path is not BASE, BASE.N or BASE.N.D",
        "Use a type id optionally followed by a numeric ordinal and a depth letter",
    ),
    ErrorMetadata::new(
        "G016",
        "Grammar",
        Severity::Low,
        true,
        false,
        "No entity has the requested type id",
        "Check the type id against the loaded grammar version",
    ),
    ErrorMetadata::new(
        "G017",
        "Grammar",
        Severity::Low,
        true,
        false,
        "Primitives and tables have no constituents",
        "Look up the type id without an ordinal",
    ),
    ErrorMetadata::new(
        "G018",
        "Grammar",
        Severity::Low,
        true,
        false,
        "Ordinal lies outside the entity's constituent range",
        "Use an ordinal between 1 and the entity's last constituent",
    ),
    // Parsing
    ErrorMetadata::new(
        "P001",
        "Parsing",
        Severity::High,
        true,
        false,
        "Message header is too short to carry delimiters",
        "The first segment needs MSH plus five delimiter characters",
    ),
    ErrorMetadata::new(
        "P002",
        "Parsing",
        Severity::High,
        true,
        false,
        "Message does not begin with MSH",
        "Check that the input is an HL7 v2 message",
    ),
    ErrorMetadata::new(
        "P003",
        "Parsing",
        Severity::High,
        true,
        false,
        "Message header could not be interpreted",
        "Check MSH.9 (message type)",
    ),
    ErrorMetadata::new(
        "P004",
        "Parsing",
        Severity::High,
        true,
        false,
        "Message type is not defined by the grammar",
        "Load a grammar version that defines the message type",
    ),
    ErrorMetadata::new(
        "P005",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Segment is too short",
        "Remove or complete the segment",
    ),
    ErrorMetadata::new(
        "P006",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Segment type is not defined by the grammar",
        "Check the segment id or the grammar version",
    ),
    ErrorMetadata::new(
        "P007",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Constituent has an unknown backing type",
        "Fix the grammar reference reported during finalization",
    ),
    ErrorMetadata::new(
        "P008",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Required field is empty",
        "Populate the field",
    ),
    ErrorMetadata::new(
        "P009",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Field repeats more often than allowed",
        "Remove the extra repetitions",
    ),
    ErrorMetadata::new(
        "P010",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Value is longer than the field allows",
        "Shorten the value",
    ),
    ErrorMetadata::new(
        "P011",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Value is not in the field's table",
        "Use one of the table's codes",
    ),
    ErrorMetadata::new(
        "P012",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Withdrawn field is populated",
        "Leave withdrawn fields empty",
    ),
    ErrorMetadata::new(
        "P013",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Required child constituent is malformed",
        "Drill into the cited constituent",
    ),
    ErrorMetadata::new(
        "P014",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Child constituent carries diagnostics",
        "Drill into the cited constituent",
    ),
    ErrorMetadata::new(
        "P015",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Required segment is missing",
        "Add the segment in template order",
    ),
    ErrorMetadata::new(
        "P016",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Segment does not fit the message template",
        "Check segment order against the message structure",
    ),
    ErrorMetadata::new(
        "P017",
        "Parsing",
        Severity::Low,
        true,
        false,
        "Segment has more fields than declared",
        "Remove the extra fields",
    ),
    ErrorMetadata::new(
        "P018",
        "Parsing",
        Severity::Medium,
        true,
        false,
        "Constituent nesting is deeper than the delimiters allow",
        "Check the grammar's composite definitions",
    ),
    ErrorMetadata::new(
        "P019",
        "Parsing",
        Severity::High,
        true,
        false,
        "Message exceeds a configured parsing limit",
        "Raise the parsing limits in the build profile",
    ),
    // Loader
    ErrorMetadata::new(
        "L001",
        "Loader",
        Severity::High,
        false,
        false,
        "Grammar version directory not found",
        "Check the grammar root and version id",
    ),
    ErrorMetadata::new(
        "L002",
        "Loader",
        Severity::High,
        false,
        false,
        "Version directory holds no definition files",
        "Add .json definition files to the version directory",
    ),
    ErrorMetadata::new(
        "L003",
        "Loader",
        Severity::Medium,
        true,
        false,
        "Definition file is not valid JSON",
        "Fix the JSON syntax at the reported line",
    ),
    // Batch
    ErrorMetadata::new(
        "B001",
        "Batch",
        Severity::High,
        false,
        false,
        "Message directory not found",
        "Check the directory path",
    ),
    ErrorMetadata::new(
        "B002",
        "Batch",
        Severity::Medium,
        true,
        false,
        "No message files found",
        "Check the directory and message extensions",
    ),
    ErrorMetadata::new(
        "B003",
        "Batch",
        Severity::High,
        false,
        false,
        "Batch worker thread failed",
        "Re-run sequentially to isolate the failing file",
    ),
    // Success
    ErrorMetadata::new(
        "I001",
        "Success",
        Severity::Low,
        true,
        false,
        "Operation completed successfully",
        "None",
    ),
    ErrorMetadata::new(
        "I004",
        "Success",
        Severity::Low,
        true,
        false,
        "System initialization completed",
        "None",
    ),
    ErrorMetadata::new(
        "I006",
        "Success",
        Severity::Low,
        true,
        false,
        "File processed successfully",
        "None",
    ),
    ErrorMetadata::new(
        "I007",
        "Success",
        Severity::Low,
        true,
        false,
        "File validation passed",
        "None",
    ),
    ErrorMetadata::new(
        "I010",
        "Success",
        Severity::Low,
        true,
        false,
        "Definition document consumed",
        "None",
    ),
    ErrorMetadata::new(
        "I011",
        "Success",
        Severity::Low,
        true,
        false,
        "Grammar references validated",
        "None",
    ),
    ErrorMetadata::new(
        "I012",
        "Success",
        Severity::Low,
        true,
        false,
        "Grammar finalized",
        "None",
    ),
    ErrorMetadata::new(
        "I013",
        "Success",
        Severity::Low,
        true,
        false,
        "Grammar version loaded",
        "None",
    ),
    ErrorMetadata::new(
        "I020",
        "Success",
        Severity::Low,
        true,
        false,
        "Message parsed",
        "None",
    ),
    ErrorMetadata::new(
        "I021",
        "Success",
        Severity::Low,
        true,
        false,
        "Batch completed",
        "None",
    ),
];

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::with_capacity(METADATA.len());
        for metadata in METADATA {
            registry.insert(metadata.code, metadata.clone());
        }
        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific error code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from error code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for error code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
