//! # Grammar Loader
//!
//! Packages a directory tree of JSON definition documents into finalized
//! grammars. Each immediate subdirectory of the grammar root is one version:
//!
//! ```text
//! grammars/
//!   2.3/
//!     datatypes.json
//!     segments.json
//!     messages/adt.json
//!   2.5/
//!     ...
//! ```
//!
//! Unreadable files and JSON syntax errors are recorded as grammar errors
//! against their origin and the load carries on.

use crate::config::compile_time::grammar::MAX_DEFINITION_FILES;
use crate::config::runtime::{GrammarPreferences, LoaderPreferences};
use crate::file_processor::FileProcessor;
use crate::grammar::GrammarError;
use crate::logging::codes;
use crate::registry::{Grammar, GrammarBuilder};
use crate::{log_debug, log_error, log_info, log_performance, log_warning};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Loader errors. Problems inside definition files are grammar errors, not
/// loader errors.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Grammar directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No definition files (*.{extension}) found in {path}")]
    NoDefinitionFiles { path: String, extension: String },

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl LoaderError {
    pub fn error_code(&self) -> codes::Code {
        match self {
            LoaderError::DirectoryNotFound { .. } => codes::loader::VERSION_DIRECTORY_NOT_FOUND,
            LoaderError::NoDefinitionFiles { .. } => codes::loader::NO_DEFINITION_FILES,
            LoaderError::Io { .. } => codes::file_processing::IO_ERROR,
        }
    }

    fn io(path: &Path, error: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Loads grammar versions found under a root directory
pub struct GrammarLoader {
    root: PathBuf,
    preferences: LoaderPreferences,
    grammar_preferences: GrammarPreferences,
    processor: FileProcessor,
}

impl GrammarLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preferences: LoaderPreferences::default(),
            grammar_preferences: GrammarPreferences::default(),
            processor: FileProcessor::new().with_performance_logging(false),
        }
    }

    pub fn with_preferences(mut self, preferences: LoaderPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_grammar_preferences(mut self, preferences: GrammarPreferences) -> Self {
        self.grammar_preferences = preferences;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version ids, i.e. the names of the root's immediate subdirectories,
    /// in sorted order
    pub fn discover_versions(&self) -> LoaderResult<Vec<String>> {
        if !self.root.is_dir() {
            let error = LoaderError::DirectoryNotFound {
                path: self.root.display().to_string(),
            };
            log_error!(error.error_code(), "Grammar root is not a directory",
                "path" => self.root.display()
            );
            return Err(error);
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| LoaderError::io(&self.root, e))? {
            let entry = entry.map_err(|e| LoaderError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !name.starts_with('.') {
                    versions.push(name.to_string());
                }
            }
        }
        versions.sort();

        log_debug!("Grammar versions discovered",
            "root" => self.root.display(),
            "versions" => versions.join(",")
        );

        Ok(versions)
    }

    /// Consume every definition file of `version` and finalize the result
    pub fn load_version(&self, version: &str) -> LoaderResult<Grammar> {
        let start_time = Instant::now();
        let dir = self.root.join(version);

        log_info!("Loading grammar version",
            "version" => version,
            "directory" => dir.display()
        );

        if !dir.is_dir() {
            let error = LoaderError::DirectoryNotFound {
                path: dir.display().to_string(),
            };
            log_error!(error.error_code(), "Grammar version directory not found",
                "version" => version,
                "path" => dir.display()
            );
            return Err(error);
        }

        let files = self.definition_files(&dir)?;
        if files.is_empty() {
            let error = LoaderError::NoDefinitionFiles {
                path: dir.display().to_string(),
                extension: self.preferences.definition_extension.clone(),
            };
            log_error!(error.error_code(), "No definition files found",
                "version" => version,
                "path" => dir.display()
            );
            return Err(error);
        }

        let mut builder = GrammarBuilder::with_preferences(self.grammar_preferences.clone());

        if files.len() > MAX_DEFINITION_FILES {
            builder.record_error(GrammarError::limit_exceeded(
                version,
                "Definition files per version",
                MAX_DEFINITION_FILES,
            ));
        }

        for path in files.iter().take(MAX_DEFINITION_FILES) {
            let origin = self.origin_of(path);
            self.consume_file(&mut builder, path, &origin);
        }

        let grammar = builder.finalize();

        log_performance!(codes::success::GRAMMAR_VERSION_LOADED, "Grammar version loaded",
            duration = start_time.elapsed(),
            "version" => version,
            "files" => files.len(),
            "entities" => grammar.entity_count(),
            "errors" => grammar.errors().len()
        );

        Ok(grammar)
    }

    /// Load every discovered version. A version without definition files is
    /// skipped.
    pub fn load_all(&self) -> LoaderResult<BTreeMap<String, Grammar>> {
        let mut grammars = BTreeMap::new();
        for version in self.discover_versions()? {
            match self.load_version(&version) {
                Ok(grammar) => {
                    grammars.insert(version, grammar);
                }
                Err(LoaderError::NoDefinitionFiles { .. }) => continue,
                Err(error) => return Err(error),
            }
        }
        Ok(grammars)
    }

    fn consume_file(&self, builder: &mut GrammarBuilder, path: &Path, origin: &str) {
        let file = match self.processor.process_file(path) {
            Ok(file) => file,
            Err(e) => {
                builder.record_error(GrammarError::invalid_document(
                    origin,
                    &format!("definition file could not be read: {}", e),
                ));
                return;
            }
        };

        match serde_json::from_str::<Value>(&file.source) {
            Ok(definitions) => {
                builder.consume(&definitions, origin);
            }
            Err(e) => {
                log_warning!(codes::loader::INVALID_JSON, "Definition file is not valid JSON",
                    "origin" => origin,
                    "line" => e.line(),
                    "column" => e.column()
                );
                builder.record_error(GrammarError::json_syntax(origin, &e));
            }
        }
    }

    /// Path relative to the grammar root, with `/` separators
    fn origin_of(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn definition_files(&self, dir: &Path) -> LoaderResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.visit(dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn visit(&self, dir: &Path, files: &mut Vec<PathBuf>) -> LoaderResult<()> {
        for entry in fs::read_dir(dir).map_err(|e| LoaderError::io(dir, e))? {
            let path = entry.map_err(|e| LoaderError::io(dir, e))?.path();
            if path.is_dir() {
                if self.preferences.recursive {
                    self.visit(&path, files)?;
                }
            } else if self.is_definition_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_definition_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.preferences.definition_extension))
    }
}

// ============================================================================
// MODULE API FUNCTIONS
// ============================================================================

pub fn discover_versions(root: impl Into<PathBuf>) -> LoaderResult<Vec<String>> {
    GrammarLoader::new(root).discover_versions()
}

pub fn load_version(root: impl Into<PathBuf>, version: &str) -> LoaderResult<Grammar> {
    GrammarLoader::new(root).load_version(version)
}

pub fn load_all(root: impl Into<PathBuf>) -> LoaderResult<BTreeMap<String, Grammar>> {
    GrammarLoader::new(root).load_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::sample_definitions;
    use assert_matches::assert_matches;
    use serde_json::Map;
    use std::fs;
    use tempfile::tempdir;

    /// Write the sample definitions split over two files, one nested
    fn write_sample_version(root: &Path, version: &str) {
        let dir = root.join(version);
        fs::create_dir_all(dir.join("messages")).unwrap();

        let mut types = Map::new();
        let mut messages = Map::new();
        if let Value::Object(entries) = sample_definitions() {
            for (key, body) in entries {
                if key.starts_with("MESSAGE") {
                    messages.insert(key, body);
                } else {
                    types.insert(key, body);
                }
            }
        }
        fs::write(dir.join("types.json"), Value::Object(types).to_string()).unwrap();
        fs::write(dir.join("messages/adt.json"), Value::Object(messages).to_string()).unwrap();
    }

    #[test]
    fn test_load_version_across_files() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.3");

        let grammar = load_version(root.path(), "2.3").unwrap();
        assert!(!grammar.has_errors(), "{:?}", grammar.errors());
        assert_eq!(grammar.entity_count(), 9);
        assert_eq!(grammar.message("ADT A01").map(|m| m.origin()), Some("2.3/messages/adt.json"));
        assert_eq!(grammar.segment("EVN").map(|s| s.origin()), Some("2.3/types.json"));
    }

    #[test]
    fn test_discover_versions_sorted() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.5");
        write_sample_version(root.path(), "2.3");
        fs::create_dir(root.path().join(".cache")).unwrap();
        fs::write(root.path().join("README"), "grammars").unwrap();

        assert_eq!(discover_versions(root.path()).unwrap(), vec!["2.3", "2.5"]);

        let all = load_all(root.path()).unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["2.3", "2.5"]);
    }

    #[test]
    fn test_json_syntax_error_is_grammar_error() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.3");
        fs::write(root.path().join("2.3/broken.json"), "{\"PRIMITIVE NM\": ").unwrap();

        let grammar = load_version(root.path(), "2.3").unwrap();
        assert_eq!(grammar.errors().len(), 1);
        let error = &grammar.errors()[0];
        assert_eq!(error.origin(), "2.3/broken.json");
        assert!(error.to_string().starts_with("In '2.3/broken.json' - "));
        assert!(error.to_string().contains("JSON syntax error"));
        // The rest of the version still loads
        assert!(grammar.message("ADT A01").is_some());
    }

    #[test]
    fn test_empty_definition_file_is_grammar_error() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.3");
        fs::write(root.path().join("2.3/empty.json"), "").unwrap();

        let grammar = load_version(root.path(), "2.3").unwrap();
        assert_eq!(grammar.errors().len(), 1);
        assert!(grammar.errors()[0].to_string().contains("could not be read"));
    }

    #[test]
    fn test_redefinition_across_files_cites_both() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.3");
        fs::write(root.path().join("2.3/zz.json"), "{\"PRIMITIVE ST\": {}}").unwrap();

        let grammar = load_version(root.path(), "2.3").unwrap();
        assert_eq!(grammar.errors().len(), 1);
        let rendered = grammar.errors()[0].to_string();
        assert!(rendered.contains("2.3/zz.json"));
        assert!(rendered.contains("2.3/types.json"));
    }

    #[test]
    fn test_non_recursive_skips_nested_files() {
        let root = tempdir().unwrap();
        write_sample_version(root.path(), "2.3");

        let loader = GrammarLoader::new(root.path()).with_preferences(LoaderPreferences {
            definition_extension: "json".to_string(),
            recursive: false,
        });
        let grammar = loader.load_version("2.3").unwrap();
        assert!(grammar.message("ADT A01").is_none());
        assert!(grammar.segment("EVN").is_some());
    }

    #[test]
    fn test_missing_version_and_empty_version() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("2.4")).unwrap();

        assert_matches!(
            load_version(root.path(), "9.9"),
            Err(LoaderError::DirectoryNotFound { .. })
        );
        let empty = load_version(root.path(), "2.4");
        assert_matches!(empty, Err(LoaderError::NoDefinitionFiles { .. }));
        assert_eq!(empty.unwrap_err().error_code(), codes::loader::NO_DEFINITION_FILES);

        // Versions without definitions are skipped by load_all
        assert!(load_all(root.path()).unwrap().is_empty());
        assert_matches!(
            discover_versions(root.path().join("missing")),
            Err(LoaderError::DirectoryNotFound { .. })
        );
    }
}
