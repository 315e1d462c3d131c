//! Grammar registry and its build lifecycle
//!
//! A grammar moves through three handle types:
//!
//! * [`GrammarBuilder`]: open; definitions are consumed into it.
//! * [`ValidatedGrammar`]: references checked against the layer rules.
//! * [`Grammar`]: lengths cached; immutable and shareable across threads.
//!
//! Each transition consumes the previous handle, so consuming after
//! finalization or finalizing twice does not compile:
//!
//! ```compile_fail
//! use hl7_engine::registry::GrammarBuilder;
//!
//! let mut builder = GrammarBuilder::new();
//! let grammar = builder.finalize();
//! builder.consume(&serde_json::json!({}), "late.json");
//! ```
//!
//! ```
//! use hl7_engine::registry::GrammarBuilder;
//! use serde_json::json;
//!
//! let mut builder = GrammarBuilder::new();
//! builder.consume(&json!({"PRIMITIVE ST": {"length": 20}}), "primitives.json");
//! let grammar = builder.finalize();
//! assert!(grammar.entity("ST").is_some());
//! assert!(!grammar.has_errors());
//! ```

pub mod consume;
pub mod explain;
pub mod lengths;
pub mod lookup;
pub mod validate;

pub use lookup::{EntityRef, LookupError};

use crate::config::compile_time::grammar::MAX_GRAMMAR_ERRORS;
use crate::config::runtime::GrammarPreferences;
use crate::grammar::{Constituent, Entity, GrammarError, Metatype, Table};
use crate::log_error;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ENTITY STORAGE
// ============================================================================

/// One id→entity map per metatype. Ids are unique across all of them.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityMaps {
    primitives: BTreeMap<String, Entity>,
    tables: BTreeMap<String, Entity>,
    subcomposites: BTreeMap<String, Entity>,
    composites: BTreeMap<String, Entity>,
    segments: BTreeMap<String, Entity>,
    messages: BTreeMap<String, Entity>,
}

impl EntityMaps {
    pub(crate) fn layer(&self, metatype: Metatype) -> &BTreeMap<String, Entity> {
        match metatype {
            Metatype::Primitive => &self.primitives,
            Metatype::Table => &self.tables,
            Metatype::Subcomposite => &self.subcomposites,
            Metatype::Composite => &self.composites,
            Metatype::Segment => &self.segments,
            Metatype::Message => &self.messages,
        }
    }

    pub(crate) fn layer_mut(&mut self, metatype: Metatype) -> &mut BTreeMap<String, Entity> {
        match metatype {
            Metatype::Primitive => &mut self.primitives,
            Metatype::Table => &mut self.tables,
            Metatype::Subcomposite => &mut self.subcomposites,
            Metatype::Composite => &mut self.composites,
            Metatype::Segment => &mut self.segments,
            Metatype::Message => &mut self.messages,
        }
    }

    pub(crate) fn get(&self, type_id: &str) -> Option<&Entity> {
        Metatype::ALL
            .iter()
            .find_map(|metatype| self.layer(*metatype).get(type_id))
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        let metatype = entity.metatype();
        self.layer_mut(metatype)
            .insert(entity.type_id().to_string(), entity);
    }

    pub(crate) fn len(&self) -> usize {
        Metatype::ALL.iter().map(|m| self.layer(*m).len()).sum()
    }
}

// ============================================================================
// ERROR ACCUMULATION
// ============================================================================

/// Grammar errors accumulated across all three stages
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorLog {
    errors: Vec<GrammarError>,
    suppressed: usize,
    log_each: bool,
}

impl ErrorLog {
    fn new(log_each: bool) -> Self {
        Self {
            log_each,
            ..Default::default()
        }
    }

    /// Errors past `MAX_GRAMMAR_ERRORS` are counted but not kept
    pub(crate) fn push(&mut self, error: GrammarError) {
        if self.errors.len() >= MAX_GRAMMAR_ERRORS {
            self.suppressed += 1;
            return;
        }
        if self.log_each {
            log_error!(error.error_code(), &error.to_string(),
                "origin" => error.origin()
            );
        }
        self.errors.push(error);
    }

    pub(crate) fn extend<I: IntoIterator<Item = GrammarError>>(&mut self, errors: I) {
        for error in errors {
            self.push(error);
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.errors.len() >= MAX_GRAMMAR_ERRORS
    }
}

// ============================================================================
// LIFECYCLE HANDLES
// ============================================================================

/// Open grammar accepting definitions
#[derive(Debug)]
pub struct GrammarBuilder {
    pub(crate) maps: EntityMaps,
    pub(crate) errors: ErrorLog,
    pub(crate) preferences: GrammarPreferences,
    pub(crate) sources: usize,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::with_preferences(GrammarPreferences::default())
    }

    pub fn with_preferences(preferences: GrammarPreferences) -> Self {
        Self {
            maps: EntityMaps::default(),
            errors: ErrorLog::new(preferences.log_each_error),
            preferences,
            sources: 0,
        }
    }

    pub fn errors(&self) -> &[GrammarError] {
        &self.errors.errors
    }

    pub fn entity_count(&self) -> usize {
        self.maps.len()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.maps.get(type_id).is_some()
    }

    /// Record an error from outside the definition bodies, e.g. an
    /// unreadable file found by the loader
    pub fn record_error(&mut self, error: GrammarError) {
        self.errors.push(error);
    }

    /// Validate and cache lengths in one step
    pub fn finalize(self) -> Grammar {
        self.validate().finalize()
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Grammar whose references have been checked but whose lengths are not
/// yet known
#[derive(Debug)]
pub struct ValidatedGrammar {
    pub(crate) maps: EntityMaps,
    pub(crate) errors: ErrorLog,
}

impl ValidatedGrammar {
    pub fn errors(&self) -> &[GrammarError] {
        &self.errors.errors
    }
}

/// Finalized, immutable grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) maps: EntityMaps,
    pub(crate) errors: ErrorLog,
}

impl Grammar {
    pub fn errors(&self) -> &[GrammarError] {
        &self.errors.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.errors.is_empty() || self.errors.suppressed > 0
    }

    /// Errors dropped after the error limit was reached
    pub fn suppressed_error_count(&self) -> usize {
        self.errors.suppressed
    }

    /// Look up a plain type id (no dotted path)
    pub fn entity(&self, type_id: &str) -> Option<&Entity> {
        self.maps.get(type_id)
    }

    pub fn message(&self, type_id: &str) -> Option<&Entity> {
        self.maps.layer(Metatype::Message).get(type_id)
    }

    pub fn segment(&self, type_id: &str) -> Option<&Entity> {
        self.maps.layer(Metatype::Segment).get(type_id)
    }

    pub fn table(&self, type_id: &str) -> Option<&Table> {
        self.maps
            .layer(Metatype::Table)
            .get(type_id)
            .and_then(|entity| entity.table())
    }

    /// Backing entity of a leaf constituent. `None` for groups, unknown
    /// types, and types its parent may not hold.
    pub fn constituent_type(&self, constituent: &Constituent) -> Option<&Entity> {
        constituent.type_ref().and_then(|type_ref| {
            validate::resolve_type(&self.maps, constituent.parent_metatype, type_ref)
        })
    }

    pub fn entities(&self, metatype: Metatype) -> impl Iterator<Item = &Entity> {
        self.maps.layer(metatype).values()
    }

    pub fn entity_count(&self) -> usize {
        self.maps.len()
    }

    pub fn stats(&self) -> GrammarStats {
        GrammarStats {
            counts: Metatype::ALL
                .iter()
                .map(|m| (*m, self.maps.layer(*m).len()))
                .collect(),
            errors: self.errors.errors.len() + self.errors.suppressed,
        }
    }
}

/// Entity counts per metatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarStats {
    pub counts: BTreeMap<Metatype, usize>,
    pub errors: usize,
}

impl GrammarStats {
    pub fn count(&self, metatype: Metatype) -> usize {
        self.counts.get(&metatype).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for GrammarStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Metatype::ALL
            .iter()
            .map(|m| format!("{} {}", self.count(*m), m.as_str().to_lowercase()))
            .collect();
        write!(f, "{} ({} errors)", parts.join(", "), self.errors)
    }
}
