//! Schema-time errors
//!
//! Every variant carries the origin of the definition it concerns and renders
//! as `In '<origin>' - <message>`. None of them are fatal: the registry
//! records them and carries on with the next definition.

use super::metatype::{join_alternatives, Metatype};
use super::types::Length;
use crate::logging::codes;
use thiserror::Error;

/// Result type for grammar construction
pub type GrammarResult<T> = Result<T, GrammarError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("In '{origin}' - Unable to extract type-id from entity definition `{key}`. It should take the form `<metatype> <type-id>`, e.g. `SEGMENT EVN`.")]
    InvalidDefinitionKey { origin: String, key: String },

    #[error("In '{origin}' - Invalid metatype '{tag}' in entity definition `{key}`. Expected one of {expected}.")]
    UnknownMetatype {
        origin: String,
        key: String,
        tag: String,
        expected: String,
    },

    #[error("In '{origin}' - Redefinition of {tag} **{type_id}** (Previously defined {previous_metatype} **{type_id}** in {previous_origin}.)")]
    Redefinition {
        origin: String,
        type_id: String,
        tag: String,
        previous_metatype: Metatype,
        previous_origin: String,
    },

    #[error("In '{origin}' - Field '{field}' on {owner} specification must be of type '{expected}', not '{actual}'.")]
    InvalidFieldType {
        origin: String,
        owner: String,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("In '{origin}' - Mandatory field '{field}' on {owner} specification is missing.")]
    MissingField {
        origin: String,
        owner: String,
        field: String,
    },

    #[error("In '{origin}' - Field '{field}' on {owner} specification has invalid value '{value}'. Expected {expected}.")]
    InvalidFieldValue {
        origin: String,
        owner: String,
        field: String,
        value: String,
        expected: String,
    },

    #[error("In '{origin}' - Field '{field}' on {owner} specification is out of range: {value} ({requirement}).")]
    OutOfRange {
        origin: String,
        owner: String,
        field: String,
        value: String,
        requirement: &'static str,
    },

    #[error("In '{origin}' - Field 'repeatability' on {owner} specification is not allowed: constituents of a {parent_metatype} cannot repeat.")]
    RepeatabilityNotAllowed {
        origin: String,
        owner: String,
        parent_metatype: Metatype,
    },

    #[error("In '{origin}' - Field 'constituents' on {owner} specification is not allowed: segment groups may only appear in a MESSAGE, not a {parent_metatype}.")]
    SegmentGroupNotAllowed {
        origin: String,
        owner: String,
        parent_metatype: Metatype,
    },

    #[error("In '{origin}' - '{constituent}' specifies type {type_id}, which does not exist.")]
    UnresolvedReference {
        origin: String,
        constituent: String,
        type_id: String,
    },

    #[error("In '{origin}' - '{constituent}' specifies type {type_id} (of {type_origin}), which is of metatype {actual}, not {allowed}.")]
    MetatypeMismatch {
        origin: String,
        constituent: String,
        type_id: String,
        type_origin: String,
        actual: Metatype,
        allowed: String,
    },

    #[error("In '{origin}' - '{constituent}' has explicit length {explicit_length}, shorter than the longest code ({table_length}) of its table {table_id}.")]
    TableExceedsExplicitLength {
        origin: String,
        constituent: String,
        table_id: String,
        table_length: u64,
        explicit_length: u64,
    },

    #[error("In '{origin}' - '{constituent}' uses table {table_id} whose longest code ({table_length}) exceeds the length of its type {type_id} ({type_length}).")]
    TableExceedsTypeLength {
        origin: String,
        constituent: String,
        table_id: String,
        table_length: u64,
        type_id: String,
        type_length: Length,
    },

    #[error("In '{origin}' - '{constituent}' has explicit length {explicit_length}, longer than the length of its type {type_id} ({type_length}).")]
    ExplicitExceedsTypeLength {
        origin: String,
        constituent: String,
        explicit_length: u64,
        type_id: String,
        type_length: Length,
    },

    #[error("In '{origin}' - {owner} declares length {explicit_length}, but its constituents allow at most {computed}.")]
    EntityLengthExceedsConstituents {
        origin: String,
        owner: String,
        explicit_length: u64,
        computed: Length,
    },

    #[error("In '{origin}' - {owner} declares length {explicit_length}, too short to hold separators for its {last_id} constituents.")]
    EntityLengthBelowSeparators {
        origin: String,
        owner: String,
        explicit_length: u64,
        last_id: usize,
    },

    #[error("In '{origin}' - {owner} declares length {explicit_length}, but its longest code has length {longest_code}.")]
    TableLengthTooShort {
        origin: String,
        owner: String,
        explicit_length: u64,
        longest_code: u64,
    },

    #[error("In '{origin}' - Definition document is invalid: {reason}")]
    InvalidDocument { origin: String, reason: String },

    #[error("In '{origin}' - {limit} limit of {max} exceeded; remaining definitions ignored.")]
    LimitExceeded {
        origin: String,
        limit: &'static str,
        max: usize,
    },
}

impl GrammarError {
    pub fn invalid_definition_key(origin: &str, key: &str) -> Self {
        Self::InvalidDefinitionKey {
            origin: origin.to_string(),
            key: key.to_string(),
        }
    }

    pub fn unknown_metatype(origin: &str, key: &str, tag: &str) -> Self {
        Self::UnknownMetatype {
            origin: origin.to_string(),
            key: key.to_string(),
            tag: tag.to_string(),
            expected: super::metatype::all_tags(),
        }
    }

    pub fn redefinition(
        origin: &str,
        type_id: &str,
        tag: &str,
        previous_metatype: Metatype,
        previous_origin: &str,
    ) -> Self {
        Self::Redefinition {
            origin: origin.to_string(),
            type_id: type_id.to_string(),
            tag: tag.to_string(),
            previous_metatype,
            previous_origin: previous_origin.to_string(),
        }
    }

    pub fn metatype_mismatch(
        origin: &str,
        constituent: &str,
        type_id: &str,
        type_origin: &str,
        actual: Metatype,
        allowed: &[Metatype],
    ) -> Self {
        Self::MetatypeMismatch {
            origin: origin.to_string(),
            constituent: constituent.to_string(),
            type_id: type_id.to_string(),
            type_origin: type_origin.to_string(),
            actual,
            allowed: join_alternatives(allowed),
        }
    }

    pub fn unresolved_reference(origin: &str, constituent: &str, type_id: &str) -> Self {
        Self::UnresolvedReference {
            origin: origin.to_string(),
            constituent: constituent.to_string(),
            type_id: type_id.to_string(),
        }
    }

    pub fn invalid_document(origin: &str, reason: &str) -> Self {
        Self::InvalidDocument {
            origin: origin.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn json_syntax(origin: &str, error: &serde_json::Error) -> Self {
        Self::invalid_document(
            origin,
            &format!(
                "JSON syntax error at line {}, column {}: {}",
                error.line(),
                error.column(),
                error
            ),
        )
    }

    pub fn limit_exceeded(origin: &str, limit: &'static str, max: usize) -> Self {
        Self::LimitExceeded {
            origin: origin.to_string(),
            limit,
            max,
        }
    }

    /// Get the appropriate error code for global logging system
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::InvalidDefinitionKey { .. } => codes::grammar::INVALID_DEFINITION_KEY,
            Self::UnknownMetatype { .. } => codes::grammar::UNKNOWN_METATYPE,
            Self::Redefinition { .. } => codes::grammar::REDEFINITION,
            Self::InvalidFieldType { .. } => codes::grammar::INVALID_FIELD_TYPE,
            Self::MissingField { .. } => codes::grammar::MISSING_FIELD,
            Self::InvalidFieldValue { .. } => codes::grammar::INVALID_FIELD_VALUE,
            Self::OutOfRange { .. } => codes::grammar::OUT_OF_RANGE,
            Self::RepeatabilityNotAllowed { .. } => codes::grammar::REPEATABILITY_NOT_ALLOWED,
            Self::SegmentGroupNotAllowed { .. } => codes::grammar::SEGMENT_GROUP_NOT_ALLOWED,
            Self::UnresolvedReference { .. } => codes::grammar::UNRESOLVED_REFERENCE,
            Self::MetatypeMismatch { .. } => codes::grammar::METATYPE_MISMATCH,
            Self::TableExceedsExplicitLength { .. }
            | Self::TableExceedsTypeLength { .. }
            | Self::ExplicitExceedsTypeLength { .. }
            | Self::EntityLengthExceedsConstituents { .. }
            | Self::EntityLengthBelowSeparators { .. }
            | Self::TableLengthTooShort { .. } => codes::grammar::LENGTH_INCONSISTENCY,
            Self::InvalidDocument { .. } => codes::grammar::INVALID_DEFINITION_DOCUMENT,
            Self::LimitExceeded { .. } => codes::grammar::LIMIT_EXCEEDED,
        }
    }

    /// Origin of the definition this error concerns
    pub fn origin(&self) -> &str {
        match self {
            Self::InvalidDefinitionKey { origin, .. }
            | Self::UnknownMetatype { origin, .. }
            | Self::Redefinition { origin, .. }
            | Self::InvalidFieldType { origin, .. }
            | Self::MissingField { origin, .. }
            | Self::InvalidFieldValue { origin, .. }
            | Self::OutOfRange { origin, .. }
            | Self::RepeatabilityNotAllowed { origin, .. }
            | Self::SegmentGroupNotAllowed { origin, .. }
            | Self::UnresolvedReference { origin, .. }
            | Self::MetatypeMismatch { origin, .. }
            | Self::TableExceedsExplicitLength { origin, .. }
            | Self::TableExceedsTypeLength { origin, .. }
            | Self::ExplicitExceedsTypeLength { origin, .. }
            | Self::EntityLengthExceedsConstituents { origin, .. }
            | Self::EntityLengthBelowSeparators { origin, .. }
            | Self::TableLengthTooShort { origin, .. }
            | Self::InvalidDocument { origin, .. }
            | Self::LimitExceeded { origin, .. } => origin,
        }
    }

    /// Length inconsistencies are found during finalization, never consumption
    pub fn is_length_inconsistency(&self) -> bool {
        self.error_code() == codes::grammar::LENGTH_INCONSISTENCY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_display_includes_origin() {
        let error = GrammarError::invalid_definition_key("2.3/segments.json", "SEGMENTEVN");
        let text = error.to_string();
        assert!(text.starts_with("In '2.3/segments.json' - Unable to extract type-id"));
        assert!(text.contains("`SEGMENTEVN`"));
        assert_eq!(error.origin(), "2.3/segments.json");
    }

    #[test]
    fn test_redefinition_cites_both_origins() {
        let error = GrammarError::redefinition(
            "b.json",
            "EVN",
            "COMPOSITE",
            Metatype::Segment,
            "a.json",
        );
        assert_eq!(
            error.to_string(),
            "In 'b.json' - Redefinition of COMPOSITE **EVN** (Previously defined SEGMENT **EVN** in a.json.)"
        );
        assert_eq!(error.error_code(), codes::grammar::REDEFINITION);
    }

    #[test]
    fn test_metatype_mismatch_lists_allowed_set() {
        let error = GrammarError::metatype_mismatch(
            "segments.json",
            "PID.3 - Patient ID",
            "ADT A01",
            "messages.json",
            Metatype::Message,
            Metatype::Segment.allowed_constituents(),
        );
        assert!(error.to_string().contains(
            "specifies type ADT A01 (of messages.json), which is of metatype MESSAGE, not COMPOSITE, SUBCOMPOSITE, or PRIMITIVE."
        ));
    }

    #[test]
    fn test_unknown_metatype_expected_list() {
        let error = GrammarError::unknown_metatype("a.json", "GROUP X", "GROUP");
        assert_matches!(&error, GrammarError::UnknownMetatype { tag, .. } if tag == "GROUP");
        assert!(error
            .to_string()
            .contains("MESSAGE, SEGMENT, COMPOSITE, SUBCOMPOSITE, PRIMITIVE, TABLE"));
    }

    #[test]
    fn test_length_errors_share_code() {
        let error = GrammarError::ExplicitExceedsTypeLength {
            origin: "a.json".into(),
            constituent: "EVN.1 - Event Type Code".into(),
            explicit_length: 30,
            type_id: "ID".into(),
            type_length: Length::Finite(20),
        };
        assert!(error.is_length_inconsistency());
        assert!(!GrammarError::invalid_document("a.json", "not an object").is_length_inconsistency());
    }
}
