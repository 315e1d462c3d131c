//! Consumption of definition documents into an open grammar

use super::GrammarBuilder;
use crate::config::compile_time::grammar::MAX_ENTITIES_PER_GRAMMAR;
use crate::grammar::reader::json_type_name;
use crate::grammar::{Entity, GrammarError, GrammarResult, Metatype};
use crate::logging::codes;
use crate::log_success;
use serde_json::Value;

impl GrammarBuilder {
    /// Consume one definition document. Each `"<METATYPE> <type-id>"` key is
    /// handled independently; failures are recorded and the next key is
    /// tried. Returns the number of entities added.
    pub fn consume(&mut self, definitions: &Value, origin: &str) -> usize {
        self.sources += 1;

        let entries = match definitions {
            Value::Object(entries) => entries,
            other => {
                self.errors.push(GrammarError::invalid_document(
                    origin,
                    &format!(
                        "top-level value must be of type 'object', not '{}'.",
                        json_type_name(other)
                    ),
                ));
                return 0;
            }
        };

        let mut added = 0;
        for (key, body) in entries {
            if self.preferences.stop_at_error_limit && self.errors.is_full() {
                break;
            }
            if self.maps.len() >= MAX_ENTITIES_PER_GRAMMAR {
                self.errors.push(GrammarError::limit_exceeded(
                    origin,
                    "Entities per grammar",
                    MAX_ENTITIES_PER_GRAMMAR,
                ));
                break;
            }

            match self.consume_entry(key, body, origin) {
                Ok(()) => added += 1,
                Err(error) => self.errors.push(error),
            }
        }

        log_success!(codes::success::DEFINITIONS_CONSUMED, "Definitions consumed",
            "origin" => origin,
            "entities" => added,
            "keys" => entries.len()
        );

        added
    }

    /// Parse `text` as JSON and consume it. A syntax error becomes a single
    /// grammar error for `origin`.
    pub fn consume_str(&mut self, text: &str, origin: &str) -> usize {
        match serde_json::from_str::<Value>(text) {
            Ok(definitions) => self.consume(&definitions, origin),
            Err(e) => {
                self.sources += 1;
                self.errors.push(GrammarError::json_syntax(origin, &e));
                0
            }
        }
    }

    /// Number of documents consumed so far
    pub fn source_count(&self) -> usize {
        self.sources
    }

    fn consume_entry(&mut self, key: &str, body: &Value, origin: &str) -> GrammarResult<()> {
        let (tag, type_id) = key
            .split_once(' ')
            .map(|(tag, id)| (tag, id.trim()))
            .filter(|(tag, id)| !tag.is_empty() && !id.is_empty())
            .ok_or_else(|| GrammarError::invalid_definition_key(origin, key))?;

        if let Some(previous) = self.maps.get(type_id) {
            return Err(GrammarError::redefinition(
                origin,
                type_id,
                tag,
                previous.metatype(),
                previous.origin(),
            ));
        }

        let metatype = Metatype::from_tag(tag)
            .ok_or_else(|| GrammarError::unknown_metatype(origin, key, tag))?;

        let mut constituent_errors = Vec::new();
        let entity =
            Entity::from_definition(metatype, type_id, body, origin, &mut constituent_errors);
        self.errors.extend(constituent_errors);

        self.maps.insert(entity?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_consume_counts_entities() {
        let mut builder = GrammarBuilder::new();
        let added = builder.consume(&super::super::tests::sample_definitions(), "sample.json");

        assert_eq!(added, 9);
        assert_eq!(builder.entity_count(), 9);
        assert!(builder.errors().is_empty());
        assert!(builder.contains("ADT A01"));
        assert_eq!(builder.source_count(), 1);
    }

    #[test]
    fn test_malformed_key() {
        let mut builder = GrammarBuilder::new();
        builder.consume(&json!({"SEGMENTEVN": {"constituents": []}}), "a.json");

        assert_matches!(&builder.errors()[0], GrammarError::InvalidDefinitionKey { key, .. } if key == "SEGMENTEVN");
        assert_eq!(builder.entity_count(), 0);
    }

    #[test]
    fn test_unknown_metatype() {
        let mut builder = GrammarBuilder::new();
        builder.consume(&json!({"GROUP ORC": {"constituents": []}}), "a.json");

        assert_matches!(&builder.errors()[0], GrammarError::UnknownMetatype { tag, .. } if tag == "GROUP");
    }

    #[test]
    fn test_redefinition_across_files_and_metatypes() {
        let mut builder = GrammarBuilder::new();
        builder.consume(&json!({"PRIMITIVE ST": {}}), "primitives.json");
        builder.consume(&json!({"COMPOSITE ST": {"constituents": []}}), "composites.json");

        assert_eq!(builder.errors().len(), 1);
        let error = &builder.errors()[0];
        assert_matches!(
            error,
            GrammarError::Redefinition { previous_metatype: Metatype::Primitive, .. }
        );
        let text = error.to_string();
        assert!(text.contains("primitives.json"));
        assert!(text.contains("composites.json"));
        assert_eq!(builder.entity_count(), 1);
    }

    #[test]
    fn test_redefinition_checked_before_metatype() {
        let mut builder = GrammarBuilder::new();
        builder.consume(&json!({"PRIMITIVE ST": {}}), "a.json");
        builder.consume(&json!({"BOGUS ST": {}}), "b.json");

        assert_matches!(&builder.errors()[0], GrammarError::Redefinition { tag, .. } if tag == "BOGUS");
    }

    #[test]
    fn test_one_bad_entry_does_not_abort_document() {
        let mut builder = GrammarBuilder::new();
        let added = builder.consume(
            &json!({
                "PRIMITIVE ID": {"length": "twenty"},
                "PRIMITIVE ST": {"length": 200},
                "SEGMENT EVN": {"constituents": [{"optionality": "R", "type": "ST"}]}
            }),
            "mixed.json",
        );

        assert_eq!(added, 2);
        assert_eq!(builder.errors().len(), 1);
        assert!(!builder.contains("ID"));
    }

    #[test]
    fn test_non_object_document() {
        let mut builder = GrammarBuilder::new();
        assert_eq!(builder.consume(&json!(["PRIMITIVE ST"]), "list.json"), 0);
        assert_matches!(&builder.errors()[0], GrammarError::InvalidDocument { .. });
    }

    #[test]
    fn test_consume_str_syntax_error() {
        let mut builder = GrammarBuilder::new();
        assert_eq!(builder.consume_str("{\"PRIMITIVE ST\": ", "broken.json"), 0);

        let error = &builder.errors()[0];
        assert_matches!(error, GrammarError::InvalidDocument { .. });
        assert!(error.to_string().starts_with("In 'broken.json' - Definition document is invalid: JSON syntax error"));
    }

    #[test]
    fn test_message_type_id_keeps_space() {
        let mut builder = GrammarBuilder::new();
        builder.consume_str(
            r#"{"SEGMENT EVN": {"constituents": []}, "MESSAGE ADT A01": {"constituents": [{"optionality": "R", "type": "EVN"}]}}"#,
            "m.json",
        );
        assert!(builder.contains("ADT A01"));
    }
}
