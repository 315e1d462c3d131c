//! Second finalization pass: length caching
//!
//! Layers are processed tables first, then subcomposites up to messages.
//! The layer being computed is taken out of the maps while its entities are
//! mutated; every lookup it performs lands on a lower layer that is already
//! cached.

use super::validate::resolve_type;
use super::{EntityMaps, ErrorLog, Grammar, ValidatedGrammar};
use crate::grammar::{Constituent, Entity, EntityKind, GrammarError, Length, Metatype, Slot};
use crate::logging::codes;
use crate::log_performance;
use std::time::Instant;

impl ValidatedGrammar {
    /// Cache every length and seal the grammar
    pub fn finalize(self) -> Grammar {
        let start = Instant::now();
        let ValidatedGrammar {
            mut maps,
            mut errors,
        } = self;

        for entity in maps.layer_mut(Metatype::Table).values_mut() {
            cache_table_length(entity, &mut errors);
        }

        for metatype in Metatype::STRUCTURED {
            let mut layer = std::mem::take(maps.layer_mut(metatype));
            for entity in layer.values_mut() {
                cache_structure_length(&maps, entity, &mut errors);
            }
            *maps.layer_mut(metatype) = layer;
        }

        log_performance!(codes::success::GRAMMAR_FINALIZED, "Grammar finalized",
            duration = start.elapsed(),
            "entities" => maps.len(),
            "errors" => errors.errors.len()
        );

        Grammar { maps, errors }
    }
}

fn cache_table_length(entity: &mut Entity, errors: &mut ErrorLog) {
    let owner = format!("{} {}", Metatype::Table, entity.header.type_id);
    let origin = entity.header.origin.clone();

    if let EntityKind::Table { table, length } = &mut entity.kind {
        let longest_code = table.longest_code();
        if let Some(explicit_length) = table.explicit_length {
            if explicit_length < longest_code {
                errors.push(GrammarError::TableLengthTooShort {
                    origin,
                    owner,
                    explicit_length,
                    longest_code,
                });
            }
        }
        *length = Some(Length::Finite(longest_code));
    }
}

fn cache_structure_length(maps: &EntityMaps, entity: &mut Entity, errors: &mut ErrorLog) {
    let origin = entity.header.origin.clone();
    let owner = format!("{} {}", entity.metatype(), entity.header.type_id);
    let Some(structure) = entity.structure_mut() else {
        return;
    };

    for constituent in structure.constituents.iter_mut() {
        cache_constituent_length(maps, constituent, errors);
    }

    let separators = Length::Finite(structure.last_id.saturating_sub(1) as u64);
    let computed = structure
        .constituents
        .iter()
        .map(|c| c.resolved_length().repeated(c.repeatability))
        .sum::<Length>()
        + separators;

    structure.length = Some(match structure.explicit_length {
        None => computed,
        Some(explicit_length) => {
            if Length::Finite(explicit_length) > computed {
                errors.push(GrammarError::EntityLengthExceedsConstituents {
                    origin: origin.clone(),
                    owner: owner.clone(),
                    explicit_length,
                    computed,
                });
            }
            if (explicit_length as usize) < structure.last_id {
                errors.push(GrammarError::EntityLengthBelowSeparators {
                    origin,
                    owner,
                    explicit_length,
                    last_id: structure.last_id,
                });
            }
            Length::Finite(explicit_length).min(computed)
        }
    });
}

fn cache_constituent_length(maps: &EntityMaps, constituent: &mut Constituent, errors: &mut ErrorLog) {
    let label = constituent.label();
    let parent = constituent.parent_metatype;

    let length = match &mut constituent.slot {
        Slot::Group { children, .. } => {
            for child in children.iter_mut() {
                cache_constituent_length(maps, child, errors);
            }
            let interior = Length::Finite(children.len().saturating_sub(1) as u64);
            interior
                + children
                    .iter()
                    .map(|c| c.resolved_length().repeated(c.repeatability))
                    .sum::<Length>()
        }
        Slot::Leaf {
            type_ref,
            table_ref,
            explicit_length,
        } => {
            let type_length = resolve_type(maps, parent, type_ref)
                .and_then(Entity::length)
                .unwrap_or(Length::Unbounded);
            let table_length = table_ref
                .as_deref()
                .and_then(|id| maps.layer(Metatype::Table).get(id))
                .and_then(Entity::length)
                .and_then(|length| length.finite());

            let origin = &constituent.origin;
            if let (Some(table_length), Some(explicit_length)) = (table_length, *explicit_length) {
                if table_length > explicit_length {
                    errors.push(GrammarError::TableExceedsExplicitLength {
                        origin: origin.clone(),
                        constituent: label.clone(),
                        table_id: table_ref.clone().unwrap_or_default(),
                        table_length,
                        explicit_length,
                    });
                }
            }
            if let Some(table_length) = table_length {
                if Length::Finite(table_length) > type_length {
                    errors.push(GrammarError::TableExceedsTypeLength {
                        origin: origin.clone(),
                        constituent: label.clone(),
                        table_id: table_ref.clone().unwrap_or_default(),
                        table_length,
                        type_id: type_ref.clone(),
                        type_length,
                    });
                }
            }
            if let Some(explicit_length) = *explicit_length {
                if Length::Finite(explicit_length) > type_length {
                    errors.push(GrammarError::ExplicitExceedsTypeLength {
                        origin: origin.clone(),
                        constituent: label.clone(),
                        explicit_length,
                        type_id: type_ref.clone(),
                        type_length,
                    });
                }
            }

            (*explicit_length)
                .or(table_length)
                .map(Length::Finite)
                .unwrap_or(type_length)
        }
    };

    constituent.length = Some(length);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::GrammarBuilder;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn finalize(definitions: serde_json::Value) -> Grammar {
        let mut builder = GrammarBuilder::new();
        builder.consume(&definitions, "defs.json");
        builder.finalize()
    }

    fn leaf_length(grammar: &Grammar, segment: &str, ordinal: usize) -> Option<Length> {
        grammar
            .segment(segment)
            .and_then(|e| e.structure())
            .and_then(|s| s.constituent_containing(ordinal))
            .and_then(|c| c.length)
    }

    #[test]
    fn test_leaf_length_defaults() {
        let grammar = finalize(json!({
            "PRIMITIVE ID": {"length": 20},
            "TABLE 0003": {"values": {"A01": "Admit", "A04": "Register"}},
            "SEGMENT EVN": {"constituents": [
                {"optionality": "R", "type": "ID", "table": "0003"},
                {"optionality": "R", "type": "ID"},
                {"optionality": "R", "type": "ID", "length": 5},
                {"optionality": "R", "type": "ID", "table": "9999"},
                {"optionality": "R", "type": "NOPE"}
            ]}
        }));

        assert_eq!(leaf_length(&grammar, "EVN", 1), Some(Length::Finite(3)));
        assert_eq!(leaf_length(&grammar, "EVN", 2), Some(Length::Finite(20)));
        assert_eq!(leaf_length(&grammar, "EVN", 3), Some(Length::Finite(5)));
        assert_eq!(leaf_length(&grammar, "EVN", 4), Some(Length::Finite(20)));
        assert_eq!(leaf_length(&grammar, "EVN", 5), Some(Length::Unbounded));

        // Only the unresolved reference is an error; the unknown table is ignored
        assert_eq!(grammar.errors().len(), 1);
        assert_matches!(grammar.errors()[0], GrammarError::UnresolvedReference { .. });
    }

    #[test]
    fn test_each_violated_inequality_reported_separately() {
        let grammar = finalize(json!({
            "PRIMITIVE ID": {"length": 2},
            "TABLE 0003": {"values": {"A01": "Admit"}},
            "SEGMENT EVN": {"constituents": [
                {"optionality": "R", "type": "ID", "table": "0003", "length": 1},
                {"optionality": "R", "type": "ID", "length": 5}
            ]}
        }));

        let errors = grammar.errors();
        assert_eq!(errors.len(), 3);
        assert_matches!(errors[0], GrammarError::TableExceedsExplicitLength { table_length: 3, explicit_length: 1, .. });
        assert_matches!(errors[1], GrammarError::TableExceedsTypeLength { table_length: 3, .. });
        assert_matches!(errors[2], GrammarError::ExplicitExceedsTypeLength { explicit_length: 5, .. });
        assert!(errors.iter().all(|e| e.is_length_inconsistency()));
        // Explicit length still wins when present
        assert_eq!(leaf_length(&grammar, "EVN", 1), Some(Length::Finite(1)));
    }

    #[test]
    fn test_segment_group_length() {
        let grammar = finalize(json!({
            "PRIMITIVE ST": {"length": 10},
            "SEGMENT ORC": {"constituents": [{"optionality": "R", "type": "ST"}]},
            "SEGMENT NTE": {"constituents": [
                {"optionality": "O", "type": "ST"},
                {"optionality": "O", "type": "ST", "repeatability": 2}
            ]},
            "MESSAGE ORM O01": {"constituents": [
                {"optionality": "R", "constituents": [
                    {"optionality": "R", "type": "ORC"},
                    {"optionality": "O", "type": "NTE", "repeatability": 3}
                ]}
            ]}
        }));
        assert!(!grammar.has_errors(), "{:?}", grammar.errors());

        // ORC = 10; NTE = 10 + 2 * 10 + 1 = 31
        let nte = grammar.segment("NTE").and_then(|e| e.length());
        assert_eq!(nte, Some(Length::Finite(31)));

        let message = grammar.message("ORM O01").and_then(|e| e.structure()).unwrap();
        let group = &message.constituents[0];
        assert_eq!(group.length, Some(Length::Finite(1 + 10 + 31 * 3)));
        // Entity: group length + (last_id - 1)
        assert_eq!(message.length, Some(Length::Finite(104 + 1)));
    }

    #[test]
    fn test_unbounded_propagates() {
        let grammar = finalize(json!({
            "PRIMITIVE ST": {"length": 10},
            "SEGMENT NTE": {"constituents": [{"optionality": "O", "type": "ST", "repeatability": -1}]}
        }));
        assert_eq!(grammar.segment("NTE").and_then(|e| e.length()), Some(Length::Unbounded));
    }

    #[test]
    fn test_explicit_entity_and_table_lengths() {
        let grammar = finalize(json!({
            "PRIMITIVE ST": {"length": 10},
            "TABLE 0001": {"length": 1, "values": {"UN": "Unknown"}},
            "COMPOSITE CE": {"length": 50, "constituents": [
                {"optionality": "R", "type": "ST"},
                {"optionality": "O", "type": "ST"}
            ]},
            "COMPOSITE XX": {"length": 1, "constituents": [
                {"optionality": "R", "type": "ST"},
                {"optionality": "O", "type": "ST"}
            ]}
        }));

        let errors = grammar.errors();
        assert_eq!(errors.len(), 3);
        assert_matches!(errors[0], GrammarError::TableLengthTooShort { longest_code: 2, .. });
        assert_matches!(errors[1], GrammarError::EntityLengthExceedsConstituents { explicit_length: 50, .. });
        assert_matches!(errors[2], GrammarError::EntityLengthBelowSeparators { last_id: 2, .. });
        assert!(errors[1].to_string().contains("COMPOSITE CE declares length 50"));

        assert_eq!(grammar.entity("CE").and_then(|e| e.length()), Some(Length::Finite(21)));
        assert_eq!(grammar.entity("XX").and_then(|e| e.length()), Some(Length::Finite(1)));
        assert_eq!(grammar.entity("0001").and_then(|e| e.length()), Some(Length::Finite(2)));
    }
}
