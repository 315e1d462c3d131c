//! Recursive constituent parsing: fields, components, subcomponents

use super::delimiters::split_with_offsets;
use super::tree::{ParsedConstituent, ParsedRepetition, RepetitionValue};
use super::ParseContext;
use crate::config::constants::protocol::{MAX_CONSTITUENT_LEVEL, NULL_VALUE};
use crate::diagnostics::{Citation, NodeStatus, ParsingError};
use crate::grammar::{Constituent, Entity, EntityKind, Length, Structure};
use crate::logging::codes;
use crate::utils::Span;

/// Parse a segment field (level 1)
pub(crate) fn parse_field(
    ctx: &ParseContext<'_>,
    slot: &Constituent,
    raw: &str,
    span: Span,
) -> ParsedConstituent {
    parse_constituent(ctx, slot, raw, span, 1)
}

/// Header fields that carry the delimiters themselves are never split
pub(crate) fn parse_verbatim(slot: &Constituent, raw: &str, span: Span) -> ParsedConstituent {
    let mut node = empty_node(slot, raw, span, 1);
    let mut status = NodeStatus::default();
    status.succeed();
    node.repetitions.push(ParsedRepetition {
        raw: raw.to_string(),
        span,
        path: node.path.clone(),
        number: 1,
        value: RepetitionValue::Primitive(Some(raw.to_string())),
        status,
    });
    node.status.succeed();
    node
}

fn empty_node(slot: &Constituent, raw: &str, span: Span, level: u8) -> ParsedConstituent {
    ParsedConstituent {
        raw: raw.to_string(),
        span,
        path: slot.path(),
        level,
        type_id: slot.type_ref().unwrap_or_default().to_string(),
        optionality: slot.optionality,
        repeatability: slot.repeatability,
        repetitions: Vec::new(),
        status: NodeStatus::default(),
    }
}

fn parse_constituent(
    ctx: &ParseContext<'_>,
    slot: &Constituent,
    raw: &str,
    span: Span,
    level: u8,
) -> ParsedConstituent {
    let mut node = empty_node(slot, raw, span, level);

    let Some(backing) = ctx.grammar.constituent_type(slot) else {
        node.status.fail(ParsingError::new(
            codes::parsing::UNKNOWN_CONSTITUENT_TYPE,
            format!("Constituent {} is of unknown type '{}'.", node.path, node.type_id),
        ));
        if !raw.is_empty() {
            node.repetitions.push(ParsedRepetition {
                raw: raw.to_string(),
                span,
                path: node.path.clone(),
                number: 1,
                value: RepetitionValue::Unparsed,
                status: NodeStatus::default(),
            });
        }
        return node;
    };

    if raw.is_empty() {
        if slot.optionality.is_required() {
            node.status.push(ParsingError::new(
                codes::parsing::REQUIRED_FIELD_MISSING,
                format!("Required field {} is missing.", node.path),
            ));
        }
        if matches!(backing.kind, EntityKind::Primitive { .. }) {
            let mut status = NodeStatus::default();
            status.succeed();
            node.repetitions.push(ParsedRepetition {
                raw: String::new(),
                span,
                path: node.path.clone(),
                number: 1,
                value: RepetitionValue::Primitive(None),
                status,
            });
        }
        node.status.succeed();
        return node;
    }

    if ctx.preferences.flag_withdrawn_fields && slot.optionality.is_withdrawn() {
        node.status.push(ParsingError::new(
            codes::parsing::WITHDRAWN_FIELD_PRESENT,
            format!("Withdrawn field {} is populated.", node.path),
        ));
    }

    let mut bodies = if level == 1 {
        split_with_offsets(raw, ctx.delimiters.repetition)
    } else {
        vec![(0, raw)]
    };

    if let Some(max) = slot.repeatability.max() {
        if bodies.len() > max {
            node.status.push(ParsingError::new(
                codes::parsing::EXCESS_REPETITIONS,
                format!("Too many repetitions of {}. Discarding extras.", node.path),
            ));
            bodies.truncate(max);
        }
    }

    for (i, (offset, body)) in bodies.into_iter().enumerate() {
        let repetition = parse_repetition(
            ctx,
            slot,
            backing,
            body,
            span.narrow(offset, body.len()),
            level,
            i + 1,
        );

        if repetition.status.is_malformed() && slot.optionality.is_required() {
            node.status.fail(ParsingError::citing(
                codes::parsing::CHILD_MALFORMED,
                format!("Constituent {} repetition {} is malformed.", node.path, i + 1),
                Citation::Repetition(i),
            ));
        } else if repetition.status.has_diagnostics() {
            node.status.push(ParsingError::citing(
                codes::parsing::CHILD_DIAGNOSTICS,
                format!(
                    "Error(s) encountered while parsing {} repetition {}.",
                    node.path,
                    i + 1
                ),
                Citation::Repetition(i),
            ));
        }
        node.repetitions.push(repetition);
    }

    node.status.succeed();
    node
}

fn parse_repetition(
    ctx: &ParseContext<'_>,
    slot: &Constituent,
    backing: &Entity,
    raw: &str,
    span: Span,
    level: u8,
    number: usize,
) -> ParsedRepetition {
    let mut repetition = ParsedRepetition {
        raw: raw.to_string(),
        span,
        path: slot.path(),
        number,
        value: RepetitionValue::Unparsed,
        status: NodeStatus::default(),
    };

    match &backing.kind {
        EntityKind::Primitive { .. } => {
            let value = if raw == NULL_VALUE {
                Some(String::new())
            } else if raw.is_empty() {
                None
            } else {
                check_primitive_content(ctx, slot, raw, &mut repetition.status);
                Some(raw.to_string())
            };
            repetition.value = RepetitionValue::Primitive(value);
        }
        EntityKind::Structure(structure) => {
            let separator = if level < MAX_CONSTITUENT_LEVEL {
                ctx.delimiters.for_level(level)
            } else {
                None
            };
            match separator {
                Some(separator) => {
                    let components =
                        parse_components(ctx, structure, raw, span, separator, level + 1, &mut repetition.status);
                    repetition.value = RepetitionValue::Components(components);
                }
                None => repetition.status.fail(ParsingError::new(
                    codes::parsing::NESTING_TOO_DEEP,
                    format!(
                        "{} {} is nested deeper than the delimiters allow.",
                        backing.metatype(),
                        backing.type_id()
                    ),
                )),
            }
        }
        EntityKind::Table { .. } => repetition.status.fail(ParsingError::new(
            codes::parsing::UNKNOWN_CONSTITUENT_TYPE,
            format!("Constituent {} is of unknown type '{}'.", slot.path(), backing.type_id()),
        )),
    }

    repetition.status.succeed();
    repetition
}

fn parse_components(
    ctx: &ParseContext<'_>,
    structure: &Structure,
    raw: &str,
    span: Span,
    separator: char,
    level: u8,
    status: &mut NodeStatus,
) -> Vec<ParsedConstituent> {
    let parts = split_with_offsets(raw, separator);
    let mut components = Vec::with_capacity(structure.constituents.len());

    for (i, child) in structure.constituents.iter().enumerate() {
        // Omitted trailing components are empty
        let (offset, body) = parts.get(i).copied().unwrap_or((raw.len(), ""));
        let component = parse_constituent(ctx, child, body, span.narrow(offset, body.len()), level);

        if component.status.is_malformed() && child.optionality.is_required() {
            status.fail(ParsingError::citing(
                codes::parsing::CHILD_MALFORMED,
                format!("Constituent {} is malformed.", component.path),
                Citation::Component(i),
            ));
        } else if component.status.has_diagnostics() {
            status.push(ParsingError::citing(
                codes::parsing::CHILD_DIAGNOSTICS,
                format!("Error(s) encountered while parsing constituent {}.", component.path),
                Citation::Component(i),
            ));
        }
        components.push(component);
    }

    components
}

fn check_primitive_content(
    ctx: &ParseContext<'_>,
    slot: &Constituent,
    value: &str,
    status: &mut NodeStatus,
) {
    if ctx.preferences.check_lengths {
        if let Some(length @ Length::Finite(max)) = slot.length {
            let actual = value.chars().count();
            if !length.admits(actual) {
                status.push(ParsingError::new(
                    codes::parsing::LENGTH_EXCEEDED,
                    format!(
                        "Value of {} is {} characters long; at most {} allowed.",
                        slot.path(),
                        actual,
                        max
                    ),
                ));
            }
        }
    }

    if ctx.preferences.check_table_values {
        if let Some(table_id) = slot.table_ref() {
            let known = ctx.grammar.table(table_id).and_then(|t| t.contains_code(value));
            if known == Some(false) {
                status.push(ParsingError::new(
                    codes::parsing::TABLE_VALUE_UNKNOWN,
                    format!("Value '{}' of {} is not in table {}.", value, slot.path(), table_id),
                ));
            }
        }
    }
}
