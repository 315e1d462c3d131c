//! Segment parsing: type identification and field splitting

use super::constituent::{parse_field, parse_verbatim};
use super::delimiters::split_with_offsets;
use super::tree::ParsedSegment;
use super::ParseContext;
use crate::config::constants::protocol::{
    HEADER_SEGMENT_ID, MIN_SEGMENT_LENGTH, SEGMENT_ID_LENGTH, VERBATIM_HEADER_FIELDS,
};
use crate::diagnostics::{Citation, NodeStatus, ParsingError};
use crate::logging::codes;
use crate::utils::Span;

/// First `SEGMENT_ID_LENGTH` characters of `raw`
fn segment_type(raw: &str) -> &str {
    match raw.char_indices().nth(SEGMENT_ID_LENGTH) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}

pub(crate) fn parse_segment(
    ctx: &ParseContext<'_>,
    raw: &str,
    span: Span,
    number: usize,
) -> ParsedSegment {
    let type_id = segment_type(raw);
    let mut segment = ParsedSegment {
        raw: raw.to_string(),
        span,
        number,
        type_id: type_id.to_string(),
        fields: Vec::new(),
        status: NodeStatus::default(),
    };

    if raw.chars().count() < MIN_SEGMENT_LENGTH {
        segment.status.fail(ParsingError::new(
            codes::parsing::SEGMENT_TOO_SHORT,
            "Segment too short.",
        ));
        return segment;
    }

    let Some(structure) = ctx.grammar.segment(type_id).and_then(|e| e.structure()) else {
        segment.status.fail(ParsingError::new(
            codes::parsing::UNKNOWN_SEGMENT,
            format!("Unknown segment '{}'.", type_id),
        ));
        return segment;
    };

    let is_header = type_id == HEADER_SEGMENT_ID;
    let mut bodies: Vec<(usize, &str)> = Vec::new();
    if is_header {
        // MSH.1 is the field separator itself
        let start = HEADER_SEGMENT_ID.len();
        let separator = raw
            .get(start..start + ctx.delimiters.field.len_utf8())
            .unwrap_or_default();
        bodies.push((start, separator));
    }
    bodies.extend(split_with_offsets(raw, ctx.delimiters.field).into_iter().skip(1));

    let declared = structure.constituents.len();
    for (i, slot) in structure.constituents.iter().enumerate() {
        let (offset, body) = bodies.get(i).copied().unwrap_or((raw.len(), ""));
        let field_span = span.narrow(offset, body.len());

        let field = if is_header && i < VERBATIM_HEADER_FIELDS {
            parse_verbatim(slot, body, field_span)
        } else {
            parse_field(ctx, slot, body, field_span)
        };

        if field.status.is_malformed() && slot.optionality.is_required() {
            segment.status.fail(ParsingError::citing(
                codes::parsing::CHILD_MALFORMED,
                format!("Constituent {} is malformed.", field.path),
                Citation::Field(i),
            ));
        } else if field.status.has_diagnostics() {
            segment.status.push(ParsingError::citing(
                codes::parsing::CHILD_DIAGNOSTICS,
                format!("Error(s) encountered while parsing constituent {}.", field.path),
                Citation::Field(i),
            ));
        }
        segment.fields.push(field);
    }

    if ctx.preferences.report_excess_fields {
        let excess = bodies
            .iter()
            .skip(declared)
            .filter(|(_, body)| !body.is_empty())
            .count();
        if excess > 0 {
            segment.status.push(ParsingError::new(
                codes::parsing::EXCESS_FIELDS,
                format!(
                    "Segment {} has {} field(s) beyond its {} declared constituents; ignored.",
                    type_id, excess, declared
                ),
            ));
        }
    }

    segment.status.succeed();
    segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::ParserPreferences;
    use crate::parser::Delimiters;
    use crate::registry::tests::sample_grammar;
    use crate::registry::Grammar;

    fn parse(grammar: &Grammar, raw: &str) -> ParsedSegment {
        let preferences = ParserPreferences::default();
        let ctx = ParseContext {
            grammar,
            delimiters: Delimiters::default(),
            preferences: &preferences,
        };
        parse_segment(&ctx, raw, Span::default(), 1)
    }

    #[test]
    fn test_evn_fields() {
        let grammar = sample_grammar();
        let evn = parse(&grammar, "EVN|A01|20240101");

        assert!(evn.status.is_well_formed());
        assert_eq!(evn.fields.len(), 3);
        assert_eq!(evn.field(1).and_then(|f| f.value()), Some("A01"));
        assert_eq!(evn.field(2).and_then(|f| f.value()), Some("20240101"));
        assert_eq!(evn.field(3).and_then(|f| f.value()), None);
        assert!(evn.field(3).map(|f| f.is_empty()).unwrap_or(false));

        // Missing required EVN.3 is reported through a citation, not a failure
        assert_eq!(evn.status.diagnostics().len(), 1);
        assert_eq!(evn.status.diagnostics()[0].citations, vec![Citation::Field(2)]);
        assert_eq!(
            evn.fields[2].status.diagnostics()[0].message,
            "Required field EVN.3 is missing."
        );
    }

    #[test]
    fn test_header_fields_are_verbatim() {
        let grammar = sample_grammar();
        let msh = parse(&grammar, "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|2.3");

        assert!(msh.status.is_well_formed(), "{:?}", msh.status);
        assert_eq!(msh.field(1).and_then(|f| f.value()), Some("|"));
        assert_eq!(msh.field(2).and_then(|f| f.value()), Some("^~\\&"));
        assert_eq!(msh.field(3).and_then(|f| f.value()), Some("A"));
        let message_type = msh.field(9).unwrap();
        assert_eq!(message_type.component(1).and_then(|c| c.value()), Some("ADT"));
        assert_eq!(message_type.component(2).and_then(|c| c.value()), Some("A01"));
        assert_eq!(msh.field(12).and_then(|f| f.value()), Some("2.3"));
    }

    #[test]
    fn test_short_and_unknown_segments() {
        let grammar = sample_grammar();

        let short = parse(&grammar, "EV");
        assert!(short.status.is_malformed());
        assert_eq!(short.status.diagnostics()[0].message, "Segment too short.");

        let unknown = parse(&grammar, "ZZZ|1");
        assert!(unknown.status.is_malformed());
        assert_eq!(unknown.status.diagnostics()[0].message, "Unknown segment 'ZZZ'.");
        assert!(unknown.fields.is_empty());
    }

    #[test]
    fn test_excess_fields() {
        let grammar = sample_grammar();
        let evn = parse(&grammar, "EVN|A01|1|2|extra||");

        assert!(evn.status.is_well_formed());
        let excess = evn.status.diagnostics().last().unwrap();
        assert_eq!(excess.code, codes::parsing::EXCESS_FIELDS);
        assert!(excess.message.contains("has 1 field(s) beyond its 3"));

        // Trailing empty fields alone are not reported
        let trailing = parse(&grammar, "EVN|A01|1|2||");
        assert!(!trailing.status.has_diagnostics());
    }

    #[test]
    fn test_field_spans() {
        let grammar = sample_grammar();
        let evn = parse(&grammar, "EVN|A01|20240101");
        assert_eq!(evn.fields[0].span.start.offset, 4);
        assert_eq!(evn.fields[1].span.len(), 8);
        assert_eq!(evn.fields[1].span.slice("EVN|A01|20240101"), "20240101");
    }
}
