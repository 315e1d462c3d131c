//! Whole-message parsing: delimiters, segment splitting, message type,
//! template fitting

use super::delimiters::Delimiters;
use super::fitting::fit_segments;
use super::segment::parse_segment;
use super::tree::ParsedMessage;
use super::ParseContext;
use crate::config::constants::protocol::{MESSAGE_TYPE_FIELD, SEGMENT_SEPARATOR};
use crate::config::runtime::ParserPreferences;
use crate::diagnostics::{Citation, ParsingError};
use crate::grammar::Entity;
use crate::logging::codes;
use crate::registry::Grammar;
use crate::utils::{Position, Span};
use crate::log_debug;

/// Split message text into segments with their byte offsets. A single
/// trailing empty segment left by a terminating separator is dropped.
pub(crate) fn split_segments(text: &str, accept_line_feeds: bool) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        let is_separator =
            byte == SEGMENT_SEPARATOR as u8 || (accept_line_feeds && byte == b'\n');
        if !is_separator {
            i += 1;
            continue;
        }

        segments.push((start, &text[start..i]));
        i += 1;
        if accept_line_feeds && byte == SEGMENT_SEPARATOR as u8 && bytes.get(i) == Some(&b'\n') {
            i += 1;
        }
        start = i;
    }
    segments.push((start, &text[start..]));

    if segments.len() > 1 && segments.last().is_some_and(|(_, s)| s.is_empty()) {
        segments.pop();
    }
    segments
}

/// Resolve the message template named by the header's MSH.9 field.
/// `Err` carries the fatal diagnostic.
fn message_template<'g>(
    grammar: &'g Grammar,
    delimiters: &Delimiters,
    header: &str,
) -> Result<(&'g Entity, String), ParsingError> {
    let type_field = header
        .split(delimiters.field)
        .nth(MESSAGE_TYPE_FIELD - 1)
        .ok_or_else(|| {
            ParsingError::new(
                codes::parsing::HEADER_UNPARSEABLE,
                format!(
                    "Message header lacks MSH.{}, needed to identify the message type.",
                    MESSAGE_TYPE_FIELD
                ),
            )
        })?;

    let components: Vec<&str> = type_field.split(delimiters.component).map(str::trim).collect();
    let code = components.first().copied().unwrap_or_default();
    let event = components.get(1).copied().unwrap_or_default();
    let type_id = format!("{} {}", code, event).trim().to_string();

    if let Some(template) = grammar.message(&type_id) {
        return Ok((template, type_id));
    }

    // MSH.9.3 names the message structure, e.g. ADT_A01
    if let Some(structure) = components.get(2).filter(|s| !s.is_empty()) {
        for candidate in [structure.to_string(), structure.replace('_', " ")] {
            if let Some(template) = grammar.message(&candidate) {
                return Ok((template, candidate));
            }
        }
    }

    Err(ParsingError::new(
        codes::parsing::UNKNOWN_MESSAGE_TYPE,
        format!("Unknown message type '{}'.", type_id),
    ))
}

pub(crate) fn parse_message(
    grammar: &Grammar,
    preferences: &ParserPreferences,
    text: &str,
) -> ParsedMessage {
    let mut message = ParsedMessage::new(text);

    let delimiters = match Delimiters::from_header(text) {
        Ok(delimiters) => delimiters,
        Err(error) => {
            message.status.fail(error);
            return message;
        }
    };
    message.delimiters = Some(delimiters);

    let ctx = ParseContext {
        grammar,
        delimiters,
        preferences,
    };

    let bodies = split_segments(text, preferences.accept_line_feeds);
    message.segments = bodies
        .iter()
        .enumerate()
        .map(|(i, (offset, body))| {
            let start = Position::new(*offset, (i + 1) as u32, 1);
            parse_segment(&ctx, body, Span::at(start, body.len()), i + 1)
        })
        .collect();

    let header = bodies.first().map(|(_, body)| *body).unwrap_or_default();
    match message_template(grammar, &delimiters, header) {
        Ok((template, type_id)) => {
            if let Some(structure) = template.structure() {
                fit_segments(&type_id, structure, &mut message);
            }
            message.message_type = Some(type_id);
        }
        Err(error) => {
            message.status.fail(error);
            // No fitting; segments stay reachable for drill-down
            for (index, segment) in message.segments.iter().enumerate() {
                if segment.status.has_diagnostics() {
                    message.status.push(ParsingError::citing(
                        codes::parsing::CHILD_DIAGNOSTICS,
                        format!(
                            "Error(s) encountered while parsing segment {} ({}).",
                            segment.number, segment.type_id
                        ),
                        Citation::Segment(index),
                    ));
                }
            }
        }
    }

    message.status.succeed();
    log_debug!("Message parsed",
        "type" => message.message_type.as_deref().unwrap_or("unknown"),
        "segments" => message.segments.len(),
        "outcome" => message.status.outcome()
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{report, Outcome};
    use crate::parser::MessageParser;
    use crate::registry::tests::sample_grammar;

    const HEADER: &str = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|2.3";

    fn parse(text: &str) -> ParsedMessage {
        let grammar = sample_grammar();
        MessageParser::new(&grammar).parse(text)
    }

    #[test]
    fn test_evn_admit_scenario() {
        let message = parse(&format!("{}\rEVN|A01|20240101", HEADER));

        assert_eq!(message.outcome(), Outcome::WellFormed);
        assert_eq!(message.delimiters, Some(Delimiters::default()));
        assert_eq!(message.message_type.as_deref(), Some("ADT A01"));
        assert_eq!(message.segments.len(), 2);

        let assignment = message.assignment_of(1).unwrap();
        assert_eq!((assignment.slot.as_str(), assignment.repetition), ("ADT A01.1", 1));
        assert_eq!(message.assignments.len(), 1);

        let evn = &message.segments[1];
        assert_eq!(evn.type_id, "EVN");
        assert_eq!(evn.field(1).and_then(|f| f.value()), Some("A01"));
        assert_eq!(evn.field(2).and_then(|f| f.value()), Some("20240101"));
        assert_eq!(evn.field(3).and_then(|f| f.value()), None);

        // Missing EVN.3 surfaces as a non-fatal citation chain
        let diagnostics = message.status.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].citations, vec![Citation::Segment(1)]);
    }

    #[test]
    fn test_missing_header_prefix() {
        let message = parse("EVN|A01|20240101\rEVN|A04|20240102");

        assert_eq!(message.outcome(), Outcome::Malformed);
        assert_eq!(message.status.diagnostics().len(), 1);
        assert!(message.status.diagnostics()[0].message.contains("must begin with MSH"));
        assert!(message.segments.is_empty());
        assert!(message.delimiters.is_none());
    }

    #[test]
    fn test_message_too_short() {
        let message = parse("MSH|^~");
        assert!(message.is_malformed());
        assert_eq!(message.status.diagnostics()[0].code, codes::parsing::MESSAGE_TOO_SHORT);
    }

    #[test]
    fn test_short_header_segment_stops_parsing() {
        let message = parse("MSH|^~\\\rEVN|A01|20240101|20240102");

        assert_eq!(message.outcome(), Outcome::Malformed);
        assert_eq!(message.status.diagnostics().len(), 1);
        assert_eq!(message.status.diagnostics()[0].code, codes::parsing::MESSAGE_TOO_SHORT);
        assert!(message.segments.is_empty());
        assert!(message.delimiters.is_none());
    }

    #[test]
    fn test_header_without_message_type() {
        let message = parse("MSH|^~\\&|A|B\rEVN|A01|1|2");
        assert!(message.is_malformed());
        assert_eq!(message.status.fatal()[0].code, codes::parsing::HEADER_UNPARSEABLE);
        assert!(message.status.fatal()[0].message.contains("lacks MSH.9"));
    }

    #[test]
    fn test_unknown_message_type_still_parses_segments() {
        let message = parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A99|1|P|2.3\rEVN|A01|1");

        assert!(message.is_malformed());
        assert_eq!(message.status.fatal()[0].message, "Unknown message type 'ADT A99'.");
        assert_eq!(message.segments.len(), 2);
        assert!(message.assignments.is_empty());
        assert!(message.message_type.is_none());
        // EVN.3 missing is still cited for drill-down
        assert!(message
            .status
            .warnings()
            .iter()
            .any(|w| w.citations == vec![Citation::Segment(1)]));
    }

    #[test]
    fn test_structure_component_fallback() {
        let message = parse("MSH|^~\\&|A|B|C|D|20240101||ADT^A04^ADT_A01|1|P|2.3\rEVN|A04|1|2");

        assert_eq!(message.message_type.as_deref(), Some("ADT A01"));
        assert!(message.status.is_well_formed());
    }

    #[test]
    fn test_round_trip_field_values() {
        let values = ["A04", "20240101120000", "20240102"];
        let message = parse(&format!("{}\rEVN|{}", HEADER, values.join("|")));

        assert!(message.status.is_well_formed());
        assert!(!message.status.has_diagnostics(), "{:?}", message.status);
        let evn = &message.segments[1];
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(evn.field(i + 1).and_then(|f| f.value()), Some(*expected));
        }
    }

    #[test]
    fn test_trailing_delimiters_omitted() {
        let omitted = parse(&format!("{}\rEVN|A01", HEADER));
        let explicit = parse(&format!("{}\rEVN|A01||", HEADER));

        assert!(omitted.status.is_well_formed());
        assert_eq!(omitted.segments[1].fields.len(), 3);
        let values = |m: &ParsedMessage| -> Vec<Option<String>> {
            m.segments[1].fields.iter().map(|f| f.value().map(str::to_string)).collect()
        };
        assert_eq!(values(&omitted), values(&explicit));
        assert!(omitted.segments[1].fields[1].is_empty());
    }

    #[test]
    fn test_repetition_overflow() {
        let message = parse(&format!("{}\rEVN|A01~A04|20240101|20240102", HEADER));

        assert!(message.status.is_well_formed());
        let field = message.segments[1].field(1).unwrap();
        assert_eq!(field.repetitions.len(), 1);
        assert_eq!(field.value(), Some("A01"));
        assert_eq!(field.status.diagnostics()[0].code, codes::parsing::EXCESS_REPETITIONS);
    }

    #[test]
    fn test_missing_required_segment() {
        let message = parse(HEADER);

        assert!(message.is_malformed());
        assert_eq!(
            message.status.fatal()[0].message,
            "Required segment EVN (ADT A01.1) is missing."
        );
    }

    #[test]
    fn test_null_value_on_required_field() {
        let message = parse(&format!("{}\rEVN|A01|20240101|\"\"", HEADER));

        assert!(!message.status.has_diagnostics());
        assert_eq!(message.segments[1].field(3).and_then(|f| f.value()), Some(""));
    }

    #[test]
    fn test_segment_splitting() {
        assert_eq!(split_segments("A\rB\r", false), vec![(0, "A"), (2, "B")]);
        assert_eq!(split_segments("A\r\r", false), vec![(0, "A"), (2, "")]);
        assert_eq!(split_segments("A\nB", false), vec![(0, "A\nB")]);
        assert_eq!(split_segments("A\r\nB\nC", true), vec![(0, "A"), (3, "B"), (5, "C")]);
        assert_eq!(split_segments("", false), vec![(0, "")]);
    }

    #[test]
    fn test_line_feeds_when_accepted() {
        let grammar = sample_grammar();
        let preferences = ParserPreferences {
            accept_line_feeds: true,
            ..ParserPreferences::strict_core()
        };
        let message = MessageParser::with_preferences(&grammar, preferences)
            .parse(&format!("{}\r\nEVN|A01|1|2\r\n", HEADER));

        assert_eq!(message.segments.len(), 2);
        assert!(message.status.is_well_formed());
        assert_eq!(message.segments[1].span.start.line, 2);
        assert_eq!(message.segments[1].span.start.offset, HEADER.len() + 2);
    }

    #[test]
    fn test_drill_down_report() {
        let message = parse(&format!("{}\rEVN|A01|20240101", HEADER));
        let text = report::render(&message);

        assert!(text.starts_with("message ADT A01: well-formed"));
        assert!(text.contains("segment 2 (EVN): well-formed"));
        assert!(text.contains("warning[P008]: Required field EVN.3 is missing."));
    }
}
