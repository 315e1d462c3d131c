//! Greedy left-to-right fitting of parsed segments to a message template

use super::tree::{ParsedMessage, ParsedSegment, SegmentAssignment};
use crate::config::constants::protocol::HEADER_SEGMENT_ID;
use crate::diagnostics::{Citation, ParsingError};
use crate::grammar::{Constituent, Slot, Structure};
use crate::logging::codes;

struct Fitter<'a> {
    segments: &'a [ParsedSegment],
    cursor: usize,
    assignments: Vec<SegmentAssignment>,
    /// Parallel to `assignments`: whether the filled slot is required
    required: Vec<bool>,
    missing: Vec<ParsingError>,
}

impl<'a> Fitter<'a> {
    fn next_segment(&self) -> Option<&'a ParsedSegment> {
        self.segments.get(self.cursor)
    }

    fn fit_sequence(&mut self, slots: &[Constituent]) {
        for slot in slots {
            self.fit_slot(slot);
        }
    }

    fn fit_slot(&mut self, slot: &Constituent) {
        let mut count = 0;
        loop {
            if slot.repeatability.max().is_some_and(|max| count >= max) {
                break;
            }
            let Some(segment) = self.next_segment() else {
                break;
            };
            if !can_start(slot, segment) {
                break;
            }

            match &slot.slot {
                Slot::Leaf { .. } => {
                    self.assignments.push(SegmentAssignment {
                        segment: self.cursor,
                        slot: slot.path(),
                        repetition: count + 1,
                    });
                    self.required.push(slot.optionality.is_required());
                    self.cursor += 1;
                }
                Slot::Group { children, .. } => {
                    let before = self.cursor;
                    self.fit_sequence(children);
                    if self.cursor == before {
                        break;
                    }
                }
            }
            count += 1;
        }

        if count == 0 && slot.optionality.is_required() {
            self.missing.push(missing_slot(slot));
        }
    }
}

/// True when `segment` can begin an occurrence of `slot`. A group can be
/// started by any of its leading children up to and including the first
/// required one.
fn can_start(slot: &Constituent, segment: &ParsedSegment) -> bool {
    match &slot.slot {
        Slot::Leaf { type_ref, .. } => *type_ref == segment.type_id,
        Slot::Group { children, .. } => {
            for child in children {
                if can_start(child, segment) {
                    return true;
                }
                if child.optionality.is_required() {
                    break;
                }
            }
            false
        }
    }
}

fn missing_slot(slot: &Constituent) -> ParsingError {
    let message = match &slot.slot {
        Slot::Leaf { type_ref, .. } => {
            format!("Required segment {} ({}) is missing.", type_ref, slot.path())
        }
        Slot::Group { type_id, .. } => format!(
            "Required segment group {} starting with {} is missing.",
            type_id,
            slot.first_leaf().type_ref().unwrap_or_default()
        ),
    };
    ParsingError::new(codes::parsing::MISSING_SEGMENT, message)
}

/// Fit `message.segments` to `template`, recording assignments and
/// message-level diagnostics
pub(crate) fn fit_segments(template_id: &str, template: &Structure, message: &mut ParsedMessage) {
    let header_in_template = template
        .constituents
        .first()
        .and_then(|c| c.first_leaf().type_ref())
        == Some(HEADER_SEGMENT_ID);

    let mut fitter = Fitter {
        segments: &message.segments,
        cursor: if header_in_template { 0 } else { 1 },
        assignments: Vec::new(),
        required: Vec::new(),
        missing: Vec::new(),
    };
    fitter.fit_sequence(&template.constituents);

    let Fitter {
        cursor,
        assignments,
        required,
        missing,
        ..
    } = fitter;

    for error in missing {
        message.status.fail(error);
    }

    if !header_in_template {
        if let Some(header) = message.segments.first() {
            if header.status.has_diagnostics() {
                message.status.push(ParsingError::citing(
                    codes::parsing::CHILD_DIAGNOSTICS,
                    format!("Error(s) encountered while parsing header segment {}.", header.type_id),
                    Citation::Segment(0),
                ));
            }
        }
    }

    for (assignment, required) in assignments.iter().zip(required) {
        let segment = &message.segments[assignment.segment];
        if segment.status.is_malformed() && required {
            message.status.fail(ParsingError::citing(
                codes::parsing::CHILD_MALFORMED,
                format!("Segment {} ({}) is malformed.", segment.number, segment.type_id),
                Citation::Segment(assignment.segment),
            ));
        } else if segment.status.has_diagnostics() {
            message.status.push(ParsingError::citing(
                codes::parsing::CHILD_DIAGNOSTICS,
                format!(
                    "Error(s) encountered while parsing segment {} ({}).",
                    segment.number, segment.type_id
                ),
                Citation::Segment(assignment.segment),
            ));
        }
    }

    for (index, segment) in message.segments.iter().enumerate().skip(cursor) {
        message.status.push(ParsingError::citing(
            codes::parsing::UNEXPECTED_SEGMENT,
            format!(
                "Unexpected segment {} ({}) does not fit the {} template.",
                segment.number, segment.type_id, template_id
            ),
            Citation::Segment(index),
        ));
    }

    message.assignments = assignments;
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::Citation;
    use crate::logging::codes;
    use crate::parser::MessageParser;
    use crate::registry::{Grammar, GrammarBuilder};
    use serde_json::json;

    const HEADER: &str = "MSH|^~\\&|||||||ORM^O01";

    fn grammar() -> Grammar {
        let mut builder = GrammarBuilder::new();
        builder.consume(
            &json!({
                "PRIMITIVE ST": {},
                "COMPOSITE MSG": {"constituents": [
                    {"optionality": "R", "type": "ST"},
                    {"optionality": "R", "type": "ST"}
                ]},
                "SEGMENT MSH": {"constituents": [
                    {"optionality": "R", "type": "ST"},
                    {"optionality": "R", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "O", "type": "ST"},
                    {"optionality": "R", "type": "MSG"}
                ]},
                "SEGMENT PID": {"constituents": [{"optionality": "R", "type": "ST"}]},
                "SEGMENT ORC": {"constituents": [{"optionality": "R", "type": "ST"}]},
                "SEGMENT OBR": {"constituents": [{"optionality": "R", "type": "ST"}]},
                "SEGMENT NTE": {"constituents": [{"optionality": "O", "type": "ST"}]},
                "MESSAGE ORM O01": {"constituents": [
                    {"optionality": "R", "type": "MSH"},
                    {"optionality": "O", "type": "NTE", "repeatability": -1},
                    {"optionality": "O", "constituents": [
                        {"optionality": "R", "type": "PID"}
                    ]},
                    {"optionality": "R", "repeatability": -1, "constituents": [
                        {"optionality": "R", "type": "ORC"},
                        {"optionality": "O", "constituents": [
                            {"optionality": "R", "type": "OBR"},
                            {"optionality": "O", "type": "NTE", "repeatability": -1}
                        ]}
                    ]}
                ]}
            }),
            "orm.json",
        );
        let grammar = builder.finalize();
        assert!(!grammar.has_errors(), "{:?}", grammar.errors());
        grammar
    }

    fn parse(grammar: &Grammar, body: &[&str]) -> crate::parser::ParsedMessage {
        let mut text = HEADER.to_string();
        for segment in body {
            text.push('\r');
            text.push_str(segment);
        }
        MessageParser::new(grammar).parse(&text)
    }

    fn slots(message: &crate::parser::ParsedMessage) -> Vec<(usize, &str, usize)> {
        message
            .assignments
            .iter()
            .map(|a| (a.segment, a.slot.as_str(), a.repetition))
            .collect()
    }

    #[test]
    fn test_nested_groups_with_repetition() {
        let grammar = grammar();
        let message = parse(
            &grammar,
            &["NTE|a", "PID|1", "ORC|1", "OBR|1", "NTE|b", "NTE|c", "ORC|2"],
        );

        assert!(message.status.is_well_formed(), "{:?}", message.status);
        assert!(!message.status.has_diagnostics());
        assert_eq!(
            slots(&message),
            vec![
                (0, "ORM O01.1", 1),
                (1, "ORM O01.2", 1),
                (2, "ORM O01.3", 1),
                (3, "ORM O01.4", 1),
                (4, "ORM O01.5", 1),
                (5, "ORM O01.6", 1),
                (6, "ORM O01.6", 2),
                (7, "ORM O01.4", 1),
            ]
        );
    }

    #[test]
    fn test_optional_slots_skipped() {
        let grammar = grammar();
        let message = parse(&grammar, &["ORC|1"]);

        assert!(message.status.is_well_formed());
        assert_eq!(message.assignment_of(1).map(|a| a.slot.as_str()), Some("ORM O01.4"));
    }

    #[test]
    fn test_missing_required_group() {
        let grammar = grammar();
        let message = parse(&grammar, &["PID|1"]);

        assert!(message.status.is_malformed());
        let fatal = &message.status.fatal()[0];
        assert_eq!(fatal.code, codes::parsing::MISSING_SEGMENT);
        assert!(fatal.message.contains("ORM O01.4.A starting with ORC"));
    }

    #[test]
    fn test_leftover_segments_are_reported() {
        let grammar = grammar();
        let message = parse(&grammar, &["ORC|1", "PID|late", "ORC|2"]);

        assert!(message.status.is_well_formed());
        let unexpected: Vec<_> = message
            .status
            .diagnostics()
            .iter()
            .filter(|d| d.code == codes::parsing::UNEXPECTED_SEGMENT)
            .collect();
        assert_eq!(unexpected.len(), 2);
        assert_eq!(unexpected[0].citations, vec![Citation::Segment(2)]);
        assert_eq!(unexpected[1].citations, vec![Citation::Segment(3)]);
    }

    #[test]
    fn test_malformed_required_segment_fails_message() {
        let grammar = grammar();
        let message = parse(&grammar, &["ORC|1", "OBR"]);

        // "OBR" is too short to parse but still fills the required OBR slot
        assert!(message.status.is_malformed());
        let fatal = &message.status.fatal()[0];
        assert_eq!(fatal.code, codes::parsing::CHILD_MALFORMED);
        assert_eq!(fatal.citations, vec![Citation::Segment(2)]);
        assert_eq!(fatal.message, "Segment 3 (OBR) is malformed.");
    }
}
