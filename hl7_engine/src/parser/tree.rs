//! Parse tree produced for one message
//!
//! Nodes are owned top-down: a message owns its segments, a segment its
//! fields, a field its repetitions, a composite repetition its components.
//! Diagnostics cite children by index only.

use super::delimiters::Delimiters;
use crate::diagnostics::{Citation, DiagnosticNode, NodeStatus, Outcome};
use crate::grammar::{Optionality, Repeatability};
use crate::utils::Span;

/// Template slot a segment was fitted into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAssignment {
    /// Index into [`ParsedMessage::segments`]
    pub segment: usize,
    /// Dotted path of the template slot, e.g. `ADT A01.1`
    pub slot: String,
    /// 1-based repetition of the slot this segment filled, counted within
    /// the enclosing group occurrence
    pub repetition: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub raw: String,
    pub delimiters: Option<Delimiters>,
    /// Type id of the message template, once resolved
    pub message_type: Option<String>,
    pub segments: Vec<ParsedSegment>,
    pub assignments: Vec<SegmentAssignment>,
    pub status: NodeStatus,
}

impl ParsedMessage {
    pub(crate) fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            delimiters: None,
            message_type: None,
            segments: Vec::new(),
            assignments: Vec::new(),
            status: NodeStatus::default(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.status.outcome()
    }

    pub fn is_malformed(&self) -> bool {
        self.status.is_malformed()
    }

    /// Where segment `index` was fitted, if it was
    pub fn assignment_of(&self, index: usize) -> Option<&SegmentAssignment> {
        self.assignments.iter().find(|a| a.segment == index)
    }
}

impl DiagnosticNode for ParsedMessage {
    fn label(&self) -> String {
        match &self.message_type {
            Some(type_id) => format!("message {}", type_id),
            None => "message".to_string(),
        }
    }

    fn status(&self) -> &NodeStatus {
        &self.status
    }

    fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode> {
        match citation {
            Citation::Segment(i) => self.segments.get(i).map(|s| s as &dyn DiagnosticNode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSegment {
    pub raw: String,
    pub span: Span,
    /// 1-based position in the message
    pub number: usize,
    pub type_id: String,
    pub fields: Vec<ParsedConstituent>,
    pub status: NodeStatus,
}

impl ParsedSegment {
    /// Field by 1-based ordinal, as in `EVN.1`
    pub fn field(&self, ordinal: usize) -> Option<&ParsedConstituent> {
        ordinal.checked_sub(1).and_then(|i| self.fields.get(i))
    }
}

impl DiagnosticNode for ParsedSegment {
    fn label(&self) -> String {
        format!("segment {} ({})", self.number, self.type_id)
    }

    fn status(&self) -> &NodeStatus {
        &self.status
    }

    fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode> {
        match citation {
            Citation::Field(i) => self.fields.get(i).map(|f| f as &dyn DiagnosticNode),
            _ => None,
        }
    }
}

/// A field, component, or subcomponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConstituent {
    pub raw: String,
    pub span: Span,
    /// Dotted path of the grammar slot, e.g. `MSG.2`
    pub path: String,
    /// 1 for fields, 2 for components, 3 for subcomponents
    pub level: u8,
    pub type_id: String,
    pub optionality: Optionality,
    pub repeatability: Repeatability,
    pub repetitions: Vec<ParsedRepetition>,
    pub status: NodeStatus,
}

impl ParsedConstituent {
    /// Primitive value of the first repetition. `Some("")` is the HL7 null
    /// value `""`; `None` means absent or not a primitive.
    pub fn value(&self) -> Option<&str> {
        self.repetitions.first().and_then(ParsedRepetition::value)
    }

    /// Component of the first repetition, by 1-based ordinal
    pub fn component(&self, ordinal: usize) -> Option<&ParsedConstituent> {
        self.repetitions
            .first()
            .and_then(|r| r.component(ordinal))
    }

    /// True when nothing was supplied for this slot
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl DiagnosticNode for ParsedConstituent {
    fn label(&self) -> String {
        self.path.clone()
    }

    fn status(&self) -> &NodeStatus {
        &self.status
    }

    fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode> {
        match citation {
            Citation::Repetition(i) => self.repetitions.get(i).map(|r| r as &dyn DiagnosticNode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepetitionValue {
    /// `None` for an empty body, `Some("")` for the null value
    Primitive(Option<String>),
    Components(Vec<ParsedConstituent>),
    /// Backing type unknown; kept raw
    Unparsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRepetition {
    pub raw: String,
    pub span: Span,
    /// Dotted path of the owning slot
    pub path: String,
    /// 1-based
    pub number: usize,
    pub value: RepetitionValue,
    pub status: NodeStatus,
}

impl ParsedRepetition {
    pub fn value(&self) -> Option<&str> {
        match &self.value {
            RepetitionValue::Primitive(value) => value.as_deref(),
            _ => None,
        }
    }

    pub fn components(&self) -> &[ParsedConstituent] {
        match &self.value {
            RepetitionValue::Components(components) => components,
            _ => &[],
        }
    }

    pub fn component(&self, ordinal: usize) -> Option<&ParsedConstituent> {
        ordinal.checked_sub(1).and_then(|i| self.components().get(i))
    }
}

impl DiagnosticNode for ParsedRepetition {
    fn label(&self) -> String {
        format!("{} repetition {}", self.path, self.number)
    }

    fn status(&self) -> &NodeStatus {
        &self.status
    }

    fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode> {
        match citation {
            Citation::Component(i) => self.components().get(i).map(|c| c as &dyn DiagnosticNode),
            _ => None,
        }
    }
}
