//! Message parsing against a finalized grammar
//!
//! Parsing never fails outright: every problem is recorded as a diagnostic on
//! the node it concerns, and the caller inspects the tree's outcomes.
//!
//! ```
//! use hl7_engine::parser::MessageParser;
//! use hl7_engine::registry::GrammarBuilder;
//! use serde_json::json;
//!
//! let mut builder = GrammarBuilder::new();
//! builder.consume(&json!({
//!     "PRIMITIVE ST": {"length": 20},
//!     "SEGMENT EVN": {"constituents": [{"optionality": "R", "type": "ST"}]},
//!     "MESSAGE ADT A01": {"constituents": [{"optionality": "R", "type": "EVN"}]}
//! }), "defs.json");
//! let grammar = builder.finalize();
//!
//! let message = MessageParser::new(&grammar).parse("MSH|^~\\&|||||||ADT^A01\rEVN|A01");
//! assert_eq!(message.message_type.as_deref(), Some("ADT A01"));
//! assert_eq!(message.segments[1].field(1).and_then(|f| f.value()), Some("A01"));
//! ```

pub mod constituent;
pub mod delimiters;
pub mod fitting;
pub mod message;
pub mod segment;
pub mod tree;

pub use delimiters::Delimiters;
pub use tree::{
    ParsedConstituent, ParsedMessage, ParsedRepetition, ParsedSegment, RepetitionValue,
    SegmentAssignment,
};

use crate::config::runtime::ParserPreferences;
use crate::registry::Grammar;

/// Everything a node parser needs to consult
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseContext<'a> {
    pub grammar: &'a Grammar,
    pub delimiters: Delimiters,
    pub preferences: &'a ParserPreferences,
}

/// Parses message text against one finalized grammar
#[derive(Debug, Clone)]
pub struct MessageParser<'g> {
    grammar: &'g Grammar,
    preferences: ParserPreferences,
}

impl<'g> MessageParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_preferences(grammar, ParserPreferences::default())
    }

    pub fn with_preferences(grammar: &'g Grammar, preferences: ParserPreferences) -> Self {
        Self {
            grammar,
            preferences,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn preferences(&self) -> &ParserPreferences {
        &self.preferences
    }

    pub fn parse(&self, text: &str) -> ParsedMessage {
        message::parse_message(self.grammar, &self.preferences, text)
    }
}

/// Parse `text` with default preferences
pub fn parse_message(grammar: &Grammar, text: &str) -> ParsedMessage {
    MessageParser::new(grammar).parse(text)
}
