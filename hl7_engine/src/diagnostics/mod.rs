//! Parse diagnostics shared by every node of a parse tree
//!
//! Each node owns a [`NodeStatus`]: a tri-state outcome plus an ordered list
//! of [`ParsingError`]s. Fatal errors always come first. An error may cite
//! children of the node that raised it by index; following those citations
//! walks from a message-level failure down to the token that caused it.

pub mod report;

use crate::logging::codes::Code;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of parsing one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Unresolved,
    WellFormed,
    Malformed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unresolved => "unresolved",
            Self::WellFormed => "well-formed",
            Self::Malformed => "malformed",
        })
    }
}

/// Non-owning reference from a diagnostic to a direct child of its node.
/// Indices are 0-based positions in the child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Citation {
    /// Segment of a message
    Segment(usize),
    /// Field of a segment
    Field(usize),
    /// Repetition of a constituent
    Repetition(usize),
    /// Component or subcomponent of a repetition
    Component(usize),
}

/// One message-time diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingError {
    pub code: Code,
    pub message: String,
    pub citations: Vec<Citation>,
}

impl ParsingError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            citations: Vec::new(),
        }
    }

    /// Diagnostic pointing at one child node
    pub fn citing(code: Code, message: impl Into<String>, citation: Citation) -> Self {
        Self {
            code,
            message: message.into(),
            citations: vec![citation],
        }
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome and diagnostics of a parse node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatus {
    outcome: Outcome,
    diagnostics: Vec<ParsingError>,
    fatal_count: usize,
}

impl NodeStatus {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn diagnostics(&self) -> &[ParsingError] {
        &self.diagnostics
    }

    /// The leading errors that made this node malformed
    pub fn fatal(&self) -> &[ParsingError] {
        &self.diagnostics[..self.fatal_count]
    }

    /// Diagnostics recorded without failing the node
    pub fn warnings(&self) -> &[ParsingError] {
        &self.diagnostics[self.fatal_count..]
    }

    pub fn is_malformed(&self) -> bool {
        self.outcome == Outcome::Malformed
    }

    pub fn is_well_formed(&self) -> bool {
        self.outcome == Outcome::WellFormed
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Mark the node malformed. The error is placed after any earlier fatal
    /// errors and ahead of every non-fatal one.
    pub fn fail(&mut self, error: ParsingError) {
        self.diagnostics.insert(self.fatal_count, error);
        self.fatal_count += 1;
        self.outcome = Outcome::Malformed;
    }

    /// Record a non-fatal diagnostic
    pub fn push(&mut self, error: ParsingError) {
        self.diagnostics.push(error);
    }

    /// Settle an unresolved node as well-formed; a malformed node stays so
    pub fn succeed(&mut self) {
        if self.outcome == Outcome::Unresolved {
            self.outcome = Outcome::WellFormed;
        }
    }
}

/// A parse node that can be drilled into through citations
pub trait DiagnosticNode {
    /// Short human-readable name, e.g. `EVN.1` or `segment 2 (EVN)`
    fn label(&self) -> String;

    fn status(&self) -> &NodeStatus;

    /// Child addressed by `citation`, if this node has one there
    fn cited(&self, citation: Citation) -> Option<&dyn DiagnosticNode>;
}
