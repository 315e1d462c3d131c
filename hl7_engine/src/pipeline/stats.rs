use crate::parser::{ParsedConstituent, ParsedMessage};
use std::fmt;

/// Node counts over one parse tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub segments: usize,
    /// Fields, components and subcomponents
    pub constituents: usize,
    pub repetitions: usize,
    /// Diagnostics on every node, the message included
    pub diagnostics: usize,
    pub malformed_nodes: usize,
    /// Deepest constituent level reached: 1 for fields, 2 for components,
    /// 3 for subcomponents
    pub deepest_nesting: u8,
}

impl ParseStats {
    pub fn from_message(message: &ParsedMessage) -> Self {
        let mut stats = Self {
            segments: message.segments.len(),
            ..Self::default()
        };
        stats.count_status(&message.status);

        for segment in &message.segments {
            stats.count_status(&segment.status);
            for field in &segment.fields {
                stats.visit(field);
            }
        }
        stats
    }

    fn count_status(&mut self, status: &crate::diagnostics::NodeStatus) {
        self.diagnostics += status.diagnostics().len();
        if status.is_malformed() {
            self.malformed_nodes += 1;
        }
    }

    fn visit(&mut self, constituent: &ParsedConstituent) {
        self.constituents += 1;
        self.deepest_nesting = self.deepest_nesting.max(constituent.level);
        self.count_status(&constituent.status);

        for repetition in &constituent.repetitions {
            self.repetitions += 1;
            self.count_status(&repetition.status);
            for component in repetition.components() {
                self.visit(component);
            }
        }
    }
}

impl fmt::Display for ParseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments, {} constituents, {} repetitions, {} diagnostics, {} malformed",
            self.segments, self.constituents, self.repetitions, self.diagnostics, self.malformed_nodes
        )
    }
}
