//! Source location tracking for message text
//!
//! Positions inside a message are reported the way HL7 users read them: the
//! "line" is the 1-based segment number and the column is the 1-based byte
//! column inside that segment.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a parse node starts in the message text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of the message (0-based)
    pub offset: usize,
    /// Segment number (1-based)
    pub line: u32,
    /// Byte column within the segment (1-based)
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// First byte of the header segment
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// `n` bytes further along the same segment
    fn advance_bytes(self, n: usize) -> Self {
        Self {
            offset: self.offset + n,
            line: self.line,
            column: self.column + n as u32,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte range of a segment, field, or component. Never crosses a segment
/// separator, so start and end share a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    /// Exclusive
    pub end: Position,
}

impl Span {
    /// Span of `len` bytes beginning at `start`
    pub fn at(start: Position, len: usize) -> Self {
        Self {
            start,
            end: start.advance_bytes(len),
        }
    }

    /// Sub-span of `len` bytes starting `from` bytes into this span
    pub fn narrow(&self, from: usize, len: usize) -> Self {
        Self::at(self.start.advance_bytes(from), len)
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Text this span covers in `message`
    pub fn slice<'a>(&self, message: &'a str) -> &'a str {
        &message[self.start.offset..self.end.offset]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
    }
}
