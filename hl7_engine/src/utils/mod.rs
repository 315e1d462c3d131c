//! Shared location types used by the parser, diagnostics, and logging.

pub mod span;

pub use span::{Position, Span};
