//! HL7 v2 grammar finalization and message parsing
//!
//! Grammars are built from JSON definition documents ([`registry`],
//! [`loader`]), finalized once, and then shared read-only by any number of
//! message parses ([`parser`], [`pipeline`], [`batch`]).

#[macro_use]
pub mod logging;

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod file_processor;
pub mod grammar;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use diagnostics::{Outcome, ParsingError};
pub use grammar::GrammarError;
pub use loader::{GrammarLoader, LoaderError};
pub use parser::{MessageParser, ParsedMessage};
pub use pipeline::{PipelineError, PipelineResult};
pub use registry::{Grammar, GrammarBuilder};
