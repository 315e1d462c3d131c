//! Grammar entity model
//!
//! Entities are built from JSON definition bodies through [`reader::FieldReader`]
//! and are plain data afterwards. Cross-entity rules (reference resolution,
//! lengths) belong to the registry.

pub mod constituent;
pub mod entity;
pub mod error;
pub mod metatype;
pub mod reader;
pub mod table;
pub mod types;

pub use constituent::{depth_letter, Constituent, ConstituentSite, Slot};
pub use entity::{Entity, EntityHeader, EntityKind, Structure};
pub use error::{GrammarError, GrammarResult};
pub use metatype::Metatype;
pub use table::{Table, TableEntry};
pub use types::{Length, Optionality, Repeatability};
