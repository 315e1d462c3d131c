//! Dotted-path lookup: `BASE`, `BASE.N`, `BASE.N.D`

use super::Grammar;
use crate::grammar::{Constituent, Entity, Metatype};
use crate::logging::codes;
use std::fmt;
use thiserror::Error;

/// Result of a path lookup
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'g> {
    Entity(&'g Entity),
    Constituent(&'g Constituent),
}

impl<'g> EntityRef<'g> {
    pub fn as_constituent(&self) -> Option<&'g Constituent> {
        match self {
            Self::Constituent(constituent) => Some(constituent),
            Self::Entity(_) => None,
        }
    }
}

impl fmt::Display for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => fmt::Display::fmt(entity, f),
            Self::Constituent(constituent) => fmt::Display::fmt(constituent, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Path '{path}' is malformed: expected BASE, BASE.N or BASE.N.D")]
    MalformedPath { path: String },

    #[error("No entity with type id '{type_id}'")]
    UnknownBase { type_id: String },

    #[error("{metatype} {type_id} has no constituents to index")]
    NotIndexable { type_id: String, metatype: Metatype },

    #[error("Ordinal '{ordinal}' in path '{path}' is not a number")]
    NonNumericOrdinal { path: String, ordinal: String },

    #[error("{type_id} has constituents 1..{last_id}; {ordinal} is out of range")]
    OrdinalOutOfRange {
        type_id: String,
        ordinal: usize,
        last_id: usize,
    },
}

impl LookupError {
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::MalformedPath { .. } | Self::NonNumericOrdinal { .. } => {
                codes::grammar::MALFORMED_PATH
            }
            Self::UnknownBase { .. } => codes::grammar::UNKNOWN_TYPE_ID,
            Self::NotIndexable { .. } => codes::grammar::NOT_INDEXABLE,
            Self::OrdinalOutOfRange { .. } => codes::grammar::ORDINAL_OUT_OF_RANGE,
        }
    }
}

impl Grammar {
    /// Resolve a type id or dotted constituent path; `None` when it does
    /// not name anything
    pub fn get_entity(&self, path: &str) -> Option<EntityRef<'_>> {
        self.resolve_path(path).ok()
    }

    /// Like [`Grammar::get_entity`], reporting why a path failed
    pub fn resolve_path(&self, path: &str) -> Result<EntityRef<'_>, LookupError> {
        let mut parts = path.split('.');
        let base = parts.next().unwrap_or_default();
        let ordinal = parts.next();
        let letter = parts.next();

        if base.is_empty() || parts.next().is_some() {
            return Err(LookupError::MalformedPath {
                path: path.to_string(),
            });
        }

        let entity = self
            .entity(base)
            .ok_or_else(|| LookupError::UnknownBase {
                type_id: base.to_string(),
            })?;

        let Some(ordinal) = ordinal else {
            return Ok(EntityRef::Entity(entity));
        };

        let structure = entity.structure().ok_or_else(|| LookupError::NotIndexable {
            type_id: base.to_string(),
            metatype: entity.metatype(),
        })?;

        let n: usize = ordinal
            .parse()
            .map_err(|_| LookupError::NonNumericOrdinal {
                path: path.to_string(),
                ordinal: ordinal.to_string(),
            })?;

        let letter = match letter {
            None => None,
            Some(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_uppercase() => Some(c),
                    _ => {
                        return Err(LookupError::MalformedPath {
                            path: path.to_string(),
                        })
                    }
                }
            }
        };

        let out_of_range = || LookupError::OrdinalOutOfRange {
            type_id: base.to_string(),
            ordinal: n,
            last_id: structure.last_id,
        };

        let mut current = structure.constituent_containing(n).ok_or_else(out_of_range)?;
        loop {
            if letter == Some(current.depth_letter) || !current.is_group() {
                return Ok(EntityRef::Constituent(current));
            }
            current = current.child_containing(n).ok_or_else(out_of_range)?;
        }
    }
}
