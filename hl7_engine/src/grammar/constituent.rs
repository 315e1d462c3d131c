//! Constituents: ordinal child slots of structured entities

use super::error::{GrammarError, GrammarResult};
use super::metatype::Metatype;
use super::reader::FieldReader;
use super::types::{Length, Optionality, Repeatability};
use crate::config::compile_time::grammar::{MAX_CONSTITUENTS_PER_ENTITY, MAX_GROUP_DEPTH};
use crate::config::constants::grammar::{FIRST_DEPTH_LETTER, MAX_DEPTH_LETTER_OFFSET};
use serde_json::Value;
use std::fmt;

/// Letter identifying a nesting depth; depths past 25 share `'Z'`
pub fn depth_letter(depth: usize) -> char {
    let offset = depth.min(MAX_DEPTH_LETTER_OFFSET) as u32;
    char::from_u32(FIRST_DEPTH_LETTER as u32 + offset).unwrap_or('Z')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Leaf {
        type_ref: String,
        table_ref: Option<String>,
        explicit_length: Option<u64>,
    },
    /// Segment group, legal only inside a message
    Group {
        type_id: String,
        children: Vec<Constituent>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    /// First ordinal owned by this slot
    pub index: usize,
    /// Last ordinal owned; equal to `index` for leaves
    pub last_id: usize,
    pub depth: usize,
    pub depth_letter: char,
    pub parent_metatype: Metatype,
    pub parent_type_id: String,
    pub origin: String,
    pub description: String,
    pub long_description: String,
    pub from: String,
    pub optionality: Optionality,
    pub repeatability: Repeatability,
    pub slot: Slot,
    /// Cached during finalization
    pub length: Option<Length>,
}

/// Where a constituent is being read
#[derive(Debug, Clone, Copy)]
pub struct ConstituentSite<'a> {
    pub parent_metatype: Metatype,
    pub parent_type_id: &'a str,
    pub origin: &'a str,
}

impl<'a> ConstituentSite<'a> {
    /// Read a run of constituent bodies, numbering accepted ones from
    /// `first_index`. Rejected bodies are recorded in `errors` and take no
    /// ordinal.
    pub fn read_sequence(
        &self,
        items: &[Value],
        first_index: usize,
        depth: usize,
        errors: &mut Vec<GrammarError>,
    ) -> Vec<Constituent> {
        let items = if items.len() > MAX_CONSTITUENTS_PER_ENTITY {
            errors.push(GrammarError::limit_exceeded(
                self.origin,
                "Constituents per entity",
                MAX_CONSTITUENTS_PER_ENTITY,
            ));
            &items[..MAX_CONSTITUENTS_PER_ENTITY]
        } else {
            items
        };

        let mut constituents = Vec::with_capacity(items.len());
        let mut next_index = first_index;

        for item in items {
            match self.read(item, next_index, depth, errors) {
                Ok(constituent) => {
                    next_index = constituent.last_id + 1;
                    constituents.push(constituent);
                }
                Err(error) => errors.push(error),
            }
        }

        constituents
    }

    fn read(
        &self,
        body: &Value,
        index: usize,
        depth: usize,
        errors: &mut Vec<GrammarError>,
    ) -> GrammarResult<Constituent> {
        let owner = format!("{} {}.{}", self.parent_metatype, self.parent_type_id, index);
        let reader = FieldReader::new(body, &owner, self.origin)?;

        let optionality = reader.optionality("optionality")?;

        if reader.has("repeatability") && !self.parent_metatype.allows_repeatability() {
            return Err(GrammarError::RepeatabilityNotAllowed {
                origin: self.origin.to_string(),
                owner,
                parent_metatype: self.parent_metatype,
            });
        }
        let repeatability = reader.repeatability("repeatability")?;

        let letter = depth_letter(depth);
        let (slot, last_id) = if reader.has("constituents") {
            if !self.parent_metatype.allows_segment_groups() {
                return Err(GrammarError::SegmentGroupNotAllowed {
                    origin: self.origin.to_string(),
                    owner,
                    parent_metatype: self.parent_metatype,
                });
            }
            if depth + 1 > MAX_GROUP_DEPTH {
                return Err(GrammarError::limit_exceeded(
                    self.origin,
                    "Segment group depth",
                    MAX_GROUP_DEPTH,
                ));
            }

            let items = reader.required_array("constituents")?;
            let children = self.read_sequence(items, index, depth + 1, errors);
            let last_id = match children.last() {
                Some(last) => last.last_id,
                None => {
                    return Err(GrammarError::InvalidFieldValue {
                        origin: self.origin.to_string(),
                        owner,
                        field: "constituents".to_string(),
                        value: "[]".to_string(),
                        expected: "at least one valid constituent".to_string(),
                    })
                }
            };

            let slot = Slot::Group {
                type_id: format!("{}.{}.{}", self.parent_type_id, index, letter),
                children,
            };
            (slot, last_id)
        } else {
            let slot = Slot::Leaf {
                type_ref: reader.required_string("type")?.to_string(),
                table_ref: reader.string("table")?.map(str::to_string),
                explicit_length: reader.length("length")?,
            };
            (slot, index)
        };

        Ok(Constituent {
            index,
            last_id,
            depth,
            depth_letter: letter,
            parent_metatype: self.parent_metatype,
            parent_type_id: self.parent_type_id.to_string(),
            origin: self.origin.to_string(),
            description: reader.text("description")?,
            long_description: reader.text("long-description")?,
            from: reader.text("from")?,
            optionality,
            repeatability,
            slot,
            length: None,
        })
    }
}

impl Constituent {
    /// Dotted address, e.g. `EVN.1`
    pub fn path(&self) -> String {
        format!("{}.{}", self.parent_type_id, self.index)
    }

    /// Path plus description, as quoted in grammar errors
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            self.path()
        } else {
            format!("{} - {}", self.path(), self.description)
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.slot, Slot::Group { .. })
    }

    pub fn type_ref(&self) -> Option<&str> {
        match &self.slot {
            Slot::Leaf { type_ref, .. } => Some(type_ref),
            Slot::Group { .. } => None,
        }
    }

    pub fn table_ref(&self) -> Option<&str> {
        match &self.slot {
            Slot::Leaf { table_ref, .. } => table_ref.as_deref(),
            Slot::Group { .. } => None,
        }
    }

    pub fn children(&self) -> &[Constituent] {
        match &self.slot {
            Slot::Group { children, .. } => children,
            Slot::Leaf { .. } => &[],
        }
    }

    pub fn contains(&self, ordinal: usize) -> bool {
        self.index <= ordinal && ordinal <= self.last_id
    }

    /// Child owning `ordinal`
    pub fn child_containing(&self, ordinal: usize) -> Option<&Constituent> {
        self.children().iter().find(|c| c.contains(ordinal))
    }

    /// Cached length; unbounded before finalization
    pub fn resolved_length(&self) -> Length {
        self.length.unwrap_or(Length::Unbounded)
    }

    /// First leaf in document order, descending into groups
    pub fn first_leaf(&self) -> &Constituent {
        match self.children().first() {
            Some(child) => child.first_leaf(),
            None => self,
        }
    }

    pub fn for_each_leaf<'s, F>(&'s self, f: &mut F)
    where
        F: FnMut(&'s Constituent),
    {
        match &self.slot {
            Slot::Group { children, .. } => {
                for child in children {
                    child.for_each_leaf(f);
                }
            }
            Slot::Leaf { .. } => f(self),
        }
    }
}

impl fmt::Display for Constituent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;
        match &self.slot {
            Slot::Leaf {
                type_ref,
                table_ref,
                ..
            } => {
                write!(f, " : {}", type_ref)?;
                if let Some(table) = table_ref {
                    write!(f, " (table {})", table)?;
                }
            }
            Slot::Group { type_id, children } => {
                write!(f, " : group {} of {}", type_id, children.len())?;
            }
        }
        write!(
            f,
            " [{}, repeat {}, length {}]",
            self.optionality,
            self.repeatability,
            self.resolved_length()
        )
    }
}
