//! Entity metatypes and the rules that hang off each tag

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a grammar entity
///
/// Variants are ordered by layer: an entity may only reference entities of
/// strictly lower layers, which is what lets finalization run bottom-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metatype {
    Primitive,
    Table,
    Subcomposite,
    Composite,
    Segment,
    Message,
}

impl Metatype {
    /// Listing order used in diagnostics
    pub const ALL: [Metatype; 6] = [
        Metatype::Message,
        Metatype::Segment,
        Metatype::Composite,
        Metatype::Subcomposite,
        Metatype::Primitive,
        Metatype::Table,
    ];

    /// Structured layers in finalization order
    pub const STRUCTURED: [Metatype; 4] = [
        Metatype::Subcomposite,
        Metatype::Composite,
        Metatype::Segment,
        Metatype::Message,
    ];

    /// Parse a definition-key tag. Tags are case sensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PRIMITIVE" => Some(Self::Primitive),
            "TABLE" => Some(Self::Table),
            "SUBCOMPOSITE" => Some(Self::Subcomposite),
            "COMPOSITE" => Some(Self::Composite),
            "SEGMENT" => Some(Self::Segment),
            "MESSAGE" => Some(Self::Message),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primitive => "PRIMITIVE",
            Self::Table => "TABLE",
            Self::Subcomposite => "SUBCOMPOSITE",
            Self::Composite => "COMPOSITE",
            Self::Segment => "SEGMENT",
            Self::Message => "MESSAGE",
        }
    }

    /// Metatypes a leaf constituent owned by this metatype may reference
    pub fn allowed_constituents(&self) -> &'static [Metatype] {
        match self {
            Self::Subcomposite => &[Metatype::Primitive],
            Self::Composite => &[Metatype::Subcomposite, Metatype::Primitive],
            Self::Segment => &[
                Metatype::Composite,
                Metatype::Subcomposite,
                Metatype::Primitive,
            ],
            Self::Message => &[Metatype::Segment],
            Self::Primitive | Self::Table => &[],
        }
    }

    pub fn allows_constituent(&self, child: Metatype) -> bool {
        self.allowed_constituents().contains(&child)
    }

    /// Only segment fields and message slots may repeat
    pub fn allows_repeatability(&self) -> bool {
        matches!(self, Self::Segment | Self::Message)
    }

    pub fn allows_segment_groups(&self) -> bool {
        matches!(self, Self::Message)
    }
}

impl fmt::Display for Metatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a set of metatypes as "A", "A or B", or "A, B, or C"
pub fn join_alternatives(metatypes: &[Metatype]) -> String {
    match metatypes {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|m| m.as_str()).collect();
            format!("{}, or {}", head.join(", "), last)
        }
    }
}

/// Every tag, in listing order, for "expected one of" messages
pub fn all_tags() -> String {
    Metatype::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
