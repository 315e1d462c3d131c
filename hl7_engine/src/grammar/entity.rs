//! Grammar entities: a closed union over the six metatypes

use super::constituent::{Constituent, ConstituentSite};
use super::error::{GrammarError, GrammarResult};
use super::metatype::Metatype;
use super::reader::FieldReader;
use super::table::Table;
use super::types::Length;
use serde_json::Value;
use std::fmt;

/// Fields shared by every entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHeader {
    pub type_id: String,
    pub origin: String,
    pub description: String,
    pub long_description: String,
    pub from: String,
}

/// Subcomposite, composite, segment or message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub metatype: Metatype,
    pub constituents: Vec<Constituent>,
    pub last_id: usize,
    pub explicit_length: Option<u64>,
    /// Cached during finalization
    pub length: Option<Length>,
}

impl Structure {
    /// Top-level constituent owning `ordinal`
    pub fn constituent_containing(&self, ordinal: usize) -> Option<&Constituent> {
        self.constituents.iter().find(|c| c.contains(ordinal))
    }

    /// Leaf constituents in ordinal order, groups flattened
    pub fn leaves(&self) -> Vec<&Constituent> {
        let mut leaves = Vec::with_capacity(self.last_id);
        for constituent in &self.constituents {
            constituent.for_each_leaf(&mut |leaf| leaves.push(leaf));
        }
        leaves
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Primitive { length: Length },
    Table { table: Table, length: Option<Length> },
    Structure(Structure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub header: EntityHeader,
    pub kind: EntityKind,
}

impl Entity {
    /// Build an entity from its definition body. Errors in individual
    /// constituents go to `errors`; an error in the entity's own fields
    /// rejects the entity.
    pub fn from_definition(
        metatype: Metatype,
        type_id: &str,
        body: &Value,
        origin: &str,
        errors: &mut Vec<GrammarError>,
    ) -> GrammarResult<Self> {
        let owner = format!("{} {}", metatype, type_id);
        let reader = FieldReader::new(body, &owner, origin)?;

        let header = EntityHeader {
            type_id: type_id.to_string(),
            origin: origin.to_string(),
            description: reader.text("description")?,
            long_description: reader.text("long-description")?,
            from: reader.text("from")?,
        };

        let kind = match metatype {
            Metatype::Primitive => EntityKind::Primitive {
                length: reader
                    .length("length")?
                    .map(Length::Finite)
                    .unwrap_or(Length::Unbounded),
            },
            Metatype::Table => EntityKind::Table {
                table: Table::read(&reader)?,
                length: None,
            },
            Metatype::Subcomposite
            | Metatype::Composite
            | Metatype::Segment
            | Metatype::Message => {
                let explicit_length = reader.length("length")?;
                let items = reader.required_array("constituents")?;
                let site = ConstituentSite {
                    parent_metatype: metatype,
                    parent_type_id: type_id,
                    origin,
                };
                let constituents = site.read_sequence(items, 1, 0, errors);
                let last_id = constituents.last().map_or(0, |c| c.last_id);

                EntityKind::Structure(Structure {
                    metatype,
                    constituents,
                    last_id,
                    explicit_length,
                    length: None,
                })
            }
        };

        Ok(Self { header, kind })
    }

    pub fn metatype(&self) -> Metatype {
        match &self.kind {
            EntityKind::Primitive { .. } => Metatype::Primitive,
            EntityKind::Table { .. } => Metatype::Table,
            EntityKind::Structure(structure) => structure.metatype,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.header.type_id
    }

    pub fn origin(&self) -> &str {
        &self.header.origin
    }

    /// Primitive lengths are known up front; the others once finalized
    pub fn length(&self) -> Option<Length> {
        match &self.kind {
            EntityKind::Primitive { length } => Some(*length),
            EntityKind::Table { length, .. } => *length,
            EntityKind::Structure(structure) => structure.length,
        }
    }

    pub fn structure(&self) -> Option<&Structure> {
        match &self.kind {
            EntityKind::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    pub fn structure_mut(&mut self) -> Option<&mut Structure> {
        match &mut self.kind {
            EntityKind::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.kind {
            EntityKind::Table { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn constituents(&self) -> &[Constituent] {
        self.structure()
            .map(|s| s.constituents.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.metatype(), self.header.type_id)?;
        if !self.header.description.is_empty() {
            write!(f, " - {}", self.header.description)?;
        }
        let length = self
            .length()
            .map_or_else(|| "pending".to_string(), |l| l.to_string());
        match &self.kind {
            EntityKind::Primitive { .. } => write!(f, " [length {}]", length)?,
            EntityKind::Table { table, .. } => {
                write!(f, " [{} codes, length {}]", table.len(), length)?
            }
            EntityKind::Structure(structure) => write!(
                f,
                " [{} constituents, length {}]",
                structure.last_id, length
            )?,
        }
        write!(f, " ({})", self.header.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn build(metatype: Metatype, id: &str, body: Value) -> (GrammarResult<Entity>, Vec<GrammarError>) {
        let mut errors = Vec::new();
        let entity = Entity::from_definition(metatype, id, &body, "test.json", &mut errors);
        (entity, errors)
    }

    #[test]
    fn test_primitive_length_defaults_to_unbounded() {
        let (entity, _) = build(Metatype::Primitive, "ST", json!({"description": "String"}));
        let entity = entity.unwrap();
        assert_eq!(entity.length(), Some(Length::Unbounded));
        assert_eq!(entity.to_string(), "PRIMITIVE ST - String [length unbounded] (test.json)");

        let (entity, _) = build(Metatype::Primitive, "ID", json!({"length": 20}));
        assert_eq!(entity.unwrap().length(), Some(Length::Finite(20)));
    }

    #[test]
    fn test_structure_records_constituent_errors() {
        let (entity, errors) = build(
            Metatype::Segment,
            "EVN",
            json!({
                "description": "Event Type",
                "constituents": [
                    {"optionality": "R", "type": "ID"},
                    {"optionality": "R"},
                    {"optionality": "O", "type": "TS"}
                ]
            }),
        );

        let entity = entity.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(entity.metatype(), Metatype::Segment);
        let structure = entity.structure().unwrap();
        assert_eq!(structure.last_id, 2);
        assert_eq!(structure.length, None);
        assert_eq!(structure.leaves().len(), 2);
        assert_eq!(
            structure.constituent_containing(2).and_then(|c| c.type_ref()),
            Some("TS")
        );
    }

    #[test]
    fn test_structure_requires_constituents() {
        let (entity, _) = build(Metatype::Composite, "CE", json!({"description": "Coded"}));
        assert_matches!(entity, Err(GrammarError::MissingField { field, .. }) if field == "constituents");
    }

    #[test]
    fn test_field_type_errors_name_owner() {
        let (entity, _) = build(Metatype::Primitive, "ST", json!({"description": 3}));
        assert_eq!(
            entity.unwrap_err().to_string(),
            "In 'test.json' - Field 'description' on PRIMITIVE ST specification must be of type 'string', not 'number'."
        );
    }

    #[test]
    fn test_table_entity() {
        let (entity, _) = build(
            Metatype::Table,
            "0001",
            json!({"description": "Sex", "values": {"F": "Female", "M": "Male"}}),
        );
        let entity = entity.unwrap();
        assert_eq!(entity.table().map(|t| t.len()), Some(2));
        assert_eq!(entity.length(), None);
        assert!(entity.constituents().is_empty());
    }
}
