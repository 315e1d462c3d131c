//! Human-readable explanations of grammar entities

use super::{EntityRef, Grammar, LookupError};
use crate::grammar::{Constituent, Entity, EntityKind};

impl Grammar {
    /// Multi-line explanation of whatever `path` names
    pub fn explain(&self, path: &str) -> Result<String, LookupError> {
        let mut out = String::new();
        match self.resolve_path(path)? {
            EntityRef::Entity(entity) => explain_entity(&mut out, entity),
            EntityRef::Constituent(constituent) => {
                out.push_str(&format!("{}\n", constituent));
                push_notes(&mut out, &constituent.long_description, &constituent.from);
                if constituent.is_group() {
                    out.push_str("  Constituents:\n");
                    for child in constituent.children() {
                        push_constituent(&mut out, child, 2);
                    }
                } else if let Some(backing) = constituent.type_ref().and_then(|id| self.entity(id)) {
                    out.push_str(&format!("  Type: {}\n", backing));
                }
                if let Some(table) = constituent.table_ref().and_then(|id| self.entity(id)) {
                    out.push_str(&format!("  Table: {}\n", table));
                }
            }
        }
        Ok(out)
    }
}

fn push_notes(out: &mut String, long_description: &str, from: &str) {
    if !long_description.is_empty() {
        out.push_str(&format!("  {}\n", long_description));
    }
    if !from.is_empty() {
        out.push_str(&format!("  From: {}\n", from));
    }
}

fn push_constituent(out: &mut String, constituent: &Constituent, depth: usize) {
    out.push_str(&format!("{}{}\n", "  ".repeat(depth), constituent));
    for child in constituent.children() {
        push_constituent(out, child, depth + 1);
    }
}

fn explain_entity(out: &mut String, entity: &Entity) {
    out.push_str(&format!("{}\n", entity));
    push_notes(out, &entity.header.long_description, &entity.header.from);

    match &entity.kind {
        EntityKind::Primitive { .. } => {}
        EntityKind::Table { table, .. } => {
            out.push_str("  Codes:\n");
            for entry in &table.entries {
                out.push_str(&format!(
                    "    {} - {}\n",
                    entry.code_display(),
                    entry.text_display()
                ));
            }
        }
        EntityKind::Structure(structure) => {
            out.push_str("  Constituents:\n");
            for constituent in &structure.constituents {
                push_constituent(out, constituent, 2);
            }
        }
    }
}
