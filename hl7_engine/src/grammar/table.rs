//! Code tables

use super::error::{GrammarError, GrammarResult};
use super::reader::{json_type_name, FieldReader};
use serde_json::Value;

/// Separator used when a multi-part code or text is shown or measured
pub const PART_SEPARATOR: char = '&';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub code: Vec<String>,
    pub text: Vec<String>,
}

impl TableEntry {
    /// Encoded length of the code, one separator between parts
    pub fn code_length(&self) -> u64 {
        let chars: usize = self.code.iter().map(|part| part.chars().count()).sum();
        (chars + self.code.len().saturating_sub(1)) as u64
    }

    pub fn single_code(&self) -> Option<&str> {
        match self.code.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn code_display(&self) -> String {
        self.code.join(&PART_SEPARATOR.to_string())
    }

    pub fn text_display(&self) -> String {
        self.text.join(&PART_SEPARATOR.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub entries: Vec<TableEntry>,
    pub explicit_length: Option<u64>,
}

impl Table {
    pub fn read(reader: &FieldReader<'_>) -> GrammarResult<Self> {
        let explicit_length = reader.length("length")?;
        let entries = match reader.get("values") {
            None => Vec::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(code, text)| {
                    Ok(TableEntry {
                        code: vec![code.clone()],
                        text: read_parts(reader, text)?,
                    })
                })
                .collect::<GrammarResult<Vec<_>>>()?,
            Some(Value::Array(pairs)) => pairs
                .iter()
                .map(|pair| read_pair(reader, pair))
                .collect::<GrammarResult<Vec<_>>>()?,
            Some(other) => return Err(reader.invalid_type("values", "object or array", other)),
        };

        Ok(Self {
            entries,
            explicit_length,
        })
    }

    pub fn longest_code(&self) -> u64 {
        self.entries
            .iter()
            .map(TableEntry::code_length)
            .max()
            .unwrap_or(0)
    }

    /// Whether `value` is one of the codes. `None` when the table cannot be
    /// checked: it is empty or has multi-part codes.
    pub fn contains_code(&self, value: &str) -> Option<bool> {
        if self.entries.is_empty() {
            return None;
        }
        let mut found = false;
        for entry in &self.entries {
            match entry.single_code() {
                Some(code) => found |= code == value,
                None => return None,
            }
        }
        Some(found)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_parts(reader: &FieldReader<'_>, value: &Value) -> GrammarResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => Ok(s.clone()),
                other => Err(reader.invalid_type("values", "string", other)),
            })
            .collect(),
        other => Err(reader.invalid_type("values", "string or array", other)),
    }
}

fn read_pair(reader: &FieldReader<'_>, pair: &Value) -> GrammarResult<TableEntry> {
    match pair {
        Value::Array(items) if items.len() == 2 => Ok(TableEntry {
            code: read_parts(reader, &items[0])?,
            text: read_parts(reader, &items[1])?,
        }),
        other => Err(GrammarError::InvalidFieldValue {
            origin: reader.origin().to_string(),
            owner: reader.owner().to_string(),
            field: "values".to_string(),
            value: format!("{} {}", json_type_name(other), other),
            expected: "a 2-element [code, text] pair".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn read(body: Value) -> GrammarResult<Table> {
        let reader = FieldReader::new(&body, "TABLE 0001", "tables.json")?;
        Table::read(&reader)
    }

    #[test]
    fn test_object_values() {
        let table = read(json!({"values": {"F": "Female", "M": "Male", "UN": "Unknown"}})).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.longest_code(), 2);
        assert_eq!(table.contains_code("M"), Some(true));
        assert_eq!(table.contains_code("X"), Some(false));
    }

    #[test]
    fn test_pair_values_with_multi_part_codes() {
        let table = read(json!({
            "values": [["A", "Alpha"], [["ABC", "D"], ["Multi", "part"]]]
        }))
        .unwrap();

        assert_eq!(table.entries[1].code_length(), 5);
        assert_eq!(table.entries[1].code_display(), "ABC&D");
        assert_eq!(table.longest_code(), 5);
        assert_eq!(table.contains_code("A"), None);
    }

    #[test]
    fn test_empty_table() {
        let table = read(json!({"description": "User-defined"})).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.longest_code(), 0);
        assert_eq!(table.contains_code("anything"), None);
    }

    #[test]
    fn test_invalid_values() {
        assert_matches!(
            read(json!({"values": "F"})),
            Err(GrammarError::InvalidFieldType { expected: "object or array", .. })
        );
        assert_matches!(
            read(json!({"values": [["A", "Alpha", "extra"]]})),
            Err(GrammarError::InvalidFieldValue { .. })
        );
        assert_matches!(
            read(json!({"values": {"A": 1}})),
            Err(GrammarError::InvalidFieldType { actual: "number", .. })
        );
    }
}
