//! Typed field access over a JSON definition body
//!
//! All field rules (presence, JSON type, ranges, defaults) live here so that
//! entity and constituent construction read as a list of field lookups.

use super::error::{GrammarError, GrammarResult};
use super::types::{Optionality, Repeatability};
use crate::config::constants::grammar::UNBOUNDED_REPEATABILITY;
use serde_json::{Map, Value};

/// JSON type name used in diagnostics
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    owner: &'a str,
    origin: &'a str,
}

impl<'a> FieldReader<'a> {
    /// `owner` names the definition in errors, e.g. `SEGMENT EVN`
    pub fn new(body: &'a Value, owner: &'a str, origin: &'a str) -> GrammarResult<Self> {
        match body {
            Value::Object(map) => Ok(Self {
                body: map,
                owner,
                origin,
            }),
            other => Err(GrammarError::invalid_document(
                origin,
                &format!(
                    "{} specification must be of type 'object', not '{}'.",
                    owner,
                    json_type_name(other)
                ),
            )),
        }
    }

    pub fn owner(&self) -> &'a str {
        self.owner
    }

    pub fn origin(&self) -> &'a str {
        self.origin
    }

    pub fn has(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.body.get(key)
    }

    pub fn invalid_type(&self, key: &str, expected: &'static str, actual: &Value) -> GrammarError {
        GrammarError::InvalidFieldType {
            origin: self.origin.to_string(),
            owner: self.owner.to_string(),
            field: key.to_string(),
            expected,
            actual: json_type_name(actual),
        }
    }

    pub fn missing(&self, key: &str) -> GrammarError {
        GrammarError::MissingField {
            origin: self.origin.to_string(),
            owner: self.owner.to_string(),
            field: key.to_string(),
        }
    }

    fn out_of_range(&self, key: &str, value: &Value, requirement: &'static str) -> GrammarError {
        GrammarError::OutOfRange {
            origin: self.origin.to_string(),
            owner: self.owner.to_string(),
            field: key.to_string(),
            value: value.to_string(),
            requirement,
        }
    }

    pub fn string(&self, key: &str) -> GrammarResult<Option<&'a str>> {
        match self.body.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid_type(key, "string", other)),
        }
    }

    pub fn required_string(&self, key: &str) -> GrammarResult<&'a str> {
        self.string(key)?.ok_or_else(|| self.missing(key))
    }

    /// Descriptive text; absent means empty
    pub fn text(&self, key: &str) -> GrammarResult<String> {
        Ok(self.string(key)?.unwrap_or_default().to_string())
    }

    /// Non-negative integer length
    pub fn length(&self, key: &str) -> GrammarResult<Option<u64>> {
        match self.body.get(key) {
            None => Ok(None),
            Some(value @ Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.out_of_range(key, value, "must be a non-negative integer")),
            Some(other) => Err(self.invalid_type(key, "number", other)),
        }
    }

    pub fn array(&self, key: &str) -> GrammarResult<Option<&'a Vec<Value>>> {
        match self.body.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(self.invalid_type(key, "array", other)),
        }
    }

    pub fn required_array(&self, key: &str) -> GrammarResult<&'a Vec<Value>> {
        self.array(key)?.ok_or_else(|| self.missing(key))
    }

    /// Defaults to once; `-1` is unbounded
    pub fn repeatability(&self, key: &str) -> GrammarResult<Repeatability> {
        let value = match self.body.get(key) {
            None => return Ok(Repeatability::ONCE),
            Some(value @ Value::Number(_)) => value,
            Some(other) => return Err(self.invalid_type(key, "integer", other)),
        };

        match value.as_i64() {
            Some(UNBOUNDED_REPEATABILITY) => Ok(Repeatability::Unbounded),
            Some(k) if k >= 1 => u32::try_from(k)
                .map(Repeatability::Limited)
                .map_err(|_| self.out_of_range(key, value, "must fit in 32 bits")),
            _ => Err(self.out_of_range(key, value, "must be a positive integer or -1")),
        }
    }

    pub fn optionality(&self, key: &str) -> GrammarResult<Optionality> {
        let code = self.required_string(key)?;
        Optionality::from_code(code).ok_or_else(|| GrammarError::InvalidFieldValue {
            origin: self.origin.to_string(),
            owner: self.owner.to_string(),
            field: key.to_string(),
            value: code.to_string(),
            expected: format!("one of {}", Optionality::CODES),
        })
    }
}
