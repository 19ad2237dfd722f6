//! Field values - the canonical scalar form every field is stored in
//!
//! Raw input arrives as JSON. Normalization maps each value onto one of four
//! storable shapes:
//! - `String`: JSON strings (and booleans, as `"true"` / `"false"`)
//! - `Integer`: JSON numbers, fractional part truncated toward zero
//! - `NestedAsText`: JSON objects and arrays, serialized to text
//! - `Null`: JSON null
//!
//! Strings are stored as TEXT and nested values as BLOB holding the JSON text,
//! so the storage class alone tells the two apart on the way back.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Map;

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    NestedAsText(String),
    Null,
}

impl FieldValue {
    /// Normalize a single raw JSON value.
    ///
    /// Numbers are truncated, not rounded: `9.99` becomes `9` and `-2.7`
    /// becomes `-2`. Values outside the `i64` range saturate.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match raw {
            Json::Null => FieldValue::Null,
            Json::String(s) => FieldValue::String(s.clone()),
            Json::Bool(b) => FieldValue::String(b.to_string()),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if n.as_u64().is_some() {
                    FieldValue::Integer(i64::MAX)
                } else {
                    // `as` truncates toward zero and saturates
                    FieldValue::Integer(n.as_f64().unwrap_or_default() as i64)
                }
            }
            Json::Array(_) | Json::Object(_) => FieldValue::NestedAsText(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) | FieldValue::NestedAsText(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::NestedAsText(s) => ToSqlOutput::Borrowed(ValueRef::Blob(s.as_bytes())),
            FieldValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(i) => FieldValue::Integer(i),
            ValueRef::Real(f) => FieldValue::Integer(f as i64),
            ValueRef::Text(t) => FieldValue::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => FieldValue::NestedAsText(String::from_utf8_lossy(b).into_owned()),
        })
    }
}

/// Insertion-ordered field map.
///
/// Keys keep the caller's casing. Inserting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Case-insensitive lookup, matching how SQLite resolves column names
    pub fn get_ignore_case(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Normalize a raw JSON field map, preserving key order.
pub fn normalize(raw: &Map<String, serde_json::Value>) -> Fields {
    raw.iter()
        .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
        .collect()
}
