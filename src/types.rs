//! Common types used throughout rowtail
//!
//! This module contains the row model shared by sources, the poller and
//! sinks, plus the persisted cursor record.

use base64::Engine as _;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Row identifier used for cursoring
pub type RowId = i64;

// ============================================================================
// Field Values
// ============================================================================

/// A single column value as read from the source
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Text value
    Text(String),
    /// Binary value
    Blob(Vec<u8>),
}

impl Value {
    /// Integer view of this value, if it has one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to a JSON value. Blobs become base64 strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Real(f) => {
                serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Blob(b) => {
                JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One fetched row: its identifier plus all columns in select order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Value of the identifier column
    pub id: RowId,
    /// Columns in the order the source returned them
    pub fields: Vec<(String, Value)>,
}

impl Row {
    /// Create a row from an identifier and ordered fields
    pub fn new(id: RowId, fields: Vec<(String, Value)>) -> Self {
        Self { id, fields }
    }

    /// Build a row from ordered fields, taking the identifier from `id_column`.
    ///
    /// Returns `None` if the column is missing or not an integer.
    pub fn from_fields(id_column: &str, fields: Vec<(String, Value)>) -> Option<Self> {
        let id = fields
            .iter()
            .find(|(name, _)| name == id_column)
            .and_then(|(_, v)| v.as_i64())?;
        Some(Self { id, fields })
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Cursors
// ============================================================================

/// Persisted progress for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Table name
    pub table: String,
    /// Last forwarded row identifier
    pub position: RowId,
}

impl Cursor {
    /// Create a new cursor record
    pub fn new(table: impl Into<String>, position: RowId) -> Self {
        Self {
            table: table.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weblog(id: i64) -> Row {
        Row::new(
            id,
            vec![
                ("id".to_string(), Value::Integer(id)),
                ("ip".to_string(), Value::from("1.2.3.4")),
                ("request".to_string(), Value::from("/index.html")),
                ("response".to_string(), Value::Integer(200)),
            ],
        )
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let json = serde_json::to_string(&weblog(7)).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"ip":"1.2.3.4","request":"/index.html","response":200}"#
        );
    }

    #[test]
    fn test_row_from_fields() {
        let fields = vec![
            ("rowID".to_string(), Value::Integer(42)),
            ("comment".to_string(), Value::Null),
        ];
        let row = Row::from_fields("rowID", fields.clone()).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.len(), 2);
        assert!(row.get("comment").unwrap().is_null());

        assert!(Row::from_fields("id", fields).is_none());
    }

    #[test]
    fn test_row_from_fields_rejects_null_id() {
        let fields = vec![("id".to_string(), Value::Null)];
        assert!(Row::from_fields("id", fields).is_none());
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(Value::Null.to_json(), json!(null));
        assert_eq!(Value::Integer(5).to_json(), json!(5));
        assert_eq!(Value::Real(1.5).to_json(), json!(1.5));
        assert_eq!(Value::from("a").to_json(), json!("a"));
        assert_eq!(Value::Blob(vec![1, 2, 3]).to_json(), json!("AQID"));
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(Value::Integer(3).as_i64(), Some(3));
        assert_eq!(Value::from(" 12 ").as_i64(), Some(12));
        assert_eq!(Value::Real(1.0).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = Cursor::new("weblogs", 6);
        let json = serde_json::to_string(&cursor).unwrap();
        let restored: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cursor);
    }
}
