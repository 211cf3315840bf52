//! Model trait and the row/field-map values that flow through the executor

use rusqlite::types::ValueRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::metadata::Declaration;
use crate::{Error, Result};

/// Field name → value, in declaration order
pub type FieldMap = serde_json::Map<String, Value>;

/// A record type mapped to a table row.
///
/// Field values travel as `serde_json::Value`, so any serde-backed struct can
/// be a model. Nested structs serialize as objects and are persisted as
/// JSON text.
///
/// ```
/// use rowmap::{Declaration, Model};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: Option<i64>,
///     name: String,
///     email: String,
/// }
///
/// impl Model for User {
///     fn declare() -> Declaration {
///         Declaration::new().table("users").primary_key("id")
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + 'static {
    fn declare() -> Declaration;
}

/// Which fields a serialized field map contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Everything except fields declared as ignored
    Persisted,
    /// Every field, for introspection and debugging
    All,
}

/// One fetched result row: column name → value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(FieldMap);

impl Row {
    pub fn new(fields: FieldMap) -> Self {
        Self(fields)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &FieldMap {
        &self.0
    }

    pub fn into_map(self) -> FieldMap {
        self.0
    }

    /// Materialize the row into a model (or any deserializable type)
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0)).map_err(Error::Materialize)
    }

    /// Helper to convert a driver row to a Row
    pub(crate) fn from_driver_row(row: &rusqlite::Row, columns: &[String]) -> rusqlite::Result<Self> {
        let mut fields = FieldMap::new();
        for (idx, name) in columns.iter().enumerate() {
            fields.insert(name.clone(), value_from_sql(row.get_ref(idx)?));
        }
        Ok(Self(fields))
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Deserialize a boolean column stored as an integer (`0`/`1`).
///
/// Use on model fields with `#[serde(deserialize_with = "rowmap::model::bool_from_int")]`.
pub fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => Ok(b),
        BoolLike::Int(i) => Ok(i != 0),
        BoolLike::Text(s) => match s.trim() {
            "1" | "true" | "TRUE" => Ok(true),
            "0" | "false" | "FALSE" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("not a boolean: {other}"))),
        },
    }
}

/// Deserialize a nested model that was persisted as JSON text.
///
/// Accepts either the JSON text fetched from the column or an already
/// structured value.
pub fn from_json_text<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}
