//! Named query parameters and type-directed binding
//!
//! Every parameter value is turned into a [`Binding`] exactly once. The same
//! binding drives both the value handed to the driver and the literal written
//! to the execution log, so the two can never disagree on how a value was
//! treated.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;
use serde_json::{Number, Value};

use super::statement::placeholders;
use crate::model::FieldMap;

/// Trailing marker on a parameter name that disables markup stripping
pub const PASSTHROUGH_MARKER: char = '*';

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?(?:-->|$)|</?[A-Za-z!?][^>]*(?:>|$)").expect("valid markup pattern")
});

/// Trim surrounding whitespace and strip markup tags
pub fn sanitize(text: &str) -> String {
    MARKUP.replace_all(text.trim(), "").into_owned()
}

/// How a single value is bound
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Null value
    Null,
    /// Loosely empty value (`""`, `"0"`, `0.0`, `[]`, `{}`); bound as NULL,
    /// logged as `""`
    Empty,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Trimmed text with markup removed
    Text(String),
    /// Passthrough text (or a nested value as JSON), bound verbatim
    RawText(String),
}

impl Binding {
    /// Infer the binding for a value.
    ///
    /// Priority: null/empty, bool, integer, passthrough text, sanitized text.
    /// Integer `0` and `false` are never treated as empty.
    pub fn infer(value: &Value, passthrough: bool) -> Self {
        match value {
            Value::Null => Binding::Null,
            Value::String(s) if s.is_empty() || s == "0" => Binding::Empty,
            Value::Number(n) if is_float_zero(n) => Binding::Empty,
            Value::Array(items) if items.is_empty() => Binding::Empty,
            Value::Object(fields) if fields.is_empty() => Binding::Empty,
            Value::Bool(b) => Binding::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Binding::Int(i),
                None => Binding::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) if passthrough => Binding::RawText(s.clone()),
            Value::String(s) => Binding::Text(sanitize(s)),
            Value::Array(_) | Value::Object(_) => Binding::RawText(value.to_string()),
        }
    }

    /// Whether the driver receives SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Binding::Null | Binding::Empty)
    }

    /// Human-readable literal for the execution log. Never executed.
    pub fn literal(&self) -> String {
        match self {
            Binding::Null => "NULL".to_string(),
            Binding::Empty => "\"\"".to_string(),
            Binding::Bool(b) => u8::from(*b).to_string(),
            Binding::Int(i) => i.to_string(),
            Binding::Real(f) => f.to_string(),
            Binding::Text(s) | Binding::RawText(s) => format!("\"{s}\""),
        }
    }
}

fn is_float_zero(n: &Number) -> bool {
    n.is_f64() && n.as_f64() == Some(0.0)
}

impl ToSql for Binding {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Binding::Null | Binding::Empty => ToSqlOutput::Owned(SqlValue::Null),
            Binding::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Binding::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Binding::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Binding::Text(s) | Binding::RawText(s) => {
                ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))
            }
        })
    }
}

/// A named parameter as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Placeholder name without the leading `:` or the passthrough marker
    pub name: String,
    pub value: Value,
    pub passthrough: bool,
}

impl Param {
    /// Build a parameter from a key such as `"name"` or `"description*"`
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let (name, passthrough) = match key.strip_suffix(PASSTHROUGH_MARKER) {
            Some(stripped) => (stripped.to_string(), true),
            None => (key, false),
        };
        Self {
            name,
            value: value.into(),
            passthrough,
        }
    }

    pub fn binding(&self) -> Binding {
        Binding::infer(&self.value, self.passthrough)
    }

    pub fn placeholder(&self) -> String {
        format!(":{}", self.name)
    }
}

/// Ordered set of named parameters; a later value for the same name wins
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Param::new(key, value));
        self
    }

    pub fn push(&mut self, param: Param) {
        match self.0.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.0.push(param),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Only the parameters whose placeholder appears in `sql`
    pub fn for_sql(&self, sql: &str) -> Params {
        let used = placeholders(sql);
        Params(
            self.0
                .iter()
                .filter(|p| used.contains(p.name.as_str()))
                .cloned()
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.push(Param::new(key, value));
        }
        params
    }
}

impl From<FieldMap> for Params {
    fn from(fields: FieldMap) -> Self {
        fields.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_and_false_are_not_null() {
        assert_eq!(Binding::infer(&json!(0), false), Binding::Int(0));
        assert_eq!(Binding::infer(&json!(false), false), Binding::Bool(false));
        assert!(!Binding::infer(&json!(0), false).is_null());
    }

    #[test]
    fn test_empty_values_bind_null() {
        assert_eq!(Binding::infer(&Value::Null, false), Binding::Null);
        assert_eq!(Binding::infer(&json!(""), false), Binding::Empty);
        assert_eq!(Binding::infer(&json!(""), true), Binding::Empty);
        assert_eq!(Binding::infer(&json!([]), false), Binding::Empty);
        assert_eq!(Binding::infer(&json!({}), false), Binding::Empty);
        assert!(Binding::Empty.is_null());
    }

    #[test]
    fn test_loosely_empty_values_bind_null() {
        assert_eq!(Binding::infer(&json!("0"), false), Binding::Empty);
        assert_eq!(Binding::infer(&json!("0"), true), Binding::Empty);
        assert_eq!(Binding::infer(&json!(0.0), false), Binding::Empty);
        assert_eq!(Binding::infer(&json!(-0.0), false), Binding::Empty);

        assert_eq!(Binding::infer(&json!("00"), false), Binding::Text("00".to_string()));
        assert_eq!(Binding::infer(&json!(" 0"), false), Binding::Text("0".to_string()));
        assert_eq!(Binding::infer(&json!(0.5), false), Binding::Real(0.5));
    }

    #[test]
    fn test_params_for_sql_keeps_used_names() {
        let params = Params::new().set("id", 7).set("name", "Ann").set("idx", 1);
        let used = params.for_sql("UPDATE u SET name = :name WHERE id = :id");
        assert_eq!(
            used.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "name"]
        );
        assert!(params.for_sql("CREATE TABLE u (id INTEGER)").is_empty());
    }

    #[test]
    fn test_text_is_sanitized_unless_passthrough() {
        let value = json!("  <b>bold</b> move ");
        assert_eq!(
            Binding::infer(&value, false),
            Binding::Text("bold move".to_string())
        );
        assert_eq!(
            Binding::infer(&value, true),
            Binding::RawText("  <b>bold</b> move ".to_string())
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("<p>Hello <em>there</em></p>"), "Hello there");
        assert_eq!(sanitize("a < b"), "a < b");
        assert_eq!(sanitize("x<!-- note -->y"), "xy");
        assert_eq!(sanitize("cut <script"), "cut ");
        assert_eq!(sanitize("  plain  "), "plain");
    }

    #[test]
    fn test_numbers_and_nested_values() {
        assert_eq!(Binding::infer(&json!(2.5), false), Binding::Real(2.5));
        assert_eq!(
            Binding::infer(&json!({"city": "<b>Rome</b>"}), false),
            Binding::RawText(r#"{"city":"<b>Rome</b>"}"#.to_string())
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(Binding::Null.literal(), "NULL");
        assert_eq!(Binding::Empty.literal(), "\"\"");
        assert_eq!(Binding::Bool(true).literal(), "1");
        assert_eq!(Binding::Bool(false).literal(), "0");
        assert_eq!(Binding::Int(-3).literal(), "-3");
        assert_eq!(Binding::Text("Ann".to_string()).literal(), "\"Ann\"");
        assert_eq!(Binding::RawText("<i>x</i>".to_string()).literal(), "\"<i>x</i>\"");
    }

    #[test]
    fn test_passthrough_marker_is_stripped() {
        let param = Param::new("body*", "<p>hi</p>");
        assert_eq!(param.name, "body");
        assert!(param.passthrough);
        assert_eq!(param.placeholder(), ":body");

        let param = Param::new("body", "<p>hi</p>");
        assert!(!param.passthrough);
        assert_eq!(param.binding(), Binding::Text("hi".to_string()));
    }

    #[test]
    fn test_params_last_value_wins() {
        let params = Params::new().set("id", 1).set("name", "Ann").set("id", 2);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id").unwrap().value, json!(2));
        assert_eq!(
            params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "name"]
        );
    }

    #[test]
    fn test_params_from_field_map() {
        let Value::Object(fields) = json!({"name": "Ann", "bio*": "<b>hi</b>"}) else {
            unreachable!()
        };
        let params = Params::from(fields);
        assert!(params.get("bio").unwrap().passthrough);
        assert!(!params.get("name").unwrap().passthrough);
    }
}
