//! Statement classification and literalization for the execution log

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::params::Binding;

static ROW_RETURNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(select|show|with)").expect("valid statement pattern"));

static INSERTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(insert|replace)").expect("valid statement pattern"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("valid placeholder pattern"));

/// What a SQL template does, judged from its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT`, `SHOW` or `WITH`
    Query,
    /// `INSERT` or `REPLACE`
    Insert,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        if ROW_RETURNING.is_match(sql) {
            StatementKind::Query
        } else if INSERTING.is_match(sql) {
            StatementKind::Insert
        } else {
            StatementKind::Other
        }
    }

    pub fn returns_rows(self) -> bool {
        self == StatementKind::Query
    }

    pub fn captures_insert_id(self) -> bool {
        self == StatementKind::Insert
    }
}

/// Names of every `:name` placeholder in `sql`
pub fn placeholders(sql: &str) -> BTreeSet<&str> {
    PLACEHOLDER
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Replace every `:name` placeholder with the literal of its binding.
///
/// Placeholders without a matching binding are left as written.
pub fn literalize(sql: &str, bindings: &[(String, Binding)]) -> String {
    if bindings.is_empty() {
        return sql.to_string();
    }

    PLACEHOLDER
        .replace_all(sql, |caps: &Captures| {
            bindings
                .iter()
                .rev()
                .find(|(name, _)| name == &caps[1])
                .map(|(_, binding)| binding.literal())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(StatementKind::classify("SELECT * FROM users"), StatementKind::Query);
        assert_eq!(StatementKind::classify("  \n\tselect 1"), StatementKind::Query);
        assert_eq!(StatementKind::classify("Show tables"), StatementKind::Query);
        assert_eq!(
            StatementKind::classify("WITH t AS (SELECT 1) SELECT * FROM t"),
            StatementKind::Query
        );
        assert_eq!(StatementKind::classify("\ninsert into t values (1)"), StatementKind::Insert);
        assert_eq!(StatementKind::classify("REPLACE INTO t VALUES (1)"), StatementKind::Insert);
        assert_eq!(StatementKind::classify("UPDATE t SET a = 1"), StatementKind::Other);
        assert_eq!(StatementKind::classify("DELETE FROM t"), StatementKind::Other);
        assert_eq!(StatementKind::classify("-- SELECT\nDELETE FROM t"), StatementKind::Other);
    }

    #[test]
    fn test_literalize() {
        let bindings = vec![
            ("id".to_string(), Binding::Int(7)),
            ("name".to_string(), Binding::Text("Ann".to_string())),
            ("note".to_string(), Binding::Empty),
        ];
        let sql = "UPDATE users SET name=:name, note=:note WHERE id=:id";
        assert_eq!(
            literalize(sql, &bindings),
            r#"UPDATE users SET name="Ann", note="" WHERE id=7"#
        );
    }

    #[test]
    fn test_literalize_matches_whole_names() {
        let bindings = vec![("id".to_string(), Binding::Int(1))];
        assert_eq!(
            literalize("SELECT * FROM t WHERE id = :id AND idx = :idx", &bindings),
            "SELECT * FROM t WHERE id = 1 AND idx = :idx"
        );
    }

    #[test]
    fn test_placeholders() {
        let names = placeholders("SELECT * FROM t WHERE a = :a AND b = :b_2 OR a = :a");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b_2"]);
        assert!(placeholders("CREATE TABLE t (id INTEGER)").is_empty());
    }

    #[test]
    fn test_literalize_repeated_placeholder() {
        let bindings = vec![("v".to_string(), Binding::Null)];
        assert_eq!(
            literalize("SELECT :v, :v", &bindings),
            "SELECT NULL, NULL"
        );
    }
}
