//! Declarations made by model types and the descriptor resolved from them

use std::collections::BTreeSet;

/// Primary-key declaration for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub field: String,
    pub auto_increment: bool,
}

/// What a model type says about its table.
///
/// Built with a fluent API from `Model::declare()`:
///
/// ```
/// use rowmap::Declaration;
///
/// let decl = Declaration::new()
///     .table("users")
///     .primary_key("id")
///     .ignore("password_confirmation");
/// assert_eq!(decl.table_name(), Some("users"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    table: Option<String>,
    primary_keys: Vec<PrimaryKey>,
    ignored: BTreeSet<String>,
    passthrough: BTreeSet<String>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the table name
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Declare an auto-increment primary key
    pub fn primary_key(self, field: impl Into<String>) -> Self {
        self.primary_key_with(field, true)
    }

    /// Declare a primary key with an explicit auto-increment flag
    pub fn primary_key_with(mut self, field: impl Into<String>, auto_increment: bool) -> Self {
        self.primary_keys.push(PrimaryKey {
            field: field.into(),
            auto_increment,
        });
        self
    }

    /// Exclude a field from persistence.
    ///
    /// Fetched rows do not carry the field, so the model must be able to
    /// deserialize without it (`#[serde(default)]` or an `Option`).
    pub fn ignore(mut self, field: impl Into<String>) -> Self {
        self.ignored.insert(field.into());
        self
    }

    /// Bind a field's text verbatim instead of stripping markup
    pub fn passthrough(mut self, field: impl Into<String>) -> Self {
        self.passthrough.insert(field.into());
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn primary_keys(&self) -> &[PrimaryKey] {
        &self.primary_keys
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    pub fn passthrough_fields(&self) -> &BTreeSet<String> {
        &self.passthrough
    }
}

/// Resolved metadata for a model type.
///
/// Missing declarations stay `None` here; the resolver turns them into
/// metadata errors when an operation actually needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table_name: Option<String>,
    pub primary_key: Option<PrimaryKey>,
    pub ignored_fields: BTreeSet<String>,
    pub passthrough_fields: BTreeSet<String>,
    /// Every primary key that was declared, when there was more than one
    pub conflicting_keys: Vec<String>,
}

impl TableDescriptor {
    /// Descriptor for a table with an auto-increment primary key
    pub fn new(table_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            primary_key: Some(PrimaryKey {
                field: primary_key.into(),
                auto_increment: true,
            }),
            ignored_fields: BTreeSet::new(),
            passthrough_fields: BTreeSet::new(),
            conflicting_keys: Vec::new(),
        }
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        if let Some(pk) = self.primary_key.as_mut() {
            pk.auto_increment = auto_increment;
        }
        self
    }

    pub fn with_ignored(mut self, field: impl Into<String>) -> Self {
        self.ignored_fields.insert(field.into());
        self
    }

    pub fn with_passthrough(mut self, field: impl Into<String>) -> Self {
        self.passthrough_fields.insert(field.into());
        self
    }

    /// Auto-increment flag; true when no primary key was declared
    pub fn auto_increment(&self) -> bool {
        self.primary_key.as_ref().map_or(true, |pk| pk.auto_increment)
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored_fields.contains(field)
    }

    pub fn is_passthrough(&self, field: &str) -> bool {
        self.passthrough_fields.contains(field)
    }
}

impl From<Declaration> for TableDescriptor {
    fn from(decl: Declaration) -> Self {
        let table_name = decl
            .table
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let mut keys = decl.primary_keys;
        let (primary_key, conflicting_keys) = match keys.len() {
            0 => (None, Vec::new()),
            1 => (keys.pop(), Vec::new()),
            _ => (None, keys.into_iter().map(|pk| pk.field).collect()),
        };

        Self {
            table_name,
            primary_key,
            ignored_fields: decl.ignored,
            passthrough_fields: decl.passthrough,
            conflicting_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_into_descriptor() {
        let desc: TableDescriptor = Declaration::new()
            .table("users")
            .primary_key("id")
            .ignore("token")
            .passthrough("bio")
            .into();

        assert_eq!(desc.table_name.as_deref(), Some("users"));
        assert_eq!(desc.primary_key.as_ref().unwrap().field, "id");
        assert!(desc.auto_increment());
        assert!(desc.is_ignored("token"));
        assert!(!desc.is_ignored("name"));
        assert!(desc.is_passthrough("bio"));
        assert!(!desc.is_passthrough("token"));
    }

    #[test]
    fn test_blank_table_is_undeclared() {
        let desc: TableDescriptor = Declaration::new().table("   ").into();
        assert!(desc.table_name.is_none());
    }

    #[test]
    fn test_auto_increment_defaults_true() {
        let desc: TableDescriptor = Declaration::new().table("t").into();
        assert!(desc.primary_key.is_none());
        assert!(desc.auto_increment());

        let desc: TableDescriptor = Declaration::new()
            .table("t")
            .primary_key_with("code", false)
            .into();
        assert!(!desc.auto_increment());
    }

    #[test]
    fn test_multiple_primary_keys_conflict() {
        let desc: TableDescriptor = Declaration::new()
            .table("t")
            .primary_key("a")
            .primary_key("b")
            .into();
        assert!(desc.primary_key.is_none());
        assert_eq!(desc.conflicting_keys, vec!["a".to_string(), "b".to_string()]);
    }
}
