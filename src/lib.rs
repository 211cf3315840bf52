//! # Rowmap - Minimal object-relational mapping layer
//!
//! Binds plain serde-backed model types to rows of a relational table.
//!
//! Rowmap provides:
//! - Per-type table metadata (table name, primary key, ignored fields) with a caching resolver
//! - A query executor with type-directed parameter binding and markup sanitization
//! - A CRUD facade built on the resolver and the executor
//! - An append-only execution log with literalized SQL for auditing

pub mod config;
pub mod connection;
pub mod crud;
pub mod log;
pub mod metadata;
pub mod model;
pub mod query;
pub mod ui;

// Re-exports for convenient access
pub use connection::Connection;
pub use crud::Crud;
pub use log::{ExecutionLog, LogEntry};
pub use metadata::{Declaration, MetadataResolver, TableDescriptor};
pub use model::{FieldMap, FieldScope, Model, Row};
pub use query::{Binding, ExecOutcome, Param, Params, QueryExecutor};

/// Result type alias for Rowmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Rowmap operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("{message}")]
    Crud {
        message: String,
        last_log: Option<Box<LogEntry>>,
    },

    #[error("Connection error: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Could not materialize row: {0}")]
    Materialize(#[source] serde_json::Error),

    #[error("Could not serialize model: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    /// Build a CRUD error carrying the most recent log entry, if any
    pub fn crud(message: impl Into<String>, last_log: Option<&LogEntry>) -> Self {
        Error::Crud {
            message: message.into(),
            last_log: last_log.cloned().map(Box::new),
        }
    }

    /// The log entry attached to a CRUD error
    pub fn last_log(&self) -> Option<&LogEntry> {
        match self {
            Error::Crud { last_log, .. } => last_log.as_deref(),
            _ => None,
        }
    }
}

/// Missing or inconsistent model metadata
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("table not declared for {0}")]
    TableNotDeclared(&'static str),

    #[error("primary key not declared for {0}")]
    PrimaryKeyNotDeclared(&'static str),

    #[error("{model} declares more than one primary key: {fields:?}")]
    MultiplePrimaryKeys {
        model: &'static str,
        fields: Vec<String>,
    },
}

/// Misuse of the API, detected before any SQL runs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("no connection set")]
    NoConnection,

    #[error("instance of {0} does not serialize to a field map")]
    InstanceNotAMap(&'static str),

    #[error("instance of {model} has no value for primary key `{field}`")]
    MissingPrimaryKeyValue {
        model: &'static str,
        field: String,
    },
}
