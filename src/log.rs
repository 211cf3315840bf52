//! Execution log - append-only history of every statement run

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::connection::Connection;
use crate::query::Params;

/// One statement execution, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    /// Template as executed, with placeholders
    pub sql: String,
    /// Template with placeholders replaced by literals; for reading only
    pub literal_sql: String,
    pub params: Params,
    pub rows_affected: Option<u64>,
    pub last_insert_id: Option<i64>,
    pub error: Option<String>,
    /// Database the connection was bound to
    pub database: String,
    #[serde(skip)]
    pub connection: Weak<Connection>,
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The connection used, if it is still alive
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match &self.error {
            Some(error) => write!(f, "{}: {} | {}", at, error, self.literal_sql),
            None => write!(
                f,
                "{}: {} row(s) affected | {}",
                at,
                self.rows_affected.unwrap_or(0),
                self.literal_sql
            ),
        }
    }
}

/// Insertion-ordered, append-only sequence of [`LogEntry`]
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ExecutionLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
