//! Query executor - binds, runs and logs every statement

use std::sync::Arc;

use chrono::Local;
use serde::de::DeserializeOwned;

use super::params::{Binding, Params};
use super::statement::{literalize, StatementKind};
use crate::connection::Connection;
use crate::log::{ExecutionLog, LogEntry};
use crate::model::Row;
use crate::{Result, UsageError};

/// What a statement produced.
///
/// Driver failures are reported as [`ExecOutcome::Failure`]; the message is in
/// the execution log.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome<R = Row> {
    /// Fetched rows of a `SELECT`, `SHOW` or `WITH` statement
    Rows(Vec<R>),
    /// Any other statement completed
    Done {
        rows_affected: u64,
        last_insert_id: Option<i64>,
    },
    Failure,
}

impl<R> ExecOutcome<R> {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecOutcome::Failure)
    }

    pub fn rows(&self) -> Option<&[R]> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<R>> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Rows changed, or rows fetched for a query
    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows.len() as u64),
            ExecOutcome::Done { rows_affected, .. } => Some(*rows_affected),
            ExecOutcome::Failure => None,
        }
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        match self {
            ExecOutcome::Done { last_insert_id, .. } => *last_insert_id,
            _ => None,
        }
    }
}

/// Result of a statement that reached the driver without error
struct Execution {
    rows: Option<Vec<Row>>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

/// Runs SQL against the active connection and records every call.
///
/// One connection is active at a time. Replacing it with
/// [`set_connection`](Self::set_connection) drops this executor's reference but
/// does not close a connection still held elsewhere.
#[derive(Debug, Default)]
pub struct QueryExecutor {
    connection: Option<Arc<Connection>>,
    log: ExecutionLog,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(connection: impl Into<Arc<Connection>>) -> Self {
        let mut executor = Self::new();
        executor.set_connection(connection);
        executor
    }

    /// Make `connection` the active connection
    pub fn set_connection(&mut self, connection: impl Into<Arc<Connection>>) {
        let connection = connection.into();
        tracing::debug!(database = connection.database(), "active connection set");
        self.connection = Some(connection);
    }

    pub fn connection(&self) -> Option<&Arc<Connection>> {
        self.connection.as_ref()
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn last_log(&self) -> Option<&LogEntry> {
        self.log.last()
    }

    /// Execute `sql` with named parameters.
    ///
    /// Fails only when no connection is set; driver errors become
    /// [`ExecOutcome::Failure`].
    pub fn exec(&mut self, sql: &str, params: Option<&Params>) -> Result<ExecOutcome> {
        let connection = self.connection.clone().ok_or(UsageError::NoConnection)?;
        let kind = StatementKind::classify(sql);
        let bindings: Vec<(String, Binding)> = params
            .map(|params| params.iter().map(|p| (p.name.clone(), p.binding())).collect())
            .unwrap_or_default();

        let result = run(&connection, sql, &bindings, kind);

        let literal_sql = literalize(sql, &bindings);
        let (rows_affected, last_insert_id, error) = match &result {
            Ok(execution) => (Some(execution.rows_affected), execution.last_insert_id, None),
            Err(e) => (None, None, Some(e.to_string())),
        };

        match &error {
            Some(error) => tracing::warn!(target: "rowmap::sql", %error, "{}", literal_sql),
            None => tracing::debug!(target: "rowmap::sql", rows = rows_affected, "{}", literal_sql),
        }

        self.log.append(LogEntry {
            timestamp: Local::now(),
            sql: sql.to_string(),
            literal_sql,
            params: params.cloned().unwrap_or_default(),
            rows_affected,
            last_insert_id,
            error,
            database: connection.database().to_string(),
            connection: Arc::downgrade(&connection),
        });

        Ok(match result {
            Ok(Execution { rows: Some(rows), .. }) => ExecOutcome::Rows(rows),
            Ok(execution) => ExecOutcome::Done {
                rows_affected: execution.rows_affected,
                last_insert_id: execution.last_insert_id,
            },
            Err(_) => ExecOutcome::Failure,
        })
    }

    /// Execute `sql` and materialize fetched rows into `T`
    pub fn exec_as<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        params: Option<&Params>,
    ) -> Result<ExecOutcome<T>> {
        Ok(match self.exec(sql, params)? {
            ExecOutcome::Rows(rows) => ExecOutcome::Rows(
                rows.into_iter()
                    .map(Row::into_model)
                    .collect::<Result<Vec<T>>>()?,
            ),
            ExecOutcome::Done {
                rows_affected,
                last_insert_id,
            } => ExecOutcome::Done {
                rows_affected,
                last_insert_id,
            },
            ExecOutcome::Failure => ExecOutcome::Failure,
        })
    }
}

fn run(
    connection: &Connection,
    sql: &str,
    bindings: &[(String, Binding)],
    kind: StatementKind,
) -> rusqlite::Result<Execution> {
    let handle = connection.handle();
    let mut stmt = handle.prepare(sql)?;

    for (name, binding) in bindings {
        let placeholder = format!(":{name}");
        let idx = stmt
            .parameter_index(&placeholder)?
            .ok_or_else(|| rusqlite::Error::InvalidParameterName(placeholder.clone()))?;
        stmt.raw_bind_parameter(idx, binding)?;
    }

    if kind.returns_rows() {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.raw_query();
        let mut fetched = Vec::new();
        while let Some(row) = rows.next()? {
            fetched.push(Row::from_driver_row(row, &columns)?);
        }
        return Ok(Execution {
            rows_affected: fetched.len() as u64,
            rows: Some(fetched),
            last_insert_id: None,
        });
    }

    // Step through to completion; some writes and pragmas yield rows too
    let mut rows = stmt.raw_query();
    while rows.next()?.is_some() {}
    drop(rows);

    let rows_affected = handle.changes() as u64;
    let last_insert_id = kind.captures_insert_id().then(|| handle.last_insert_rowid());
    Ok(Execution {
        rows: None,
        rows_affected,
        last_insert_id,
    })
}
