//! CRUD facade over the metadata resolver and the query executor
//!
//! Every operation resolves table metadata first, so a model without a table
//! or primary key fails before any SQL is built.

use std::any::type_name;

use serde_json::Value;

use crate::metadata::MetadataResolver;
use crate::model::{FieldMap, FieldScope, Model};
use crate::query::{ExecOutcome, Param, Params, QueryExecutor};
use crate::{Error, Result, UsageError};

/// Basic record operations for [`Model`] types
pub struct Crud<'a> {
    executor: &'a mut QueryExecutor,
    resolver: &'a MetadataResolver,
}

impl<'a> Crud<'a> {
    /// CRUD over `executor` using the process-wide metadata resolver
    pub fn new(executor: &'a mut QueryExecutor) -> Self {
        Self::with_resolver(executor, MetadataResolver::global())
    }

    pub fn with_resolver(executor: &'a mut QueryExecutor, resolver: &'a MetadataResolver) -> Self {
        Self { executor, resolver }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &*self.executor
    }

    /// Fetch one record by primary key
    pub fn get<T: Model>(&mut self, pk_value: impl Into<Value>) -> Result<Option<T>> {
        let table = self.resolver.table_name::<T>()?;
        let pk = self.resolver.primary_key::<T>()?;

        let params = Params::new().set("value", pk_value);
        let sql = format!("SELECT * FROM {table} WHERE {pk} = :value");
        Ok(self.fetch::<T>(&sql, Some(&params))?.into_iter().next())
    }

    /// Fetch every record.
    ///
    /// `order_by` is appended verbatim when non-empty. `limit == 0` means no
    /// limit, in which case `offset` is ignored.
    pub fn get_all<T: Model>(&mut self, limit: u64, offset: u64, order_by: &str) -> Result<Vec<T>> {
        let table = self.resolver.table_name::<T>()?;

        let mut sql = format!("SELECT * FROM {table}");
        if !order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {order_by}"));
        }
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {offset},{limit}"));
        }
        self.fetch::<T>(&sql, None)
    }

    /// `LIKE` search on one field; the caller supplies the wildcards
    pub fn search<T: Model>(&mut self, field: &str, pattern: impl Into<Value>) -> Result<Vec<T>> {
        let table = self.resolver.table_name::<T>()?;

        let params = Params::new().set("value", pattern);
        let sql = format!("SELECT * FROM {table} WHERE {field} LIKE :value");
        self.fetch::<T>(&sql, Some(&params))
    }

    /// Fetch records matching a caller-written `WHERE` fragment
    pub fn search_custom<T: Model>(&mut self, where_clause: &str, params: &Params) -> Result<Vec<T>> {
        let table = self.resolver.table_name::<T>()?;

        let sql = format!("SELECT * FROM {table} WHERE {where_clause}");
        self.fetch::<T>(&sql, Some(params))
    }

    /// Insert a record, returning the generated id of an auto-increment key
    pub fn insert<T: Model>(&mut self, instance: &T) -> Result<Option<i64>> {
        let table = self.resolver.table_name::<T>()?;
        let pk = self.resolver.declared_primary_key::<T>()?;
        let auto_increment = self.resolver.is_primary_key_auto_increment::<T>();

        let mut fields = self.resolver.field_map(instance, FieldScope::Persisted)?;
        let generated_key = pk.filter(|_| auto_increment);
        if let Some(pk) = &generated_key {
            fields = fields.into_iter().filter(|(name, _)| name != pk).collect();
        }

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let params = self.params_for::<T>(fields);
        let outcome = self.executor.exec(&sql, Some(&params))?;
        self.require_effect(&outcome, || format!("Could not insert a {table} record"))?;

        Ok(generated_key
            .and(outcome.last_insert_id())
            .filter(|id| *id != 0))
    }

    /// Update a record by its primary key
    pub fn update<T: Model>(&mut self, instance: &T) -> Result<()> {
        let table = self.resolver.table_name::<T>()?;
        let pk = self.resolver.primary_key::<T>()?;

        let fields = self.resolver.field_map(instance, FieldScope::Persisted)?;
        let pk_value = match fields.get(&pk) {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                return Err(UsageError::MissingPrimaryKeyValue {
                    model: type_name::<T>(),
                    field: pk,
                }
                .into());
            }
        };

        let assignments: Vec<String> = fields
            .keys()
            .filter(|name| **name != pk)
            .map(|name| format!("{name}=:{name}"))
            .collect();
        let sql = format!(
            "UPDATE {table} SET {} WHERE {pk}=:{pk}",
            assignments.join(", ")
        );

        let params = self.params_for::<T>(fields);
        let outcome = self.executor.exec(&sql, Some(&params))?;
        self.require_effect(&outcome, || {
            format!("Could not update {table} record {pk}={pk_value}")
        })?;
        Ok(())
    }

    /// Delete a record by primary key
    pub fn delete<T: Model>(&mut self, pk_value: impl Into<Value>) -> Result<()> {
        let table = self.resolver.table_name::<T>()?;
        let pk = self.resolver.primary_key::<T>()?;

        let pk_value = pk_value.into();
        let params = Params::new().set(pk.as_str(), pk_value.clone());
        let sql = format!("DELETE FROM {table} WHERE {pk}=:{pk}");

        let outcome = self.executor.exec(&sql, Some(&params))?;
        self.require_effect(&outcome, || {
            format!("Could not delete {table} record {pk}={pk_value}")
        })?;
        Ok(())
    }

    /// Delete every record where `field` equals `value`; returns the count
    pub fn delete_any<T: Model>(&mut self, field: &str, value: impl Into<Value>) -> Result<u64> {
        let table = self.resolver.table_name::<T>()?;

        let value = value.into();
        let params = Params::new().set("value", value.clone());
        let sql = format!("DELETE FROM {table} WHERE {field} = :value");

        let outcome = self.executor.exec(&sql, Some(&params))?;
        self.require_effect(&outcome, || {
            format!("Could not delete {table} records where {field}={value}")
        })
    }

    fn fetch<T: Model>(&mut self, sql: &str, params: Option<&Params>) -> Result<Vec<T>> {
        match self.executor.exec_as::<T>(sql, params)? {
            ExecOutcome::Rows(rows) => Ok(rows),
            _ => Err(Error::crud(
                format!("Could not fetch {} records", type_name::<T>()),
                self.executor.last_log(),
            )),
        }
    }

    /// Parameters for a field map, honoring passthrough declarations
    fn params_for<T: Model>(&self, fields: FieldMap) -> Params {
        let descriptor = self.resolver.descriptor::<T>();
        let mut params = Params::new();
        for (name, value) in fields {
            params.push(Param {
                passthrough: descriptor.is_passthrough(&name),
                name,
                value,
            });
        }
        params
    }

    fn require_effect(&self, outcome: &ExecOutcome, message: impl FnOnce() -> String) -> Result<u64> {
        match outcome {
            ExecOutcome::Done { rows_affected, .. } if *rows_affected > 0 => Ok(*rows_affected),
            _ => Err(Error::crud(message(), self.executor.last_log())),
        }
    }
}
