//! Metadata resolver with a per-type cache
//!
//! Declarations are read once per model type and memoized by `TypeId`.
//! The cache is never invalidated: metadata is a static property of a type.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::declaration::TableDescriptor;
use crate::model::{FieldMap, FieldScope, Model};
use crate::{Error, MetadataError, Result, UsageError};

static GLOBAL: OnceLock<MetadataResolver> = OnceLock::new();

/// Resolves and caches [`TableDescriptor`]s for model types
#[derive(Debug, Default)]
pub struct MetadataResolver {
    cache: RwLock<HashMap<TypeId, Arc<TableDescriptor>>>,
    introspections: AtomicUsize,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide resolver
    pub fn global() -> &'static MetadataResolver {
        GLOBAL.get_or_init(MetadataResolver::new)
    }

    /// Seed the cache with an explicit descriptor, overriding `T::declare()`
    pub fn register<T: Model>(&self, descriptor: TableDescriptor) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(descriptor));
    }

    /// Resolved descriptor for `T`, introspecting on first use only
    pub fn descriptor<T: Model>(&self) -> Arc<TableDescriptor> {
        let key = TypeId::of::<T>();
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(found);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let descriptor = cache.entry(key).or_insert_with(|| {
            self.introspections.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(model = type_name::<T>(), "introspecting model metadata");
            Arc::new(T::declare().into())
        });
        Arc::clone(descriptor)
    }

    /// Number of times a declaration has actually been read
    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::Relaxed)
    }

    pub fn table_name<T: Model>(&self) -> std::result::Result<String, MetadataError> {
        self.descriptor::<T>()
            .table_name
            .clone()
            .ok_or(MetadataError::TableNotDeclared(type_name::<T>()))
    }

    /// Primary-key field of `T`; fails when none is declared
    pub fn primary_key<T: Model>(&self) -> std::result::Result<String, MetadataError> {
        self.declared_primary_key::<T>()?
            .ok_or(MetadataError::PrimaryKeyNotDeclared(type_name::<T>()))
    }

    /// Primary-key field of `T`, or `None` when the type declares none
    pub fn declared_primary_key<T: Model>(
        &self,
    ) -> std::result::Result<Option<String>, MetadataError> {
        let descriptor = self.descriptor::<T>();
        if !descriptor.conflicting_keys.is_empty() {
            return Err(MetadataError::MultiplePrimaryKeys {
                model: type_name::<T>(),
                fields: descriptor.conflicting_keys.clone(),
            });
        }
        Ok(descriptor.primary_key.as_ref().map(|pk| pk.field.clone()))
    }

    pub fn is_primary_key_auto_increment<T: Model>(&self) -> bool {
        self.descriptor::<T>().auto_increment()
    }

    pub fn is_field_ignored<T: Model>(&self, field: &str) -> bool {
        self.descriptor::<T>().is_ignored(field)
    }

    pub fn is_field_passthrough<T: Model>(&self, field: &str) -> bool {
        self.descriptor::<T>().is_passthrough(field)
    }

    /// Serialize `instance` into a field map.
    ///
    /// `FieldScope::Persisted` drops ignored fields; `FieldScope::All` keeps
    /// everything.
    pub fn field_map<T: Model>(&self, instance: &T, scope: FieldScope) -> Result<FieldMap> {
        let value = serde_json::to_value(instance).map_err(Error::Serialize)?;
        let serde_json::Value::Object(fields) = value else {
            return Err(UsageError::InstanceNotAMap(type_name::<T>()).into());
        };

        if scope == FieldScope::Persisted {
            let descriptor = self.descriptor::<T>();
            return Ok(fields
                .into_iter()
                .filter(|(name, _)| !descriptor.is_ignored(name))
                .collect());
        }
        Ok(fields)
    }
}
