//! Metadata Layer - per-type table declarations and their cached resolution
//!
//! A model type declares:
//! - the table it maps to
//! - its primary-key field (auto-increment unless stated otherwise)
//! - fields excluded from persistence

pub mod declaration;
pub mod resolver;

pub use declaration::{Declaration, PrimaryKey, TableDescriptor};
pub use resolver::MetadataResolver;
