//! Query Layer - parameter binding, statement execution, literalized logging

pub mod executor;
pub mod params;
pub mod statement;

pub use executor::{ExecOutcome, QueryExecutor};
pub use params::{sanitize, Binding, Param, Params, PASSTHROUGH_MARKER};
pub use statement::{literalize, StatementKind};
