//! Core types shared by the DDL builders and the migration engine.
//!
//! - [`identifier`]: name validation and quoting rules
//! - [`spec`]: typed column/index/migration descriptions

pub mod identifier;
pub mod spec;

pub use spec::{
    ColumnPosition, ColumnSpec, CopyMode, CopyScope, DefaultValue, FnSpelling, GeneratedExpr,
    IndexColumn, IndexKind, IndexSpec, MigrationPlan, Virtuality,
};
