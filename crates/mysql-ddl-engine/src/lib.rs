//! # mysql-ddl-engine
//!
//! MySQL DDL fragment generation and table migration library.
//!
//! This library builds the SQL texts a schema editor needs and runs
//! table-level migrations, with support for:
//!
//! - **Column definitions** covering defaults, generated columns, and
//!   primary-key auto-insertion for AUTO_INCREMENT columns
//! - **Index and foreign-key statements** for create/edit flows
//! - **Move/copy** of tables and views across schemas, with optional
//!   metadata carry-over
//! - **Cached table status** shared per (schema, table) identity
//! - **Row counting** with an exact/estimated trade-off
//!
//! Statement sequences are not transactional: MySQL DDL cannot be
//! rolled back, so a failed migration step leaves earlier steps
//! applied and reports them through the accumulated errors and the SQL
//! log.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use mysql_ddl_engine::{build_column_definition, ColumnSpec, DefaultValue};
//!
//! let mut spec = ColumnSpec::new("id", "INT");
//! spec.length = "11".to_string();
//! spec.extra = "AUTO_INCREMENT".to_string();
//! spec.default = DefaultValue::None;
//!
//! let (sql, appended_pk) = build_column_definition(&spec, &HashSet::new());
//! assert!(sql.starts_with("`id` INT(11)"));
//! assert!(appended_pk);
//! ```

pub mod access;
pub mod config;
pub mod core;
pub mod ddl;
pub mod error;
pub mod migrate;
pub mod records;
pub mod relation;
pub mod status;
pub mod table;

// Re-exports for convenient access
pub use access::mysql::MysqlAccess;
pub use access::{ColumnInfo, ConnectionScope, DbAccess, Row};
pub use config::{Config, ConnectionConfig, CountingConfig, RelationConfig};
pub use crate::core::identifier::{backquote, backquote_qualified, is_valid_name};
pub use crate::core::spec::{
    ColumnPosition, ColumnSpec, CopyMode, CopyScope, DefaultValue, FnSpelling, GeneratedExpr,
    IndexColumn, IndexKind, IndexSpec, MigrationPlan, Virtuality,
};
pub use ddl::{
    build_column_alteration, build_column_definition, foreign_key_statement,
    index_create_or_edit, IndexRef,
};
pub use error::{DdlError, Result};
pub use migrate::TableMigrator;
pub use relation::{
    DbRelationStorage, DisabledRelationStorage, MemoryUiPrefsStore, RelationStorage,
    StoredUiPrefs, UiPrefsStore,
};
pub use status::StatusCache;
pub use table::{Table, PROP_COLUMN_ORDER, PROP_COLUMN_VISIB, PROP_SORTED_COLUMN};
