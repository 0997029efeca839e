//! Typed descriptions of columns, indexes and migration plans.
//!
//! These types replace the stringly-typed markers of the administration
//! front-end with closed enumerations, so every consumer matches
//! exhaustively and unrecognized spellings are rejected up front.

use serde::{Deserialize, Serialize};

/// Spelling used for a server-function default (`CURRENT_TIMESTAMP` vs
/// `current_timestamp()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FnSpelling {
    /// The bare SQL keyword, upper case.
    Keyword,
    /// The lower-case function-call form.
    FunctionCall,
}

/// Default-value clause of a column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// No DEFAULT clause at all.
    None,
    /// `DEFAULT NULL`.
    Null,
    /// `DEFAULT CURRENT_TIMESTAMP` / `DEFAULT current_timestamp()`.
    CurrentTimestamp(FnSpelling),
    /// `DEFAULT uuid()` (always rendered as the function call).
    Uuid(FnSpelling),
    /// `DEFAULT <literal>`, literal already quoted by the caller.
    UserDefined(String),
}

impl DefaultValue {
    /// Resolve a default-type marker coming from a request into a typed
    /// default. `value` is only consulted for the user-defined kind.
    ///
    /// Returns `None` for unrecognized markers instead of falling
    /// through to some other behavior.
    pub fn parse(kind: &str, value: &str) -> Option<Self> {
        match kind {
            "NONE" => Some(DefaultValue::None),
            "NULL" => Some(DefaultValue::Null),
            "USER_DEFINED" => Some(DefaultValue::UserDefined(value.to_string())),
            _ if kind.eq_ignore_ascii_case("CURRENT_TIMESTAMP") => {
                Some(DefaultValue::CurrentTimestamp(FnSpelling::Keyword))
            }
            _ if kind.eq_ignore_ascii_case("current_timestamp()") => {
                Some(DefaultValue::CurrentTimestamp(FnSpelling::FunctionCall))
            }
            _ if kind.eq_ignore_ascii_case("UUID") => Some(DefaultValue::Uuid(FnSpelling::Keyword)),
            _ if kind.eq_ignore_ascii_case("uuid()") => {
                Some(DefaultValue::Uuid(FnSpelling::FunctionCall))
            }
            _ => None,
        }
    }
}

/// Whether a generated column is computed on read or persisted on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Virtuality {
    Virtual,
    Stored,
}

impl Virtuality {
    /// SQL keyword for the generated-column clause.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Virtuality::Virtual => "VIRTUAL",
            Virtuality::Stored => "STORED",
        }
    }
}

/// Generated-column clause: `AS (<expression>) VIRTUAL|STORED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedExpr {
    pub expression: String,
    pub virtuality: Virtuality,
}

/// Relative-position directive for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnPosition {
    /// Move to the front of the table.
    First,
    /// Move after the named column.
    After(String),
}

impl ColumnPosition {
    /// Resolve a position marker: a leading `-` means FIRST, any other
    /// non-empty value names the column to move after.
    pub fn parse(move_to: &str) -> Option<Self> {
        if move_to.is_empty() {
            return None;
        }
        if move_to.starts_with('-') {
            return Some(ColumnPosition::First);
        }
        Some(ColumnPosition::After(move_to.to_string()))
    }
}

/// Description of one column for DDL generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name (unquoted).
    pub name: String,

    /// SQL type name, e.g. `INT`, `VARCHAR`, `BOOLEAN`.
    pub sql_type: String,

    /// Length/precision string, empty when absent.
    pub length: String,

    /// Type attribute modifiers, e.g. `UNSIGNED`, emitted verbatim.
    pub attribute: String,

    /// Collation/charset name; only applied to types that accept one.
    pub collation: String,

    /// `NULL` vs `NOT NULL`.
    pub nullable: bool,

    /// Default-value clause.
    pub default: DefaultValue,

    /// Free-form extra clause, e.g. `AUTO_INCREMENT`.
    pub extra: String,

    /// Column comment, quoted and escaped on output.
    pub comment: String,

    /// Generated-column clause; suppresses the default clause.
    pub generated: Option<GeneratedExpr>,

    /// Position directive, appended last.
    pub position: Option<ColumnPosition>,
}

impl ColumnSpec {
    /// Create a minimal spec with the given name and type; everything
    /// else empty, nullable, no default.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            length: String::new(),
            attribute: String::new(),
            collation: String::new(),
            nullable: true,
            default: DefaultValue::None,
            extra: String::new(),
            comment: String::new(),
            generated: None,
            position: None,
        }
    }
}

/// Kind of an index for statement generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
    Fulltext,
    Spatial,
}

/// One indexed column with its optional sub-part length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub sub_part: Option<u32>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_part: None,
        }
    }
}

/// Description of one index for statement generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name; empty for unnamed (server-assigned) indexes.
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: Vec::new(),
        }
    }
}

/// What a move/copy operation carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyScope {
    /// Structure only.
    Structure,
    /// Data only; the target must already exist.
    DataOnly,
    /// Structure first, then data.
    StructureAndData,
}

impl CopyScope {
    pub fn includes_structure(&self) -> bool {
        matches!(self, CopyScope::Structure | CopyScope::StructureAndData)
    }

    pub fn includes_data(&self) -> bool {
        matches!(self, CopyScope::DataOnly | CopyScope::StructureAndData)
    }
}

/// Whether the operation is part of a whole-schema batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyMode {
    SingleTable,
    WholeSchema,
}

/// Transient description of one move/copy operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    pub target_table: String,
    pub scope: CopyScope,
    /// Rename semantics: drop the source after success.
    pub move_table: bool,
    pub mode: CopyMode,
    /// For whole-schema copies, create the target schema if missing.
    pub add_database: bool,
    /// Emit a DROP ... IF EXISTS for the target before creating it.
    pub drop_existing: bool,
}

impl MigrationPlan {
    /// Plan a single-table copy with structure and data.
    pub fn copy(
        source_schema: impl Into<String>,
        source_table: impl Into<String>,
        target_schema: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            source_schema: source_schema.into(),
            source_table: source_table.into(),
            target_schema: target_schema.into(),
            target_table: target_table.into(),
            scope: CopyScope::StructureAndData,
            move_table: false,
            mode: CopyMode::SingleTable,
            add_database: true,
            drop_existing: false,
        }
    }

    /// Plan a single-table move with structure and data.
    pub fn move_to(
        source_schema: impl Into<String>,
        source_table: impl Into<String>,
        target_schema: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            move_table: true,
            ..Self::copy(source_schema, source_table, target_schema, target_table)
        }
    }

    pub fn with_scope(mut self, scope: CopyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_mode(mut self, mode: CopyMode) -> Self {
        self.mode = mode;
        self
    }
}
