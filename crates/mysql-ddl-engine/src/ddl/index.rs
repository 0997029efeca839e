//! Index and foreign-key statement builder.
//!
//! Emits `ALTER TABLE` statements for index creation/modification and
//! foreign-key constraints, with cross-schema qualification only where
//! it is needed.

use crate::core::identifier::{backquote, backquote_qualified};
use crate::core::spec::{IndexKind, IndexSpec};
use crate::error::{DdlError, Result};

/// Reference to an existing index, either by bare name or by a full
/// descriptor. Both forms resolve to the same name.
#[derive(Debug, Clone, Copy)]
pub enum IndexRef<'a> {
    Name(&'a str),
    Spec(&'a IndexSpec),
}

impl<'a> IndexRef<'a> {
    /// The referenced index name.
    pub fn name(&self) -> &'a str {
        match self {
            IndexRef::Name(name) => name,
            IndexRef::Spec(spec) => &spec.name,
        }
    }
}

/// Build the `ALTER TABLE ... ADD FOREIGN KEY ...;` statement.
///
/// The foreign schema qualifier is omitted when it matches the
/// statement's own schema.
pub fn foreign_key_statement(
    schema: &str,
    table: &str,
    local_columns: &[String],
    foreign_schema: &str,
    foreign_table: &str,
    foreign_columns: &[String],
    constraint: Option<&str>,
) -> String {
    let referenced = if foreign_schema == schema {
        backquote(foreign_table)
    } else {
        backquote_qualified(foreign_schema, foreign_table)
    };

    let add = match constraint {
        Some(name) if !name.is_empty() => format!("ADD CONSTRAINT {} FOREIGN KEY", backquote(name)),
        _ => "ADD FOREIGN KEY".to_string(),
    };

    format!(
        "ALTER TABLE {} {} ({}) REFERENCES {}({});",
        backquote(table),
        add,
        quoted_list(local_columns),
        referenced,
        quoted_list(foreign_columns),
    )
}

/// Build the `ALTER TABLE` statement that creates a new index or edits
/// an existing one.
///
/// When the previous index resolves to `PRIMARY` the statement starts
/// with `DROP PRIMARY KEY`; when it names a different index than the new
/// spec, that index is dropped first.
pub fn index_create_or_edit(
    schema: &str,
    table: &str,
    index: &IndexSpec,
    previous: Option<IndexRef<'_>>,
) -> Result<String> {
    if index.name == "PRIMARY" && index.kind != IndexKind::Primary {
        return Err(DdlError::validation(
            "The name of the primary key must be \"PRIMARY\" and no other index may use it",
        ));
    }
    if index.kind == IndexKind::Primary && !index.name.is_empty() && index.name != "PRIMARY" {
        return Err(DdlError::validation(
            "A primary key is always named \"PRIMARY\"",
        ));
    }

    let mut sql = format!("ALTER TABLE {}", backquote_qualified(schema, table));

    match previous.map(|p| p.name()) {
        Some("PRIMARY") => sql.push_str(" DROP PRIMARY KEY,"),
        Some(old) if !old.is_empty() && old != index.name => {
            sql.push_str(&format!(" DROP INDEX {},", backquote(old)));
        }
        _ => {}
    }

    sql.push_str(&format!(" ADD {}", add_clause(index)));

    if !index.columns.is_empty() {
        let columns = index
            .columns
            .iter()
            .map(|c| match c.sub_part {
                Some(len) => format!("{}({})", backquote(&c.name), len),
                None => backquote(&c.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ({})", columns));
    }

    sql.push(';');
    Ok(sql)
}

fn add_clause(index: &IndexSpec) -> String {
    let keyword = match index.kind {
        IndexKind::Primary => return "PRIMARY KEY".to_string(),
        IndexKind::Unique => "UNIQUE",
        IndexKind::Index => "INDEX",
        IndexKind::Fulltext => "FULLTEXT",
        IndexKind::Spatial => "SPATIAL",
    };

    if index.name.is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", keyword, backquote(&index.name))
    }
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| backquote(c))
        .collect::<Vec<_>>()
        .join(", ")
}
