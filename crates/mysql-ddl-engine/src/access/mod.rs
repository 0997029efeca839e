//! Database-access collaborator.
//!
//! The engine emits SQL text; everything that actually touches the
//! server goes through the [`DbAccess`] trait so that core logic can be
//! exercised against scripted implementations. The MySQL driver lives in
//! [`mysql`].

pub mod mysql;

use async_trait::async_trait;

use crate::core::identifier;
use crate::error::Result;

/// Which connection a statement runs on: the end-user connection or the
/// control connection reserved for the configuration storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionScope {
    User,
    Control,
}

/// A single result row: column names and their text values in select
/// order. Values are `None` for SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column/value pair.
    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Value of the named column; `None` for NULL or an absent column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values[i].as_deref())
    }

    /// Value at the given column index.
    pub fn get_index(&self, index: usize) -> Option<String> {
        self.values.get(index).and_then(|v| v.clone())
    }

    /// Value of the first column.
    pub fn first(&self) -> Option<&str> {
        self.values.first().and_then(|v| v.as_deref())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, Option<String>)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Option<String>)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

/// One entry of a table's column map (`SHOW COLUMNS` shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub field: String,
    pub column_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

impl ColumnInfo {
    /// Whether the column is a generated (virtual or stored) column.
    /// Generated columns cannot be INSERTed into during data copies.
    pub fn is_generated(&self) -> bool {
        self.extra.to_ascii_uppercase().contains("GENERATED")
    }
}

/// Access to one database server.
///
/// Only [`try_query`](DbAccess::try_query) and
/// [`fetch_result`](DbAccess::fetch_result) are required; the remaining
/// methods are template methods layered on top of them.
#[async_trait]
pub trait DbAccess: Send + Sync {
    /// Run a statement. Returns the number of result rows for reads and
    /// the number of affected rows for writes.
    async fn try_query(&self, sql: &str, scope: ConnectionScope) -> Result<u64>;

    /// Run a query on the user connection and collect all rows.
    async fn fetch_result(&self, sql: &str) -> Result<Vec<Row>>;

    /// Like [`fetch_result`](DbAccess::fetch_result), but over the
    /// control connection where one exists.
    async fn fetch_result_control(&self, sql: &str) -> Result<Vec<Row>> {
        self.fetch_result(sql).await
    }

    /// Run a query and return the first row, if any.
    async fn fetch_single_row(&self, sql: &str) -> Result<Option<Row>> {
        Ok(self.fetch_result(sql).await?.into_iter().next())
    }

    /// Run a query and return the first column of the first row.
    async fn fetch_value(&self, sql: &str) -> Result<Option<String>> {
        Ok(self
            .fetch_single_row(sql)
            .await?
            .and_then(|row| row.first().map(str::to_string)))
    }

    /// Run a query and collect the named column of every row.
    async fn fetch_column(&self, sql: &str, column: &str) -> Result<Vec<String>> {
        Ok(self
            .fetch_result(sql)
            .await?
            .iter()
            .filter_map(|row| row.get(column).map(str::to_string))
            .collect())
    }

    /// Escape a string for embedding in a quoted SQL literal.
    fn escape_string(&self, value: &str) -> String {
        identifier::escape_literal(value)
    }

    /// Quote a string as a SQL literal.
    fn quote_string(&self, value: &str) -> String {
        identifier::quote_literal(value)
    }

    /// Fetch the server-reported status row for one table.
    async fn get_table_status(&self, schema: &str, table: &str) -> Result<Option<Row>> {
        let sql = format!(
            "SHOW TABLE STATUS FROM {} LIKE {}",
            identifier::backquote(schema),
            self.quote_string(table),
        );
        self.fetch_single_row(&sql).await
    }

    /// Fetch the column map of one table.
    async fn get_column_map(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!(
            "SHOW COLUMNS FROM {}",
            identifier::backquote_qualified(schema, table)
        );
        let rows = self.fetch_result(&sql).await?;
        Ok(rows
            .iter()
            .map(|row| ColumnInfo {
                field: row.get("Field").unwrap_or_default().to_string(),
                column_type: row.get("Type").unwrap_or_default().to_string(),
                nullable: row.get("Null") == Some("YES"),
                key: row.get("Key").unwrap_or_default().to_string(),
                default: row.get("Default").map(str::to_string),
                extra: row.get("Extra").unwrap_or_default().to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`DbAccess`] used by the engine's unit tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{ConnectionScope, DbAccess, Row};
    use crate::error::{DdlError, Result};

    /// Maps exact SQL text to canned result rows and records every
    /// statement it is handed.
    #[derive(Default)]
    pub(crate) struct ScriptedDb {
        responses: Mutex<HashMap<String, Vec<Row>>>,
        affected: Mutex<HashMap<String, u64>>,
        failures: Mutex<HashSet<String>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedDb {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn on(&self, sql: &str, rows: Vec<Row>) {
            self.responses
                .lock()
                .unwrap()
                .insert(sql.to_string(), rows);
        }

        /// Script the affected-row count a write statement reports.
        pub(crate) fn on_affected(&self, sql: &str, rows: u64) {
            self.affected.lock().unwrap().insert(sql.to_string(), rows);
        }

        pub(crate) fn fail_on(&self, sql: &str) {
            self.failures.lock().unwrap().insert(sql.to_string());
        }

        pub(crate) fn executed(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub(crate) fn did_execute(&self, sql: &str) -> bool {
            self.log.lock().unwrap().iter().any(|s| s == sql)
        }
    }

    /// Build a [`Row`] from column/value pairs.
    pub(crate) fn row(pairs: &[(&str, Option<&str>)]) -> Row {
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), value.map(str::to_string)))
            .collect()
    }

    #[async_trait]
    impl DbAccess for ScriptedDb {
        async fn try_query(&self, sql: &str, _scope: ConnectionScope) -> Result<u64> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.failures.lock().unwrap().contains(sql) {
                return Err(DdlError::statement(sql, "scripted failure"));
            }
            if let Some(rows) = self.affected.lock().unwrap().get(sql) {
                return Ok(*rows);
            }
            let rows = self
                .responses
                .lock()
                .unwrap()
                .get(sql)
                .map(|rows| rows.len() as u64)
                .unwrap_or(0);
            Ok(rows)
        }

        async fn fetch_result(&self, sql: &str) -> Result<Vec<Row>> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.failures.lock().unwrap().contains(sql) {
                return Err(DdlError::statement(sql, "scripted failure"));
            }
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(sql)
                .cloned()
                .unwrap_or_default())
        }
    }
}
