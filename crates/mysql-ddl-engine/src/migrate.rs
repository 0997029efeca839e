//! Table move/copy across schemas.
//!
//! A move or copy is a sequence of plain statements over one
//! connection. MySQL DDL is not transactional, so the sequence is NOT
//! wrapped in a transaction: a failure aborts the remaining steps and
//! leaves already-applied ones in place. Callers see exactly what
//! happened through [`TableMigrator::sql_log`],
//! [`TableMigrator::messages`] and [`TableMigrator::errors`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::access::{ConnectionScope, DbAccess};
use crate::core::identifier::{backquote, backquote_qualified, is_valid_name};
use crate::core::spec::{CopyMode, MigrationPlan};
use crate::error::{DdlError, Result};
use crate::relation::{DisabledRelationStorage, RelationStorage, UiPrefsStore};
use crate::status::StatusCache;
use crate::table::Table;

/// Executes [`MigrationPlan`]s.
pub struct TableMigrator {
    db: Arc<dyn DbAccess>,
    cache: Arc<StatusCache>,
    relation: Arc<dyn RelationStorage>,
    uiprefs: Option<Arc<dyn UiPrefsStore>>,
    errors: Vec<String>,
    messages: Vec<String>,
    sql_log: Vec<String>,
}

impl TableMigrator {
    pub fn new(db: Arc<dyn DbAccess>, cache: Arc<StatusCache>) -> Self {
        Self {
            db,
            cache,
            relation: Arc::new(DisabledRelationStorage),
            uiprefs: None,
            errors: Vec::new(),
            messages: Vec::new(),
            sql_log: Vec::new(),
        }
    }

    /// Attach a configuration storage so moves carry relation links and
    /// stored metadata along.
    pub fn with_relation_storage(mut self, relation: Arc<dyn RelationStorage>) -> Self {
        self.relation = relation;
        self
    }

    pub fn with_uiprefs_store(mut self, store: Arc<dyn UiPrefsStore>) -> Self {
        self.uiprefs = Some(store);
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    /// Every statement handed to the server, in order, including any
    /// that failed.
    pub fn sql_log(&self) -> &[String] {
        &self.sql_log
    }

    /// Run one move/copy. Returns true only when every step succeeded;
    /// the first failure aborts the remaining steps without undoing the
    /// completed ones.
    pub async fn move_copy(&mut self, plan: &MigrationPlan) -> bool {
        match self.execute(plan).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "move/copy aborted");
                self.errors.push(err.to_string());
                false
            }
        }
    }

    async fn execute(&mut self, plan: &MigrationPlan) -> Result<()> {
        if !is_valid_name(&plan.target_table, false) {
            return Err(DdlError::validation(format!(
                "Invalid table name: {}",
                plan.target_table
            )));
        }
        if !is_valid_name(&plan.target_schema, false) {
            return Err(DdlError::validation(format!(
                "Invalid database name: {}",
                plan.target_schema
            )));
        }
        if plan.source_schema == plan.target_schema && plan.source_table == plan.target_table {
            return Err(DdlError::validation(
                "Can't move table to same one!".to_string(),
            ));
        }

        let source = backquote_qualified(&plan.source_schema, &plan.source_table);
        let target = backquote_qualified(&plan.target_schema, &plan.target_table);
        let handle = Table::new(
            plan.source_schema.clone(),
            plan.source_table.clone(),
            Arc::clone(&self.db),
            Arc::clone(&self.cache),
        );
        let is_view = handle.is_view().await?;
        debug!(%source, %target, is_view, move_table = plan.move_table, "starting move/copy");

        if plan.mode == CopyMode::WholeSchema && plan.add_database {
            let sql = format!(
                "CREATE DATABASE IF NOT EXISTS {};",
                backquote(&plan.target_schema)
            );
            self.run(sql).await?;
        }

        if plan.scope.includes_structure() {
            if plan.drop_existing {
                let drop = if is_view { "DROP VIEW" } else { "DROP TABLE" };
                self.run(format!("{drop} IF EXISTS {target};")).await?;
            }
            if is_view {
                let create = self.view_definition(plan).await?;
                self.run(format!("CREATE VIEW {target} AS {create};")).await?;
            } else {
                self.run(format!("CREATE TABLE {target} LIKE {source};"))
                    .await?;
            }
        }

        if plan.scope.includes_data() {
            let columns = self.common_columns(plan).await?;
            let list = columns
                .iter()
                .map(|column| backquote(column))
                .collect::<Vec<_>>()
                .join(", ");
            self.run(format!(
                "INSERT INTO {target}({list}) SELECT {list} FROM {source};"
            ))
            .await?;
        }

        if plan.move_table {
            let drop = if is_view { "DROP VIEW" } else { "DROP TABLE" };
            self.run(format!("{drop} {source};")).await?;

            self.relation
                .migrate(
                    &plan.source_schema,
                    &plan.source_table,
                    &plan.target_schema,
                    &plan.target_table,
                )
                .await?;
            if let Some(uiprefs) = &self.uiprefs {
                uiprefs
                    .migrate(
                        &plan.source_schema,
                        &plan.source_table,
                        &plan.target_schema,
                        &plan.target_table,
                    )
                    .await?;
            }
            self.cache.invalidate(&plan.source_schema, &plan.source_table);
            self.cache.invalidate(&plan.target_schema, &plan.target_table);

            info!(%source, %target, "table moved");
            self.messages.push(format!(
                "Table {}.{} has been moved to {}.{}.",
                plan.source_schema, plan.source_table, plan.target_schema, plan.target_table
            ));
        } else {
            if plan.scope.includes_structure() {
                self.duplicate_metadata(plan).await?;
            }
            self.cache.invalidate(&plan.target_schema, &plan.target_table);

            info!(%source, %target, "table copied");
            self.messages.push(format!(
                "Table {}.{} has been copied to {}.{}.",
                plan.source_schema, plan.source_table, plan.target_schema, plan.target_table
            ));
        }
        Ok(())
    }

    /// Pass through the configuration storage's row-duplication for a
    /// copied table. A -1 (feature off) result is not an error.
    async fn duplicate_metadata(&self, plan: &MigrationPlan) -> Result<()> {
        self.relation
            .duplicate_info(
                "displaywork",
                "table_info",
                &["display_field"],
                &[
                    ("db_name", &plan.source_schema),
                    ("table_name", &plan.source_table),
                ],
                &[
                    ("db_name", &plan.target_schema),
                    ("table_name", &plan.target_table),
                ],
            )
            .await?;
        self.relation
            .duplicate_info(
                "relwork",
                "relation",
                &["master_field", "foreign_field"],
                &[
                    ("master_db", &plan.source_schema),
                    ("master_table", &plan.source_table),
                ],
                &[
                    ("master_db", &plan.target_schema),
                    ("foreign_db", &plan.target_schema),
                    ("master_table", &plan.target_table),
                ],
            )
            .await?;
        self.relation
            .duplicate_info(
                "relwork",
                "relation",
                &["master_field", "foreign_field"],
                &[
                    ("foreign_db", &plan.source_schema),
                    ("foreign_table", &plan.source_table),
                ],
                &[
                    ("master_db", &plan.target_schema),
                    ("foreign_db", &plan.target_schema),
                    ("foreign_table", &plan.target_table),
                ],
            )
            .await?;
        self.relation
            .duplicate_info(
                "mimework",
                "column_info",
                &[
                    "column_name",
                    "comment",
                    "mimetype",
                    "transformation",
                    "transformation_options",
                ],
                &[
                    ("db_name", &plan.source_schema),
                    ("table_name", &plan.source_table),
                ],
                &[
                    ("db_name", &plan.target_schema),
                    ("table_name", &plan.target_table),
                ],
            )
            .await?;
        Ok(())
    }

    /// The view's SELECT body, extracted from `SHOW CREATE VIEW`.
    async fn view_definition(&self, plan: &MigrationPlan) -> Result<String> {
        let source = backquote_qualified(&plan.source_schema, &plan.source_table);
        let sql = format!("SHOW CREATE VIEW {source}");
        let row = self
            .db
            .fetch_single_row(&sql)
            .await?
            .ok_or_else(|| DdlError::statement(&sql, "no view definition returned"))?;
        let create = row
            .get("Create View")
            .ok_or_else(|| DdlError::statement(&sql, "missing Create View column"))?;
        // The SELECT body starts after the first " AS " of the CREATE
        // statement; everything before it is definer/algorithm noise
        // bound to the source identity.
        let body = create
            .split_once(" AS ")
            .map(|(_, body)| body)
            .ok_or_else(|| DdlError::statement(&sql, "unexpected view definition shape"))?;
        Ok(body.to_string())
    }

    /// Columns present in both source and target, in source order,
    /// excluding generated source columns (which cannot be inserted).
    async fn common_columns(&self, plan: &MigrationPlan) -> Result<Vec<String>> {
        let source_columns = self
            .db
            .get_column_map(&plan.source_schema, &plan.source_table)
            .await?;
        let target_columns: Vec<String> = self
            .db
            .get_column_map(&plan.target_schema, &plan.target_table)
            .await?
            .into_iter()
            .map(|column| column.field)
            .collect();

        let columns: Vec<String> = source_columns
            .into_iter()
            .filter(|column| !column.is_generated())
            .map(|column| column.field)
            .filter(|field| target_columns.contains(field))
            .collect();
        if columns.is_empty() {
            return Err(DdlError::validation(format!(
                "No columns in common between {}.{} and {}.{}",
                plan.source_schema, plan.source_table, plan.target_schema, plan.target_table
            )));
        }
        Ok(columns)
    }

    async fn run(&mut self, sql: String) -> Result<()> {
        self.sql_log.push(sql.clone());
        self.db
            .try_query(&sql, ConnectionScope::User)
            .await
            .map(|_| ())
    }
}
