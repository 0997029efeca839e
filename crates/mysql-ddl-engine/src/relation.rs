//! Configuration-storage collaborators: relation links, stored column
//! metadata, and per-table UI preferences.
//!
//! These features are optional server-side add-ons. When the storage is
//! not configured, every operation degrades to a no-op with a
//! distinguished "nothing to do" result rather than an error.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::access::{ConnectionScope, DbAccess};
use crate::config::RelationConfig;
use crate::core::identifier::{backquote, backquote_qualified, quote_literal};
use crate::error::Result;

/// UI preferences stored for one table, stamped with the table's
/// creation time so preferences for a since-recreated table can be
/// detected as stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredUiPrefs {
    pub prefs: HashMap<String, JsonValue>,
    pub create_time: Option<String>,
}

/// Key/value storage for per-table UI preferences.
#[async_trait]
pub trait UiPrefsStore: Send + Sync {
    async fn load(&self, schema: &str, table: &str) -> Result<StoredUiPrefs>;
    async fn save(&self, schema: &str, table: &str, prefs: &StoredUiPrefs) -> Result<()>;
    async fn remove(&self, schema: &str, table: &str) -> Result<()>;

    /// Re-key stored preferences after a table was renamed or moved.
    async fn migrate(
        &self,
        from_schema: &str,
        from_table: &str,
        to_schema: &str,
        to_table: &str,
    ) -> Result<()>;
}

/// In-process [`UiPrefsStore`].
#[derive(Default)]
pub struct MemoryUiPrefsStore {
    inner: Mutex<HashMap<(String, String), StoredUiPrefs>>,
}

impl MemoryUiPrefsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UiPrefsStore for MemoryUiPrefsStore {
    async fn load(&self, schema: &str, table: &str) -> Result<StoredUiPrefs> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .get(&(schema.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, schema: &str, table: &str, prefs: &StoredUiPrefs) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert((schema.to_string(), table.to_string()), prefs.clone());
        Ok(())
    }

    async fn remove(&self, schema: &str, table: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(&(schema.to_string(), table.to_string()));
        Ok(())
    }

    async fn migrate(
        &self,
        from_schema: &str,
        from_table: &str,
        to_schema: &str,
        to_table: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prefs) = inner.remove(&(from_schema.to_string(), from_table.to_string())) {
            inner.insert((to_schema.to_string(), to_table.to_string()), prefs);
        }
        Ok(())
    }
}

/// Relation/metadata storage: cross-table links, display columns, and
/// stored content transformations.
#[async_trait]
pub trait RelationStorage: Send + Sync {
    /// Whether the named feature (`relwork`, `displaywork`, `mimework`,
    /// `uiprefswork`) is available.
    fn feature_enabled(&self, work: &str) -> bool;

    /// Copy metadata rows referencing one table so they also reference
    /// another, as part of a table copy.
    ///
    /// `get_fields` are the columns carried over verbatim,
    /// `where_fields` select the source rows, and `new_fields` override
    /// the identity columns on the copies. Returns the number of rows
    /// copied, or -1 when the feature behind `work` (or its storage
    /// table under `storage_key`) is not configured.
    async fn duplicate_info(
        &self,
        work: &str,
        storage_key: &str,
        get_fields: &[&str],
        where_fields: &[(&str, &str)],
        new_fields: &[(&str, &str)],
    ) -> Result<i64>;

    /// Re-point all stored metadata from one table identity to another,
    /// as part of a table move or rename.
    async fn migrate(
        &self,
        from_schema: &str,
        from_table: &str,
        to_schema: &str,
        to_table: &str,
    ) -> Result<()>;
}

/// [`RelationStorage`] over a configured storage schema, speaking
/// through the control connection.
pub struct DbRelationStorage<D: DbAccess + ?Sized> {
    db: std::sync::Arc<D>,
    config: RelationConfig,
}

impl<D: DbAccess + ?Sized> DbRelationStorage<D> {
    pub fn new(db: std::sync::Arc<D>, config: RelationConfig) -> Self {
        Self { db, config }
    }

    fn storage(&self, table: &str) -> String {
        backquote_qualified(&self.config.db, table)
    }

    async fn repoint(
        &self,
        storage_table: &str,
        db_column: &str,
        table_column: &str,
        from_schema: &str,
        from_table: &str,
        to_schema: &str,
        to_table: &str,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = {}, {} = {} WHERE {} = {} AND {} = {}",
            self.storage(storage_table),
            backquote(db_column),
            quote_literal(to_schema),
            backquote(table_column),
            quote_literal(to_table),
            backquote(db_column),
            quote_literal(from_schema),
            backquote(table_column),
            quote_literal(from_table),
        );
        self.db.try_query(&sql, ConnectionScope::Control).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: DbAccess + ?Sized> RelationStorage for DbRelationStorage<D> {
    fn feature_enabled(&self, work: &str) -> bool {
        self.config.feature_enabled(work)
    }

    async fn duplicate_info(
        &self,
        work: &str,
        storage_key: &str,
        get_fields: &[&str],
        where_fields: &[(&str, &str)],
        new_fields: &[(&str, &str)],
    ) -> Result<i64> {
        if !self.feature_enabled(work) {
            return Ok(-1);
        }
        let storage_table = match self.config.storage_table(storage_key) {
            Some(table) => table.to_string(),
            None => return Ok(-1),
        };

        let select_list = get_fields
            .iter()
            .map(|field| backquote(field))
            .collect::<Vec<_>>()
            .join(", ");
        let where_clause = where_fields
            .iter()
            .map(|(field, value)| format!("{} = {}", backquote(field), quote_literal(value)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let select_sql = format!(
            "SELECT {} FROM {} WHERE {}",
            select_list,
            self.storage(&storage_table),
            where_clause,
        );
        let rows = self.db.fetch_result_control(&select_sql).await?;

        let mut columns: Vec<String> = get_fields.iter().map(|field| backquote(field)).collect();
        columns.extend(new_fields.iter().map(|(field, _)| backquote(field)));
        let column_list = columns.join(", ");

        let mut copied = 0i64;
        for row in rows {
            let mut values: Vec<String> = get_fields
                .iter()
                .map(|field| match row.get(field) {
                    Some(value) => quote_literal(value),
                    None => "NULL".to_string(),
                })
                .collect();
            values.extend(new_fields.iter().map(|(_, value)| quote_literal(value)));
            let insert_sql = format!(
                "INSERT IGNORE INTO {} ({}) VALUES ({})",
                self.storage(&storage_table),
                column_list,
                values.join(", "),
            );
            // INSERT IGNORE reports 0 affected rows for a skipped
            // duplicate; only rows the server actually wrote count.
            copied += self.db.try_query(&insert_sql, ConnectionScope::Control).await? as i64;
        }
        debug!(work, table = %storage_table, copied, "duplicated metadata rows");
        Ok(copied)
    }

    async fn migrate(
        &self,
        from_schema: &str,
        from_table: &str,
        to_schema: &str,
        to_table: &str,
    ) -> Result<()> {
        if let Some(table) = self.config.relation.clone() {
            // Relation links reference the table on both ends.
            self.repoint(
                &table,
                "master_db",
                "master_table",
                from_schema,
                from_table,
                to_schema,
                to_table,
            )
            .await?;
            self.repoint(
                &table,
                "foreign_db",
                "foreign_table",
                from_schema,
                from_table,
                to_schema,
                to_table,
            )
            .await?;
        }
        for key in ["table_info", "column_info", "table_uiprefs"] {
            if let Some(table) = self.config.storage_table(key).map(str::to_string) {
                self.repoint(
                    &table,
                    "db_name",
                    "table_name",
                    from_schema,
                    from_table,
                    to_schema,
                    to_table,
                )
                .await?;
            }
        }
        Ok(())
    }
}

/// [`RelationStorage`] used when no configuration storage exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRelationStorage;

#[async_trait]
impl RelationStorage for DisabledRelationStorage {
    fn feature_enabled(&self, _work: &str) -> bool {
        false
    }

    async fn duplicate_info(
        &self,
        _work: &str,
        _storage_key: &str,
        _get_fields: &[&str],
        _where_fields: &[(&str, &str)],
        _new_fields: &[(&str, &str)],
    ) -> Result<i64> {
        Ok(-1)
    }

    async fn migrate(
        &self,
        _from_schema: &str,
        _from_table: &str,
        _to_schema: &str,
        _to_table: &str,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::access::testing::{row, ScriptedDb};

    fn relation_config() -> RelationConfig {
        RelationConfig {
            db: "pmadb".to_string(),
            relation: Some("pma__relation".to_string()),
            table_info: None,
            table_uiprefs: Some("pma__table_uiprefs".to_string()),
            column_info: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_info_disabled_feature() {
        let storage = DisabledRelationStorage;
        let copied = storage
            .duplicate_info(
                "relwork",
                "relation",
                &["master_field"],
                &[("master_db", "db")],
                &[("master_db", "db2")],
            )
            .await
            .unwrap();
        assert_eq!(copied, -1);
    }

    #[tokio::test]
    async fn test_duplicate_info_unconfigured_table() {
        let db = Arc::new(ScriptedDb::new());
        let storage = DbRelationStorage::new(db, relation_config());
        // displaywork is off because table_info is not configured.
        let copied = storage
            .duplicate_info("displaywork", "table_info", &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(copied, -1);
    }

    #[tokio::test]
    async fn test_duplicate_info_copies_rows() {
        let db = Arc::new(ScriptedDb::new());
        db.on(
            "SELECT `master_field`, `foreign_field` FROM `pmadb`.`pma__relation` \
             WHERE `master_db` = 'db' AND `master_table` = 'orders'",
            vec![row(&[
                ("master_field", Some("customer_id")),
                ("foreign_field", Some("id")),
            ])],
        );
        db.on_affected(
            "INSERT IGNORE INTO `pmadb`.`pma__relation` \
             (`master_field`, `foreign_field`, `master_db`, `master_table`) \
             VALUES ('customer_id', 'id', 'db', 'orders_copy')",
            1,
        );
        let storage = DbRelationStorage::new(db.clone(), relation_config());

        let copied = storage
            .duplicate_info(
                "relwork",
                "relation",
                &["master_field", "foreign_field"],
                &[("master_db", "db"), ("master_table", "orders")],
                &[("master_db", "db"), ("master_table", "orders_copy")],
            )
            .await
            .unwrap();

        assert_eq!(copied, 1);
        assert!(db.did_execute(
            "INSERT IGNORE INTO `pmadb`.`pma__relation` \
             (`master_field`, `foreign_field`, `master_db`, `master_table`) \
             VALUES ('customer_id', 'id', 'db', 'orders_copy')"
        ));
    }

    #[tokio::test]
    async fn test_duplicate_info_ignored_duplicate_not_counted() {
        let db = Arc::new(ScriptedDb::new());
        db.on(
            "SELECT `master_field` FROM `pmadb`.`pma__relation` \
             WHERE `master_db` = 'db' AND `master_table` = 'orders'",
            vec![row(&[("master_field", Some("customer_id"))])],
        );
        // The target row already exists, so INSERT IGNORE writes nothing.
        db.on_affected(
            "INSERT IGNORE INTO `pmadb`.`pma__relation` \
             (`master_field`, `master_db`, `master_table`) \
             VALUES ('customer_id', 'db', 'orders_copy')",
            0,
        );
        let storage = DbRelationStorage::new(db.clone(), relation_config());

        let copied = storage
            .duplicate_info(
                "relwork",
                "relation",
                &["master_field"],
                &[("master_db", "db"), ("master_table", "orders")],
                &[("master_db", "db"), ("master_table", "orders_copy")],
            )
            .await
            .unwrap();

        assert_eq!(copied, 0);
    }

    #[tokio::test]
    async fn test_migrate_repoints_both_link_ends() {
        let db = Arc::new(ScriptedDb::new());
        let storage = DbRelationStorage::new(db.clone(), relation_config());

        storage.migrate("db", "old", "db", "new").await.unwrap();

        assert!(db.did_execute(
            "UPDATE `pmadb`.`pma__relation` SET `master_db` = 'db', `master_table` = 'new' \
             WHERE `master_db` = 'db' AND `master_table` = 'old'"
        ));
        assert!(db.did_execute(
            "UPDATE `pmadb`.`pma__relation` SET `foreign_db` = 'db', `foreign_table` = 'new' \
             WHERE `foreign_db` = 'db' AND `foreign_table` = 'old'"
        ));
        assert!(db.did_execute(
            "UPDATE `pmadb`.`pma__table_uiprefs` SET `db_name` = 'db', `table_name` = 'new' \
             WHERE `db_name` = 'db' AND `table_name` = 'old'"
        ));
    }

    #[tokio::test]
    async fn test_memory_uiprefs_roundtrip_and_migrate() {
        let store = MemoryUiPrefsStore::new();
        let mut prefs = StoredUiPrefs::default();
        prefs
            .prefs
            .insert("sorted_col".to_string(), serde_json::json!("id ASC"));
        store.save("db", "t", &prefs).await.unwrap();

        store.migrate("db", "t", "db2", "t2").await.unwrap();
        assert!(store.load("db", "t").await.unwrap().prefs.is_empty());
        let moved = store.load("db2", "t2").await.unwrap();
        assert_eq!(moved.prefs.get("sorted_col"), Some(&serde_json::json!("id ASC")));
    }
}
