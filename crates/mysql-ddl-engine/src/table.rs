//! A handle to one table or view, identified by schema and name.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::access::{ConnectionScope, DbAccess};
use crate::config::CountingConfig;
use crate::core::identifier::{backquote, is_valid_name};
use crate::error::Result;
use crate::relation::{StoredUiPrefs, UiPrefsStore};
use crate::status::StatusCache;

/// UI preference key: the column the table was last sorted by.
pub const PROP_SORTED_COLUMN: &str = "sorted_col";
/// UI preference key: user-chosen column display order.
pub const PROP_COLUMN_ORDER: &str = "col_order";
/// UI preference key: user-chosen column visibility flags.
pub const PROP_COLUMN_VISIB: &str = "col_visib";

/// One table or view on the server.
///
/// Owns no connection itself; every operation goes through the shared
/// [`DbAccess`] collaborator. Status lookups are memoized in the shared
/// [`StatusCache`] keyed by (schema, table), so separate handles to the
/// same table see the same cached attributes.
pub struct Table {
    schema: String,
    name: String,
    pub(crate) db: Arc<dyn DbAccess>,
    pub(crate) cache: Arc<StatusCache>,
    pub(crate) counting: CountingConfig,
    uiprefs_store: Option<Arc<dyn UiPrefsStore>>,
    uiprefs: Option<StoredUiPrefs>,
    errors: Vec<String>,
    messages: Vec<String>,
}

impl Table {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        db: Arc<dyn DbAccess>,
        cache: Arc<StatusCache>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            db,
            cache,
            counting: CountingConfig::default(),
            uiprefs_store: None,
            uiprefs: None,
            errors: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Override the row-counting limits (defaults are conservative).
    pub fn with_counting(mut self, counting: CountingConfig) -> Self {
        self.counting = counting;
        self
    }

    /// Attach a UI-preference store; without one the preference
    /// accessors report nothing stored.
    pub fn with_uiprefs_store(mut self, store: Arc<dyn UiPrefsStore>) -> Self {
        self.uiprefs_store = Some(store);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table name wrapped in backticks.
    pub fn name_quoted(&self) -> String {
        backquote(&self.name)
    }

    /// Schema name wrapped in backticks.
    pub fn schema_quoted(&self) -> String {
        backquote(&self.schema)
    }

    /// `schema.table`, unquoted.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// `` `schema`.`table` ``, ready for embedding in a statement.
    pub fn full_name_quoted(&self) -> String {
        format!("{}.{}", backquote(&self.schema), backquote(&self.name))
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

    pub(crate) fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub(crate) fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Rename the table, optionally moving it to another schema.
    ///
    /// A rename to the current identity is a no-op that still reports
    /// success. An invalid target name is rejected before any statement
    /// is issued. On success the cached status for both the old and new
    /// identity is dropped.
    pub async fn rename(&mut self, new_name: &str, new_schema: Option<&str>) -> bool {
        let target_schema = new_schema.unwrap_or(&self.schema).to_string();
        if target_schema == self.schema && new_name == self.name {
            return true;
        }

        if !is_valid_name(new_name, false) {
            self.push_error(format!("Invalid table name: {new_name}"));
            return false;
        }

        let sql = format!(
            "RENAME TABLE {}.{} TO {}.{};",
            backquote(&self.schema),
            backquote(&self.name),
            backquote(&target_schema),
            backquote(new_name),
        );
        debug!(sql = %sql, "renaming table");
        if let Err(err) = self.db.try_query(&sql, ConnectionScope::User).await {
            self.push_error(err.to_string());
            return false;
        }

        self.cache.invalidate(&self.schema, &self.name);
        self.cache.invalidate(&target_schema, new_name);

        let old_name = std::mem::replace(&mut self.name, new_name.to_string());
        let old_schema = std::mem::replace(&mut self.schema, target_schema);
        info!(
            from = %format!("{old_schema}.{old_name}"),
            to = %self.full_name(),
            "table renamed"
        );
        self.push_message(format!(
            "Table {old_name} has been renamed to {}.",
            self.name
        ));
        true
    }

    /// Read a stored UI preference.
    ///
    /// Column-order and column-visibility preferences are tied to the
    /// table's creation timestamp: when the table has been recreated
    /// since the preference was saved, the stale entry is discarded.
    pub async fn get_ui_prop(&mut self, property: &str) -> Result<Option<JsonValue>> {
        self.load_uiprefs().await?;
        let prefs = match &self.uiprefs {
            Some(prefs) => prefs,
            None => return Ok(None),
        };
        if !prefs.prefs.contains_key(property) {
            return Ok(None);
        }

        if (property == PROP_COLUMN_ORDER || property == PROP_COLUMN_VISIB)
            && !self.is_view().await?
        {
            let saved = self
                .uiprefs
                .as_ref()
                .and_then(|prefs| prefs.create_time.clone());
            let actual = self.get_status_info("Create_time", false).await?;
            if saved.as_deref() != actual.as_deref() {
                debug!(property, "discarding stale preference for recreated table");
                self.remove_ui_prop(property).await?;
                return Ok(None);
            }
        }

        Ok(self
            .uiprefs
            .as_ref()
            .and_then(|prefs| prefs.prefs.get(property).cloned()))
    }

    /// Store a UI preference, stamping it with the table's creation
    /// time when the property is creation-sensitive.
    pub async fn set_ui_prop(&mut self, property: &str, value: JsonValue) -> Result<()> {
        self.load_uiprefs().await?;
        let create_time = if (property == PROP_COLUMN_ORDER || property == PROP_COLUMN_VISIB)
            && !self.is_view().await?
        {
            self.get_status_info("Create_time", false).await?
        } else {
            None
        };

        let prefs = self.uiprefs.get_or_insert_with(StoredUiPrefs::default);
        prefs.prefs.insert(property.to_string(), value);
        if create_time.is_some() {
            prefs.create_time = create_time;
        }
        self.save_uiprefs().await
    }

    pub async fn remove_ui_prop(&mut self, property: &str) -> Result<()> {
        self.load_uiprefs().await?;
        if let Some(prefs) = &mut self.uiprefs {
            prefs.prefs.remove(property);
        }
        self.save_uiprefs().await
    }

    async fn load_uiprefs(&mut self) -> Result<()> {
        if self.uiprefs.is_some() {
            return Ok(());
        }
        let store = match &self.uiprefs_store {
            Some(store) => Arc::clone(store),
            None => return Ok(()),
        };
        self.uiprefs = Some(store.load(&self.schema, &self.name).await?);
        Ok(())
    }

    async fn save_uiprefs(&mut self) -> Result<()> {
        let store = match &self.uiprefs_store {
            Some(store) => Arc::clone(store),
            None => return Ok(()),
        };
        if let Some(prefs) = &self.uiprefs {
            store.save(&self.schema, &self.name, prefs).await?;
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .finish()
    }
}
