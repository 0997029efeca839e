//! Cached table-status attributes and structural facts.
//!
//! The server reports engine, collation, comment and friends through
//! `SHOW TABLE STATUS`; fetching that per accessor call would hammer the
//! server, so all attributes for a table are pulled in one round trip
//! and memoized in a process-wide [`StatusCache`] keyed by
//! (schema, table). Structural changes must call
//! [`StatusCache::invalidate`] for every identity they touch.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::core::identifier::quote_literal;
use crate::error::Result;
use crate::table::Table;

/// Engines that present a unified view over underlying tables.
const MERGE_ENGINES: &[&str] = &["MERGE", "MRG_MYISAM"];

#[derive(Debug, Default, Clone)]
struct CacheEntry {
    status: Option<HashMap<String, String>>,
    is_view: Option<bool>,
    is_updatable_view: Option<bool>,
    exact_rows: Option<u64>,
}

/// Shared per-(schema, table) memo of server-reported attributes.
///
/// Not a singleton: whoever owns the connection owns the cache and
/// hands `Arc` clones to each [`Table`].
#[derive(Debug, Default)]
pub struct StatusCache {
    inner: Mutex<HashMap<(String, String), CacheEntry>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything cached for one table identity.
    pub fn invalidate(&self, schema: &str, table: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(&(schema.to_string(), table.to_string()));
    }

    pub(crate) fn status(&self, schema: &str, table: &str) -> Option<HashMap<String, String>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&(schema.to_string(), table.to_string()))
            .and_then(|entry| entry.status.clone())
    }

    pub(crate) fn set_status(&self, schema: &str, table: &str, status: HashMap<String, String>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .status = Some(status);
    }

    pub(crate) fn is_view(&self, schema: &str, table: &str) -> Option<bool> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&(schema.to_string(), table.to_string()))
            .and_then(|entry| entry.is_view)
    }

    pub(crate) fn set_is_view(&self, schema: &str, table: &str, value: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .is_view = Some(value);
    }

    pub(crate) fn is_updatable_view(&self, schema: &str, table: &str) -> Option<bool> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&(schema.to_string(), table.to_string()))
            .and_then(|entry| entry.is_updatable_view)
    }

    pub(crate) fn set_is_updatable_view(&self, schema: &str, table: &str, value: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .is_updatable_view = Some(value);
    }

    pub(crate) fn exact_rows(&self, schema: &str, table: &str) -> Option<u64> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&(schema.to_string(), table.to_string()))
            .and_then(|entry| entry.exact_rows)
    }

    pub(crate) fn set_exact_rows(&self, schema: &str, table: &str, rows: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .exact_rows = Some(rows);
    }
}

impl Table {
    /// One attribute from `SHOW TABLE STATUS`, fetched on first access
    /// and memoized in the shared cache.
    pub async fn get_status_info(
        &self,
        key: &str,
        force_reload: bool,
    ) -> Result<Option<String>> {
        let cached = if force_reload {
            None
        } else {
            self.cache.status(self.schema(), self.name())
        };
        let status = match cached {
            Some(status) => status,
            None => {
                debug!(table = %self.full_name(), "loading table status");
                let row = self.db.get_table_status(self.schema(), self.name()).await?;
                let status: HashMap<String, String> = match row {
                    Some(row) => row
                        .columns()
                        .iter()
                        .enumerate()
                        .filter_map(|(i, column)| {
                            row.get_index(i).map(|value| (column.clone(), value))
                        })
                        .collect(),
                    None => HashMap::new(),
                };
                self.cache
                    .set_status(self.schema(), self.name(), status.clone());
                status
            }
        };
        Ok(status.get(key).cloned())
    }

    pub async fn storage_engine(&self) -> Result<Option<String>> {
        // Older servers report the engine under "Type".
        match self.get_status_info("Engine", false).await? {
            Some(engine) => Ok(Some(engine.to_uppercase())),
            None => Ok(self
                .get_status_info("Type", false)
                .await?
                .map(|engine| engine.to_uppercase())),
        }
    }

    pub async fn collation(&self) -> Result<Option<String>> {
        self.get_status_info("Collation", false).await
    }

    pub async fn comment(&self) -> Result<Option<String>> {
        self.get_status_info("Comment", false).await
    }

    pub async fn row_format(&self) -> Result<Option<String>> {
        self.get_status_info("Row_format", false).await
    }

    pub async fn auto_increment(&self) -> Result<Option<u64>> {
        Ok(self
            .get_status_info("Auto_increment", false)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    /// Parsed `Create_options`, as an option-name → value map.
    ///
    /// The server reports space-separated `name=value` pairs; the row
    /// format also surfaces there and is folded into a `row_format`
    /// entry for uniform access.
    pub async fn create_options(&self) -> Result<HashMap<String, String>> {
        let raw = self
            .get_status_info("Create_options", false)
            .await?
            .unwrap_or_default();
        let mut options = HashMap::new();
        for pair in raw.split(' ').filter(|pair| !pair.is_empty()) {
            match pair.split_once('=') {
                Some((name, value)) => {
                    options.insert(name.to_string(), value.to_string());
                }
                None => {
                    options.insert(pair.to_string(), "ON".to_string());
                }
            }
        }
        if !options.contains_key("row_format") {
            if let Some(row_format) = self.get_status_info("Row_format", false).await? {
                options.insert("row_format".to_string(), row_format);
            }
        }
        Ok(options)
    }

    /// Whether the table uses a merge storage engine. A table with no
    /// cached engine (e.g. a broken view) reports false, not an error.
    pub async fn is_merge(&self) -> Result<bool> {
        let engine = match self.storage_engine().await? {
            Some(engine) => engine,
            None => return Ok(false),
        };
        Ok(MERGE_ENGINES.iter().any(|merge| *merge == engine))
    }

    /// Whether this handle names a view. Empty names short-circuit to
    /// false without contacting the server.
    pub async fn is_view(&self) -> Result<bool> {
        if self.schema().is_empty() || self.name().is_empty() {
            return Ok(false);
        }
        if let Some(cached) = self.cache.is_view(self.schema(), self.name()) {
            return Ok(cached);
        }
        let sql = format!(
            "SELECT 1 FROM information_schema.VIEWS WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
            quote_literal(self.schema()),
            quote_literal(self.name()),
        );
        let is_view = self.db.fetch_value(&sql).await?.is_some();
        self.cache.set_is_view(self.schema(), self.name(), is_view);
        Ok(is_view)
    }

    /// Whether this handle names a view the server considers updatable.
    pub async fn is_updatable_view(&self) -> Result<bool> {
        if self.schema().is_empty() || self.name().is_empty() {
            return Ok(false);
        }
        if let Some(cached) = self.cache.is_updatable_view(self.schema(), self.name()) {
            return Ok(cached);
        }
        let sql = format!(
            "SELECT 1 FROM information_schema.VIEWS WHERE TABLE_SCHEMA = {} \
             AND TABLE_NAME = {} AND IS_UPDATABLE = 'YES'",
            quote_literal(self.schema()),
            quote_literal(self.name()),
        );
        let updatable = self.db.fetch_value(&sql).await?.is_some();
        self.cache
            .set_is_updatable_view(self.schema(), self.name(), updatable);
        Ok(updatable)
    }
}
