//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DdlError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// End-user server connection.
    pub connection: ConnectionConfig,

    /// Optional control connection for the configuration storage.
    #[serde(default)]
    pub control_connection: Option<ConnectionConfig>,

    /// Row-counting heuristics.
    #[serde(default)]
    pub counting: CountingConfig,

    /// Optional configuration storage (relation/metadata feature).
    #[serde(default)]
    pub relation: Option<RelationConfig>,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.connection.host.is_empty() {
            return Err(DdlError::Config(
                "connection.host must not be empty".to_string(),
            ));
        }
        if let Some(relation) = &self.relation {
            if relation.db.is_empty() {
                return Err(DdlError::Config(
                    "relation.db must name the configuration storage schema".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One MySQL server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Default schema, if any.
    #[serde(default)]
    pub database: Option<String>,
}

/// Limits for the exact/estimated row-count trade-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountingConfig {
    /// Above this estimate, tables keep their estimated row count
    /// unless an exact count is forced.
    #[serde(default = "default_max_exact_count")]
    pub max_exact_count: u64,

    /// Upper bound on exact counting for views; 0 disables exact view
    /// counts entirely.
    #[serde(default)]
    pub max_exact_count_views: u64,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            max_exact_count: default_max_exact_count(),
            max_exact_count_views: 0,
        }
    }
}

/// Location of the configuration storage tables.
///
/// A feature is enabled exactly when its storage table is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Schema holding the storage tables.
    pub db: String,

    /// Cross-table relation links.
    #[serde(default)]
    pub relation: Option<String>,

    /// Display-column assignments.
    #[serde(default)]
    pub table_info: Option<String>,

    /// Per-table UI preferences.
    #[serde(default)]
    pub table_uiprefs: Option<String>,

    /// Column comments and content transformations.
    #[serde(default)]
    pub column_info: Option<String>,
}

impl RelationConfig {
    /// Whether the named feature is available.
    pub fn feature_enabled(&self, work: &str) -> bool {
        match work {
            "relwork" => self.relation.is_some(),
            "displaywork" => self.table_info.is_some(),
            "uiprefswork" => self.table_uiprefs.is_some(),
            "mimework" => self.column_info.is_some(),
            _ => false,
        }
    }

    /// Storage table behind the given key, if configured.
    pub fn storage_table(&self, key: &str) -> Option<&str> {
        match key {
            "relation" => self.relation.as_deref(),
            "table_info" => self.table_info.as_deref(),
            "table_uiprefs" => self.table_uiprefs.as_deref(),
            "column_info" => self.column_info.as_deref(),
            _ => None,
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_max_exact_count() -> u64 {
    50_000
}
