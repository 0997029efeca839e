//! Error types for the schema engine.

use thiserror::Error;

/// Main error type for DDL generation and migration operations.
#[derive(Error, Debug)]
pub enum DdlError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An identifier or column/index description failed validation
    /// before any statement was emitted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server rejected a generated statement.
    #[error("Statement failed: {message}\n  SQL: {sql}")]
    Statement { sql: String, message: String },

    /// Connection or protocol error from the MySQL driver.
    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DdlError {
    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DdlError::Validation(message.into())
    }

    /// Create a Statement error tagged with the SQL that failed.
    pub fn statement(sql: impl Into<String>, message: impl Into<String>) -> Self {
        DdlError::Statement {
            sql: sql.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DdlError>;
