//! MySQL/MariaDB implementation of [`DbAccess`] over `mysql_async`.
//!
//! Result values are converted to their text form, which is what the
//! status/metadata queries (`SHOW TABLE STATUS`, `SHOW COLUMNS`,
//! `SHOW INDEXES`) want anyway.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, Row as MySqlRow, Value};
use tracing::{debug, info};

use crate::access::{ConnectionScope, DbAccess, Row};
use crate::config::ConnectionConfig;
use crate::error::{DdlError, Result};

/// `DbAccess` backed by one user pool and an optional control pool for
/// the configuration storage.
pub struct MysqlAccess {
    user: Pool,
    control: Option<Pool>,
}

impl MysqlAccess {
    /// Connect using the given configuration.
    pub async fn connect(
        config: &ConnectionConfig,
        control: Option<&ConnectionConfig>,
    ) -> Result<Self> {
        let user = Pool::new(build_opts(config));
        // Probe the connection so misconfiguration surfaces here.
        let mut conn = user.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        drop(conn);

        info!(
            "Connected to MySQL server {}:{}",
            config.host, config.port
        );

        let control = control.map(|cfg| Pool::new(build_opts(cfg)));

        Ok(Self { user, control })
    }

    /// Build an access layer from existing pools.
    pub fn from_pools(user: Pool, control: Option<Pool>) -> Self {
        Self { user, control }
    }

    async fn conn(&self, scope: ConnectionScope) -> Result<Conn> {
        let pool = match scope {
            ConnectionScope::User => &self.user,
            // Fall back to the user connection when no control
            // connection is configured.
            ConnectionScope::Control => self.control.as_ref().unwrap_or(&self.user),
        };
        Ok(pool.get_conn().await?)
    }

    /// Disconnect all pools.
    pub async fn close(self) -> Result<()> {
        self.user.disconnect().await?;
        if let Some(control) = self.control {
            control.disconnect().await?;
        }
        Ok(())
    }
}

fn build_opts(config: &ConnectionConfig) -> OptsBuilder {
    OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(config.database.clone())
}

#[async_trait]
impl DbAccess for MysqlAccess {
    async fn try_query(&self, sql: &str, scope: ConnectionScope) -> Result<u64> {
        debug!(scope = ?scope, "executing: {}", sql);
        let mut conn = self.conn(scope).await?;
        let rows: Vec<MySqlRow> = conn
            .query(sql)
            .await
            .map_err(|e| DdlError::statement(sql, e.to_string()))?;
        if rows.is_empty() {
            Ok(conn.affected_rows())
        } else {
            Ok(rows.len() as u64)
        }
    }

    async fn fetch_result(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("fetching: {}", sql);
        let mut conn = self.conn(ConnectionScope::User).await?;
        let rows: Vec<MySqlRow> = conn
            .query(sql)
            .await
            .map_err(|e| DdlError::statement(sql, e.to_string()))?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn fetch_result_control(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("fetching (control): {}", sql);
        let mut conn = self.conn(ConnectionScope::Control).await?;
        let rows: Vec<MySqlRow> = conn
            .query(sql)
            .await
            .map_err(|e| DdlError::statement(sql, e.to_string()))?;
        Ok(rows.iter().map(convert_row).collect())
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for (i, column) in row.columns_ref().iter().enumerate() {
        let value = row.as_ref(i).and_then(value_to_text);
        out.push(column.name_str().to_string(), value);
    }
    out
}

/// Render a protocol value as text; `None` for SQL NULL.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Some(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let total_hours = u32::from(*hours) + days * 24;
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds);
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Some(text)
        }
    }
}
