//! Row counting and cheap row-existence probes.

use tracing::debug;

use crate::access::ConnectionScope;
use crate::core::identifier::backquote;
use crate::error::Result;
use crate::table::Table;

impl Table {
    /// Number of rows in the table.
    ///
    /// An exact count already in the cache wins. Otherwise, unless
    /// `force_exact` is set, a large table keeps the server's estimated
    /// row count from the status row; small tables (and forced calls)
    /// get a real `COUNT(*)`. Counting rows of a view can be arbitrarily
    /// expensive, so views are counted through a `LIMIT`-bounded probe,
    /// capped by `max_exact_count_views`; a cap of 0 leaves the view
    /// count unknown.
    pub async fn count_records(&self, force_exact: bool) -> Result<Option<u64>> {
        if let Some(rows) = self.cache.exact_rows(self.schema(), self.name()) {
            return Ok(Some(rows));
        }

        let is_view = self.is_view().await?;
        if !force_exact && !is_view {
            let estimate: Option<u64> = self
                .get_status_info("Rows", false)
                .await?
                .and_then(|value| value.parse().ok());
            if let Some(estimate) = estimate {
                if estimate > self.counting.max_exact_count {
                    debug!(
                        table = %self.full_name(),
                        estimate,
                        "returning estimated row count"
                    );
                    return Ok(Some(estimate));
                }
            }
        }

        let exact = if !is_view {
            self.db
                .fetch_value(&format!("SELECT COUNT(*) FROM {}", self.full_name_quoted()))
                .await?
                .and_then(|value| value.parse().ok())
        } else if self.counting.max_exact_count_views == 0 {
            None
        } else {
            let sql = format!(
                "SELECT 1 FROM {} LIMIT {}",
                self.full_name_quoted(),
                self.counting.max_exact_count_views,
            );
            Some(self.db.try_query(&sql, ConnectionScope::User).await?)
        };

        if let Some(rows) = exact {
            self.cache.set_exact_rows(self.schema(), self.name(), rows);
        }
        Ok(exact)
    }

    /// Whether the table holds at least `threshold` rows.
    ///
    /// Selects only the cheapest available index column rather than
    /// counting: a single-column primary key if one exists, else a
    /// single-column unique index, else any indexed column, else a full
    /// row. The query is bounded by `LIMIT threshold`, so this stays
    /// cheap even on huge tables.
    pub async fn check_if_min_records_exist(&self, threshold: u64) -> Result<bool> {
        let probe = self.probe_column().await?;
        let sql = format!(
            "SELECT {} FROM {} LIMIT {}",
            probe,
            self.full_name_quoted(),
            threshold,
        );
        let rows = self.db.try_query(&sql, ConnectionScope::User).await?;
        Ok(rows >= threshold)
    }

    /// Columns covered by single-column unique indexes, primary key
    /// first.
    pub async fn unique_columns(&self) -> Result<Vec<String>> {
        let indexes = self.show_indexes().await?;
        let mut primary = Vec::new();
        let mut unique = Vec::new();
        for index in &indexes {
            if index.non_unique {
                continue;
            }
            if Self::is_single_column(&indexes, &index.key_name) {
                if index.key_name == "PRIMARY" {
                    primary.push(index.column.clone());
                } else {
                    unique.push(index.column.clone());
                }
            }
        }
        primary.extend(unique);
        Ok(primary)
    }

    /// Leading columns of every index, in index order.
    pub async fn indexed_columns(&self) -> Result<Vec<String>> {
        Ok(self
            .show_indexes()
            .await?
            .into_iter()
            .filter(|index| index.seq_in_index == 1)
            .map(|index| index.column)
            .collect())
    }

    async fn probe_column(&self) -> Result<String> {
        if let Some(column) = self.unique_columns().await?.into_iter().next() {
            return Ok(backquote(&column));
        }
        if let Some(column) = self.indexed_columns().await?.into_iter().next() {
            return Ok(backquote(&column));
        }
        Ok("*".to_string())
    }

    async fn show_indexes(&self) -> Result<Vec<IndexEntry>> {
        let sql = format!("SHOW INDEXES FROM {}", self.full_name_quoted());
        let rows = self.db.fetch_result(&sql).await?;
        Ok(rows
            .iter()
            .map(|row| IndexEntry {
                key_name: row.get("Key_name").unwrap_or_default().to_string(),
                column: row.get("Column_name").unwrap_or_default().to_string(),
                non_unique: row.get("Non_unique") != Some("0"),
                seq_in_index: row
                    .get("Seq_in_index")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(1),
            })
            .collect())
    }

    fn is_single_column(indexes: &[IndexEntry], key_name: &str) -> bool {
        indexes
            .iter()
            .filter(|index| index.key_name == key_name)
            .count()
            == 1
    }
}

struct IndexEntry {
    key_name: String,
    column: String,
    non_unique: bool,
    seq_in_index: u32,
}
