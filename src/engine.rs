//! Embedded SQLite store adapter.
//!
//! This module owns the connection to the file-backed store and the tabular
//! result type the rest of the crate consumes. The pool is capped at a single
//! connection: one session, one exclusively owned store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, TypeInfo};

use crate::error::{TidyError, TidyResult};

/// A materialized tabular result: ordered named columns and dynamically
/// typed rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame from column names and row data.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Column names in statement order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row data, one cell vector per row.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of one named column, or `None` if the column is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

/// A connection to an embedded SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// A leading `~/` expands to the user's home directory. The special path
    /// `:memory:` opens a transient in-memory store.
    pub async fn open(path: &str) -> TidyResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(expand_home(path))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| TidyError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// List every table in the store.
    pub async fn tables(&self) -> TidyResult<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TidyError::Execution(e.to_string()))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| TidyError::Execution(e.to_string()))
            })
            .collect()
    }

    /// Ordered column names of `table`, read from a zero-row projection.
    pub async fn columns(&self, table: &str) -> TidyResult<Vec<String>> {
        let sql = format!("SELECT * FROM '{table}' LIMIT 1");
        let described = (&self.pool)
            .describe(&sql)
            .await
            .map_err(|e| TidyError::Execution(e.to_string()))?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }

    /// Run a statement and collect its rows into a [`Frame`].
    pub async fn fetch(&self, sql: &str) -> TidyResult<Frame> {
        tracing::debug!(%sql, "fetching rows");
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TidyError::Execution(e.to_string()))?;

        match rows.first() {
            Some(first) => {
                let columns = first.columns().iter().map(|c| c.name().to_string()).collect();
                let data = rows.iter().map(row_values).collect();
                Ok(Frame::new(columns, data))
            }
            None => {
                // A zero-row result carries no header; recover it from the
                // statement itself.
                let described = (&self.pool)
                    .describe(sql)
                    .await
                    .map_err(|e| TidyError::Execution(e.to_string()))?;
                let columns = described
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                Ok(Frame::new(columns, Vec::new()))
            }
        }
    }

    /// Run a statement for its side effects, returning affected rows.
    pub async fn execute(&self, sql: &str) -> TidyResult<u64> {
        tracing::debug!(%sql, "executing statement");
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| TidyError::Execution(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Decode one engine row into dynamic cells by declared type name.
fn row_values(row: &SqliteRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| match column.type_info().name() {
            "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "INTEGER" | "INT8" | "BIGINT" => row
                .try_get::<i64, _>(i)
                .map(|v| Value::Number(v.into()))
                .unwrap_or(Value::Null),
            "REAL" | "NUMERIC" => row
                .try_get::<f64, _>(i)
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<String, _>(i)
                .map(Value::String)
                .unwrap_or(Value::Null),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Frame {
        Frame::new(
            vec!["country".to_string(), "year".to_string()],
            vec![
                vec![json!("US"), json!(2001)],
                vec![json!("FR"), json!(2004)],
            ],
        )
    }

    #[test]
    fn test_frame_accessors() {
        let frame = sample();
        assert_eq!(frame.columns(), &["country", "year"]);
        assert_eq!(frame.row_count(), 2);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_frame_column_lookup() {
        let frame = sample();
        let years = frame.column("year").unwrap();
        assert_eq!(years, vec![&json!(2001), &json!(2004)]);
        assert!(frame.column("missing").is_none());
    }

    #[test]
    fn test_home_expansion_leaves_plain_paths() {
        assert_eq!(expand_home("data.sqlite"), PathBuf::from("data.sqlite"));
        assert_eq!(expand_home(":memory:"), PathBuf::from(":memory:"));
    }
}
